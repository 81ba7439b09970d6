//! End-to-end scenario tests against the public `Kernel` API, standing in for a real
//! multi-process workload the way `original_source/*/*.c`'s test harnesses drive the C
//! scheduler under load.

use rv6_sched::policy::Policy;
use rv6_sched::process::ProcessState;
use rv6_sched::scheduler::NoopSwitch;
use rv6_sched::syscall::WaitOutcome;
use rv6_sched::Kernel;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn lottery_shares_converge_to_ticket_ratio() {
    init_logging();
    let k = Kernel::new(Policy::Lottery { decay_period: 0 });
    let heavy = k.spawn(0, "heavy", None).unwrap();
    let light = k.spawn(0, "light", None).unwrap();
    let heavy_pid = k.getpid(0, heavy);
    let light_pid = k.getpid(0, light);
    k.settickets(0, heavy_pid, 90).unwrap();
    k.settickets(0, light_pid, 10).unwrap();

    let mut heavy_wins = 0u32;
    let mut switch = NoopSwitch;
    for _ in 0..2000 {
        if let Some(idx) = k.schedule(0, &mut switch) {
            if idx == heavy {
                heavy_wins += 1;
            }
            k.yield_now(0, idx);
        }
    }
    let share = heavy_wins as f64 / 2000.0;
    assert!((0.80..=0.98).contains(&share), "heavy share was {share}");

    // `ticks_scheduled` is the cumulative "times selected" counter (§3); it must match the
    // hand-counted tally exactly, and never reset just because a process was re-enqueued.
    let heavy_ticks_scheduled = k.getpinfo_one(0, heavy_pid).unwrap().ticks_scheduled;
    assert_eq!(heavy_ticks_scheduled, heavy_wins as u64);
}

#[test]
fn priority_policy_always_prefers_the_strictly_higher_band() {
    let k = Kernel::new(Policy::priority());
    let low = k.spawn(0, "low", None).unwrap();
    let high = k.spawn(0, "high", None).unwrap();
    let low_pid = k.getpid(0, low);
    let high_pid = k.getpid(0, high);
    k.setpriority(0, low_pid, 9).unwrap();
    k.setpriority(0, high_pid, 0).unwrap();

    let mut switch = NoopSwitch;
    let picked = k.schedule(0, &mut switch);
    assert_eq!(picked, Some(high));
}

#[test]
fn priority_aging_prevents_starvation_of_low_band_processes() {
    let k = Kernel::new(Policy::priority());
    let starved = k.spawn(0, "starved", None).unwrap();
    let starved_pid = k.getpid(0, starved);
    k.setpriority(0, starved_pid, 10).unwrap();

    // A constant stream of fresh high-priority arrivals would starve `starved` forever
    // without aging; confirm aging promotes it into contention within a bounded number of
    // ticks instead.
    let mut promoted = false;
    for t in 0..500u64 {
        let contender = k.spawn(0, "contender", None).unwrap();
        k.setpriority(0, k.getpid(0, contender), 0).unwrap();
        k.tick(0);
        let info = k.getpinfo_one(0, starved_pid).unwrap();
        if info.priority.unwrap() < 10 {
            promoted = true;
            break;
        }
        let _ = t;
    }
    assert!(promoted, "starved process was never promoted by aging");
}

#[test]
fn round_robin_gives_every_runnable_process_a_turn() {
    let k = Kernel::new(Policy::round_robin());
    let procs: Vec<usize> = (0..4).map(|i| k.spawn(0, &format!("p{i}"), None).unwrap()).collect();

    let mut order = Vec::new();
    let mut switch = NoopSwitch;
    for _ in 0..procs.len() {
        let idx = k.schedule(0, &mut switch).unwrap();
        order.push(idx);
        k.yield_now(0, idx);
    }
    for p in &procs {
        assert!(order.contains(p), "process {p} never got a turn in one full round");
    }
}

#[test]
fn fork_exit_wait_is_idempotent_across_repeated_cycles() {
    let k = Kernel::new(Policy::round_robin());
    let parent = k.spawn(0, "parent", None).unwrap();
    k.mark_init(parent);

    for _ in 0..10 {
        let child = k.fork(0, parent).unwrap();
        let child_pid = k.getpid(0, child);
        k.exit(0, child, 0);
        match k.wait(0, parent).unwrap() {
            WaitOutcome::Reaped { pid, .. } => assert_eq!(pid, child_pid),
            WaitOutcome::Blocked => panic!("expected an immediate reap"),
        }
    }
    // The table must be back to just the parent: every child slot was freed.
    assert_eq!(k.getpinfo(0).len(), 1);
}

#[test]
fn killed_sleeper_observes_the_kill_flag_after_waking() {
    let k = Kernel::new(Policy::round_robin());
    let idx = k.spawn(0, "victim", None).unwrap();
    let pid = k.getpid(0, idx);
    {
        let mut slots = k.table.lock(0);
        slots[idx].state = ProcessState::Running;
        rv6_sched::sleepwake::sleep(&mut slots, idx, 0x1234);
    }
    k.kill(0, pid).unwrap();
    assert_eq!(k.table.lock(0)[idx].state, ProcessState::Runnable);
    assert!(k.is_killed(0, idx));
}

#[test]
fn process_table_exhaustion_is_reported_not_panicked() {
    let k = Kernel::new(Policy::round_robin());
    let mut last = Ok(0);
    for i in 0..10_000 {
        last = k.spawn(0, &format!("p{i}"), None);
        if last.is_err() {
            break;
        }
    }
    assert!(last.is_err(), "expected the table to eventually report exhaustion");
}
