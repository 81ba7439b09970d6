//! Xorshift32 PRNG (§4.1), grounded in `original_source/lottery-scheduler/rand.c`.
//!
//! The C source keeps one mutable global `randstate`; this crate generalizes that into one
//! `Prng` per CPU so that per-CPU draws are decorrelated (§9 Design Notes: "Do not substitute
//! a single long-running stream").

/// Xorshift32 generator. Never reaches the all-zero state after [`Prng::seed`].
#[derive(Copy, Clone, Debug)]
pub struct Prng {
    state: u32,
}

impl Prng {
    /// A fresh generator seeded to the non-zero default state, matching the C source's
    /// `unsigned int randstate = 1;` static initializer.
    pub const fn new() -> Prng {
        Prng { state: 1 }
    }

    /// Set the internal state. A zero seed is silently promoted to 1.
    pub fn seed(&mut self, seed: u32) {
        self.state = if seed == 0 { 1 } else { seed };
    }

    /// Advance the generator and return the lower 31 bits of the new state.
    pub fn next(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x & 0x7fff_ffff
    }

    /// Return a value in `[0, n)` with modulo-bias rejection. Panics if `n == 0`.
    pub fn range(&mut self, n: u32) -> u32 {
        assert!(n >= 1, "Prng::range requires n >= 1");
        if n == 1 {
            // The rejection loop below is correct for n == 1 too (threshold divides evenly),
            // but short-circuit to avoid an unnecessary draw.
            self.next();
            return 0;
        }
        let threshold = (0x7fff_ffffu32 / n) * n;
        loop {
            let r = self.next();
            if r < threshold {
                return r % n;
            }
        }
    }

    /// Re-seed from a mix of the current tick counter, CPU id, current state, and an
    /// iteration salt, then draw once. This is the exact re-seed-before-every-draw
    /// convention §9 requires preserved.
    pub fn reseed_and_draw(&mut self, ticks_now: u64, cpu_id: usize, salt: u64, n: u32) -> u32 {
        let mix = (ticks_now as u32)
            ^ (cpu_id as u32).wrapping_mul(0x9E37_79B9)
            ^ self.state.rotate_left(7)
            ^ (salt as u32).wrapping_mul(0x85EB_CA6B);
        self.seed(mix);
        self.range(n)
    }
}

impl Default for Prng {
    fn default() -> Self {
        Prng::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_seed_promoted_to_one() {
        let mut p = Prng::new();
        p.seed(0);
        let mut expected = Prng::new();
        expected.seed(1);
        assert_eq!(p.next(), expected.next());
    }

    #[test]
    fn deterministic_given_explicit_seed() {
        let mut a = Prng::new();
        a.seed(12345);
        let mut b = Prng::new();
        b.seed(12345);
        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn range_never_reaches_n() {
        let mut p = Prng::new();
        p.seed(42);
        for n in [1u32, 2, 3, 7, 64, 1000] {
            for _ in 0..2000 {
                assert!(p.range(n) < n);
            }
        }
    }

    #[test]
    fn range_distributes_reasonably() {
        let mut p = Prng::new();
        p.seed(7);
        let n = 10u32;
        let mut counts = [0u32; 10];
        for _ in 0..100_000 {
            counts[p.range(n) as usize] += 1;
        }
        for c in counts {
            // Expect roughly 10_000 per bucket; allow generous slack since this is not a
            // statistical-quality test, just a sanity check against an obviously broken shift.
            assert!(c > 7_000 && c < 13_000, "bucket count {c} looks biased");
        }
    }
}
