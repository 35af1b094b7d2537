//! Deterministic uniform deviates
//!
//! Park–Miller "minimal standard" multiplicative congruential generator:
//! `s' = 16807 · s mod (2^31 − 1)`. The state is a 31-bit value in
//! `1..2^31−1` held in a `u32`; every product is formed in `u64`, so no step
//! depends on native overflow or sign-extension behaviour and the sequence is
//! identical on every platform.
//!
//! Because the generator is a pure multiplication, `n` draws collapse into a
//! single multiplication by `16807^n`, which [`Seed::skip`] evaluates by
//! square-and-multiply.

/// Generator modulus, `2^31 − 1`
pub const MODULUS: u32 = 0x7FFF_FFFF;

/// Generator multiplier
pub const MULTIPLIER: u32 = 16_807;

/// A 31-bit generator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed(u32);

impl Seed {
    /// Substitute for a seed that reduces to zero
    pub const DEFAULT: Self = Self(1009);

    /// Reduce any integer into a valid state
    ///
    /// Zero is a fixed point of the generator and is replaced by
    /// [`Seed::DEFAULT`].
    pub fn new(raw: i64) -> Self {
        let reduced = raw.rem_euclid(MODULUS as i64) as u32;
        if reduced == 0 {
            Self::DEFAULT
        } else {
            Self(reduced)
        }
    }

    /// Raw state value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// One draw: the returned value is the new state
    #[inline]
    pub fn draw(self) -> (u32, Seed) {
        let next = mulmod(self.0 as u64, MULTIPLIER as u64) as u32;
        (next, Seed(next))
    }

    /// The state `n` draws later, without producing the intermediate values
    pub fn skip(self, n: u64) -> Seed {
        let factor = powmod(MULTIPLIER as u64, n);
        Seed(mulmod(self.0 as u64, factor) as u32)
    }
}

impl Default for Seed {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[inline]
fn mulmod(a: u64, b: u64) -> u64 {
    // Both operands are below 2^31, so the product fits in 62 bits.
    (a * b) % MODULUS as u64
}

fn powmod(mut base: u64, mut exp: u64) -> u64 {
    let mut acc = 1u64;
    base %= MODULUS as u64;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mulmod(acc, base);
        }
        base = mulmod(base, base);
        exp >>= 1;
    }
    acc
}

/// A stateful stream over [`Seed`] that counts the draws it has consumed
///
/// Rules draw through this wrapper so the generation context can pad every
/// candidate to its fixed draw budget with [`Prng::pad_to`].
#[derive(Debug, Clone)]
pub struct Prng {
    seed: Seed,
    drawn: u64,
}

impl Prng {
    /// Start a stream at `seed`
    pub fn new(seed: Seed) -> Self {
        Self { seed, drawn: 0 }
    }

    /// Current state
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Draws consumed since the stream was created or last reset
    pub fn drawn(&self) -> u64 {
        self.drawn
    }

    /// Replace the state and clear the draw counter
    pub fn reset(&mut self, seed: Seed) {
        self.seed = seed;
        self.drawn = 0;
    }

    /// Next raw 31-bit value, in `1..2^31−1`
    #[inline]
    pub fn next_u31(&mut self) -> u32 {
        let (value, next) = self.seed.draw();
        self.seed = next;
        self.drawn += 1;
        value
    }

    /// Uniform integer in `0..n`; one draw even when `n` is zero
    #[inline]
    pub fn below(&mut self, n: u32) -> u32 {
        let value = self.next_u31() as u64;
        ((value * n as u64) >> 31) as u32
    }

    /// Triangular offset in `-radius..=radius` (two draws)
    #[inline]
    pub fn jitter(&mut self, radius: u32) -> i32 {
        let a = self.below(radius + 1) as i32;
        let b = self.below(radius + 1) as i32;
        a + b - radius as i32
    }

    /// Advance by `n` draws without producing them
    pub fn skip(&mut self, n: u64) {
        if n > 0 {
            self.seed = self.seed.skip(n);
            self.drawn += n;
        }
    }

    /// Fast-forward until `budget` draws have been consumed
    pub fn pad_to(&mut self, budget: u64) {
        debug_assert!(self.drawn <= budget, "rule overdrew its budget");
        self.skip(budget.saturating_sub(self.drawn));
    }
}
