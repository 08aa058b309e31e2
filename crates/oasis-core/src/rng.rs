//! Deterministic placement RNG
//!
//! xorshift64, used to scatter new profiles across the world map. Seeded from
//! config so a test run places players reproducibly.

#[derive(Debug, Clone)]
pub struct GameRng {
    state: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed (zero is remapped; xorshift needs a non-zero state)
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-ish value in `0..bound`; zero when `bound` is zero
    pub fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % u64::from(bound)) as u32
    }

    /// Map coordinates in `0..size` on both axes
    pub fn map_position(&mut self, size: u32) -> (i32, i32) {
        let x = self.below(size);
        let y = self.below(size);
        (
            i32::try_from(x).unwrap_or(i32::MAX),
            i32::try_from(y).unwrap_or(i32::MAX),
        )
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(12345)
    }
}
