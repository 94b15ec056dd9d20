/// A small linear congruential generator with explicit state.
///
/// Randomness here only adds layout variety (which shift a picture lands
/// on, which picture gets which root), so reproducibility matters more
/// than quality: the same seed and inputs must always plan the same trace.
/// The generator is passed `&mut` through every call that needs it; there
/// is no ambient RNG state anywhere in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRandom {
    seed: u64,
}

const MULTIPLIER: u64 = 9301;
const OFFSET: u64 = 49297;
const MODULUS: u64 = 233280;

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.seed = self
            .seed
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(OFFSET)
            % MODULUS;
        self.seed as f64 / MODULUS as f64
    }

    /// Fisher-Yates shuffle driven by this generator.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_f64() * (i as f64 + 1.0)) as usize;
            items.swap(i, j);
        }
    }
}
