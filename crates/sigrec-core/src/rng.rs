// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::AnalysisError;

/// Small deterministic splitmix64 generator.
///
/// Every randomized step in sigrec takes an explicit seed and builds one of
/// these locally, so identical inputs and seeds give bit-identical outputs on
/// every platform.
#[derive(Clone, Copy, Debug)]
pub struct StableRng {
    state: u64,
}

impl StableRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9e3779b97f4a7c15),
        }
    }

    /// Derives an independent stream for restart `stream` of a seeded procedure.
    pub fn derive(seed: u64, stream: u64) -> Self {
        Self::new(seed ^ stream.wrapping_mul(0xa0761d6478bd642f))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }

    /// Uniform draw in `[0, 1)` with 53 bits of precision.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    pub fn gen_range(&mut self, upper_exclusive: usize) -> Result<usize, AnalysisError> {
        if upper_exclusive == 0 {
            return Err(AnalysisError::invalid_input(
                "StableRng.gen_range requires upper_exclusive >= 1; got 0",
            ));
        }

        let value = self.next_u64();
        let modulus = u64::try_from(upper_exclusive)
            .map_err(|_| AnalysisError::resource_limit("rng upper_exclusive conversion overflow"))?;
        let sampled = value % modulus;
        usize::try_from(sampled)
            .map_err(|_| AnalysisError::resource_limit("rng sampled index conversion overflow"))
    }

    /// Picks `count` distinct indices from `0..population` (partial Fisher-Yates).
    ///
    /// The returned indices are in draw order.
    pub fn sample_indices(
        &mut self,
        population: usize,
        count: usize,
    ) -> Result<Vec<usize>, AnalysisError> {
        if count > population {
            return Err(AnalysisError::invalid_input(format!(
                "cannot sample {count} distinct indices from a population of {population}"
            )));
        }

        let mut pool: Vec<usize> = (0..population).collect();
        for slot in 0..count {
            let pick = slot + self.gen_range(population - slot)?;
            pool.swap(slot, pick);
        }
        pool.truncate(count);
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::StableRng;

    #[test]
    fn same_seed_gives_same_stream() {
        let mut a = StableRng::new(7);
        let mut b = StableRng::new(7);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn derived_streams_differ() {
        let mut a = StableRng::derive(7, 0);
        let mut b = StableRng::derive(7, 1);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn next_f64_stays_in_unit_interval() {
        let mut rng = StableRng::new(3);
        for _ in 0..10_000 {
            let value = rng.next_f64();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn gen_range_zero_is_rejected() {
        let mut rng = StableRng::new(0);
        let err = rng.gen_range(0).expect_err("empty range must fail");
        assert!(err.to_string().contains("upper_exclusive"));
    }

    #[test]
    fn sample_indices_are_distinct_and_in_range() {
        let mut rng = StableRng::new(11);
        let mut picked = rng.sample_indices(50, 20).expect("sampling should succeed");
        assert_eq!(picked.len(), 20);
        assert!(picked.iter().all(|&idx| idx < 50));
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 20);

        let all = rng.sample_indices(5, 5).expect("full draw should succeed");
        assert_eq!(all.len(), 5);
        assert!(rng.sample_indices(3, 4).is_err());
    }
}
