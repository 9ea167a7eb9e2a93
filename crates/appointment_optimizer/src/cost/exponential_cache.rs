use fxhash::FxHashMap;
use ndarray::Array2;

/// Default budget of cached matrix entries, 32 MiB of `f64`.
pub const DEFAULT_MAX_CACHED_ELEMENTS: usize = 1 << 22;

/// Arena of `exp(V_i * x)` matrices keyed by client index and the exact bit
/// pattern of the elapsed time.
///
/// Between objective evaluations of the minimizer most interarrival times stay
/// the same (the padded and fixed slots never change, and a finite difference
/// only moves one coordinate), so most exponentials are found here.
pub struct ExponentialCache {
    slots: FxHashMap<(usize, u64), usize>,
    arena: Vec<Array2<f64>>,
    stored_elements: usize,
    max_elements: usize,
    hits: usize,
    misses: usize,
}

impl ExponentialCache {
    pub fn new(max_elements: usize) -> Self {
        ExponentialCache {
            slots: FxHashMap::default(),
            arena: Vec::new(),
            stored_elements: 0,
            max_elements,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_compute<F>(&mut self, client: usize, elapsed: f64, compute: F) -> &Array2<f64>
    where
        F: FnOnce() -> Array2<f64>,
    {
        let key = (client, elapsed.to_bits());

        let slot = match self.slots.get(&key) {
            Some(&slot) => {
                self.hits += 1;
                slot
            }
            None => {
                self.misses += 1;
                let matrix = compute();

                if self.stored_elements + matrix.len() > self.max_elements {
                    self.clear();
                }

                self.stored_elements += matrix.len();
                self.arena.push(matrix);
                let slot = self.arena.len() - 1;
                self.slots.insert(key, slot);
                slot
            }
        };

        &self.arena[slot]
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.arena.clear();
        self.stored_elements = 0;
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl Default for ExponentialCache {
    fn default() -> Self {
        ExponentialCache::new(DEFAULT_MAX_CACHED_ELEMENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_entries() {
        let mut cache = ExponentialCache::default();
        let mut computed = 0;

        for _ in 0..3 {
            cache.get_or_compute(1, 0.5, || {
                computed += 1;
                Array2::eye(2)
            });
        }

        assert_eq!(computed, 1);
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_keys_on_client_and_exact_time() {
        let mut cache = ExponentialCache::default();

        cache.get_or_compute(0, 0.5, || Array2::eye(1));
        cache.get_or_compute(1, 0.5, || Array2::eye(2));
        cache.get_or_compute(1, 0.5 + f64::EPSILON, || Array2::eye(2));

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.misses(), 3);
    }

    #[test]
    fn test_clears_when_budget_exceeded() {
        let mut cache = ExponentialCache::new(10);

        cache.get_or_compute(0, 1.0, || Array2::eye(3));
        assert_eq!(cache.len(), 1);

        let matrix = cache.get_or_compute(0, 2.0, || Array2::eye(2) * 2.0);
        assert_eq!(matrix[[0, 0]], 2.0);
        assert_eq!(cache.len(), 1);
    }
}
