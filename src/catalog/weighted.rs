//! Weighted choice over a closed set of categories.

use crate::error::{EngineError, Result};
use rand::Rng;
use std::fmt::Debug;

/// A validated weighted set.
///
/// Drawing uses one uniform integer in `[0, total_weight)` and a prefix-sum
/// search, so the chance of entry `i` is exactly `weight_i / total_weight`
/// whatever order the entries were declared in.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedCatalog<T> {
    ids: Vec<T>,
    weights: Vec<u64>,
    cumulative: Vec<u64>,
    total: u64,
}

impl<T: Clone + PartialEq + Debug> WeightedCatalog<T> {
    /// Validate and build a catalog.
    ///
    /// Rejects an empty set, any weight `<= 0` and duplicate ids.
    pub fn new(entries: Vec<(T, i64)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(EngineError::InvalidCatalog(
                "weighted set has no entries".to_string(),
            ));
        }

        let mut ids = Vec::with_capacity(entries.len());
        let mut weights = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut total: u64 = 0;

        for (id, weight) in entries {
            if weight <= 0 {
                return Err(EngineError::InvalidCatalog(format!(
                    "entry {:?} has non-positive weight {}",
                    id, weight
                )));
            }
            if ids.contains(&id) {
                return Err(EngineError::InvalidCatalog(format!(
                    "duplicate entry {:?}",
                    id
                )));
            }
            total = total.checked_add(weight as u64).ok_or_else(|| {
                EngineError::InvalidCatalog("total weight overflows".to_string())
            })?;
            ids.push(id);
            weights.push(weight as u64);
            cumulative.push(total);
        }

        Ok(Self {
            ids,
            weights,
            cumulative,
            total,
        })
    }

    /// Draw one id, consuming a single uniform integer from `rng`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &T {
        let roll = rng.gen_range(0..self.total);
        let index = self.cumulative.partition_point(|&bound| bound <= roll);
        &self.ids[index]
    }

    /// Declared probability of `id`, or `None` if it is not in the set.
    pub fn probability(&self, id: &T) -> Option<f64> {
        self.ids
            .iter()
            .position(|candidate| candidate == id)
            .map(|i| self.weights[i] as f64 / self.total as f64)
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &T) -> bool {
        self.ids.contains(id)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, u64)> {
        self.ids.iter().zip(self.weights.iter().copied())
    }
}

/// One-shot draw over an ordered `(id, weight)` sequence.
pub fn draw<T, R>(entries: &[(T, i64)], rng: &mut R) -> Result<T>
where
    T: Clone + PartialEq + Debug,
    R: Rng + ?Sized,
{
    let catalog = WeightedCatalog::new(entries.to_vec())?;
    Ok(catalog.draw(rng).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let result = WeightedCatalog::<&str>::new(vec![]);
        assert!(matches!(result, Err(EngineError::InvalidCatalog(_))));
    }

    #[test]
    fn test_zero_and_negative_weights_rejected() {
        assert!(WeightedCatalog::new(vec![("a", 1), ("b", 0)]).is_err());
        assert!(WeightedCatalog::new(vec![("a", -4)]).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = WeightedCatalog::new(vec![("a", 1), ("a", 2)]);
        assert!(matches!(result, Err(EngineError::InvalidCatalog(_))));
    }

    #[test]
    fn test_single_entry_always_drawn() {
        let catalog = WeightedCatalog::new(vec![("only", 7)]).unwrap();
        let mut rng = test_rng();
        for _ in 0..1000 {
            assert_eq!(*catalog.draw(&mut rng), "only");
        }
    }

    #[test]
    fn test_probability_matches_weights() {
        let catalog = WeightedCatalog::new(vec![("a", 1), ("b", 3), ("c", 96)]).unwrap();
        assert_eq!(catalog.total_weight(), 100);
        assert_eq!(catalog.probability(&"a"), Some(0.01));
        assert_eq!(catalog.probability(&"b"), Some(0.03));
        assert_eq!(catalog.probability(&"c"), Some(0.96));
        assert_eq!(catalog.probability(&"z"), None);
    }

    #[test]
    fn test_draw_frequencies_converge() {
        let catalog = WeightedCatalog::new(vec![("low", 10), ("high", 30)]).unwrap();
        let mut rng = test_rng();
        let n = 100_000;
        let high = (0..n).filter(|_| *catalog.draw(&mut rng) == "high").count();
        let share = high as f64 / n as f64;
        assert!((share - 0.75).abs() < 0.01, "high share was {:.4}", share);
    }

    #[test]
    fn test_one_shot_draw_validates() {
        let mut rng = test_rng();
        assert!(draw::<&str, _>(&[], &mut rng).is_err());
        assert_eq!(draw(&[("x", 5)], &mut rng).unwrap(), "x");
    }
}
