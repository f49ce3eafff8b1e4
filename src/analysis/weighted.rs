use std::collections::{BTreeMap, HashMap};

/// Combines named sub-scores (0–100) into one score using a fixed weight table.
///
/// Entries missing from the input are dropped from both the numerator and the
/// denominator, so the remaining weights are renormalized rather than the
/// missing entry counting as zero.
#[derive(Debug, Clone)]
pub struct WeightedScorer {
    weights: HashMap<String, f64>,
}

impl WeightedScorer {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &HashMap<String, f64> {
        &self.weights
    }

    /// Weighted mean of the present entries, rounded and clamped to [0, 100].
    /// Returns 0 when nothing weighted is present.
    ///
    /// Entries are summed in name order, so the result does not depend on the
    /// order they are supplied in.
    pub fn score<'a, I>(&self, entries: I) -> u32
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let present: BTreeMap<&str, f64> = entries.into_iter().collect();

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (name, value) in &present {
            let Some(weight) = self.weights.get(*name).copied() else {
                continue;
            };
            if weight <= 0.0 || !value.is_finite() {
                continue;
            }
            numerator += value * weight;
            denominator += weight;
        }

        if denominator <= f64::EPSILON {
            return 0;
        }

        (numerator / denominator).round().clamp(0.0, 100.0) as u32
    }

    /// Convenience over an owned map, as produced by the scoring pipelines.
    pub fn score_map(&self, scores: &HashMap<String, f64>) -> u32 {
        self.score(scores.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::score::default_category_weights;

    #[test]
    fn full_input_matches_plain_weighted_sum() {
        let scorer = WeightedScorer::new(default_category_weights());
        let score = scorer.score([("environmental", 80.0), ("social", 60.0), ("governance", 70.0)]);
        // 32 + 18 + 21
        assert_eq!(score, 71);
    }

    #[test]
    fn weighted_sum_is_rounded_to_nearest_integer() {
        let scorer = WeightedScorer::new(default_category_weights());
        let score = scorer.score([("environmental", 81.0), ("social", 62.0), ("governance", 70.0)]);
        // 32.4 + 18.6 + 21 = 72.0
        assert_eq!(score, 72);
        let score = scorer.score([("environmental", 83.0), ("social", 60.0), ("governance", 70.0)]);
        // 33.2 + 18 + 21 = 72.2
        assert_eq!(score, 72);
    }

    #[test]
    fn order_of_entries_does_not_matter() {
        let scorer = WeightedScorer::new(default_category_weights());
        let forward = scorer.score([("environmental", 55.0), ("social", 91.0), ("governance", 12.0)]);
        let reverse = scorer.score([("governance", 12.0), ("social", 91.0), ("environmental", 55.0)]);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn half_point_means_score_identically_in_any_order() {
        let scorer = WeightedScorer::new(default_category_weights());
        for (e, s, g) in [(0.25, 23.0, 25.0), (0.25, 25.5, 12.5), (0.5, 28.5, 12.5)] {
            let expected = scorer.score([("environmental", e), ("social", s), ("governance", g)]);
            for _ in 0..16 {
                assert_eq!(scorer.score([("environmental", e), ("social", s), ("governance", g)]), expected);
                assert_eq!(scorer.score([("governance", g), ("social", s), ("environmental", e)]), expected);
                assert_eq!(scorer.score([("social", s), ("environmental", e), ("governance", g)]), expected);
            }
        }
    }

    #[test]
    fn missing_categories_renormalize_remaining_weights() {
        let scorer = WeightedScorer::new(default_category_weights());
        assert_eq!(scorer.score([("environmental", 90.0)]), 90);

        // (0.4 * 90 + 0.3 * 50) / 0.7 = 72.857...
        assert_eq!(scorer.score([("environmental", 90.0), ("social", 50.0)]), 73);
    }

    #[test]
    fn empty_or_unweighted_input_scores_zero() {
        let scorer = WeightedScorer::new(default_category_weights());
        assert_eq!(scorer.score(std::iter::empty()), 0);
        assert_eq!(scorer.score([("unknown_category", 100.0)]), 0);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let scorer = WeightedScorer::new(default_category_weights());
        assert_eq!(scorer.score([("environmental", 250.0)]), 100);
        assert_eq!(scorer.score([("environmental", -20.0)]), 0);
    }
}
