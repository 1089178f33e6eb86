use orb_core::{Descriptor, Match};
use rayon::prelude::*;

#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(&a, &b)| (a ^ b).count_ones()).sum()
}

/// Exhaustive nearest-neighbour matcher over Hamming distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BruteForceMatcher {
    /// Keep a pair only when each side is the other's nearest neighbour
    pub cross_check: bool,
    /// Reject pairs farther apart than this many bits
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub max_distance: Option<u32>,
}

impl Default for BruteForceMatcher {
    fn default() -> Self {
        Self {
            cross_check: true,
            max_distance: None,
        }
    }
}

impl BruteForceMatcher {
    pub fn new(cross_check: bool) -> Self {
        Self {
            cross_check,
            ..Self::default()
        }
    }

    pub fn with_max_distance(mut self, max_distance: u32) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// Match every `query` descriptor against `train`.
    ///
    /// Ties go to the lowest index. The result is sorted by ascending
    /// distance, then by query index.
    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }

        let forward = nearest_neighbours(query, train);
        let backward = self.cross_check.then(|| nearest_neighbours(train, query));

        let mut matches: Vec<Match> = forward
            .into_iter()
            .enumerate()
            .filter(|&(query_idx, (train_idx, _))| match &backward {
                Some(back) => back[train_idx].0 == query_idx,
                None => true,
            })
            .filter(|&(_, (_, distance))| self.max_distance.map_or(true, |max| distance <= max))
            .map(|(query_idx, (train_idx, distance))| Match {
                query_idx,
                train_idx,
                distance,
            })
            .collect();

        matches.sort_by_key(|m| (m.distance, m.query_idx));
        tracing::trace!(
            query = query.len(),
            train = train.len(),
            matches = matches.len(),
            cross_check = self.cross_check,
            "matched descriptors"
        );
        matches
    }
}

/// Index and distance of the closest `to` descriptor for each of `from`
fn nearest_neighbours(from: &[Descriptor], to: &[Descriptor]) -> Vec<(usize, u32)> {
    from.par_iter()
        .map(|a| {
            let mut best = (0, u32::MAX);
            for (j, b) in to.iter().enumerate() {
                let d = hamming_distance(a, b);
                if d < best.1 {
                    best = (j, d);
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn desc(bits: &[usize]) -> Descriptor {
        let mut d = [0u8; 32];
        for &i in bits {
            d[i / 8] |= 1 << (i % 8);
        }
        d
    }

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance(&[0u8; 32], &[0u8; 32]), 0);
        assert_eq!(hamming_distance(&[0u8; 32], &[0xffu8; 32]), 256);
        assert_eq!(hamming_distance(&desc(&[0, 9, 255]), &desc(&[9])), 2);
    }

    #[test]
    fn test_empty_sides() {
        let matcher = BruteForceMatcher::default();
        assert!(matcher.match_descriptors(&[], &[desc(&[1])]).is_empty());
        assert!(matcher.match_descriptors(&[desc(&[1])], &[]).is_empty());
    }

    #[test]
    fn test_identical_sets_match_one_to_one() {
        let set: Vec<Descriptor> = (0..20).map(|i| desc(&[i * 3, i * 3 + 1, 200 + i])).collect();
        let matches = BruteForceMatcher::default().match_descriptors(&set, &set);

        assert_eq!(matches.len(), set.len());
        for (i, m) in matches.iter().enumerate() {
            assert_eq!((m.query_idx, m.train_idx, m.distance), (i, i, 0));
        }
    }

    #[test]
    fn test_cross_check_drops_one_sided_pairs() {
        // Both queries prefer train 0; only query 0 is train 0's choice
        let query = vec![desc(&[1, 2, 3]), desc(&[1, 2, 3, 4])];
        let train = vec![desc(&[1, 2, 3]), desc(&(100..140).collect::<Vec<_>>())];

        let checked = BruteForceMatcher::new(true).match_descriptors(&query, &train);
        assert_eq!(checked, vec![Match { query_idx: 0, train_idx: 0, distance: 0 }]);

        let plain = BruteForceMatcher::new(false).match_descriptors(&query, &train);
        assert_eq!(plain.len(), 2);
        assert_eq!(plain[1], Match { query_idx: 1, train_idx: 0, distance: 1 });
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        let query = vec![desc(&[5])];
        let train = vec![desc(&[6]), desc(&[7])];
        let matches = BruteForceMatcher::new(false).match_descriptors(&query, &train);
        assert_eq!(matches[0].train_idx, 0);
    }

    #[test]
    fn test_max_distance() {
        let query = vec![desc(&[1]), desc(&[2, 3, 4, 5, 6])];
        let train = vec![desc(&[1]), desc(&[100])];
        let matches = BruteForceMatcher::default()
            .with_max_distance(2)
            .match_descriptors(&query, &train);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].query_idx, 0);
    }

    fn descriptors(max_len: usize) -> impl Strategy<Value = Vec<Descriptor>> {
        prop::collection::vec(prop::array::uniform32(any::<u8>()), 0..max_len)
    }

    proptest! {
        #[test]
        fn prop_cross_checked_matches_are_mutual(query in descriptors(24), train in descriptors(24)) {
            let matches = BruteForceMatcher::default().match_descriptors(&query, &train);

            for m in &matches {
                let d = hamming_distance(&query[m.query_idx], &train[m.train_idx]);
                prop_assert_eq!(d, m.distance);
                prop_assert!(train.iter().all(|t| hamming_distance(&query[m.query_idx], t) >= d));
                prop_assert!(query.iter().all(|q| hamming_distance(q, &train[m.train_idx]) >= d));
            }

            let mut seen_train: Vec<usize> = matches.iter().map(|m| m.train_idx).collect();
            seen_train.sort_unstable();
            seen_train.dedup();
            prop_assert_eq!(seen_train.len(), matches.len());
        }

        #[test]
        fn prop_matches_sorted_by_distance(query in descriptors(24), train in descriptors(24), cross in any::<bool>()) {
            let matches = BruteForceMatcher::new(cross).match_descriptors(&query, &train);
            prop_assert!(matches.windows(2).all(|w| (w[0].distance, w[0].query_idx) <= (w[1].distance, w[1].query_idx)));
        }
    }
}
