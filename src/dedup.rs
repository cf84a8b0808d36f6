// src/dedup.rs - collapses duplicate detections of the same hand
use crate::landmark::Candidate;

/// Drops candidates whose wrist lies within `threshold_px` of a candidate accepted earlier.
///
/// The full-frame view and one of the half crops usually both see the same hand. Candidates
/// are visited in input order and the first one seen wins, so the result is order dependent
/// rather than an optimal clustering. A pairwise clustering pass could replace it at added cost.
pub struct Deduplicator {
    threshold_px: f64,
}

impl Deduplicator {
    pub const DEFAULT_THRESHOLD_PX: f64 = 100.0;

    pub fn new(threshold_px: f64) -> Self {
        Self { threshold_px }
    }

    pub fn threshold_px(&self) -> f64 {
        self.threshold_px
    }

    /// Removes duplicates from `candidates`, preserving the order of the survivors.
    ///
    /// A candidate without landmarks has no wrist to compare and is always kept.
    pub fn dedup(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let input_len = candidates.len();
        let mut accepted: Vec<Candidate> = Vec::with_capacity(input_len);

        for candidate in candidates {
            let duplicate_of = accepted.iter().position(|kept| {
                candidate
                    .wrist_distance(kept)
                    .map_or(false, |dist| dist < self.threshold_px)
            });

            match duplicate_of {
                Some(index) => {
                    tracing::trace!(
                        region = candidate.source_region.as_str(),
                        kept_region = accepted[index].source_region.as_str(),
                        "discarding duplicate candidate"
                    );
                }
                None => accepted.push(candidate),
            }
        }

        tracing::trace!(input = input_len, output = accepted.len(), "deduplicated candidates");
        accepted
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD_PX)
    }
}
