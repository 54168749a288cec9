use consult_common::{ConsultError, Result};
use std::cmp::Ordering;
use tracing::{debug, error, warn};

use crate::similarity::{cosine_similarity, norm};
use crate::types::{RankedPage, Record, SearchParams, SimilarityMatch};

/// Turns a query vector and an unordered candidate snapshot into a ranked,
/// thresholded window.
///
/// Implementations must order by similarity descending with ascending `id`
/// on ties, and count every match at or above the threshold in
/// `total_count` regardless of the window.
pub trait SimilarityRanker: Send + Sync {
    fn rank(
        &self,
        query: &[f32],
        candidates: Vec<Record>,
        params: &SearchParams,
    ) -> Result<RankedPage>;
}

/// Exact full-scan ranker: scores every candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactRanker;

impl SimilarityRanker for ExactRanker {
    fn rank(
        &self,
        query: &[f32],
        candidates: Vec<Record>,
        params: &SearchParams,
    ) -> Result<RankedPage> {
        params.validate()?;

        if norm(query) == 0.0 {
            warn!(
                "Query vector has no direction (dimension {}); no candidate can match",
                query.len()
            );
            return Ok(RankedPage::default());
        }

        let mut scored: Vec<(usize, f32)> = score_candidates(query, &candidates)
            .into_iter()
            .filter(|(_, similarity)| *similarity >= params.threshold)
            .collect();

        scored.sort_by(|a, b| rank_order(a, b, &candidates));

        let total_count = scored.len();
        debug!(
            "Ranked {} candidates: {} matches at threshold {}",
            candidates.len(),
            total_count,
            params.threshold
        );

        let window: Vec<(usize, f32)> = scored
            .into_iter()
            .skip(params.skip)
            .take(params.limit)
            .collect();

        // Move only the windowed records out of the snapshot
        let mut slots: Vec<Option<Record>> = candidates.into_iter().map(Some).collect();
        let matches = window
            .into_iter()
            .filter_map(|(idx, similarity)| {
                slots[idx]
                    .take()
                    .map(|record| SimilarityMatch { record, similarity })
            })
            .collect();

        Ok(RankedPage { matches, total_count })
    }
}

/// Similarity descending, then id ascending
fn rank_order(a: &(usize, f32), b: &(usize, f32), candidates: &[Record]) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| candidates[a.0].id.cmp(&candidates[b.0].id))
}

#[cfg(not(feature = "parallel"))]
fn score_candidates(query: &[f32], candidates: &[Record]) -> Vec<(usize, f32)> {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| score(query, record).map(|s| (idx, s)))
        .collect()
}

#[cfg(feature = "parallel")]
fn score_candidates(query: &[f32], candidates: &[Record]) -> Vec<(usize, f32)> {
    use rayon::prelude::*;

    candidates
        .par_iter()
        .enumerate()
        .filter_map(|(idx, record)| score(query, record).map(|s| (idx, s)))
        .collect()
}

/// Similarity of one candidate, or `None` when it cannot be scored
fn score(query: &[f32], record: &Record) -> Option<f32> {
    if record.embedding.is_empty() {
        debug!("Record {} has no embedding, skipped", record.id);
        return None;
    }

    match cosine_similarity(query, &record.embedding) {
        Ok(similarity) => Some(similarity),
        Err(ConsultError::DimensionMismatch { expected, actual }) => {
            error!(
                "Record {} embedding has dimension {}, query has {}; excluded",
                record.id, actual, expected
            );
            None
        }
        Err(e) => {
            warn!("Record {} cannot be scored: {}; excluded", record.id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: u64, embedding: Vec<f32>) -> Record {
        let now = Utc::now();
        Record {
            id,
            text: format!("record {}", id),
            embedding,
            created_at: now,
            updated_at: now,
        }
    }

    fn ids(page: &RankedPage) -> Vec<u64> {
        page.matches.iter().map(|m| m.record.id).collect()
    }

    fn scenario() -> Vec<Record> {
        vec![
            record(1, vec![1.0, 0.0]),
            record(2, vec![0.0, 1.0]),
            record(3, vec![0.9, 0.1]),
        ]
    }

    #[test]
    fn test_threshold_order_and_window() {
        let page = ExactRanker
            .rank(&[1.0, 0.0], scenario(), &SearchParams::new(0.5, 0, 1))
            .unwrap();
        assert_eq!(ids(&page), vec![1]);
        assert_eq!(page.total_count, 2);
        assert_eq!(page.matches[0].similarity, 1.0);

        let page = ExactRanker
            .rank(&[1.0, 0.0], scenario(), &SearchParams::new(0.5, 0, 10))
            .unwrap();
        assert_eq!(ids(&page), vec![1, 3]);
        assert!((page.matches[1].similarity - 0.993_884).abs() < 1e-5);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let page = ExactRanker
            .rank(&[1.0, 0.0], scenario(), &SearchParams::new(0.0, 0, 10))
            .unwrap();
        // orthogonal record scores exactly 0.0 and still counts
        assert_eq!(ids(&page), vec![1, 3, 2]);
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_ties_break_on_ascending_id() {
        // norms are exact in f32, so the first three tie at exactly 1.0
        let candidates = vec![
            record(9, vec![1.0, 0.0]),
            record(4, vec![2.0, 0.0]),
            record(7, vec![0.5, 0.0]),
            record(1, vec![3.0, 4.0]),
        ];
        let page = ExactRanker
            .rank(&[1.0, 0.0], candidates, &SearchParams::new(0.1, 0, 10))
            .unwrap();
        assert_eq!(ids(&page), vec![4, 7, 9, 1]);
    }

    #[test]
    fn test_skip_past_end_keeps_total() {
        let page = ExactRanker
            .rank(&[1.0, 0.0], scenario(), &SearchParams::new(0.5, 2, 10))
            .unwrap();
        assert!(page.matches.is_empty());
        assert_eq!(page.total_count, 2);

        let page = ExactRanker
            .rank(&[1.0, 0.0], scenario(), &SearchParams::new(0.5, 1, 10))
            .unwrap();
        assert_eq!(ids(&page), vec![3]);
    }

    #[test]
    fn test_unscorable_candidates_are_excluded() {
        let mut candidates = scenario();
        candidates.push(record(4, vec![]));
        candidates.push(record(5, vec![1.0, 0.0, 0.0]));
        candidates.push(record(6, vec![0.0, 0.0]));

        let page = ExactRanker
            .rank(&[1.0, 0.0], candidates, &SearchParams::new(0.0, 0, 10))
            .unwrap();
        assert_eq!(ids(&page), vec![1, 3, 2]);
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn test_zero_query_matches_nothing() {
        let page = ExactRanker
            .rank(&[0.0, 0.0], scenario(), &SearchParams::new(0.0, 0, 10))
            .unwrap();
        assert!(page.matches.is_empty());
        assert_eq!(page.total_count, 0);
    }

    #[test]
    fn test_invalid_parameters() {
        for params in [
            SearchParams::new(0.5, 0, 0),
            SearchParams::new(1.5, 0, 10),
            SearchParams::new(-0.5, 0, 10),
        ] {
            let err = ExactRanker.rank(&[1.0, 0.0], scenario(), &params).unwrap_err();
            assert!(matches!(err, ConsultError::InvalidParameters(_)));
        }
    }

    #[test]
    fn test_windows_tile_the_full_ranking() {
        let candidates: Vec<Record> = (1..=23u64)
            .map(|id| {
                let angle = (id % 7) as f32 * 0.2;
                record(id, vec![angle.cos(), angle.sin()])
            })
            .collect();
        let query = [1.0, 0.0];

        let full = ExactRanker
            .rank(&query, candidates.clone(), &SearchParams::new(0.3, 0, 100))
            .unwrap();

        let mut tiled = Vec::new();
        for skip in (0..full.total_count + 5).step_by(4) {
            let page = ExactRanker
                .rank(&query, candidates.clone(), &SearchParams::new(0.3, skip, 4))
                .unwrap();
            assert_eq!(page.total_count, full.total_count);
            tiled.extend(page.matches);
        }
        assert_eq!(tiled, full.matches);

        for pair in full.matches.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.similarity > b.similarity
                    || (a.similarity == b.similarity && a.record.id < b.record.id)
            );
        }
    }

    #[test]
    fn test_identical_calls_identical_output() {
        let params = SearchParams::new(0.2, 0, 10);
        let candidates = scenario();
        let first = ExactRanker.rank(&[0.6, 0.8], candidates.clone(), &params).unwrap();
        let second = ExactRanker.rank(&[0.6, 0.8], candidates, &params).unwrap();
        assert_eq!(first, second);
    }
}
