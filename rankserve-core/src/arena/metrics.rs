//! Ranking-quality metrics for arena runs
//!
//! NDCG@10 and MRR@10, computed either from graded qrels or from the
//! binary-relevance fallback (gold-answer substring membership). Formulas
//! follow the BEIR convention: DCG discounts with log2(rank + 1) and the
//! graded gain is 2^grade - 1.

/// Rank cutoff for both metrics.
pub const METRIC_CUTOFF: usize = 10;

/// Per-query metric pair, both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryScore {
    /// NDCG at the cutoff
    pub ndcg: f64,
    /// Reciprocal rank of the first relevant item within the cutoff
    pub rr: f64,
}

/// Graded DCG over grades in ranked order.
fn dcg_graded(grades: &[f32], k: usize) -> f64 {
    grades
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, grade)| {
            let gain = 2f64.powf(*grade as f64) - 1.0;
            gain / (i as f64 + 2.0).log2()
        })
        .sum()
}

/// Ideal graded DCG from the full judged grade set.
fn idcg_graded(all_grades: &[f32], k: usize) -> f64 {
    let mut sorted: Vec<f32> = all_grades.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    dcg_graded(&sorted, k)
}

/// Score one query against graded judgments.
///
/// `ranked_grades` are the grades of the returned items in rank order;
/// `judged_grades` are the grades of every judged document for the query
/// (the ideal-DCG pool).
pub fn graded_query_score(ranked_grades: &[f32], judged_grades: &[f32]) -> QueryScore {
    let idcg = idcg_graded(judged_grades, METRIC_CUTOFF);
    let ndcg = if idcg > 0.0 {
        dcg_graded(ranked_grades, METRIC_CUTOFF) / idcg
    } else {
        0.0
    };

    let rr = ranked_grades
        .iter()
        .take(METRIC_CUTOFF)
        .position(|grade| *grade > 0.0)
        .map(|i| 1.0 / (i as f64 + 1.0))
        .unwrap_or(0.0);

    QueryScore { ndcg, rr }
}

/// Score one query from a binary relevance vector over its candidates.
///
/// Binary gains; the ideal DCG is normalized from the same relevance
/// vector, so a query with no relevant candidate contributes zero to both
/// metrics.
pub fn binary_query_score(relevant: &[bool]) -> QueryScore {
    let total_relevant = relevant.iter().filter(|r| **r).count();
    if total_relevant == 0 {
        return QueryScore { ndcg: 0.0, rr: 0.0 };
    }

    let dcg: f64 = relevant
        .iter()
        .take(METRIC_CUTOFF)
        .enumerate()
        .filter(|(_, r)| **r)
        .map(|(i, _)| 1.0 / (i as f64 + 2.0).log2())
        .sum();

    let idcg: f64 = (0..total_relevant.min(METRIC_CUTOFF))
        .map(|i| 1.0 / (i as f64 + 2.0).log2())
        .sum();

    let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };

    let rr = relevant
        .iter()
        .take(METRIC_CUTOFF)
        .position(|r| *r)
        .map(|i| 1.0 / (i as f64 + 1.0))
        .unwrap_or(0.0);

    QueryScore { ndcg, rr }
}

/// Mean of per-query scores scaled to the 0–100 range.
pub fn aggregate(scores: &[QueryScore]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let count = scores.len() as f64;
    let ndcg = scores.iter().map(|s| s.ndcg).sum::<f64>() / count * 100.0;
    let mrr = scores.iter().map(|s| s.rr).sum::<f64>() / count * 100.0;
    (ndcg, mrr)
}
