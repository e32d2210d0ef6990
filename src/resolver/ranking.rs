use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::AlternativeCandidate;

/// Order candidates best first and drop repeated ids.
///
/// Most rule checks satisfied wins, then the cheaper part (priced before
/// unpriced), then the catalog's relevance, then the id.
pub fn rank(mut candidates: Vec<AlternativeCandidate>) -> Vec<AlternativeCandidate> {
    candidates.sort_by(compare_candidates);
    let mut seen = BTreeSet::new();
    candidates.retain(|c| seen.insert(c.component.id.clone()));
    candidates
}

fn compare_candidates(a: &AlternativeCandidate, b: &AlternativeCandidate) -> Ordering {
    b.constraints_satisfied
        .cmp(&a.constraints_satisfied)
        .then_with(|| compare_price(a.component.price, b.component.price))
        .then_with(|| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.component.id.cmp(&b.component.id))
}

fn compare_price(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::test_parts::*;

    fn candidate(id: &str, satisfied: usize, price: Option<f64>, relevance: f64) -> AlternativeCandidate {
        let component = match price {
            Some(p) => priced(psu(id, 850.0), p),
            None => psu(id, 850.0),
        };
        AlternativeCandidate {
            component,
            fit_score: 1.0,
            constraints_satisfied: satisfied,
            relevance,
        }
    }

    fn ids(candidates: &[AlternativeCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.component.id.as_str()).collect()
    }

    #[test]
    fn test_satisfied_count_beats_price() {
        let ranked = rank(vec![
            candidate("cheap", 1, Some(50.0), 0.5),
            candidate("better", 2, Some(150.0), 0.5),
        ]);
        assert_eq!(ids(&ranked), vec!["better", "cheap"]);
    }

    #[test]
    fn test_priced_before_unpriced() {
        let ranked = rank(vec![
            candidate("unpriced", 2, None, 0.9),
            candidate("pricey", 2, Some(300.0), 0.1),
            candidate("cheap", 2, Some(90.0), 0.1),
        ]);
        assert_eq!(ids(&ranked), vec!["cheap", "pricey", "unpriced"]);
    }

    #[test]
    fn test_relevance_then_id_break_ties() {
        let ranked = rank(vec![
            candidate("b", 2, Some(100.0), 0.5),
            candidate("a", 2, Some(100.0), 0.5),
            candidate("c", 2, Some(100.0), 0.8),
        ]);
        assert_eq!(ids(&ranked), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_duplicates_keep_best_entry() {
        let ranked = rank(vec![
            candidate("a", 1, Some(100.0), 0.5),
            candidate("a", 2, Some(100.0), 0.5),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].constraints_satisfied, 2);
    }
}
