//! Aggregation of recorded choices into percentages
//!
//! Every figure is computed from current row counts; nothing is cached.
//! Percentages carry one decimal place and are rounded half-to-even in
//! integer arithmetic, which keeps the A/B split summing to exactly 100.0.

use std::collections::HashSet;

use crate::error::Result;
use crate::game::types::{ChoiceResponse, DilemmaStat};
use crate::storage::{DilemmaOption, StorageScope};

/// Split reported for a dilemma nobody has answered yet
pub const NO_DATA_PERCENTAGE: f64 = 50.0;

/// Agreement reported when there is nothing to compare against
pub const SELF_AGREEMENT_PERCENTAGE: f64 = 100.0;

/// `count / total` as a percentage in tenths, rounded half-to-even
///
/// `total` must be non-zero.
fn percent_tenths(count: u64, total: u64) -> u64 {
    debug_assert!(total > 0);
    let scaled = u128::from(count) * 1000;
    let total = u128::from(total);
    let quotient = scaled / total;
    let twice_remainder = (scaled % total) * 2;

    let rounded = if twice_remainder > total || (twice_remainder == total && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    };
    rounded as u64
}

/// `count / total` as a percentage with one decimal place
///
/// Returns `None` when `total` is zero; callers pick the convention.
pub fn percentage(count: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(percent_tenths(count, total) as f64 / 10.0)
}

/// Current totals and A/B split for a dilemma
pub fn stats_for(scope: &StorageScope, dilemma_id: &str) -> Result<DilemmaStat> {
    let total = scope.count_choices(dilemma_id, None)?;
    let count_a = scope.count_choices(dilemma_id, Some(DilemmaOption::A))?;
    let count_b = total.saturating_sub(count_a);

    Ok(DilemmaStat {
        dilemma_id: dilemma_id.to_string(),
        total_responses: total,
        choice_a_count: count_a,
        choice_b_count: count_b,
        choice_a_percentage: percentage(count_a, total).unwrap_or(NO_DATA_PERCENTAGE),
        choice_b_percentage: percentage(count_b, total).unwrap_or(NO_DATA_PERCENTAGE),
    })
}

/// Share of all responses to `dilemma_id` that picked `option`
pub fn percentage_matching(
    scope: &StorageScope,
    dilemma_id: &str,
    option: DilemmaOption,
) -> Result<f64> {
    let total = scope.count_choices(dilemma_id, None)?;
    let matching = scope.count_choices(dilemma_id, Some(option))?;
    Ok(percentage(matching, total).unwrap_or(SELF_AGREEMENT_PERCENTAGE))
}

/// Statistics for everything a session has answered
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// One entry per recorded choice, in recording order
    pub choices: Vec<ChoiceResponse>,
    /// One entry per distinct dilemma, in first-seen order
    pub stats: Vec<DilemmaStat>,
}

/// Batch statistics for every dilemma touched by `session_id`
pub fn stats_for_session(scope: &StorageScope, session_id: &str) -> Result<SessionStats> {
    let recorded = scope.session_choices(session_id)?;

    let mut choices = Vec::with_capacity(recorded.len());
    let mut stats = Vec::new();
    let mut seen = HashSet::new();

    for choice in recorded {
        let agreeing = percentage_matching(scope, &choice.dilemma_id, choice.option)?;
        if seen.insert(choice.dilemma_id.clone()) {
            stats.push(stats_for(scope, &choice.dilemma_id)?);
        }
        choices.push(ChoiceResponse::from_choice(choice, agreeing));
    }

    Ok(SessionStats { choices, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;
    use tempfile::tempdir;

    fn create_test_storage() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempdir().expect("failed to create tempdir");
        let storage =
            SqliteStorage::new_with_path(dir.path().join("dilemma.db")).expect("storage");
        (storage, dir)
    }

    fn seed(scope: &StorageScope, dilemma: &str, picks: &[DilemmaOption]) {
        for (i, option) in picks.iter().enumerate() {
            let session = format!("{dilemma}-{i}");
            if scope.get_session(&session).unwrap().is_none() {
                scope.insert_session(&session).unwrap();
            }
            scope.insert_choice(&session, dilemma, *option).unwrap();
        }
    }

    #[test]
    fn test_percentage_basic_values() {
        assert_eq!(percentage(1, 2), Some(50.0));
        assert_eq!(percentage(1, 3), Some(33.3));
        assert_eq!(percentage(2, 3), Some(66.7));
        assert_eq!(percentage(3, 3), Some(100.0));
        assert_eq!(percentage(0, 7), Some(0.0));
        assert_eq!(percentage(0, 0), None);
    }

    #[test]
    fn test_percentage_rounds_half_to_even() {
        // 1/16 = 6.25% and 15/16 = 93.75%
        assert_eq!(percentage(1, 16), Some(6.2));
        assert_eq!(percentage(15, 16), Some(93.8));
        // 3/16 = 18.75% and 13/16 = 81.25%
        assert_eq!(percentage(3, 16), Some(18.8));
        assert_eq!(percentage(13, 16), Some(81.2));
    }

    #[test]
    fn test_split_always_sums_to_hundred() {
        for total in 1..=400u64 {
            for count_a in 0..=total {
                let a = percent_tenths(count_a, total);
                let b = percent_tenths(total - count_a, total);
                assert_eq!(a + b, 1000, "count_a={count_a} total={total}");
                let pa = percentage(count_a, total).unwrap();
                let pb = percentage(total - count_a, total).unwrap();
                assert_eq!(pa + pb, 100.0, "count_a={count_a} total={total}");
            }
        }
    }

    #[test]
    fn test_stats_for_unseen_dilemma_defaults_to_even_split() {
        let (storage, _dir) = create_test_storage();
        let scope = storage.read_scope().unwrap();
        let stat = stats_for(&scope, "nobody-answered").unwrap();

        assert_eq!(stat.total_responses, 0);
        assert_eq!(stat.choice_a_count, 0);
        assert_eq!(stat.choice_b_count, 0);
        assert_eq!(stat.choice_a_percentage, 50.0);
        assert_eq!(stat.choice_b_percentage, 50.0);
    }

    #[test]
    fn test_stats_for_counts_and_split() {
        let (storage, _dir) = create_test_storage();
        let scope = storage.scope().unwrap();
        seed(
            &scope,
            "trolley",
            &[DilemmaOption::A, DilemmaOption::B, DilemmaOption::A],
        );

        let stat = stats_for(&scope, "trolley").unwrap();
        assert_eq!(stat.total_responses, 3);
        assert_eq!(stat.choice_a_count, 2);
        assert_eq!(stat.choice_b_count, 1);
        assert_eq!(stat.choice_a_percentage, 66.7);
        assert_eq!(stat.choice_b_percentage, 33.3);
    }

    #[test]
    fn test_percentage_matching_without_rows_is_full_agreement() {
        let (storage, _dir) = create_test_storage();
        let scope = storage.read_scope().unwrap();
        assert_eq!(
            percentage_matching(&scope, "empty", DilemmaOption::B).unwrap(),
            100.0
        );
    }

    #[test]
    fn test_percentage_matching_counts_each_option() {
        let (storage, _dir) = create_test_storage();
        let scope = storage.scope().unwrap();
        seed(
            &scope,
            "lifeboat",
            &[
                DilemmaOption::B,
                DilemmaOption::B,
                DilemmaOption::B,
                DilemmaOption::A,
            ],
        );

        assert_eq!(
            percentage_matching(&scope, "lifeboat", DilemmaOption::B).unwrap(),
            75.0
        );
        assert_eq!(
            percentage_matching(&scope, "lifeboat", DilemmaOption::A).unwrap(),
            25.0
        );
    }

    #[test]
    fn test_stats_for_session_keeps_choice_order_and_dedups_stats() {
        let (storage, _dir) = create_test_storage();
        let scope = storage.scope().unwrap();
        scope.insert_session("player").unwrap();
        scope.insert_session("other").unwrap();
        scope.insert_choice("other", "trolley", DilemmaOption::B).unwrap();
        scope.insert_choice("player", "trolley", DilemmaOption::A).unwrap();
        scope.insert_choice("player", "lifeboat", DilemmaOption::B).unwrap();

        let summary = stats_for_session(&scope, "player").unwrap();

        assert_eq!(summary.choices.len(), 2);
        assert_eq!(summary.choices[0].dilemma_id, "trolley");
        assert_eq!(summary.choices[0].percentage_same, 50.0);
        assert_eq!(summary.choices[1].dilemma_id, "lifeboat");
        assert_eq!(summary.choices[1].percentage_same, 100.0);

        let ids: Vec<&str> = summary.stats.iter().map(|s| s.dilemma_id.as_str()).collect();
        assert_eq!(ids, vec!["trolley", "lifeboat"]);
        assert_eq!(summary.stats[0].total_responses, 2);
    }

    #[test]
    fn test_stats_for_session_without_choices() {
        let (storage, _dir) = create_test_storage();
        let scope = storage.scope().unwrap();
        scope.insert_session("idle").unwrap();

        let summary = stats_for_session(&scope, "idle").unwrap();
        assert!(summary.choices.is_empty());
        assert!(summary.stats.is_empty());
    }
}
