//! Onset detection over a committed score history.
//!
//! A single low score is noise. Onset is the first timestamp of the earliest
//! run of at least `min_run` consecutive scores below the sustained-deviation
//! threshold. The query only reads its input and can run on every chart
//! render.

use chrono::{DateTime, Utc};

use crate::models::{HealthScore, TimeWindow};

/// Find the start of the earliest sustained low-score run inside `window`.
///
/// `history` must be in time order. Warming-up scores never count as low.
pub fn find_onset(
    history: &[HealthScore],
    window: &TimeWindow,
    threshold: f64,
    min_run: usize,
) -> Option<DateTime<Utc>> {
    // ---
    let min_run = min_run.max(1);
    let mut run_start: Option<DateTime<Utc>> = None;
    let mut run_len = 0usize;

    for s in history.iter().filter(|s| window.contains(s.timestamp)) {
        if !s.warming_up && s.score < threshold {
            if run_len == 0 {
                run_start = Some(s.timestamp);
            }
            run_len += 1;
            if run_len >= min_run {
                return run_start;
            }
        } else {
            run_len = 0;
            run_start = None;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn history(scores: &[f64]) -> Vec<HealthScore> {
        // ---
        scores
            .iter()
            .enumerate()
            .map(|(i, score)| HealthScore {
                flock_id: "F1".to_string(),
                timestamp: t(i as i64),
                score: *score,
                contributing_deviations: BTreeMap::new(),
                warming_up: false,
            })
            .collect()
    }

    #[test]
    fn test_transient_dips_are_not_onset() {
        // ---
        let mut scores = vec![95.0; 40];
        for i in [5, 12, 13, 30] {
            scores[i] = 20.0;
        }
        let h = history(&scores);

        assert_eq!(find_onset(&h, &TimeWindow::all(), 55.0, 10), None);
    }

    #[test]
    fn test_sustained_run_reports_its_start() {
        // ---
        let mut scores = vec![95.0; 30];
        for s in scores.iter_mut().skip(15).take(10) {
            *s = 40.0;
        }
        let h = history(&scores);

        assert_eq!(find_onset(&h, &TimeWindow::all(), 55.0, 10), Some(t(15)));
    }

    #[test]
    fn test_earliest_sustained_run_wins() {
        // ---
        let mut scores = vec![95.0; 60];
        for i in (5..18).chain(30..50) {
            scores[i] = 30.0;
        }
        let h = history(&scores);

        assert_eq!(find_onset(&h, &TimeWindow::all(), 55.0, 10), Some(t(5)));
    }

    #[test]
    fn test_run_interrupted_before_min_length() {
        // ---
        let mut scores = vec![95.0; 30];
        for i in (2..11).chain(12..16) {
            scores[i] = 30.0;
        }
        let h = history(&scores);

        assert_eq!(find_onset(&h, &TimeWindow::all(), 55.0, 10), None);
    }

    #[test]
    fn test_window_restricts_the_scan() {
        // ---
        let mut scores = vec![95.0; 60];
        for i in (5..18).chain(30..50) {
            scores[i] = 30.0;
        }
        let h = history(&scores);

        let window = TimeWindow::between(t(20), t(59));
        assert_eq!(find_onset(&h, &window, 55.0, 10), Some(t(30)));

        // run clipped by the window end is too short
        let window = TimeWindow::between(t(0), t(10));
        assert_eq!(find_onset(&h, &window, 55.0, 10), None);
    }

    #[test]
    fn test_warming_up_scores_are_ignored() {
        // ---
        let mut h = history(&[10.0; 12]);
        for s in h.iter_mut().take(3) {
            s.warming_up = true;
        }

        assert_eq!(find_onset(&h, &TimeWindow::all(), 55.0, 10), None);
        assert_eq!(find_onset(&h, &TimeWindow::all(), 55.0, 9), Some(t(3)));
    }

    #[test]
    fn test_empty_history() {
        // ---
        assert_eq!(find_onset(&[], &TimeWindow::all(), 55.0, 10), None);
    }
}
