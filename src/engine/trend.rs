//! Least-squares score trend.

use crate::models::{HealthScore, Trend};

/// Slope of the score over time, in points per hour.
///
/// Warming-up scores are skipped. Returns `None` with fewer than two usable
/// scores or when they all share a timestamp.
pub fn trend<'a, I>(scores: I) -> Option<Trend>
where
    I: IntoIterator<Item = &'a HealthScore>,
{
    // ---
    let usable: Vec<&HealthScore> = scores.into_iter().filter(|s| !s.warming_up).collect();
    if usable.len() < 2 {
        return None;
    }

    let origin = usable[0].timestamp;
    let points: Vec<(f64, f64)> = usable
        .iter()
        .map(|s| {
            let hours = (s.timestamp - origin).num_milliseconds() as f64 / 3_600_000.0;
            (hours, s.score)
        })
        .collect();

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (x, y) in &points {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    if sxx <= f64::EPSILON {
        return None;
    }

    Some(Trend {
        slope_per_hour: sxy / sxx,
        samples: usable.len(),
        from: origin,
        to: usable[usable.len() - 1].timestamp,
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn scores(values: &[f64]) -> Vec<HealthScore> {
        // ---
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, score)| HealthScore {
                flock_id: "F1".to_string(),
                timestamp: t0 + Duration::minutes(30 * i as i64),
                score: *score,
                contributing_deviations: BTreeMap::new(),
                warming_up: false,
            })
            .collect()
    }

    #[test]
    fn test_declining_scores_have_negative_slope() {
        // ---
        // five points lost every half hour
        let t = trend(&scores(&[100.0, 95.0, 90.0, 85.0, 80.0])).unwrap();
        assert!((t.slope_per_hour + 10.0).abs() < 1e-9);
        assert_eq!(t.samples, 5);
    }

    #[test]
    fn test_flat_scores() {
        // ---
        let t = trend(&scores(&[90.0; 6])).unwrap();
        assert!(t.slope_per_hour.abs() < 1e-12);
    }

    #[test]
    fn test_too_few_points() {
        // ---
        assert!(trend(&scores(&[90.0])).is_none());

        let mut s = scores(&[90.0, 80.0, 70.0]);
        s[0].warming_up = true;
        s[1].warming_up = true;
        assert!(trend(&s).is_none());
    }
}
