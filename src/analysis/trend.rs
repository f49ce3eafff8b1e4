use crate::models::trend::{Forecast, TrendAnalysis, TrendDirection, TrendLine, TrendPoint};

/// Slopes closer to zero than this are reported as stable.
const STABLE_SLOPE: f64 = 1e-9;

/// Fit an ordinary least-squares line over the index domain [0, n-1].
/// Returns `None` for fewer than two points.
pub fn fit_line(values: &[f64]) -> Option<TrendLine> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n_f * sum_xx - sum_x * sum_x;
    if denominator.abs() <= f64::EPSILON {
        return None;
    }

    let slope = (n_f * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n_f;
    Some(TrendLine { slope, intercept })
}

/// Confidence for the i-th forecast step: 0.9 minus 0.15 per step, floored at 0.3.
pub fn step_confidence(step: usize) -> f64 {
    (0.9 - step as f64 * 0.15).max(0.3)
}

/// Project `years` future periods from an ordered history.
pub fn forecast(history: &[TrendPoint], years: usize) -> Option<TrendAnalysis> {
    let values: Vec<f64> = history.iter().map(|p| p.value).collect();
    let line = fit_line(&values)?;
    let n = history.len();
    let last_period = history.last().map(|p| p.period)?;

    // The horizon stops at the last representable period.
    let forecast = (1..=years)
        .map_while(|i| {
            let period = i32::try_from(i).ok().and_then(|step| last_period.checked_add(step))?;
            let x = (n + i - 1) as f64;
            Some(Forecast {
                period,
                predicted_value: (line.slope * x + line.intercept).max(0.0),
                confidence: step_confidence(i),
            })
        })
        .collect();

    let direction = if line.slope > STABLE_SLOPE {
        TrendDirection::Increasing
    } else if line.slope < -STABLE_SLOPE {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Some(TrendAnalysis {
        historical: history.to_vec(),
        forecast,
        trend: line,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(values: &[(i32, f64)]) -> Vec<TrendPoint> {
        values
            .iter()
            .map(|(period, value)| TrendPoint {
                period: *period,
                value: *value,
            })
            .collect()
    }

    #[test]
    fn perfectly_linear_series_extends_the_line() {
        let analysis = forecast(&points(&[(0, 10.0), (1, 20.0), (2, 30.0)]), 1).expect("forecast");
        assert!((analysis.trend.slope - 10.0).abs() < 1e-9);
        assert!((analysis.trend.intercept - 10.0).abs() < 1e-9);
        assert_eq!(analysis.forecast.len(), 1);
        assert_eq!(analysis.forecast[0].period, 3);
        assert!((analysis.forecast[0].predicted_value - 40.0).abs() < 1e-9);
        assert_eq!(analysis.direction, TrendDirection::Increasing);
    }

    #[test]
    fn forecast_periods_follow_the_last_reported_year() {
        let analysis = forecast(&points(&[(2021, 100.0), (2022, 90.0), (2023, 80.0)]), 2).expect("forecast");
        let periods: Vec<i32> = analysis.forecast.iter().map(|f| f.period).collect();
        assert_eq!(periods, vec![2024, 2025]);
        assert!((analysis.forecast[0].predicted_value - 70.0).abs() < 1e-9);
        assert_eq!(analysis.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn predictions_never_go_negative() {
        let analysis = forecast(&points(&[(0, 20.0), (1, 10.0)]), 4).expect("forecast");
        // 20 - 10x: x=2 → 0, x=3 → -10
        assert_eq!(analysis.forecast[1].predicted_value, 0.0);
        assert_eq!(analysis.forecast[3].predicted_value, 0.0);
    }

    #[test]
    fn confidence_decays_to_floor() {
        let analysis = forecast(&points(&[(0, 1.0), (1, 2.0)]), 6).expect("forecast");
        let confidence: Vec<f64> = analysis.forecast.iter().map(|f| f.confidence).collect();
        assert!((confidence[0] - 0.75).abs() < 1e-9);
        assert!((confidence[1] - 0.6).abs() < 1e-9);
        assert!((confidence[2] - 0.45).abs() < 1e-9);
        for pair in confidence.windows(2).take(3) {
            assert!(pair[0] > pair[1]);
        }
        assert!(confidence.iter().all(|c| *c >= 0.3));
        assert_eq!(confidence[5], 0.3);
    }

    #[test]
    fn fewer_than_two_points_yields_nothing() {
        assert!(forecast(&[], 3).is_none());
        assert!(forecast(&points(&[(2023, 5.0)]), 3).is_none());
    }

    #[test]
    fn flat_series_is_stable() {
        let analysis = forecast(&points(&[(0, 5.0), (1, 5.0), (2, 5.0)]), 0).expect("forecast");
        assert!(analysis.forecast.is_empty());
        assert_eq!(analysis.direction, TrendDirection::Stable);
    }

    #[test]
    fn horizon_stops_at_the_last_representable_period() {
        let analysis = forecast(&points(&[(i32::MAX - 2, 1.0), (i32::MAX - 1, 2.0)]), 3).expect("forecast");
        assert_eq!(analysis.forecast.len(), 1);
        assert_eq!(analysis.forecast[0].period, i32::MAX);
    }
}
