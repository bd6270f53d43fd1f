//! Year-over-year rating statistics for the quantitative report.

use serde::{Deserialize, Serialize};

/// Per-period statistics. Every float is rounded to two decimals; a period
/// without finite ratings reports zero statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeStats {
    pub year: i32,
    pub average_rating: f64,
    pub response_count: usize,
    pub median: f64,
    /// Sample standard deviation; 0 with fewer than two ratings.
    pub std_dev: f64,
    pub min_rating: f64,
    pub max_rating: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increase,
    Decrease,
    Stable,
}

impl Trend {
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Trend::Increase
        } else if delta < 0.0 {
            Trend::Decrease
        } else {
            Trend::Stable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub rating_change: f64,
    pub response_change: i64,
    pub rating_improved: bool,
    pub response_increased: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeComparison {
    pub current_year: QuantitativeStats,
    pub previous_year: QuantitativeStats,
    pub improvement: Improvement,
    pub trend: Trend,
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Statistics for one period. `response_count` counts every submitted
/// rating; the averages and spread only use the finite ones.
pub fn period_stats(year: i32, ratings: &[f64]) -> QuantitativeStats {
    let mut xs: Vec<f64> = ratings.iter().copied().filter(|r| r.is_finite()).collect();
    xs.sort_by(f64::total_cmp);
    let n = xs.len();

    if n == 0 {
        return QuantitativeStats {
            year,
            average_rating: 0.0,
            response_count: ratings.len(),
            median: 0.0,
            std_dev: 0.0,
            min_rating: 0.0,
            max_rating: 0.0,
        };
    }

    let mean = xs.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        xs[n / 2]
    } else {
        (xs[n / 2 - 1] + xs[n / 2]) / 2.0
    };
    let std_dev = if n > 1 {
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };

    QuantitativeStats {
        year,
        average_rating: round2(mean),
        response_count: ratings.len(),
        median: round2(median),
        std_dev: round2(std_dev),
        min_rating: round2(xs[0]),
        max_rating: round2(xs[n - 1]),
    }
}

/// Current vs previous period, with the delta derived from the rounded averages.
pub fn compute_quantitative_stats(
    current: &[f64],
    previous: &[f64],
    current_year: i32,
    previous_year: i32,
) -> QuantitativeComparison {
    let cur = period_stats(current_year, current);
    let prev = period_stats(previous_year, previous);
    let rating_change = round2(cur.average_rating - prev.average_rating);

    let improvement = Improvement {
        rating_change,
        response_change: cur.response_count as i64 - prev.response_count as i64,
        rating_improved: cur.average_rating > prev.average_rating,
        response_increased: cur.response_count > prev.response_count,
    };

    QuantitativeComparison {
        trend: Trend::from_delta(rating_change),
        current_year: cur,
        previous_year: prev,
        improvement,
    }
}
