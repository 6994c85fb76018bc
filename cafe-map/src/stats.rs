//! Descriptive statistics over a region's cafes.
//!
//! Numeric aggregates are computed over present values only; a field
//! with no values reports `None` ("no data") rather than failing.
//! Frequency tables list every tier in the domain, zero counts included.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{CafeRecord, Tier};

/// Central tendency and spread of one numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NumericSummary {
    /// Number of records that had a value.
    pub samples: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n − 1 denominator); 0 for one sample.
    pub stdev: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericSummary {
    /// Summarize `values`. Order does not matter.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = values.into_iter().collect();
        if values.is_empty() {
            return Self::default();
        }
        values.sort_by(f64::total_cmp);

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;

        let stdev = if n <= 1 {
            0.0
        } else {
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (n - 1) as f64).sqrt()
        };

        let median = if n % 2 == 0 {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        } else {
            values[n / 2]
        };

        Self {
            samples: n,
            mean: Some(mean),
            stdev: Some(stdev),
            median: Some(median),
            min: values.first().copied(),
            max: values.last().copied(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.samples > 0
    }
}

/// Descriptive-statistics snapshot for one city.
///
/// Derived from records on demand; never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub city: String,
    /// Number of input records, whether or not their fields were present.
    pub count: usize,
    pub rating: NumericSummary,
    pub quietness: NumericSummary,
    pub price_distribution: BTreeMap<Tier, usize>,
    pub wifi_distribution: BTreeMap<Tier, usize>,
    pub seat_distribution: BTreeMap<Tier, usize>,
}

impl RegionSummary {
    /// `count == 0` means "no data", not an error.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Summarize `records` for `city`.
pub fn summarize<'a>(
    city: &str,
    records: impl IntoIterator<Item = &'a CafeRecord>,
) -> RegionSummary {
    let records: Vec<&CafeRecord> = records.into_iter().collect();

    RegionSummary {
        city: city.to_string(),
        count: records.len(),
        rating: NumericSummary::from_values(records.iter().filter_map(|r| r.rating_value())),
        quietness: NumericSummary::from_values(records.iter().filter_map(|r| r.quietness_score)),
        price_distribution: distribution(records.iter().map(|r| r.price_tier)),
        wifi_distribution: distribution(records.iter().map(|r| r.wifi_tier)),
        seat_distribution: distribution(records.iter().map(|r| r.seat_availability)),
    }
}

fn distribution(tiers: impl Iterator<Item = Tier>) -> BTreeMap<Tier, usize> {
    let mut counts: BTreeMap<Tier, usize> = Tier::ALL.iter().map(|&t| (t, 0)).collect();
    for tier in tiers {
        *counts.entry(tier).or_default() += 1;
    }
    counts
}
