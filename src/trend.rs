//! Calendar-month buckets.
//!
//! Rows are grouped on the first day of their month, never on the display
//! label, so the output order is chronological across year boundaries.
//! Months between the first and last delivery that have no rows still get a
//! bucket, with a zero count and no means, so the series has no silent gaps.
use crate::derive::period_label;
use crate::types::{EnrichedRecord, MonthlyBucket};
use crate::util::{finite_mean, mean};
use chrono::{Months, NaiveDate};
use std::collections::BTreeMap;

fn bucket(month_start: NaiveDate, rows: &[&EnrichedRecord]) -> MonthlyBucket {
    let (avg_delay, _) = finite_mean(rows.iter().map(|r| r.delay_minutes));
    // rows without an on-time flag are left out of the rate
    let on_time: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.on_time)
        .map(|t| if t { 100.0 } else { 0.0 })
        .collect();
    let (cost_per_km, bad_cost) = finite_mean(rows.iter().map(|r| r.cost_per_km));
    let (fuel_cost_ratio, _) =
        finite_mean(rows.iter().map(|r| r.fuel_cost * 100.0 / r.total_cost));

    MonthlyBucket {
        month_start,
        period_label: period_label(month_start),
        deliveries: rows.len(),
        avg_delay,
        on_time_rate: mean(&on_time),
        cost_per_km,
        fuel_cost_ratio,
        non_finite_cost_rows: bad_cost,
    }
}

/// Per-month aggregates in ascending month order, one bucket for every
/// calendar month from the earliest to the latest delivery.
pub fn monthly_buckets(records: &[EnrichedRecord]) -> Vec<MonthlyBucket> {
    let mut by_month: BTreeMap<NaiveDate, Vec<&EnrichedRecord>> = BTreeMap::new();
    for r in records {
        by_month.entry(r.month_start).or_default().push(r);
    }
    let (Some(&first), Some(&last)) = (by_month.keys().next(), by_month.keys().next_back())
    else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(by_month.len());
    let mut month = first;
    while month <= last {
        let rows = by_month.get(&month).map(Vec::as_slice).unwrap_or(&[]);
        out.push(bucket(month, rows));
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }
    out
}
