//! Groupings by delivery city and by vehicle.
use crate::types::{CityBreakdownRow, DistributionSummary, EnrichedRecord, VehicleCountRow};
use crate::util::{finite_mean, mean, quantile};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Per-city means, sorted by city name. Rows with a blank city belong to no
/// group.
pub fn by_city(records: &[EnrichedRecord]) -> Vec<CityBreakdownRow> {
    let mut groups: BTreeMap<&str, Vec<&EnrichedRecord>> = BTreeMap::new();
    for r in records {
        if let Some(city) = r.delivery_city.as_deref() {
            groups.entry(city).or_default().push(r);
        }
    }
    groups
        .into_iter()
        .map(|(city, rows)| {
            let (avg_delay, _) = finite_mean(rows.iter().map(|r| r.delay_minutes));
            let on_time: Vec<f64> = rows
                .iter()
                .filter_map(|r| r.on_time)
                .map(|t| if t { 100.0 } else { 0.0 })
                .collect();
            let (cost_per_km, dropped) = finite_mean(rows.iter().map(|r| r.cost_per_km));
            CityBreakdownRow {
                delivery_city: city.to_string(),
                deliveries: rows.len(),
                avg_delay,
                cost_per_km,
                on_time_rate: mean(&on_time),
                non_finite_cost_rows: dropped,
            }
        })
        .collect()
}

/// City rows ordered worst delay first, ties by city name.
pub fn rank_by_delay(rows: &[CityBreakdownRow]) -> Vec<CityBreakdownRow> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| {
        let (da, db) = (
            a.avg_delay.unwrap_or(f64::NEG_INFINITY),
            b.avg_delay.unwrap_or(f64::NEG_INFINITY),
        );
        db.partial_cmp(&da)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.delivery_city.cmp(&b.delivery_city))
    });
    ranked
}

/// Delivery count for every vehicle, sorted by vehicle id.
///
/// Deliveries with a blank vehicle id are counted together in a leading
/// `None` row, so the counts always sum to the number of records.
pub fn by_vehicle(records: &[EnrichedRecord]) -> Vec<VehicleCountRow> {
    let mut counts: BTreeMap<Option<&str>, usize> = BTreeMap::new();
    for r in records {
        *counts.entry(r.vehicle_id.as_deref()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(vehicle_id, deliveries_count)| VehicleCountRow {
            vehicle_id: vehicle_id.map(str::to_string),
            deliveries_count,
        })
        .collect()
}

/// Spread of the per-vehicle counts, as drawn by a box plot.
pub fn summarize(counts: &[VehicleCountRow]) -> DistributionSummary {
    let mut values: Vec<f64> = counts.iter().map(|c| c.deliveries_count as f64).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    DistributionSummary {
        vehicles: values.len(),
        min: values.first().copied(),
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values.last().copied(),
        mean: mean(&values),
    }
}
