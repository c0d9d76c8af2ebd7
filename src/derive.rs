//! Per-row derived fields.
//!
//! Divisions are not guarded here: a zero `distance_km` yields an infinite
//! (or NaN) `cost_per_km`, and the aggregating engines decide what to do with
//! non-finite values.
use crate::types::{EnrichedRecord, JoinedRow};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// First day of the calendar month containing `ts`.
pub fn month_start(ts: NaiveDateTime) -> NaiveDate {
    let d = ts.date();
    // Day 1 of an existing month always exists.
    d.with_day(1).unwrap_or(d)
}

/// Display label for a month, e.g. `Mar 2024`.
pub fn period_label(month: NaiveDate) -> String {
    month.format("%b %Y").to_string()
}

pub fn enrich(row: JoinedRow) -> EnrichedRecord {
    let JoinedRow {
        event,
        vehicle_home_city,
    } = row;
    let total_cost = event.fuel_cost + event.other_cost;
    let month = month_start(event.date);
    EnrichedRecord {
        delay_minutes: event.actual_minutes - event.planned_minutes,
        total_cost,
        cost_per_km: total_cost / event.distance_km,
        fuel_cost_per_km: event.fuel_cost / event.distance_km,
        month_start: month,
        period_label: period_label(month),
        delivery_id: event.delivery_id,
        vehicle_id: event.vehicle_id,
        date: event.date,
        delivery_city: event.delivery_city,
        vehicle_home_city,
        planned_minutes: event.planned_minutes,
        actual_minutes: event.actual_minutes,
        on_time: event.on_time,
        fuel_cost: event.fuel_cost,
        other_cost: event.other_cost,
        distance_km: event.distance_km,
    }
}

/// One enriched record per joined row, order preserved.
pub fn enrich_all(rows: Vec<JoinedRow>) -> Vec<EnrichedRecord> {
    rows.into_iter().map(enrich).collect()
}
