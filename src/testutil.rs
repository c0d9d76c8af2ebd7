//! Record builders shared by the unit tests.
use crate::derive::enrich;
use crate::types::{DeliveryEvent, EnrichedRecord, JoinedRow};
use chrono::NaiveDate;

#[allow(clippy::too_many_arguments)]
pub fn record(
    id: &str,
    vehicle: &str,
    date: &str,
    city: &str,
    fuel_cost: f64,
    other_cost: f64,
    distance_km: f64,
    on_time: bool,
) -> EnrichedRecord {
    enrich(JoinedRow {
        event: DeliveryEvent {
            delivery_id: Some(id.to_string()),
            vehicle_id: Some(vehicle.to_string()),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .expect("test date")
                .and_hms_opt(12, 0, 0)
                .expect("noon"),
            delivery_city: Some(city.to_string()),
            planned_minutes: 30.0,
            actual_minutes: 30.0,
            on_time: Some(on_time),
            fuel_cost,
            other_cost,
            distance_km,
        },
        vehicle_home_city: None,
    })
}

/// Same record with `actual_minutes` moved so the delay equals `delay`.
pub fn delayed(mut r: EnrichedRecord, delay: f64) -> EnrichedRecord {
    r.actual_minutes = r.planned_minutes + delay;
    r.delay_minutes = delay;
    r
}
