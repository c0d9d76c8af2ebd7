//! Reads the two source tables and joins them.
//!
//! Deliveries are left-outer-joined onto the vehicle registry by
//! `vehicle_id`. Both tables carry a `city` column: the delivery side becomes
//! `delivery_city`, the registry side becomes `vehicle_home_city`, and neither
//! ever overwrites the other.
use crate::error::{PipelineError, Result};
use crate::types::{DeliveryEvent, JoinedRow, RawDelivery, RawVehicle, VehicleRecord};
use crate::util::{parse_bool_safe, parse_f64_safe, parse_text_safe, parse_timestamp_safe};
use csv::{Reader, ReaderBuilder, Trim};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DELIVERIES: &str = "deliveries";
pub const FLEET: &str = "fleet";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub delivery_rows: usize,
    pub vehicle_rows: usize,
    pub parse_errors: usize,
    /// Blank or unparseable cells in rows that were kept.
    pub missing_cells: usize,
    pub duplicate_deliveries: usize,
    pub duplicate_vehicles: usize,
    pub unmatched_vehicles: usize,
    pub zero_distance_rows: usize,
}

fn open(source_name: &'static str, path: &Path) -> Result<File> {
    File::open(path).map_err(|e| PipelineError::MissingData {
        source_name,
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn reader<R: Read>(rdr: R) -> Reader<R> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(rdr)
}

/// Fail fast when the header row lacks any of `required`.
fn check_columns<R: Read>(
    source_name: &'static str,
    rdr: &mut Reader<R>,
    required: &[&str],
) -> Result<()> {
    let headers = rdr
        .headers()
        .map_err(|source| PipelineError::Csv { source_name, source })?;
    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !present.contains(**c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns {
            source_name,
            columns: missing,
        })
    }
}

/// Numeric cell, NaN when blank or unparseable.
fn number(cell: Option<&str>, missing: &mut usize) -> f64 {
    parse_f64_safe(cell).unwrap_or_else(|| {
        *missing += 1;
        f64::NAN
    })
}

fn optional<T>(value: Option<T>, missing: &mut usize) -> Option<T> {
    if value.is_none() {
        *missing += 1;
    }
    value
}

/// Coerce one raw row. Only an unparseable `date` rejects the row; every
/// other bad cell is kept as `None` or NaN and counted in `missing`.
fn coerce_delivery(row: RawDelivery, missing: &mut usize) -> Option<DeliveryEvent> {
    let date = parse_timestamp_safe(row.date.as_deref())?;
    Some(DeliveryEvent {
        delivery_id: optional(parse_text_safe(row.delivery_id.as_deref()), missing),
        vehicle_id: optional(parse_text_safe(row.vehicle_id.as_deref()), missing),
        date,
        delivery_city: optional(parse_text_safe(row.city.as_deref()), missing),
        planned_minutes: number(row.planned_minutes.as_deref(), missing),
        actual_minutes: number(row.actual_minutes.as_deref(), missing),
        on_time: optional(parse_bool_safe(row.on_time.as_deref()), missing),
        fuel_cost: number(row.fuel_cost.as_deref(), missing),
        other_cost: number(row.other_cost.as_deref(), missing),
        distance_km: number(row.distance_km.as_deref(), missing),
    })
}

/// Parse delivery events from any CSV source with a header row.
///
/// Rows without a parseable date are skipped and counted; other bad cells
/// stay in the row as missing values. A repeated `delivery_id` keeps the
/// first occurrence, and rows with no id are never treated as repeats.
pub fn read_deliveries<R: Read>(rdr: R, report: &mut LoadReport) -> Result<Vec<DeliveryEvent>> {
    let mut rdr = reader(rdr);
    check_columns(DELIVERIES, &mut rdr, RawDelivery::COLUMNS)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut events = Vec::new();
    for (idx, result) in rdr.deserialize::<RawDelivery>().enumerate() {
        let missing = &mut report.missing_cells;
        let Some(event) = result.ok().and_then(|row| coerce_delivery(row, missing)) else {
            debug!(line = idx + 2, "skipping delivery row without a parseable date");
            report.parse_errors += 1;
            continue;
        };
        if let Some(id) = &event.delivery_id {
            if !seen.insert(id.clone()) {
                report.duplicate_deliveries += 1;
                continue;
            }
        }
        if event.distance_km == 0.0 {
            report.zero_distance_rows += 1;
        }
        events.push(event);
    }
    report.delivery_rows = events.len();
    Ok(events)
}

/// Parse the vehicle registry. A repeated `vehicle_id` keeps the first entry
/// so the join stays one-to-one.
pub fn read_fleet<R: Read>(rdr: R, report: &mut LoadReport) -> Result<Vec<VehicleRecord>> {
    let mut rdr = reader(rdr);
    check_columns(FLEET, &mut rdr, RawVehicle::COLUMNS)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut vehicles = Vec::new();
    for result in rdr.deserialize::<RawVehicle>() {
        let parsed = result.ok().and_then(|row| {
            Some(VehicleRecord {
                vehicle_id: parse_text_safe(row.vehicle_id.as_deref())?,
                vehicle_home_city: parse_text_safe(row.city.as_deref())?,
            })
        });
        let Some(vehicle) = parsed else {
            report.parse_errors += 1;
            continue;
        };
        if !seen.insert(vehicle.vehicle_id.clone()) {
            report.duplicate_vehicles += 1;
            continue;
        }
        vehicles.push(vehicle);
    }
    report.vehicle_rows = vehicles.len();
    Ok(vehicles)
}

/// Left outer join of deliveries onto the registry by `vehicle_id`.
///
/// The output has exactly one row per delivery, in input order. A delivery
/// with no vehicle id is unmatched.
pub fn left_join(
    deliveries: Vec<DeliveryEvent>,
    fleet: &[VehicleRecord],
    report: &mut LoadReport,
) -> Vec<JoinedRow> {
    let home: HashMap<&str, &str> = fleet
        .iter()
        .map(|v| (v.vehicle_id.as_str(), v.vehicle_home_city.as_str()))
        .collect();

    deliveries
        .into_iter()
        .map(|event| {
            let vehicle_home_city = event
                .vehicle_id
                .as_deref()
                .and_then(|id| home.get(id))
                .map(|c| c.to_string());
            if vehicle_home_city.is_none() {
                report.unmatched_vehicles += 1;
            }
            JoinedRow {
                event,
                vehicle_home_city,
            }
        })
        .collect()
}

/// Load both tables from disk and join them.
///
/// Either file being absent or lacking required columns is a
/// [`PipelineError`]; nothing downstream should run in that case.
pub fn load_sources(deliveries: &Path, fleet: &Path) -> Result<(Vec<JoinedRow>, LoadReport)> {
    let mut report = LoadReport::default();
    let events = read_deliveries(open(DELIVERIES, deliveries)?, &mut report)?;
    let vehicles = read_fleet(open(FLEET, fleet)?, &mut report)?;
    let joined = left_join(events, &vehicles, &mut report);

    info!(
        deliveries = report.delivery_rows,
        vehicles = report.vehicle_rows,
        "loaded source tables"
    );
    if report.parse_errors > 0 {
        warn!(rows = report.parse_errors, "skipped rows without a parseable date");
    }
    if report.missing_cells > 0 {
        warn!(cells = report.missing_cells, "kept rows with blank or unparseable cells");
    }
    if report.duplicate_deliveries > 0 || report.duplicate_vehicles > 0 {
        warn!(
            deliveries = report.duplicate_deliveries,
            vehicles = report.duplicate_vehicles,
            "dropped rows with a repeated key"
        );
    }
    if report.unmatched_vehicles > 0 {
        info!(
            rows = report.unmatched_vehicles,
            "deliveries reference vehicles missing from the registry"
        );
    }
    if report.zero_distance_rows > 0 {
        warn!(
            rows = report.zero_distance_rows,
            "deliveries with zero distance have no finite cost per km"
        );
    }
    Ok((joined, report))
}
