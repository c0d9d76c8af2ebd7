use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabled::Tabled;

/// One line of `deliveries.csv`, kept as raw text until coercion.
#[derive(Debug, Deserialize)]
pub struct RawDelivery {
    pub delivery_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub date: Option<String>,
    pub city: Option<String>,
    pub planned_minutes: Option<String>,
    pub actual_minutes: Option<String>,
    pub on_time: Option<String>,
    pub fuel_cost: Option<String>,
    pub other_cost: Option<String>,
    pub distance_km: Option<String>,
}

impl RawDelivery {
    pub const COLUMNS: &'static [&'static str] = &[
        "delivery_id",
        "vehicle_id",
        "date",
        "city",
        "planned_minutes",
        "actual_minutes",
        "on_time",
        "fuel_cost",
        "other_cost",
        "distance_km",
    ];
}

/// One line of `fleet.csv`.
#[derive(Debug, Deserialize)]
pub struct RawVehicle {
    pub vehicle_id: Option<String>,
    pub city: Option<String>,
}

impl RawVehicle {
    pub const COLUMNS: &'static [&'static str] = &["vehicle_id", "city"];
}

/// One delivery after type coercion.
///
/// Only `date` is required. Blank or unparseable cells become `None`, or NaN
/// for numbers, so the row still counts wherever it can.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryEvent {
    pub delivery_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub date: NaiveDateTime,
    pub delivery_city: Option<String>,
    pub planned_minutes: f64,
    pub actual_minutes: f64,
    pub on_time: Option<bool>,
    pub fuel_cost: f64,
    pub other_cost: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRecord {
    pub vehicle_id: String,
    pub vehicle_home_city: String,
}

/// A delivery after the left join onto the vehicle registry.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub event: DeliveryEvent,
    /// `None` when the delivery's vehicle is not in the registry.
    pub vehicle_home_city: Option<String>,
}

/// A delivery with every derived metric attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub delivery_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub date: NaiveDateTime,
    pub delivery_city: Option<String>,
    pub vehicle_home_city: Option<String>,
    pub planned_minutes: f64,
    pub actual_minutes: f64,
    pub on_time: Option<bool>,
    pub fuel_cost: f64,
    pub other_cost: f64,
    pub distance_km: f64,
    pub delay_minutes: f64,
    pub total_cost: f64,
    /// Non-finite when `distance_km` is zero.
    pub cost_per_km: f64,
    pub fuel_cost_per_km: f64,
    /// First day of the delivery's calendar month; the ordering key.
    pub month_start: NaiveDate,
    /// Display label such as `Mar 2024`; the grouping and filter key.
    pub period_label: String,
}

/// Aggregates for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub month_start: NaiveDate,
    pub period_label: String,
    pub deliveries: usize,
    pub avg_delay: Option<f64>,
    /// Percentage of on-time deliveries, 0..=100.
    pub on_time_rate: Option<f64>,
    /// Mean of per-row cost per km over rows with a finite value.
    pub cost_per_km: Option<f64>,
    /// Mean of per-row `100 * fuel_cost / total_cost` over finite rows.
    pub fuel_cost_ratio: Option<f64>,
    /// Rows left out of the cost means because their ratio was not finite.
    pub non_finite_cost_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum KpiName {
    #[serde(rename = "Average Delay")]
    AverageDelay,
    #[serde(rename = "On-Time Rate")]
    OnTimeRate,
    #[serde(rename = "Cost per Kilometer")]
    CostPerKilometer,
    #[serde(rename = "Deliveries per Vehicle")]
    DeliveriesPerVehicle,
    #[serde(rename = "Fuel Cost Ratio")]
    FuelCostRatio,
}

impl KpiName {
    pub const ALL: [KpiName; 5] = [
        KpiName::AverageDelay,
        KpiName::OnTimeRate,
        KpiName::CostPerKilometer,
        KpiName::DeliveriesPerVehicle,
        KpiName::FuelCostRatio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KpiName::AverageDelay => "Average Delay",
            KpiName::OnTimeRate => "On-Time Rate",
            KpiName::CostPerKilometer => "Cost per Kilometer",
            KpiName::DeliveriesPerVehicle => "Deliveries per Vehicle",
            KpiName::FuelCostRatio => "Fuel Cost Ratio",
        }
    }

    /// True when a falling value is an improvement.
    pub fn lower_is_better(self) -> bool {
        matches!(
            self,
            KpiName::AverageDelay | KpiName::CostPerKilometer | KpiName::FuelCostRatio
        )
    }

    /// Whether a signed month-over-month delta is an improvement.
    pub fn is_favorable(self, delta_percent: f64) -> bool {
        if self.lower_is_better() {
            delta_percent < 0.0
        } else {
            delta_percent > 0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiValue {
    /// `None` when the table is empty or the ratio has no finite value.
    pub value: Option<f64>,
    pub delta_percent: f64,
}

/// The five headline indicators. Iteration follows [`KpiName::ALL`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KpiSet {
    pub entries: BTreeMap<KpiName, KpiValue>,
}

impl KpiSet {
    pub fn get(&self, name: KpiName) -> Option<KpiValue> {
        self.entries.get(&name).copied()
    }

    pub fn value(&self, name: KpiName) -> Option<f64> {
        self.get(name).and_then(|v| v.value)
    }

    pub fn delta(&self, name: KpiName) -> f64 {
        self.get(name).map(|v| v.delta_percent).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityBreakdownRow {
    pub delivery_city: String,
    pub deliveries: usize,
    pub avg_delay: Option<f64>,
    pub cost_per_km: Option<f64>,
    pub on_time_rate: Option<f64>,
    pub non_finite_cost_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleCountRow {
    /// `None` groups the deliveries with a blank vehicle id.
    pub vehicle_id: Option<String>,
    pub deliveries_count: usize,
}

/// Five-number summary plus mean of the per-vehicle delivery counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub vehicles: usize,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// Everything the presentation layer needs for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub selection: crate::filter::Selection,
    pub rows: usize,
    pub kpis: KpiSet,
    pub monthly_trend: Vec<MonthlyBucket>,
    pub city_breakdown: Vec<CityBreakdownRow>,
    pub vehicle_counts: Vec<VehicleCountRow>,
    pub vehicle_summary: DistributionSummary,
}

impl Dashboard {
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

// Rendered rows: formatted strings for console tables and CSV exports.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiCardRow {
    #[serde(rename = "KPI")]
    #[tabled(rename = "KPI")]
    pub name: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "MoM")]
    #[tabled(rename = "MoM")]
    pub mom: String,
    #[serde(rename = "Trend")]
    #[tabled(rename = "Trend")]
    pub trend: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TrendRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Deliveries")]
    #[tabled(rename = "Deliveries")]
    pub deliveries: String,
    #[serde(rename = "AvgDelay")]
    #[tabled(rename = "AvgDelay")]
    pub avg_delay: String,
    #[serde(rename = "OnTimeRate")]
    #[tabled(rename = "OnTimeRate")]
    pub on_time_rate: String,
    #[serde(rename = "CostPerKm")]
    #[tabled(rename = "CostPerKm")]
    pub cost_per_km: String,
    #[serde(rename = "FuelCostRatio")]
    #[tabled(rename = "FuelCostRatio")]
    pub fuel_cost_ratio: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CityRow {
    #[serde(rename = "City")]
    #[tabled(rename = "City")]
    pub city: String,
    #[serde(rename = "Deliveries")]
    #[tabled(rename = "Deliveries")]
    pub deliveries: String,
    #[serde(rename = "AvgDelay")]
    #[tabled(rename = "AvgDelay")]
    pub avg_delay: String,
    #[serde(rename = "CostPerKm")]
    #[tabled(rename = "CostPerKm")]
    pub cost_per_km: String,
    #[serde(rename = "OnTimeRate")]
    #[tabled(rename = "OnTimeRate")]
    pub on_time_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct VehicleRow {
    #[serde(rename = "VehicleId")]
    #[tabled(rename = "VehicleId")]
    pub vehicle_id: String,
    #[serde(rename = "Deliveries")]
    #[tabled(rename = "Deliveries")]
    pub deliveries: usize,
}
