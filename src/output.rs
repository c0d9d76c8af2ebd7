//! Console rendering and file export of a [`Dashboard`].
use crate::breakdown::rank_by_delay;
use crate::filter::FilterOptions;
use crate::types::{
    CityRow, Dashboard, KpiCardRow, KpiName, KpiSet, TrendRow, VehicleRow,
};
use crate::util::{format_int, format_number, format_opt};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

/// Label for deliveries whose vehicle id was blank.
pub const UNASSIGNED: &str = "(unassigned)";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of at most `max_rows` rows, or `(no rows)`.
pub fn table_string<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn format_kpi_value(name: KpiName, value: Option<f64>, currency: &str) -> String {
    let Some(v) = value else {
        return "n/a".to_string();
    };
    match name {
        KpiName::AverageDelay => format_number(v, 2),
        KpiName::DeliveriesPerVehicle => format_number(v, 0),
        KpiName::OnTimeRate | KpiName::FuelCostRatio => format!("{}%", format_number(v, 2)),
        KpiName::CostPerKilometer => format!("{}{}", currency, format_number(v, 2)),
    }
}

/// Arrow text for a delta: `▲` marks an improvement for that KPI, `▼` a
/// regression, `●` no change.
pub fn format_mom(name: KpiName, delta_percent: f64) -> (String, &'static str) {
    let magnitude = format_number(delta_percent.abs(), 1);
    if delta_percent == 0.0 {
        (format!("● {}%", magnitude), "flat")
    } else if name.is_favorable(delta_percent) {
        (format!("▲ {}%", magnitude), "favorable")
    } else {
        (format!("▼ {}%", magnitude), "unfavorable")
    }
}

pub fn kpi_cards(kpis: &KpiSet, currency: &str) -> Vec<KpiCardRow> {
    KpiName::ALL
        .into_iter()
        .map(|name| {
            let value = kpis.value(name);
            let (mom, trend) = format_mom(name, kpis.delta(name));
            KpiCardRow {
                name: name.label().to_string(),
                value: format_kpi_value(name, value, currency),
                mom,
                trend: trend.to_string(),
            }
        })
        .collect()
}

pub fn trend_rows(d: &Dashboard) -> Vec<TrendRow> {
    d.monthly_trend
        .iter()
        .map(|b| TrendRow {
            month: b.period_label.clone(),
            deliveries: format_int(b.deliveries),
            avg_delay: format_opt(b.avg_delay, 2),
            on_time_rate: format_opt(b.on_time_rate, 2),
            cost_per_km: format_opt(b.cost_per_km, 2),
            fuel_cost_ratio: format_opt(b.fuel_cost_ratio, 2),
        })
        .collect()
}

pub fn city_rows(d: &Dashboard) -> Vec<CityRow> {
    rank_by_delay(&d.city_breakdown)
        .into_iter()
        .map(|c| CityRow {
            city: c.delivery_city,
            deliveries: format_int(c.deliveries),
            avg_delay: format_opt(c.avg_delay, 2),
            cost_per_km: format_opt(c.cost_per_km, 2),
            on_time_rate: format_opt(c.on_time_rate, 2),
        })
        .collect()
}

pub fn vehicle_rows(d: &Dashboard) -> Vec<VehicleRow> {
    d.vehicle_counts
        .iter()
        .map(|v| VehicleRow {
            vehicle_id: v
                .vehicle_id
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            deliveries: v.deliveries_count,
        })
        .collect()
}

/// Text report for one selection.
pub fn render_dashboard(d: &Dashboard, currency: &str, max_rows: usize) -> String {
    let mut out = String::new();
    out.push_str("Logistics Operational Efficiency Analytics\n");
    out.push_str(&format!("({}; {} deliveries)\n\n", d.selection.describe(), format_int(d.rows)));

    if d.is_empty() {
        out.push_str("No deliveries match the current filters.\n");
        return out;
    }

    out.push_str("High-Level Performance Benchmarks\n\n");
    out.push_str(&table_string(&kpi_cards(&d.kpis, currency), KpiName::ALL.len()));
    out.push_str("\n\nAverage Delay by City\n\n");
    out.push_str(&table_string(&city_rows(d), max_rows));
    out.push_str("\n\nMonthly Trend\n\n");
    out.push_str(&table_string(&trend_rows(d), max_rows));

    let s = &d.vehicle_summary;
    out.push_str("\n\nDeliveries per Vehicle Distribution\n");
    out.push_str(&format!(
        "vehicles={} min={} q1={} median={} q3={} max={} mean={}\n",
        format_int(s.vehicles),
        format_opt(s.min, 0),
        format_opt(s.q1, 2),
        format_opt(s.median, 2),
        format_opt(s.q3, 2),
        format_opt(s.max, 0),
        format_opt(s.mean, 2),
    ));
    out
}

pub fn render_options(opts: &FilterOptions) -> String {
    format!(
        "Cities: {}\nMonths: {}\n",
        opts.cities.join(" | "),
        opts.months.join(" | ")
    )
}

/// Write the four report tables as CSV plus `dashboard.json`.
///
/// Returns the files written, in write order.
pub fn export_dashboard(dir: &Path, d: &Dashboard, currency: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let files = [
        "kpis.csv",
        "monthly_trend.csv",
        "city_breakdown.csv",
        "vehicle_deliveries.csv",
        "dashboard.json",
    ]
    .map(|f| dir.join(f));

    write_csv(&files[0], &kpi_cards(&d.kpis, currency))?;
    write_csv(&files[1], &trend_rows(d))?;
    write_csv(&files[2], &city_rows(d))?;
    write_csv(&files[3], &vehicle_rows(d))?;
    write_json(&files[4], d)?;

    info!(dir = %dir.display(), files = files.len(), "exported dashboard");
    Ok(files.to_vec())
}
