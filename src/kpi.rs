//! Headline indicators and their month-over-month deltas.
use crate::trend::monthly_buckets;
use crate::types::{EnrichedRecord, KpiName, KpiSet, KpiValue, MonthlyBucket};
use crate::util::{finite_mean, percent_change, ratio, sum_present};
use std::collections::{BTreeMap, HashSet};

/// The five scalars over the whole (filtered) table.
///
/// Every value is `None` for an empty table. Cost per kilometer is a ratio of
/// sums, so short trips do not dominate it the way a mean of ratios would.
/// Missing numbers drop out of sums and means; a missing `on_time` counts as
/// not on time.
pub fn headline_values(records: &[EnrichedRecord]) -> BTreeMap<KpiName, Option<f64>> {
    let n = records.len();
    let mut out = BTreeMap::new();
    if n == 0 {
        for name in KpiName::ALL {
            out.insert(name, None);
        }
        return out;
    }

    let (avg_delay, _) = finite_mean(records.iter().map(|r| r.delay_minutes));
    let on_time = records.iter().filter(|r| r.on_time == Some(true)).count();
    let total_cost = sum_present(records.iter().map(|r| r.total_cost));
    let fuel_cost = sum_present(records.iter().map(|r| r.fuel_cost));
    let distance = sum_present(records.iter().map(|r| r.distance_km));
    // a blank vehicle id is one more group, as in the per-vehicle table
    let vehicles: HashSet<Option<&str>> =
        records.iter().map(|r| r.vehicle_id.as_deref()).collect();

    out.insert(KpiName::AverageDelay, avg_delay);
    out.insert(KpiName::OnTimeRate, Some(on_time as f64 * 100.0 / n as f64));
    out.insert(KpiName::CostPerKilometer, ratio(total_cost, distance));
    out.insert(
        KpiName::DeliveriesPerVehicle,
        ratio(n as f64, vehicles.len() as f64),
    );
    out.insert(KpiName::FuelCostRatio, ratio(fuel_cost * 100.0, total_cost));
    out
}

/// The monthly figure each KPI is compared on.
///
/// Deliveries per Vehicle moves with the month's delivery count, and the cost
/// figures use the bucket's per-row means.
pub fn bucket_metric(bucket: &MonthlyBucket, name: KpiName) -> Option<f64> {
    match name {
        KpiName::AverageDelay => bucket.avg_delay,
        KpiName::OnTimeRate => bucket.on_time_rate,
        KpiName::CostPerKilometer => bucket.cost_per_km,
        KpiName::DeliveriesPerVehicle => Some(bucket.deliveries as f64),
        KpiName::FuelCostRatio => bucket.fuel_cost_ratio,
    }
}

/// Signed percent change between the last two months that have deliveries.
///
/// Gap months in the trend are passed over, so March is compared with
/// January when February is empty. Fewer than two such months means every
/// delta is 0.
pub fn month_over_month(buckets: &[MonthlyBucket]) -> BTreeMap<KpiName, f64> {
    let mut active = buckets.iter().rev().filter(|b| b.deliveries > 0);
    let pair = match (active.next(), active.next()) {
        (Some(cur), Some(prev)) => Some((prev, cur)),
        _ => None,
    };
    KpiName::ALL
        .into_iter()
        .map(|name| {
            let delta = pair
                .map(|(prev, cur)| {
                    percent_change(bucket_metric(prev, name), bucket_metric(cur, name))
                })
                .unwrap_or(0.0);
            (name, delta)
        })
        .collect()
}

/// KPIs for `records`, with deltas taken from `trend`.
///
/// `trend` must be the monthly buckets of the same `records`.
pub fn kpis_with_trend(records: &[EnrichedRecord], trend: &[MonthlyBucket]) -> KpiSet {
    let values = headline_values(records);
    let deltas = month_over_month(trend);
    let entries = KpiName::ALL
        .into_iter()
        .map(|name| {
            let value = values.get(&name).copied().flatten();
            let delta_percent = deltas.get(&name).copied().unwrap_or(0.0);
            (
                name,
                KpiValue {
                    value,
                    delta_percent,
                },
            )
        })
        .collect();
    KpiSet { entries }
}

pub fn compute_kpis(records: &[EnrichedRecord]) -> KpiSet {
    kpis_with_trend(records, &monthly_buckets(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{delayed, record};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn cost_per_km_is_ratio_of_sums() {
        let t = vec![
            record("D1", "V1", "2024-01-01", "Lagos", 10.0, 0.0, 2.0, true),
            record("D2", "V2", "2024-01-02", "Lagos", 20.0, 0.0, 5.0, true),
        ];
        let cpk = compute_kpis(&t).value(KpiName::CostPerKilometer).unwrap();
        assert!(close(cpk, 30.0 / 7.0));
        assert!(!close(cpk, 4.5));
    }

    #[test]
    fn on_time_rate_is_a_percentage() {
        let t = vec![
            record("D1", "V1", "2024-01-01", "Lagos", 1.0, 1.0, 1.0, true),
            record("D2", "V1", "2024-01-02", "Lagos", 1.0, 1.0, 1.0, true),
            record("D3", "V1", "2024-01-03", "Lagos", 1.0, 1.0, 1.0, false),
        ];
        let rate = compute_kpis(&t).value(KpiName::OnTimeRate).unwrap();
        assert!((rate - 66.67).abs() < 0.01);
    }

    #[test]
    fn deliveries_per_vehicle_and_fuel_ratio() {
        let t = vec![
            delayed(record("D1", "V1", "2024-01-01", "Lagos", 3.0, 1.0, 1.0, true), 5.0),
            delayed(record("D2", "V1", "2024-01-02", "Lagos", 3.0, 1.0, 1.0, true), 1.0),
            delayed(record("D3", "V2", "2024-01-03", "Kano", 2.0, 2.0, 1.0, true), 0.0),
        ];
        let k = compute_kpis(&t);
        assert!(close(k.value(KpiName::DeliveriesPerVehicle).unwrap(), 1.5));
        // 8 fuel out of 12 total
        assert!(close(k.value(KpiName::FuelCostRatio).unwrap(), 800.0 / 12.0));
        assert!(close(k.value(KpiName::AverageDelay).unwrap(), 2.0));
    }

    #[test]
    fn empty_table_is_undefined_not_a_panic() {
        let k = compute_kpis(&[]);
        for name in KpiName::ALL {
            assert_eq!(k.value(name), None);
            assert_eq!(k.delta(name), 0.0);
        }
    }

    #[test]
    fn single_month_has_zero_deltas() {
        let t = vec![
            record("D1", "V1", "2024-05-01", "Lagos", 1.0, 1.0, 1.0, true),
            record("D2", "V2", "2024-05-09", "Lagos", 5.0, 1.0, 2.0, false),
        ];
        let k = compute_kpis(&t);
        for name in KpiName::ALL {
            assert_eq!(k.delta(name), 0.0);
        }
    }

    #[test]
    fn delta_compares_last_two_months() {
        let t = vec![
            delayed(record("D1", "V1", "2024-01-10", "Lagos", 1.0, 1.0, 1.0, true), 100.0),
            delayed(record("D2", "V1", "2024-02-10", "Lagos", 1.0, 1.0, 1.0, true), 10.0),
            delayed(record("D3", "V1", "2024-03-10", "Lagos", 1.0, 1.0, 1.0, true), 15.0),
            delayed(record("D4", "V2", "2024-03-11", "Lagos", 1.0, 1.0, 1.0, false), 15.0),
        ];
        let k = compute_kpis(&t);
        assert!(close(k.delta(KpiName::AverageDelay), 50.0));
        assert!(close(k.delta(KpiName::OnTimeRate), -50.0));
        assert!(close(k.delta(KpiName::DeliveriesPerVehicle), 100.0));
        assert!(close(k.delta(KpiName::CostPerKilometer), 0.0));
    }

    #[test]
    fn zero_previous_month_gives_zero_delta() {
        let t = vec![
            delayed(record("D1", "V1", "2024-01-10", "Lagos", 1.0, 1.0, 1.0, true), 0.0),
            delayed(record("D2", "V1", "2024-02-10", "Lagos", 1.0, 1.0, 1.0, true), 5.0),
        ];
        assert_eq!(compute_kpis(&t).delta(KpiName::AverageDelay), 0.0);
    }

    #[test]
    fn zero_distance_everywhere_leaves_cost_per_km_undefined() {
        let t = vec![
            record("D1", "V1", "2024-01-01", "Lagos", 10.0, 5.0, 0.0, true),
            record("D2", "V2", "2024-01-02", "Lagos", 20.0, 0.0, 0.0, true),
        ];
        let k = compute_kpis(&t);
        assert_eq!(k.value(KpiName::CostPerKilometer), None);
        assert!(k.value(KpiName::FuelCostRatio).is_some());
    }

    #[test]
    fn zero_total_cost_everywhere_leaves_fuel_ratio_undefined() {
        let t = vec![
            record("D1", "V1", "2024-01-01", "Lagos", 0.0, 0.0, 3.0, true),
            record("D2", "V2", "2024-01-02", "Lagos", 0.0, 0.0, 4.0, false),
        ];
        let k = compute_kpis(&t);
        assert_eq!(k.value(KpiName::FuelCostRatio), None);
        assert_eq!(k.value(KpiName::CostPerKilometer), Some(0.0));
    }

    #[test]
    fn undefined_previous_cost_per_km_gives_zero_delta() {
        let t = vec![
            record("D1", "V1", "2024-01-10", "Lagos", 4.0, 1.0, 0.0, true),
            record("D2", "V1", "2024-01-20", "Lagos", 2.0, 1.0, 0.0, true),
            record("D3", "V1", "2024-02-10", "Lagos", 4.0, 1.0, 5.0, true),
        ];
        let trend = monthly_buckets(&t);
        assert_eq!(trend[0].cost_per_km, None);
        assert_eq!(trend[1].cost_per_km, Some(1.0));
        let k = kpis_with_trend(&t, &trend);
        assert_eq!(k.delta(KpiName::CostPerKilometer), 0.0);
        assert!(k.delta(KpiName::CostPerKilometer).is_finite());
    }

    #[test]
    fn delta_skips_empty_gap_months() {
        let t = vec![
            delayed(record("D1", "V1", "2024-01-10", "Lagos", 1.0, 1.0, 1.0, true), 10.0),
            delayed(record("D2", "V1", "2024-03-10", "Lagos", 1.0, 1.0, 1.0, true), 15.0),
        ];
        let trend = monthly_buckets(&t);
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[1].deliveries, 0);
        let k = kpis_with_trend(&t, &trend);
        assert!(close(k.delta(KpiName::AverageDelay), 50.0));
        assert_eq!(k.delta(KpiName::DeliveriesPerVehicle), 0.0);
    }

    #[test]
    fn missing_cells_drop_out_of_headline_figures() {
        let mut blank_cost = record("D1", "V1", "2024-01-01", "Lagos", 6.0, 0.0, 2.0, true);
        blank_cost.other_cost = f64::NAN;
        blank_cost.total_cost = f64::NAN;
        let mut blank_flag = record("D2", "V2", "2024-01-02", "Lagos", 4.0, 2.0, 2.0, true);
        blank_flag.on_time = None;
        let mut blank_vehicle = record("D3", "V2", "2024-01-03", "Lagos", 4.0, 2.0, 2.0, true);
        blank_vehicle.vehicle_id = None;

        let k = compute_kpis(&[blank_cost, blank_flag, blank_vehicle]);
        // total cost 12 over 6 km, the NaN total drops out of the sum
        assert!(close(k.value(KpiName::CostPerKilometer).unwrap(), 2.0));
        assert!(close(k.value(KpiName::OnTimeRate).unwrap(), 200.0 / 3.0));
        assert!(close(k.value(KpiName::DeliveriesPerVehicle).unwrap(), 1.0));
        assert_eq!(k.value(KpiName::AverageDelay), Some(0.0));
    }

    #[test]
    fn favourability_follows_direction() {
        assert!(KpiName::AverageDelay.is_favorable(-3.0));
        assert!(!KpiName::CostPerKilometer.is_favorable(2.0));
        assert!(KpiName::OnTimeRate.is_favorable(1.0));
        assert!(!KpiName::DeliveriesPerVehicle.is_favorable(-1.0));
    }
}
