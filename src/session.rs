//! Session-scoped cache of the enriched table and per-selection results.
//!
//! The source files are read once when the session opens. Each distinct
//! filter selection is computed at most once until [`Session::reload`].
use crate::breakdown::{by_city, by_vehicle, summarize};
use crate::derive::enrich_all;
use crate::error::Result;
use crate::filter::{apply, FilterOptions, Selection};
use crate::kpi::kpis_with_trend;
use crate::loader::{load_sources, LoadReport};
use crate::trend::monthly_buckets;
use crate::types::{Dashboard, EnrichedRecord};
use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Full output bundle for one selection over `records`.
///
/// Pure: identical inputs give identical output. KPI deltas and the trend
/// share one set of monthly buckets built from the filtered rows.
pub fn build_dashboard(records: &[EnrichedRecord], selection: &Selection) -> Dashboard {
    let view = apply(records, selection);
    let monthly_trend = monthly_buckets(&view);
    let kpis = kpis_with_trend(&view, &monthly_trend);
    let vehicle_counts = by_vehicle(&view);
    let vehicle_summary = summarize(&vehicle_counts);
    Dashboard {
        selection: selection.clone(),
        rows: view.len(),
        kpis,
        monthly_trend,
        city_breakdown: by_city(&view),
        vehicle_counts,
        vehicle_summary,
    }
}

#[derive(Debug, Clone)]
struct Sources {
    deliveries: PathBuf,
    fleet: PathBuf,
}

pub struct Session {
    sources: Option<Sources>,
    records: Vec<EnrichedRecord>,
    report: LoadReport,
    options: OnceCell<FilterOptions>,
    selection: Selection,
    memo: HashMap<Selection, Dashboard>,
}

impl Session {
    /// Load and join both files, then derive the enriched table.
    pub fn open(deliveries: &Path, fleet: &Path) -> Result<Self> {
        let sources = Sources {
            deliveries: deliveries.to_path_buf(),
            fleet: fleet.to_path_buf(),
        };
        let (records, report) = load(&sources)?;
        let mut session = Session::from_records(records);
        session.sources = Some(sources);
        session.report = report;
        Ok(session)
    }

    /// A session over an already-built table, with no backing files.
    pub fn from_records(records: Vec<EnrichedRecord>) -> Self {
        Session {
            sources: None,
            records,
            report: LoadReport::default(),
            options: OnceCell::new(),
            selection: Selection::default(),
            memo: HashMap::new(),
        }
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selector choices over the unfiltered table.
    pub fn filter_options(&self) -> &FilterOptions {
        self.options
            .get_or_init(|| FilterOptions::from_records(&self.records))
    }

    /// Bundle for the current selection.
    pub fn dashboard(&mut self) -> &Dashboard {
        let records = &self.records;
        let selection = self.selection.clone();
        self.memo.entry(selection).or_insert_with_key(|sel| {
            debug!(selection = %sel.describe(), "computing dashboard");
            build_dashboard(records, sel)
        })
    }

    /// Filter on a delivery city, or `All` to clear.
    pub fn set_city_filter(&mut self, city: &str) -> &Dashboard {
        self.selection = self.selection.clone().with_city(city);
        self.dashboard()
    }

    /// Filter on a period label such as `Mar 2024`, or `All` to clear.
    pub fn set_month_filter(&mut self, period_label: &str) -> &Dashboard {
        self.selection = self.selection.clone().with_period(period_label);
        self.dashboard()
    }

    /// Re-read the source files and drop every cached result.
    ///
    /// On failure the previous table stays in place.
    pub fn reload(&mut self) -> Result<()> {
        if let Some(sources) = &self.sources {
            let (records, report) = load(sources)?;
            self.records = records;
            self.report = report;
        }
        self.options = OnceCell::new();
        self.memo.clear();
        info!(rows = self.records.len(), "session reloaded");
        Ok(())
    }
}

fn load(sources: &Sources) -> Result<(Vec<EnrichedRecord>, LoadReport)> {
    let (joined, report) = load_sources(&sources.deliveries, &sources.fleet)?;
    let records = enrich_all(joined);
    info!(
        rows = records.len(),
        deliveries = %sources.deliveries.display(),
        fleet = %sources.fleet.display(),
        "enriched table ready"
    );
    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{delayed, record};
    use crate::types::KpiName;

    fn table() -> Vec<EnrichedRecord> {
        vec![
            delayed(record("D1", "V1", "2024-01-10", "Lagos", 5.0, 5.0, 2.0, true), 4.0),
            delayed(record("D2", "V2", "2024-02-10", "Lagos", 5.0, 5.0, 5.0, false), 8.0),
            delayed(record("D3", "V2", "2024-02-11", "Abuja", 2.0, 2.0, 4.0, true), -2.0),
        ]
    }

    #[test]
    fn filters_update_the_bundle() {
        let mut s = Session::from_records(table());
        assert_eq!(s.dashboard().rows, 3);

        let lagos = s.set_city_filter("Lagos").clone();
        assert_eq!(lagos.rows, 2);
        assert_eq!(lagos.city_breakdown.len(), 1);
        assert_eq!(lagos.monthly_trend.len(), 2);
        // Feb delay 8 against Jan 4, within Lagos only
        assert_eq!(lagos.kpis.delta(KpiName::AverageDelay), 100.0);

        let feb = s.set_month_filter("Feb 2024").clone();
        assert_eq!(feb.rows, 1);
        assert_eq!(feb.kpis.delta(KpiName::AverageDelay), 0.0);

        let all = s.set_city_filter("All").clone();
        assert_eq!(all.rows, 2);
        assert_eq!(s.selection().period_label.as_deref(), Some("Feb 2024"));
    }

    #[test]
    fn unknown_city_renders_empty_bundle() {
        let mut s = Session::from_records(table());
        let d = s.set_city_filter("Atlantis").clone();
        assert!(d.is_empty());
        assert!(d.monthly_trend.is_empty());
        assert!(d.vehicle_counts.is_empty());
        for name in KpiName::ALL {
            assert_eq!(d.kpis.value(name), None);
        }
    }

    #[test]
    fn repeated_selection_is_identical() {
        let t = table();
        let sel = Selection::new("Lagos", "All");
        assert_eq!(build_dashboard(&t, &sel), build_dashboard(&t, &sel));

        let mut s = Session::from_records(t);
        let first = s.set_city_filter("Lagos").clone();
        s.set_city_filter("Abuja");
        let again = s.set_city_filter("Lagos").clone();
        assert_eq!(first, again);
    }

    #[test]
    fn options_cover_unfiltered_table() {
        let mut s = Session::from_records(table());
        s.set_city_filter("Abuja");
        let opts = s.filter_options();
        assert_eq!(opts.cities, vec!["All", "Abuja", "Lagos"]);
        assert_eq!(opts.months, vec!["All", "Jan 2024", "Feb 2024"]);
    }
}
