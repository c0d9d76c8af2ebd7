//! Equality filters on delivery city and period label.
use crate::types::EnrichedRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Selector value meaning "no filter on this dimension".
pub const ALL: &str = "All";

/// The current city and month choice. `None` matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    pub city: Option<String>,
    pub period_label: Option<String>,
}

/// Exactly `All` (or nothing) clears a dimension; any other value, including
/// a city literally named `all`, is matched verbatim.
fn from_choice(choice: &str) -> Option<String> {
    if choice.is_empty() || choice == ALL {
        None
    } else {
        Some(choice.to_string())
    }
}

impl Selection {
    pub fn new(city: &str, period_label: &str) -> Self {
        Selection {
            city: from_choice(city),
            period_label: from_choice(period_label),
        }
    }

    pub fn with_city(mut self, city: &str) -> Self {
        self.city = from_choice(city);
        self
    }

    pub fn with_period(mut self, period_label: &str) -> Self {
        self.period_label = from_choice(period_label);
        self
    }

    pub fn matches(&self, r: &EnrichedRecord) -> bool {
        self.city
            .as_deref()
            .map_or(true, |c| r.delivery_city.as_deref() == Some(c))
            && self
                .period_label
                .as_deref()
                .map_or(true, |p| r.period_label == p)
    }

    pub fn describe(&self) -> String {
        format!(
            "city={}, month={}",
            self.city.as_deref().unwrap_or(ALL),
            self.period_label.as_deref().unwrap_or(ALL)
        )
    }
}

/// Rows matching every criterion in `selection`, in table order.
pub fn apply(records: &[EnrichedRecord], selection: &Selection) -> Vec<EnrichedRecord> {
    records
        .iter()
        .filter(|r| selection.matches(r))
        .cloned()
        .collect()
}

/// Choices offered by the city and month selectors, each list led by `All`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub cities: Vec<String>,
    /// Ordered by calendar month, not alphabetically.
    pub months: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        let cities: BTreeSet<&str> = records
            .iter()
            .filter_map(|r| r.delivery_city.as_deref())
            .collect();
        let months: BTreeMap<NaiveDate, &str> = records
            .iter()
            .map(|r| (r.month_start, r.period_label.as_str()))
            .collect();

        let mut city_opts = vec![ALL.to_string()];
        city_opts.extend(cities.into_iter().map(str::to_string));
        let mut month_opts = vec![ALL.to_string()];
        month_opts.extend(months.into_values().map(str::to_string));
        FilterOptions {
            cities: city_opts,
            months: month_opts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::record;

    fn table() -> Vec<EnrichedRecord> {
        vec![
            record("D1", "V1", "2024-01-10", "Lagos", 1.0, 1.0, 1.0, true),
            record("D2", "V1", "2024-02-10", "Lagos", 1.0, 1.0, 1.0, true),
            record("D3", "V2", "2024-01-12", "Abuja", 1.0, 1.0, 1.0, false),
            record("D4", "V3", "2023-12-30", "Kano", 1.0, 1.0, 1.0, true),
        ]
    }

    fn ids(rows: &[EnrichedRecord]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.delivery_id.as_deref()).collect()
    }

    #[test]
    fn all_is_identity() {
        let t = table();
        assert_eq!(apply(&t, &Selection::new("All", "All")), t);
        assert_eq!(apply(&t, &Selection::default()), t);
    }

    #[test]
    fn filters_compose_in_any_order() {
        let t = table();
        let city_first = apply(&apply(&t, &Selection::new("Lagos", ALL)), &Selection::new(ALL, "Jan 2024"));
        let month_first = apply(&apply(&t, &Selection::new(ALL, "Jan 2024")), &Selection::new("Lagos", ALL));
        let both = apply(&t, &Selection::new("Lagos", "Jan 2024"));
        assert_eq!(ids(&city_first), vec!["D1"]);
        assert_eq!(city_first, month_first);
        assert_eq!(city_first, both);
    }

    #[test]
    fn unknown_city_gives_empty_view() {
        assert!(apply(&table(), &Selection::new("Atlantis", ALL)).is_empty());
    }

    #[test]
    fn only_the_exact_all_token_clears_a_filter() {
        let mut t = table();
        t.push(record("D5", "V4", "2024-01-15", "all", 1.0, 1.0, 1.0, true));

        assert_eq!(Selection::new("all", ALL).city.as_deref(), Some("all"));
        assert_eq!(ids(&apply(&t, &Selection::new("all", ALL))), vec!["D5"]);
        assert_eq!(apply(&t, &Selection::new("", "")), t);

        // values are not trimmed, so padding does not match
        assert_eq!(Selection::new(" Lagos ", ALL).city.as_deref(), Some(" Lagos "));
        assert!(apply(&t, &Selection::new(" Lagos ", ALL)).is_empty());
        assert_eq!(Selection::new(" All", ALL).city.as_deref(), Some(" All"));
    }

    #[test]
    fn blank_city_rows_only_pass_an_open_city_filter() {
        let mut t = table();
        t[0].delivery_city = None;
        assert_eq!(apply(&t, &Selection::default()).len(), 4);
        assert_eq!(ids(&apply(&t, &Selection::new("Lagos", ALL))), vec!["D2"]);
        let opts = FilterOptions::from_records(&t);
        assert_eq!(opts.cities, vec!["All", "Abuja", "Kano", "Lagos"]);
    }

    #[test]
    fn options_are_sorted() {
        let opts = FilterOptions::from_records(&table());
        assert_eq!(opts.cities, vec!["All", "Abuja", "Kano", "Lagos"]);
        assert_eq!(opts.months, vec!["All", "Dec 2023", "Jan 2024", "Feb 2024"]);
    }
}
