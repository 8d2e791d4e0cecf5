//! Dashboard selection: which city and date range the views show.
//!
//! Not persisted. Callers share it as `Arc<RwLock<DashboardStore>>`.

use chrono::NaiveDate;

use crate::types::find_city;

pub const DEFAULT_CITY: &str = "shanghai";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStore {
    selected_city: String,
    selected_date_range: Option<(NaiveDate, NaiveDate)>,
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardStore {
    pub fn new() -> Self {
        Self {
            selected_city: DEFAULT_CITY.to_string(),
            selected_date_range: None,
        }
    }

    pub fn selected_city(&self) -> &str {
        &self.selected_city
    }

    pub fn selected_date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.selected_date_range
    }

    /// Select a city. Catalogue labels are normalised to their value
    /// (`上海` becomes `shanghai`); other names are kept as given.
    pub fn set_selected_city(&mut self, city: &str) {
        self.selected_city = match find_city(city) {
            Some(known) => known.value.to_string(),
            None => city.to_string(),
        };
    }

    /// Select a date range; `None` clears it. A reversed range is stored
    /// in order.
    pub fn set_selected_date_range(&mut self, range: Option<(NaiveDate, NaiveDate)>) {
        self.selected_date_range = range.map(|(a, b)| if a <= b { (a, b) } else { (b, a) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn defaults_to_shanghai_without_range() {
        let store = DashboardStore::new();
        assert_eq!(store.selected_city(), "shanghai");
        assert!(store.selected_date_range().is_none());
    }

    #[test]
    fn city_labels_normalise_to_values() {
        let mut store = DashboardStore::new();
        store.set_selected_city("重庆");
        assert_eq!(store.selected_city(), "chongqing");

        store.set_selected_city("Atlantis");
        assert_eq!(store.selected_city(), "Atlantis");
    }

    #[test]
    fn date_range_is_ordered() {
        let mut store = DashboardStore::new();
        store.set_selected_date_range(Some((day(9), day(2))));
        assert_eq!(store.selected_date_range(), Some((day(2), day(9))));

        store.set_selected_date_range(None);
        assert!(store.selected_date_range().is_none());
    }
}
