// Holiday records and the per-session holiday directory

use chrono::NaiveDate;
use futures::future::try_join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::client::HolidaySource;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid country code '{0}': expected two ASCII letters (ISO 3166 alpha-2)")]
pub struct InvalidCountryCode(pub String);

/// ISO 3166 alpha-2 country code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(value: &str) -> Result<Self, InvalidCountryCode> {
        let trimmed = value.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(InvalidCountryCode(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a holiday as reported by the holiday source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HolidayKind {
    PublicHoliday,
    Observance,
    /// Any other type the source may report; never affects availability.
    #[serde(other)]
    Other,
}

/// Category requested from the holiday source (`type` query parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolidayCategory {
    PublicHoliday,
    Observance,
}

impl HolidayCategory {
    pub fn as_query_value(&self) -> &'static str {
        match self {
            HolidayCategory::PublicHoliday => "public_holiday",
            HolidayCategory::Observance => "observance",
        }
    }
}

impl fmt::Display for HolidayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Holiday {
    pub name: String,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: HolidayKind,
}

impl Holiday {
    pub fn new(name: impl Into<String>, date: NaiveDate, kind: HolidayKind) -> Self {
        Self {
            name: name.into(),
            date,
            kind,
        }
    }
}

// Accepts "YYYY-MM-DD" as well as timestamps such as "YYYY-MM-DDT00:00:00";
// the time of day is dropped.
fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let day = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

/// Parameters of one request against the holiday source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayQuery {
    pub country: CountryCode,
    pub year: i32,
    pub category: HolidayCategory,
}

/// Which categories a deployment asks the source for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    PublicOnly,
    PublicAndObservance,
}

impl FetchStrategy {
    pub fn for_observance_support(supports_observance: bool) -> Self {
        if supports_observance {
            FetchStrategy::PublicAndObservance
        } else {
            FetchStrategy::PublicOnly
        }
    }

    pub fn categories(&self) -> &'static [HolidayCategory] {
        match self {
            FetchStrategy::PublicOnly => &[HolidayCategory::PublicHoliday],
            FetchStrategy::PublicAndObservance => {
                &[HolidayCategory::PublicHoliday, HolidayCategory::Observance]
            }
        }
    }
}

/// Immutable set of holidays indexed by calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    by_date: BTreeMap<NaiveDate, Vec<Holiday>>,
    len: usize,
}

impl HolidaySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_holidays(holidays: impl IntoIterator<Item = Holiday>) -> Self {
        let mut set = Self::new();
        for holiday in holidays {
            set.by_date.entry(holiday.date).or_default().push(holiday);
            set.len += 1;
        }
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All holidays falling on `date`, in insertion order.
    pub fn on(&self, date: NaiveDate) -> &[Holiday] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_public_holiday(&self, date: NaiveDate) -> bool {
        self.on(date)
            .iter()
            .any(|holiday| holiday.kind == HolidayKind::PublicHoliday)
    }

    pub fn observance_on(&self, date: NaiveDate) -> Option<&Holiday> {
        self.on(date)
            .iter()
            .find(|holiday| holiday.kind == HolidayKind::Observance)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holiday> {
        self.by_date.values().flatten()
    }
}

/// Outcome of the directory's most recent load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug)]
struct DirectoryState {
    holidays: Arc<HolidaySet>,
    status: LoadStatus,
}

/// Fetches and caches the holidays for one form session.
///
/// Readers always get a complete snapshot: the set starts empty, and a load
/// either publishes every requested category or nothing at all. A failed
/// load leaves the set empty so availability falls back to the weekday rule.
#[derive(Debug)]
pub struct HolidayDirectory {
    strategy: FetchStrategy,
    state: RwLock<DirectoryState>,
}

impl HolidayDirectory {
    pub fn new(strategy: FetchStrategy) -> Self {
        Self {
            strategy,
            state: RwLock::new(DirectoryState {
                holidays: Arc::new(HolidaySet::new()),
                status: LoadStatus::Pending,
            }),
        }
    }

    pub fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    pub fn status(&self) -> LoadStatus {
        self.state.read().status
    }

    /// Current holiday set; empty until a load succeeds.
    pub fn snapshot(&self) -> Arc<HolidaySet> {
        Arc::clone(&self.state.read().holidays)
    }

    pub fn holidays_on(&self, date: NaiveDate) -> Vec<Holiday> {
        self.snapshot().on(date).to_vec()
    }

    /// Fetches every category of the strategy concurrently and publishes the
    /// merged result. Any failed category aborts the whole load.
    pub async fn load(
        &self,
        source: &dyn HolidaySource,
        country: &CountryCode,
        year: i32,
    ) -> Arc<HolidaySet> {
        let requests = self.strategy.categories().iter().map(|category| {
            let query = HolidayQuery {
                country: country.clone(),
                year,
                category: *category,
            };
            async move {
                debug!(country = %query.country, year, category = %query.category, "Fetching holidays");
                source.fetch(&query).await
            }
        });

        match try_join_all(requests).await {
            Ok(batches) => {
                let set = Arc::new(HolidaySet::from_holidays(batches.into_iter().flatten()));
                info!(country = %country, year, count = set.len(), "Holidays loaded");
                let mut state = self.state.write();
                state.holidays = Arc::clone(&set);
                state.status = LoadStatus::Loaded;
                set
            }
            Err(err) => {
                error!(country = %country, year, error = %err, "Error fetching holidays");
                let mut state = self.state.write();
                state.status = LoadStatus::Failed;
                Arc::clone(&state.holidays)
            }
        }
    }

    /// Runs [`HolidayDirectory::load`] in the background. The form stays
    /// usable meanwhile and sees an empty set until the load publishes.
    pub fn spawn_load(
        self: &Arc<Self>,
        source: Arc<dyn HolidaySource>,
        country: CountryCode,
        year: i32,
    ) -> tokio::task::JoinHandle<()> {
        let directory = Arc::clone(self);
        tokio::spawn(async move {
            directory.load(source.as_ref(), &country, year).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock_server::MockHolidaySource;
    use std::time::{Duration, Instant};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn poland() -> CountryCode {
        CountryCode::parse("PL").unwrap()
    }

    #[test]
    fn test_country_code_parsing() {
        assert_eq!(CountryCode::parse("pl").unwrap().as_str(), "PL");
        assert_eq!(CountryCode::parse(" CA ").unwrap().to_string(), "CA");
        assert!(CountryCode::parse("POL").is_err());
        assert!(CountryCode::parse("P1").is_err());
        assert!(CountryCode::parse("").is_err());
    }

    #[test]
    fn test_holiday_deserializes_from_wire_format() {
        let json = r#"[
            {"country": "Poland", "iso": "PL", "year": 2024, "date": "2024-12-25", "day": "Wednesday", "name": "Christmas Day", "type": "PUBLIC_HOLIDAY"},
            {"name": "Mother's Day", "date": "2024-05-26", "type": "OBSERVANCE"},
            {"name": "Some Season", "date": "2024-06-20T00:00:00", "type": "SEASON"}
        ]"#;

        let holidays: Vec<Holiday> = serde_json::from_str(json).unwrap();

        assert_eq!(holidays.len(), 3);
        assert_eq!(holidays[0].kind, HolidayKind::PublicHoliday);
        assert_eq!(holidays[0].date, date(2024, 12, 25));
        assert_eq!(holidays[1].kind, HolidayKind::Observance);
        assert_eq!(holidays[2].kind, HolidayKind::Other);
        assert_eq!(holidays[2].date, date(2024, 6, 20));
    }

    #[test]
    fn test_holiday_with_malformed_date_is_rejected() {
        let json = r#"{"name": "Broken", "date": "25/12/2024", "type": "PUBLIC_HOLIDAY"}"#;
        assert!(serde_json::from_str::<Holiday>(json).is_err());
    }

    #[test]
    fn test_holiday_set_lookup_by_date() {
        let set = HolidaySet::from_holidays(vec![
            Holiday::new("Christmas Day", date(2024, 12, 25), HolidayKind::PublicHoliday),
            Holiday::new("Christmas Eve", date(2024, 12, 24), HolidayKind::Observance),
            Holiday::new("Andrzejki", date(2024, 11, 29), HolidayKind::Observance),
        ]);

        assert_eq!(set.len(), 3);
        assert!(set.is_public_holiday(date(2024, 12, 25)));
        assert!(!set.is_public_holiday(date(2024, 12, 24)));
        assert_eq!(
            set.observance_on(date(2024, 11, 29)).map(|h| h.name.as_str()),
            Some("Andrzejki")
        );
        assert!(set.on(date(2024, 1, 2)).is_empty());
        assert_eq!(set.iter().count(), 3);
    }

    #[test]
    fn test_fetch_strategy_categories() {
        assert_eq!(
            FetchStrategy::for_observance_support(false).categories(),
            &[HolidayCategory::PublicHoliday]
        );
        assert_eq!(
            FetchStrategy::for_observance_support(true).categories(),
            &[HolidayCategory::PublicHoliday, HolidayCategory::Observance]
        );
    }

    #[tokio::test]
    async fn test_load_merges_both_categories() {
        let source = MockHolidaySource::new();
        source.set_response(
            HolidayCategory::PublicHoliday,
            vec![Holiday::new("Christmas Day", date(2024, 12, 25), HolidayKind::PublicHoliday)],
        );
        source.set_response(
            HolidayCategory::Observance,
            vec![Holiday::new("Christmas Eve", date(2024, 12, 24), HolidayKind::Observance)],
        );

        let directory = HolidayDirectory::new(FetchStrategy::PublicAndObservance);
        let set = directory.load(&source, &poland(), 2024).await;

        assert_eq!(set.len(), 2);
        assert_eq!(directory.status(), LoadStatus::Loaded);
        assert_eq!(directory.snapshot().len(), 2);
        assert_eq!(directory.holidays_on(date(2024, 12, 24)).len(), 1);
        assert_eq!(source.request_count(), 2);

        let queries = source.queries();
        assert!(queries.iter().all(|q| q.country.as_str() == "PL" && q.year == 2024));
    }

    #[tokio::test]
    async fn test_both_categories_are_fetched_concurrently() {
        let source = MockHolidaySource::new();
        source.set_delay_ms(100);
        source.set_response(
            HolidayCategory::PublicHoliday,
            vec![Holiday::new("Christmas Day", date(2024, 12, 25), HolidayKind::PublicHoliday)],
        );
        source.set_response(
            HolidayCategory::Observance,
            vec![Holiday::new("Christmas Eve", date(2024, 12, 24), HolidayKind::Observance)],
        );

        let directory = HolidayDirectory::new(FetchStrategy::PublicAndObservance);
        let started = Instant::now();
        let set = directory.load(&source, &poland(), 2024).await;
        let elapsed = started.elapsed();

        assert_eq!(set.len(), 2);
        assert_eq!(source.request_count(), 2);
        // Two sequential 100ms fetches would take at least 200ms.
        assert!(elapsed < Duration::from_millis(180), "load took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_public_only_strategy_issues_one_request() {
        let source = MockHolidaySource::new();
        source.set_response(
            HolidayCategory::PublicHoliday,
            vec![Holiday::new("Canada Day", date(2024, 7, 1), HolidayKind::PublicHoliday)],
        );

        let directory = HolidayDirectory::new(FetchStrategy::PublicOnly);
        let set = directory
            .load(&source, &CountryCode::parse("CA").unwrap(), 2024)
            .await;

        assert_eq!(set.len(), 1);
        assert_eq!(source.request_count(), 1);
        assert_eq!(source.queries()[0].category, HolidayCategory::PublicHoliday);
    }

    #[tokio::test]
    async fn test_one_failed_category_publishes_nothing() {
        let source = MockHolidaySource::new();
        source.set_response(
            HolidayCategory::PublicHoliday,
            vec![Holiday::new("Christmas Day", date(2024, 12, 25), HolidayKind::PublicHoliday)],
        );
        source.fail_category(HolidayCategory::Observance);

        let directory = HolidayDirectory::new(FetchStrategy::PublicAndObservance);
        let set = directory.load(&source, &poland(), 2024).await;

        assert!(set.is_empty());
        assert!(directory.snapshot().is_empty());
        assert_eq!(directory.status(), LoadStatus::Failed);
    }

    #[tokio::test]
    async fn test_spawned_load_publishes_in_background() {
        let source = Arc::new(MockHolidaySource::new());
        source.set_delay_ms(20);
        source.set_response(
            HolidayCategory::PublicHoliday,
            vec![Holiday::new("Christmas Day", date(2024, 12, 25), HolidayKind::PublicHoliday)],
        );

        let directory = Arc::new(HolidayDirectory::new(FetchStrategy::PublicOnly));
        let handle = directory.spawn_load(source.clone(), poland(), 2024);

        assert_eq!(directory.status(), LoadStatus::Pending);
        assert!(directory.snapshot().is_empty());

        handle.await.unwrap();
        assert_eq!(directory.status(), LoadStatus::Loaded);
        assert_eq!(directory.snapshot().len(), 1);
    }
}
