// Date availability for the booking calendar

use chrono::{Datelike, NaiveDate};

use crate::holiday::{Holiday, HolidayKind, HolidaySet};

/// Sunday under a Sunday-first week numbering.
const CLOSED_WEEKDAY_INDEX: u32 = 0;

/// True if the gym is closed on `date` by the weekday rule alone.
pub fn is_closed_weekday(date: NaiveDate) -> bool {
    date.weekday().num_days_from_sunday() == CLOSED_WEEKDAY_INDEX
}

/// Disable predicate over a plain list of holidays.
///
/// A date is disabled when it is a Sunday or when a public holiday falls on
/// it. Observances never disable a date.
pub fn is_disabled(date: NaiveDate, holidays: &[Holiday]) -> bool {
    is_closed_weekday(date)
        || holidays
            .iter()
            .any(|holiday| holiday.date == date && holiday.kind == HolidayKind::PublicHoliday)
}

/// How one calendar day renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub disabled: bool,
    pub observance: Option<String>,
}

/// Decides which calendar dates can be picked.
///
/// Both deployments share the same disable rule. The observance-aware one
/// additionally reports observance names so the form can skip time-slot
/// selection on those days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityEngine {
    supports_observance: bool,
}

impl AvailabilityEngine {
    pub fn new(supports_observance: bool) -> Self {
        Self {
            supports_observance,
        }
    }

    pub fn supports_observance(&self) -> bool {
        self.supports_observance
    }

    pub fn is_disabled(&self, date: NaiveDate, holidays: &HolidaySet) -> bool {
        is_closed_weekday(date) || holidays.is_public_holiday(date)
    }

    /// Name of the observance on `date`, if this engine tracks observances.
    pub fn observance_on<'a>(&self, date: NaiveDate, holidays: &'a HolidaySet) -> Option<&'a str> {
        if !self.supports_observance {
            return None;
        }
        holidays
            .observance_on(date)
            .map(|holiday| holiday.name.as_str())
    }

    pub fn day(&self, date: NaiveDate, holidays: &HolidaySet) -> DayAvailability {
        DayAvailability {
            date,
            disabled: self.is_disabled(date, holidays),
            observance: self.observance_on(date, holidays).map(str::to_string),
        }
    }

    /// Every day of the given month in order. Returns an empty list for an
    /// invalid month.
    pub fn month_view(&self, year: i32, month: u32, holidays: &HolidaySet) -> Vec<DayAvailability> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        first
            .iter_days()
            .take_while(|date| date.month() == month)
            .map(|date| self.day(date, holidays))
            .collect()
    }
}
