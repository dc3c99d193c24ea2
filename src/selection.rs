// Date and time-slot selection for a workout booking

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::availability::AvailabilityEngine;
use crate::holiday::HolidaySet;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{0} is not available for booking")]
    DateUnavailable(NaiveDate),

    #[error("Pick a date before choosing a time")]
    NoDateSelected,

    #[error("No time slots are offered on {date} ({observance})")]
    ObservanceDay { date: NaiveDate, observance: String },

    #[error("Unknown time slot: {0}")]
    UnknownTimeSlot(String),
}

/// The fixed set of workout start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeSlot {
    T1200,
    T1400,
    T1630,
    T1830,
    T2000,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 5] = [
        TimeSlot::T1200,
        TimeSlot::T1400,
        TimeSlot::T1630,
        TimeSlot::T1830,
        TimeSlot::T2000,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::T1200 => "12:00",
            TimeSlot::T1400 => "14:00",
            TimeSlot::T1630 => "16:30",
            TimeSlot::T1830 => "18:30",
            TimeSlot::T2000 => "20:00",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| SelectionError::UnknownTimeSlot(s.to_string()))
    }
}

/// Where the picker stands in the date-then-time flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PickerState {
    #[default]
    NoDateSelected,
    DateSelected {
        date: NaiveDate,
    },
    /// An observance falls on the date; no time slots are offered.
    ObservanceDay {
        date: NaiveDate,
        observance: String,
    },
    TimeChosen {
        date: NaiveDate,
        time: TimeSlot,
    },
}

/// Date and time handed to the form once a slot is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCommit {
    pub date: NaiveDate,
    pub time: TimeSlot,
}

/// Calendar-side state machine: a date must be picked before a time, and
/// picking a new date always drops the time.
#[derive(Debug, Clone, Default)]
pub struct SlotPicker {
    state: PickerState,
}

impl SlotPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PickerState {
        &self.state
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match &self.state {
            PickerState::NoDateSelected => None,
            PickerState::DateSelected { date }
            | PickerState::ObservanceDay { date, .. }
            | PickerState::TimeChosen { date, .. } => Some(*date),
        }
    }

    pub fn time(&self) -> Option<TimeSlot> {
        match &self.state {
            PickerState::TimeChosen { time, .. } => Some(*time),
            _ => None,
        }
    }

    pub fn observance(&self) -> Option<&str> {
        match &self.state {
            PickerState::ObservanceDay { observance, .. } => Some(observance),
            _ => None,
        }
    }

    /// Time slots to display; none until a date is picked, and none on an
    /// observance day.
    pub fn offered_slots(&self) -> &'static [TimeSlot] {
        match self.state {
            PickerState::DateSelected { .. } | PickerState::TimeChosen { .. } => &TimeSlot::ALL,
            PickerState::NoDateSelected | PickerState::ObservanceDay { .. } => &[],
        }
    }

    pub fn pick_date(
        &mut self,
        date: NaiveDate,
        engine: &AvailabilityEngine,
        holidays: &HolidaySet,
    ) -> Result<&PickerState, SelectionError> {
        if engine.is_disabled(date, holidays) {
            return Err(SelectionError::DateUnavailable(date));
        }

        self.state = match engine.observance_on(date, holidays) {
            Some(name) => PickerState::ObservanceDay {
                date,
                observance: name.to_string(),
            },
            None => PickerState::DateSelected { date },
        };
        debug!(%date, state = ?self.state, "Date picked");
        Ok(&self.state)
    }

    pub fn pick_time(&mut self, time: TimeSlot) -> Result<SelectionCommit, SelectionError> {
        let date = match &self.state {
            PickerState::DateSelected { date } | PickerState::TimeChosen { date, .. } => *date,
            PickerState::NoDateSelected => return Err(SelectionError::NoDateSelected),
            PickerState::ObservanceDay { date, observance } => {
                return Err(SelectionError::ObservanceDay {
                    date: *date,
                    observance: observance.clone(),
                })
            }
        };

        self.state = PickerState::TimeChosen { date, time };
        Ok(SelectionCommit { date, time })
    }
}
