// Booking form controller: owns every field and drives submission

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::availability::AvailabilityEngine;
use crate::client::{SubmissionReceipt, SubmissionSink};
use crate::holiday::HolidayDirectory;
use crate::selection::{PickerState, SelectionCommit, SelectionError, SlotPicker, TimeSlot};
use crate::validation::{is_ready, is_valid_email, EMAIL_FORMAT_MESSAGE};

/// Age shown on the slider before the user moves it.
pub const DEFAULT_AGE: u32 = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("The form is missing required fields")]
    NotReady,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("{0} is no longer available for booking")]
    DateUnavailable(NaiveDate),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid age bounds: min {min}, max {max}, step {step}")]
pub struct InvalidAgeBounds {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

/// Range and granularity of the age slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBounds {
    min: u32,
    max: u32,
    step: u32,
}

impl AgeBounds {
    pub fn new(min: u32, max: u32, step: u32) -> Result<Self, InvalidAgeBounds> {
        if min > max || step == 0 {
            return Err(InvalidAgeBounds { min, max, step });
        }
        Ok(Self { min, max, step })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Clamps `value` into range and rounds it down onto the step grid
    /// starting at `min`, which is all a range input can produce.
    pub fn snap(&self, value: u32) -> u32 {
        let clamped = value.clamp(self.min, self.max);
        self.min + (clamped - self.min) / self.step * self.step
    }
}

impl Default for AgeBounds {
    fn default() -> Self {
        Self {
            min: 8,
            max: 100,
            step: 1,
        }
    }
}

/// Personal details typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applicant {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: u32,
}

/// The chosen photo. Only its name takes part in the booking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upload {
    file_name: Option<String>,
}

impl Upload {
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Keeps the first of the picked or dropped files. An empty pick leaves
    /// the current upload alone.
    pub fn choose<I, S>(&mut self, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(first) = files.into_iter().next() {
            self.file_name = Some(first.into());
        }
    }

    pub fn clear(&mut self) {
        self.file_name = None;
    }
}

/// Date and time the form books; both set together once a slot is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingSelection {
    pub date: Option<NaiveDate>,
    pub time: Option<TimeSlot>,
}

/// Fields sent to the submission endpoint, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: String,
    pub file: String,
    pub date_time: String,
    pub time: String,
}

impl SubmissionPayload {
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
            ("email", self.email.as_str()),
            ("age", self.age.as_str()),
            ("file", self.file.as_str()),
            ("dateTime", self.date_time.as_str()),
            ("time", self.time.as_str()),
        ]
    }
}

/// Outcome of the last submission that reached the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Sent(SubmissionReceipt),
    TransportFailed { reason: String },
}

/// Owns the applicant, upload and booking selection of one form session.
///
/// Readiness is never stored; [`BookingForm::is_ready`] recomputes it from
/// the current fields on every call.
pub struct BookingForm {
    applicant: Applicant,
    upload: Upload,
    picker: SlotPicker,
    selection: BookingSelection,
    age_bounds: AgeBounds,
    engine: AvailabilityEngine,
    holidays: Arc<HolidayDirectory>,
    email_error: Option<String>,
    last_status: Option<SubmissionStatus>,
}

impl BookingForm {
    pub fn new(
        engine: AvailabilityEngine,
        holidays: Arc<HolidayDirectory>,
        age_bounds: AgeBounds,
    ) -> Self {
        Self {
            applicant: Applicant {
                age: age_bounds.snap(DEFAULT_AGE),
                ..Applicant::default()
            },
            upload: Upload::default(),
            picker: SlotPicker::new(),
            selection: BookingSelection::default(),
            age_bounds,
            engine,
            holidays,
            email_error: None,
            last_status: None,
        }
    }

    pub fn applicant(&self) -> &Applicant {
        &self.applicant
    }

    pub fn upload(&self) -> &Upload {
        &self.upload
    }

    pub fn picker(&self) -> &SlotPicker {
        &self.picker
    }

    pub fn selection(&self) -> BookingSelection {
        self.selection
    }

    pub fn engine(&self) -> &AvailabilityEngine {
        &self.engine
    }

    pub fn holidays(&self) -> &Arc<HolidayDirectory> {
        &self.holidays
    }

    pub fn age_bounds(&self) -> AgeBounds {
        self.age_bounds
    }

    pub fn email_error(&self) -> Option<&str> {
        self.email_error.as_deref()
    }

    pub fn last_status(&self) -> Option<&SubmissionStatus> {
        self.last_status.as_ref()
    }

    pub fn set_first_name(&mut self, value: impl Into<String>) {
        self.applicant.first_name = value.into();
    }

    pub fn set_last_name(&mut self, value: impl Into<String>) {
        self.applicant.last_name = value.into();
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.applicant.email = value.into();
    }

    /// Stores the age snapped onto the slider range and returns it.
    pub fn set_age(&mut self, value: u32) -> u32 {
        self.applicant.age = self.age_bounds.snap(value);
        self.applicant.age
    }

    pub fn choose_files<I, S>(&mut self, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.upload.choose(files);
    }

    pub fn clear_file(&mut self) {
        self.upload.clear();
    }

    pub fn is_ready(&self) -> bool {
        is_ready(
            &self.applicant,
            self.upload.file_name(),
            self.selection.date,
            self.selection.time,
        )
    }

    /// Picks a calendar date. The booked pair is dropped until a time is
    /// chosen for the new date.
    pub fn pick_date(&mut self, date: NaiveDate) -> Result<&PickerState, SelectionError> {
        let holidays = self.holidays.snapshot();
        self.picker.pick_date(date, &self.engine, &holidays)?;
        self.selection = BookingSelection::default();
        Ok(self.picker.state())
    }

    /// Chooses a time for the picked date and books the pair.
    pub fn pick_time(&mut self, time: TimeSlot) -> Result<SelectionCommit, SelectionError> {
        let commit = self.picker.pick_time(time)?;
        self.selection = BookingSelection {
            date: Some(commit.date),
            time: Some(commit.time),
        };
        debug!(date = %commit.date, time = %commit.time, "Selection committed");
        Ok(commit)
    }

    pub fn payload(&self) -> SubmissionPayload {
        SubmissionPayload {
            first_name: self.applicant.first_name.clone(),
            last_name: self.applicant.last_name.clone(),
            email: self.applicant.email.clone(),
            age: self.applicant.age.to_string(),
            file: self.upload.file_name().unwrap_or_default().to_string(),
            date_time: self
                .selection
                .date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            time: self
                .selection
                .time
                .map(|time| time.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validates the form and sends it once.
    ///
    /// Validation failures come back as `Err` and nothing is sent. A
    /// transport failure is logged and reported through the returned status;
    /// it is not retried.
    pub async fn submit(
        &mut self,
        sink: &dyn SubmissionSink,
    ) -> Result<SubmissionStatus, SubmitError> {
        if !self.is_ready() {
            return Err(SubmitError::NotReady);
        }

        if !is_valid_email(&self.applicant.email) {
            self.email_error = Some(EMAIL_FORMAT_MESSAGE.to_string());
            warn!("Submission blocked by malformed email");
            return Err(SubmitError::InvalidEmail(self.applicant.email.clone()));
        }
        self.email_error = None;

        // Holidays may have arrived after the date was picked.
        if let Some(date) = self.selection.date {
            if self.engine.is_disabled(date, &self.holidays.snapshot()) {
                warn!(%date, "Submission blocked by unavailable date");
                return Err(SubmitError::DateUnavailable(date));
            }
        }

        let payload = self.payload();
        let status = match sink.submit(&payload).await {
            Ok(receipt) => {
                info!(status_code = receipt.status_code, "Form submitted successfully");
                SubmissionStatus::Sent(receipt)
            }
            Err(err) => {
                error!(error = %err, "Error submitting form");
                SubmissionStatus::TransportFailed {
                    reason: err.to_string(),
                }
            }
        };
        self.last_status = Some(status.clone());
        Ok(status)
    }
}
