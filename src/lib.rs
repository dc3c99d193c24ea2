// Workout session booking form: validation, holiday-aware availability and submission

pub mod availability;
pub mod client;
pub mod config;
pub mod form;
pub mod holiday;
pub mod selection;
pub mod telemetry;
pub mod validation;

// Re-export key types for convenience
pub use availability::{is_disabled, AvailabilityEngine, DayAvailability};
pub use client::{
    ApiError, BookingApiClient, ClientConfig, ClientError, ClientStats, HolidaySource,
    SubmissionReceipt, SubmissionSink,
};
pub use config::{ConfigError, FormConfig};
pub use form::{
    AgeBounds, Applicant, BookingForm, BookingSelection, SubmissionPayload, SubmissionStatus,
    SubmitError, Upload,
};
pub use holiday::{
    CountryCode, FetchStrategy, Holiday, HolidayCategory, HolidayDirectory, HolidayKind,
    HolidaySet, LoadStatus,
};
pub use selection::{PickerState, SelectionCommit, SelectionError, SlotPicker, TimeSlot};
pub use validation::{is_ready, is_valid_email};
