// Deployment configuration loaded from `.env` and the process environment

use std::env;
use std::sync::Arc;
use thiserror::Error;

use crate::availability::AvailabilityEngine;
use crate::client::{ClientConfig, DEFAULT_SUBMISSION_URL};
use crate::form::{AgeBounds, BookingForm, InvalidAgeBounds};
use crate::holiday::{CountryCode, FetchStrategy, HolidayDirectory, InvalidCountryCode};

const DEFAULT_COUNTRY: &str = "PL";
const DEFAULT_YEAR: i32 = 2024;
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Countries whose deployment shows observances by default.
const OBSERVANCE_COUNTRIES: &[&str] = &["PL"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    InvalidNumber {
        name: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{name} must be true or false, got '{value}'")]
    InvalidFlag { name: &'static str, value: String },

    #[error(transparent)]
    Country(#[from] InvalidCountryCode),

    #[error(transparent)]
    AgeBounds(#[from] InvalidAgeBounds),
}

/// Everything one form session needs to know about its deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    pub country: CountryCode,
    pub year: i32,
    pub supports_observance: bool,
    pub client: ClientConfig,
    pub age: AgeBounds,
    pub log_level: String,
}

impl FormConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let country = CountryCode::parse(
            &lookup("BOOKING_COUNTRY").unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        )?;
        let year = parse_number(&lookup, "BOOKING_YEAR", "year", DEFAULT_YEAR)?;

        let supports_observance = match lookup("BOOKING_OBSERVANCE") {
            Some(value) => parse_flag("BOOKING_OBSERVANCE", &value)?,
            None => OBSERVANCE_COUNTRIES
                .iter()
                .any(|code| *code == country.as_str()),
        };

        let defaults = AgeBounds::default();
        let age = AgeBounds::new(
            parse_number(&lookup, "AGE_MIN", "u32", defaults.min())?,
            parse_number(&lookup, "AGE_MAX", "u32", defaults.max())?,
            parse_number(&lookup, "AGE_STEP", "u32", defaults.step())?,
        )?;

        let client = ClientConfig {
            holiday_endpoint: lookup("HOLIDAY_API_URL").unwrap_or_default(),
            api_key: lookup("HOLIDAY_API_KEY").unwrap_or_default(),
            submission_endpoint: lookup("SUBMISSION_URL")
                .unwrap_or_else(|| DEFAULT_SUBMISSION_URL.to_string()),
            submission_timeout_ms: parse_number(&lookup, "SUBMISSION_TIMEOUT_MS", "u64", DEFAULT_TIMEOUT_MS)?,
        };

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            country,
            year,
            supports_observance,
            client,
            age,
            log_level,
        })
    }

    pub fn engine(&self) -> AvailabilityEngine {
        AvailabilityEngine::new(self.supports_observance)
    }

    pub fn fetch_strategy(&self) -> FetchStrategy {
        FetchStrategy::for_observance_support(self.supports_observance)
    }

    pub fn new_directory(&self) -> Arc<HolidayDirectory> {
        Arc::new(HolidayDirectory::new(self.fetch_strategy()))
    }

    pub fn new_form(&self, directory: Arc<HolidayDirectory>) -> BookingForm {
        BookingForm::new(self.engine(), directory, self.age)
    }
}

fn parse_number<F, T>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            name,
            expected,
            value,
        }),
        None => Ok(default),
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}
