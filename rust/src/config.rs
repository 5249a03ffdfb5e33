//! Configuration types for the latest-date scheduler.

use chrono::NaiveDateTime;
use pyo3::prelude::*;
use std::str::FromStr;
use thiserror::Error;

use crate::calendar::{BusinessCalendar, WeekendPolicy};

/// Errors raised while interpreting a [`ScheduleConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown missing-duration policy: {0} (expected \"zero\" or \"error\")")]
    UnknownPolicy(String),
}

/// What to do with a leaf task that has no duration estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingDurationPolicy {
    /// Treat the leaf as zero work.
    #[default]
    Zero,
    /// Reject the snapshot.
    Error,
}

impl FromStr for MissingDurationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(Self::Zero),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Configuration for one scheduling run.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ScheduleConfig {
    /// Fixed project deadline every endpoint must meet.
    #[pyo3(get, set)]
    pub project_end: NaiveDateTime,
    /// Missing-duration policy: "zero" (the default, and what the task store
    /// itself assumes) or "error". Selectable per run so an import can be
    /// validated strictly; the choice covers the whole run, never single tasks.
    #[pyo3(get, set)]
    pub missing_duration: String,
    /// Whether results falling on a weekend step back to Friday
    #[pyo3(get, set)]
    pub skip_weekends: bool,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl ScheduleConfig {
    /// Default settings for the given project deadline.
    pub fn for_project_end(project_end: NaiveDateTime) -> Self {
        Self {
            project_end,
            missing_duration: "zero".to_string(),
            skip_weekends: true,
            verbosity: 0,
        }
    }

    pub fn missing_duration_policy(&self) -> Result<MissingDurationPolicy, ConfigError> {
        self.missing_duration.parse()
    }

    pub fn calendar(&self) -> BusinessCalendar {
        BusinessCalendar::new(WeekendPolicy::from_skip_flag(self.skip_weekends))
    }
}

#[pymethods]
impl ScheduleConfig {
    #[new]
    #[pyo3(signature = (project_end, missing_duration=None, skip_weekends=None, verbosity=None))]
    fn new(
        project_end: NaiveDateTime,
        missing_duration: Option<String>,
        skip_weekends: Option<bool>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::for_project_end(project_end);
        Self {
            project_end,
            missing_duration: missing_duration.unwrap_or(defaults.missing_duration),
            skip_weekends: skip_weekends.unwrap_or(defaults.skip_weekends),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleConfig(project_end={}, missing_duration={:?}, skip_weekends={})",
            self.project_end, self.missing_duration, self.skip_weekends
        )
    }
}
