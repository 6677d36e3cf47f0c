//! Record models produced by the parser

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::error::DropReason;

/// Timestamp layout used by the export, e.g. `2023-01-01 23:30:00 +0000`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Unit recorded for sleep intervals
pub const SLEEP_UNIT: &str = "min";

/// Measurement kinds eligible for import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementKind {
    StepCount,
    ActiveEnergyBurned,
    BasalEnergyBurned,
    HeartRate,
    RestingHeartRate,
    WalkingHeartRateAverage,
    HeartRateVariabilitySdnn,
    OxygenSaturation,
    RespiratoryRate,
    BodyTemperature,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    SleepAnalysis,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 13] = [
        MeasurementKind::StepCount,
        MeasurementKind::ActiveEnergyBurned,
        MeasurementKind::BasalEnergyBurned,
        MeasurementKind::HeartRate,
        MeasurementKind::RestingHeartRate,
        MeasurementKind::WalkingHeartRateAverage,
        MeasurementKind::HeartRateVariabilitySdnn,
        MeasurementKind::OxygenSaturation,
        MeasurementKind::RespiratoryRate,
        MeasurementKind::BodyTemperature,
        MeasurementKind::BloodPressureSystolic,
        MeasurementKind::BloodPressureDiastolic,
        MeasurementKind::SleepAnalysis,
    ];

    /// Identifier as it appears in the export's `type` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::StepCount => "HKQuantityTypeIdentifierStepCount",
            MeasurementKind::ActiveEnergyBurned => "HKQuantityTypeIdentifierActiveEnergyBurned",
            MeasurementKind::BasalEnergyBurned => "HKQuantityTypeIdentifierBasalEnergyBurned",
            MeasurementKind::HeartRate => "HKQuantityTypeIdentifierHeartRate",
            MeasurementKind::RestingHeartRate => "HKQuantityTypeIdentifierRestingHeartRate",
            MeasurementKind::WalkingHeartRateAverage => {
                "HKQuantityTypeIdentifierWalkingHeartRateAverage"
            }
            MeasurementKind::HeartRateVariabilitySdnn => {
                "HKQuantityTypeIdentifierHeartRateVariabilitySDNN"
            }
            MeasurementKind::OxygenSaturation => "HKQuantityTypeIdentifierOxygenSaturation",
            MeasurementKind::RespiratoryRate => "HKQuantityTypeIdentifierRespiratoryRate",
            MeasurementKind::BodyTemperature => "HKQuantityTypeIdentifierBodyTemperature",
            MeasurementKind::BloodPressureSystolic => {
                "HKQuantityTypeIdentifierBloodPressureSystolic"
            }
            MeasurementKind::BloodPressureDiastolic => {
                "HKQuantityTypeIdentifierBloodPressureDiastolic"
            }
            MeasurementKind::SleepAnalysis => "HKCategoryTypeIdentifierSleepAnalysis",
        }
    }

    /// Look up an allow-listed kind; `None` for anything else
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == identifier)
    }

    pub fn is_sleep(&self) -> bool {
        matches!(self, MeasurementKind::SleepAnalysis)
    }
}

/// One row of the `health_data` table
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Measurement identifier, or the sleep stage label for sleep intervals
    pub record_type: String,
    pub unit: Option<String>,
    pub value: f64,
    pub start_date: DateTime<FixedOffset>,
}

impl NormalizedRecord {
    /// `start_date` in the stored text form, e.g. `2023-01-01T23:30:00+00:00`
    pub fn start_date_text(&self) -> String {
        self.start_date.to_rfc3339()
    }
}

/// Result of examining one candidate element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementOutcome {
    Accepted(NormalizedRecord),
    Dropped(DropReason),
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, DropReason> {
    DateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| DropReason::InvalidTimestamp(raw.to_string()))
}

/// Parse a measurement value; NaN and infinities are rejected
pub fn parse_value(raw: &str) -> Result<f64, DropReason> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DropReason::InvalidValue(raw.to_string()))
}

/// Interval length in minutes with seconds-level precision
pub fn duration_minutes(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}
