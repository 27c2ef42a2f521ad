use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for a patient's health record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: String,
    pub patient_id: String,
    /// Aggregate status (SAFE, DANGER or CRITICAL)
    pub status: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vital sign tables, one row per metric per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    Bmi,
    Cholesterol,
    Glucose,
    Heartbeat,
    BloodPressure,
}

impl MetricKind {
    /// Every metric, in table order
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Bmi,
        MetricKind::Cholesterol,
        MetricKind::Glucose,
        MetricKind::Heartbeat,
        MetricKind::BloodPressure,
    ];

    /// Table holding this metric
    pub fn table(&self) -> &'static str {
        match self {
            MetricKind::Bmi => "bmi_readings",
            MetricKind::Cholesterol => "cholesterol_readings",
            MetricKind::Glucose => "glucose_readings",
            MetricKind::Heartbeat => "heartbeat_readings",
            MetricKind::BloodPressure => "blood_pressure_readings",
        }
    }

    /// Value columns of this metric's table, comma separated
    pub fn value_columns(&self) -> &'static str {
        match self {
            MetricKind::Bmi => "height, weight, index_bmi",
            MetricKind::Cholesterol => "cholesterol",
            MetricKind::Glucose => "glucose",
            MetricKind::Heartbeat => "heart_rate",
            MetricKind::BloodPressure => "systolic, diastolic",
        }
    }
}

/// Columns every reading table shares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingMeta {
    pub id: String,
    pub health_record_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Storage model for a BMI reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmiReading {
    pub meta: ReadingMeta,
    /// Height in centimetres
    pub height: f64,
    /// Weight in kilograms
    pub weight: f64,
    /// weight / (height in metres)^2, rounded to two decimals
    pub index_bmi: f64,
}

/// Storage model for a single-valued reading (cholesterol, glucose, heart rate)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelReading {
    pub meta: ReadingMeta,
    pub value: f64,
}

/// Storage model for a blood pressure reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodPressureReading {
    pub meta: ReadingMeta,
    pub systolic: f64,
    pub diastolic: f64,
}

/// A reading from any metric table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MetricReading {
    Bmi(BmiReading),
    Cholesterol(LevelReading),
    Glucose(LevelReading),
    Heartbeat(LevelReading),
    BloodPressure(BloodPressureReading),
}

impl MetricReading {
    pub fn meta(&self) -> &ReadingMeta {
        match self {
            MetricReading::Bmi(r) => &r.meta,
            MetricReading::Cholesterol(r) | MetricReading::Glucose(r) | MetricReading::Heartbeat(r) => &r.meta,
            MetricReading::BloodPressure(r) => &r.meta,
        }
    }
}

/// The readings of one health record for one day. Any metric may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyReadings {
    pub bmi: Option<BmiReading>,
    pub cholesterol: Option<LevelReading>,
    pub glucose: Option<LevelReading>,
    pub heartbeat: Option<LevelReading>,
    pub blood_pressure: Option<BloodPressureReading>,
}

/// A full day's submission, written in one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReadingsRequest {
    pub health_record_id: String,
    pub height: f64,
    pub weight: f64,
    pub index_bmi: f64,
    pub cholesterol: f64,
    pub glucose: f64,
    pub heart_rate: f64,
    pub systolic: f64,
    pub diastolic: f64,
    /// User performing the write
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
    /// Inclusive bounds of the day the submission belongs to
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
}
