use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Aggregate status of a health record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Safe,
    Danger,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Safe => "SAFE",
            HealthStatus::Danger => "DANGER",
            HealthStatus::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAFE" => Ok(HealthStatus::Safe),
            "DANGER" => Ok(HealthStatus::Danger),
            "CRITICAL" => Ok(HealthStatus::Critical),
            other => Err(format!("Unknown health status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BmiStatus {
    Light,
    Normal,
    Fat,
}

/// Status of cholesterol, glucose and heart rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LevelStatus {
    Normal,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BloodPressureStatus {
    Low,
    Normal,
    High,
}

/// BMI status and the index it was computed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct BmiClassification {
    pub status: BmiStatus,
    pub value: f64,
}

/// Single-valued metric status and its value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct LevelClassification {
    pub status: LevelStatus,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct BloodPressureClassification {
    pub status: BloodPressureStatus,
    pub systolic: f64,
    pub diastolic: f64,
}

impl BmiClassification {
    pub fn is_abnormal(&self) -> bool {
        self.status != BmiStatus::Normal
    }
}

impl LevelClassification {
    pub fn is_abnormal(&self) -> bool {
        self.status == LevelStatus::Critical
    }
}

impl BloodPressureClassification {
    pub fn is_abnormal(&self) -> bool {
        self.status != BloodPressureStatus::Normal
    }
}

/// The five tracked vital signs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Bmi,
    BloodPressure,
    Cholesterol,
    Glucose,
    HeartRate,
}

impl Metric {
    /// Human-readable name used in notification messages
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Bmi => "BMI",
            Metric::BloodPressure => "blood pressure",
            Metric::Cholesterol => "cholesterol",
            Metric::Glucose => "glucose",
            Metric::HeartRate => "heart rate",
        }
    }

    /// Path segment naming this metric
    pub fn slug(&self) -> &'static str {
        match self {
            Metric::Bmi => "bmi",
            Metric::BloodPressure => "blood-pressure",
            Metric::Cholesterol => "cholesterol",
            Metric::Glucose => "glucose",
            Metric::HeartRate => "heartbeat",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bmi" => Ok(Metric::Bmi),
            "blood-pressure" | "blood_pressure" => Ok(Metric::BloodPressure),
            "cholesterol" => Ok(Metric::Cholesterol),
            "glucose" => Ok(Metric::Glucose),
            "heartbeat" | "heart-rate" | "heart_rate" => Ok(Metric::HeartRate),
            other => Err(format!("Unknown metric: {}", other)),
        }
    }
}

/// One day's vital signs as submitted by a patient
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct VitalSigns {
    /// Height in centimetres
    #[validate(range(max = 300.0, message = "Height must not exceed 300 cm"))]
    pub height: f64,

    /// Weight in kilograms
    #[validate(range(max = 500.0, message = "Weight must not exceed 500 kg"))]
    pub weight: f64,

    /// Total cholesterol in mg/dL
    #[validate(range(max = 1000.0, message = "Cholesterol must not exceed 1000 mg/dL"))]
    pub cholesterol: f64,

    /// Blood glucose in mg/dL
    #[validate(range(max = 1000.0, message = "Glucose must not exceed 1000 mg/dL"))]
    pub glucose: f64,

    /// Beats per minute
    #[validate(range(max = 300.0, message = "Heart rate must not exceed 300 bpm"))]
    pub heart_rate: f64,

    #[validate(range(max = 300.0, message = "Systolic must not exceed 300 mmHg"))]
    pub systolic: f64,

    #[validate(range(max = 250.0, message = "Diastolic must not exceed 250 mmHg"))]
    pub diastolic: f64,
}

impl VitalSigns {
    /// Names of the fields that are zero, negative or not finite
    pub fn non_positive_fields(&self) -> Vec<&'static str> {
        [
            ("height", self.height),
            ("weight", self.weight),
            ("cholesterol", self.cholesterol),
            ("glucose", self.glucose),
            ("heart_rate", self.heart_rate),
            ("systolic", self.systolic),
            ("diastolic", self.diastolic),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_finite() || *value <= 0.0)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Corrected values for one stored reading; omitted fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct UpdateReadingRequest {
    #[validate(range(max = 300.0, message = "Height must not exceed 300 cm"))]
    pub height: Option<f64>,

    #[validate(range(max = 500.0, message = "Weight must not exceed 500 kg"))]
    pub weight: Option<f64>,

    /// Cholesterol, glucose or heart rate value
    #[validate(range(max = 1000.0, message = "Value must not exceed 1000"))]
    pub value: Option<f64>,

    #[validate(range(max = 300.0, message = "Systolic must not exceed 300 mmHg"))]
    pub systolic: Option<f64>,

    #[validate(range(max = 250.0, message = "Diastolic must not exceed 250 mmHg"))]
    pub diastolic: Option<f64>,
}

impl UpdateReadingRequest {
    fn fields(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("height", self.height),
            ("weight", self.weight),
            ("value", self.value),
            ("systolic", self.systolic),
            ("diastolic", self.diastolic),
        ]
    }

    /// Names of the set fields that a reading of `metric` does not carry
    pub fn foreign_fields(&self, metric: Metric) -> Vec<&'static str> {
        let own: &[&str] = match metric {
            Metric::Bmi => &["height", "weight"],
            Metric::BloodPressure => &["systolic", "diastolic"],
            Metric::Cholesterol | Metric::Glucose | Metric::HeartRate => &["value"],
        };
        self.fields()
            .into_iter()
            .filter(|(name, value)| value.is_some() && !own.contains(name))
            .map(|(name, _)| name)
            .collect()
    }

    /// Names of the set fields that are zero, negative or not finite
    pub fn non_positive_fields(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.is_some_and(|v| !v.is_finite() || v <= 0.0))
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, value)| value.is_none())
    }
}

/// A patient's health record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HealthRecord {
    pub id: String,
    pub patient_id: String,
    pub status: HealthStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored reading of any metric. Only the value fields of `metric` are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct MetricReading {
    pub id: String,
    pub health_record_id: String,
    pub metric: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_bmi: Option<f64>,
    /// Cholesterol, glucose or heart rate value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The readings of one day; metrics not yet recorded are null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DailyReadings {
    pub health_record_id: String,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub index_bmi: Option<f64>,
    pub cholesterol: Option<f64>,
    pub glucose: Option<f64>,
    pub heart_rate: Option<f64>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
}

/// One day of history, keyed by that day's blood pressure reading
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DailyHistoryEntry {
    /// ID of the blood pressure reading
    pub id: String,
    pub health_record_id: String,
    pub created_at: DateTime<Utc>,
    pub systolic: f64,
    pub diastolic: f64,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub index_bmi: Option<f64>,
    pub heart_rate: Option<f64>,
    pub glucose: Option<f64>,
    pub cholesterol: Option<f64>,
}

/// Result of aggregating one day's classifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Assessment {
    pub status: HealthStatus,
    /// Abnormal metrics, in reporting order
    pub abnormal: Vec<Metric>,
}

/// Outcome of a daily vitals submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct DailySummary {
    pub health_record_id: String,
    pub recorded_at: DateTime<Utc>,
    pub height: f64,
    pub weight: f64,
    pub index_bmi: f64,
    pub bmi: BmiClassification,
    pub blood_pressure: BloodPressureClassification,
    pub cholesterol: LevelClassification,
    pub glucose: LevelClassification,
    pub heart_rate: LevelClassification,
    pub status: HealthStatus,
    pub abnormal: Vec<Metric>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals() -> VitalSigns {
        VitalSigns {
            height: 170.0,
            weight: 65.0,
            cholesterol: 180.0,
            glucose: 90.0,
            heart_rate: 72.0,
            systolic: 120.0,
            diastolic: 80.0,
        }
    }

    #[test]
    fn test_vital_signs_bounds() {
        assert!(vitals().validate().is_ok());
        assert!(vitals().non_positive_fields().is_empty());

        let too_tall = VitalSigns { height: 350.0, ..vitals() };
        assert!(too_tall.validate().is_err());

        let broken = VitalSigns {
            weight: 0.0,
            glucose: -4.0,
            heart_rate: f64::NAN,
            ..vitals()
        };
        assert_eq!(broken.non_positive_fields(), vec!["weight", "glucose", "heart_rate"]);
    }

    #[test]
    fn test_update_request_fields_per_metric() {
        let request = UpdateReadingRequest {
            weight: Some(70.0),
            value: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(request.foreign_fields(Metric::Bmi), vec!["value"]);
        assert_eq!(request.foreign_fields(Metric::Glucose), vec!["weight"]);
        assert_eq!(request.non_positive_fields(), vec!["value"]);
        assert!(!request.is_empty());
        assert!(UpdateReadingRequest::default().is_empty());

        let too_heavy = UpdateReadingRequest {
            weight: Some(600.0),
            ..Default::default()
        };
        assert!(too_heavy.validate().is_err());
    }

    #[test]
    fn test_metric_slugs_parse_back() {
        for metric in [
            Metric::Bmi,
            Metric::BloodPressure,
            Metric::Cholesterol,
            Metric::Glucose,
            Metric::HeartRate,
        ] {
            assert_eq!(metric.slug().parse::<Metric>().unwrap(), metric);
        }
        assert!("weight".parse::<Metric>().is_err());
    }

    #[test]
    fn test_classification_abnormality() {
        assert!(BmiClassification { status: BmiStatus::Fat, value: 31.0 }.is_abnormal());
        assert!(!LevelClassification { status: LevelStatus::Normal, value: 90.0 }.is_abnormal());
        assert!(BloodPressureClassification {
            status: BloodPressureStatus::Low,
            systolic: 85.0,
            diastolic: 55.0
        }
        .is_abnormal());
    }
}
