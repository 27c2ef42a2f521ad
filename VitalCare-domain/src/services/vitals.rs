use std::env;
use tracing::warn;

use crate::entities::health_record::{
    Assessment, BloodPressureClassification, BloodPressureStatus, BmiClassification, BmiStatus, HealthStatus,
    LevelClassification, LevelStatus, Metric,
};

/// Thresholds used by the vital sign classifiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VitalThresholds {
    /// BMI below this is LIGHT
    pub bmi_light_below: f64,
    /// BMI at or above this is FAT
    pub bmi_fat_from: f64,
    pub cholesterol_critical_from: f64,
    pub glucose_low_below: f64,
    pub glucose_high_from: f64,
    /// Lowest normal heart rate, inclusive
    pub heart_rate_min: f64,
    /// Highest normal heart rate, inclusive
    pub heart_rate_max: f64,
    pub systolic_high_from: f64,
    pub diastolic_high_from: f64,
    pub systolic_low_below: f64,
    pub diastolic_low_below: f64,
}

impl Default for VitalThresholds {
    fn default() -> Self {
        Self {
            bmi_light_below: 18.5,
            bmi_fat_from: 25.0,
            cholesterol_critical_from: 240.0,
            glucose_low_below: 70.0,
            glucose_high_from: 126.0,
            heart_rate_min: 60.0,
            heart_rate_max: 100.0,
            systolic_high_from: 140.0,
            diastolic_high_from: 90.0,
            systolic_low_below: 90.0,
            diastolic_low_below: 60.0,
        }
    }
}

fn threshold(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: f64) -> f64 {
    match lookup(name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                warn!("Ignoring invalid {}={:?}, using {}", name, raw, default);
                default
            }
        },
        None => default,
    }
}

impl VitalThresholds {
    /// Load thresholds from `VITALS_*` environment variables, falling back to the defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load thresholds from any name-to-value source; unset or invalid values keep the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            bmi_light_below: threshold(&lookup, "VITALS_BMI_LIGHT_BELOW", d.bmi_light_below),
            bmi_fat_from: threshold(&lookup, "VITALS_BMI_FAT_FROM", d.bmi_fat_from),
            cholesterol_critical_from: threshold(&lookup, "VITALS_CHOLESTEROL_CRITICAL_FROM", d.cholesterol_critical_from),
            glucose_low_below: threshold(&lookup, "VITALS_GLUCOSE_LOW_BELOW", d.glucose_low_below),
            glucose_high_from: threshold(&lookup, "VITALS_GLUCOSE_HIGH_FROM", d.glucose_high_from),
            heart_rate_min: threshold(&lookup, "VITALS_HEART_RATE_MIN", d.heart_rate_min),
            heart_rate_max: threshold(&lookup, "VITALS_HEART_RATE_MAX", d.heart_rate_max),
            systolic_high_from: threshold(&lookup, "VITALS_SYSTOLIC_HIGH_FROM", d.systolic_high_from),
            diastolic_high_from: threshold(&lookup, "VITALS_DIASTOLIC_HIGH_FROM", d.diastolic_high_from),
            systolic_low_below: threshold(&lookup, "VITALS_SYSTOLIC_LOW_BELOW", d.systolic_low_below),
            diastolic_low_below: threshold(&lookup, "VITALS_DIASTOLIC_LOW_BELOW", d.diastolic_low_below),
        }
    }

    /// Classify a stored BMI index
    pub fn classify_bmi_index(&self, index_bmi: f64) -> BmiClassification {
        let status = if index_bmi < self.bmi_light_below {
            BmiStatus::Light
        } else if index_bmi < self.bmi_fat_from {
            BmiStatus::Normal
        } else {
            BmiStatus::Fat
        };
        BmiClassification { status, value: index_bmi }
    }

    /// Classify height (cm) and weight (kg) on the unrounded index. The reported value is rounded.
    pub fn classify_bmi(&self, height_cm: f64, weight_kg: f64) -> BmiClassification {
        let status = self.classify_bmi_index(raw_bmi(height_cm, weight_kg)).status;
        BmiClassification {
            status,
            value: bmi_index(height_cm, weight_kg),
        }
    }

    pub fn classify_cholesterol(&self, cholesterol: f64) -> LevelClassification {
        level(cholesterol, cholesterol >= self.cholesterol_critical_from)
    }

    pub fn classify_glucose(&self, glucose: f64) -> LevelClassification {
        level(glucose, glucose < self.glucose_low_below || glucose >= self.glucose_high_from)
    }

    pub fn classify_heart_rate(&self, heart_rate: f64) -> LevelClassification {
        level(heart_rate, heart_rate < self.heart_rate_min || heart_rate > self.heart_rate_max)
    }

    /// HIGH wins over LOW when both apply
    pub fn classify_blood_pressure(&self, systolic: f64, diastolic: f64) -> BloodPressureClassification {
        let status = if systolic >= self.systolic_high_from || diastolic >= self.diastolic_high_from {
            BloodPressureStatus::High
        } else if systolic < self.systolic_low_below || diastolic < self.diastolic_low_below {
            BloodPressureStatus::Low
        } else {
            BloodPressureStatus::Normal
        };
        BloodPressureClassification { status, systolic, diastolic }
    }
}

fn level(value: f64, critical: bool) -> LevelClassification {
    let status = if critical { LevelStatus::Critical } else { LevelStatus::Normal };
    LevelClassification { status, value }
}

/// weight / (height in metres)^2
pub fn raw_bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let metres = height_cm / 100.0;
    weight_kg / (metres * metres)
}

/// BMI rounded to two decimals, as stored and displayed
pub fn bmi_index(height_cm: f64, weight_kg: f64) -> f64 {
    (raw_bmi(height_cm, weight_kg) * 100.0).round() / 100.0
}

/// Map the number of abnormal metrics to the aggregate status
pub fn status_for_abnormal_count(abnormal: usize) -> HealthStatus {
    match abnormal {
        0 | 1 => HealthStatus::Safe,
        2 | 3 => HealthStatus::Danger,
        _ => HealthStatus::Critical,
    }
}

/// Aggregate the five classifications of a day
pub fn assess(
    bmi: &BmiClassification,
    blood_pressure: &BloodPressureClassification,
    cholesterol: &LevelClassification,
    glucose: &LevelClassification,
    heart_rate: &LevelClassification,
) -> Assessment {
    let abnormal: Vec<Metric> = [
        (Metric::Bmi, bmi.is_abnormal()),
        (Metric::BloodPressure, blood_pressure.is_abnormal()),
        (Metric::Cholesterol, cholesterol.is_abnormal()),
        (Metric::Glucose, glucose.is_abnormal()),
        (Metric::HeartRate, heart_rate.is_abnormal()),
    ]
    .into_iter()
    .filter(|(_, abnormal)| *abnormal)
    .map(|(metric, _)| metric)
    .collect();

    Assessment {
        status: status_for_abnormal_count(abnormal.len()),
        abnormal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> VitalThresholds {
        VitalThresholds::default()
    }

    #[test]
    fn test_bmi_index_rounding() {
        assert_eq!(bmi_index(170.0, 51.0), 17.65);
        assert_eq!(bmi_index(180.0, 81.0), 25.0);
    }

    #[test]
    fn test_classify_bmi() {
        let light = t().classify_bmi(170.0, 51.0);
        assert_eq!(light.status, BmiStatus::Light);
        assert_eq!(light.value, 17.65);
        assert!(light.is_abnormal());

        assert_eq!(t().classify_bmi_index(18.5).status, BmiStatus::Normal);
        assert_eq!(t().classify_bmi_index(24.99).status, BmiStatus::Normal);
        assert_eq!(t().classify_bmi_index(25.0).status, BmiStatus::Fat);
    }

    #[test]
    fn test_classify_bmi_uses_unrounded_index() {
        // 18.4969 rounds to 18.5 but is still below the LIGHT bound
        let light = t().classify_bmi(170.0, 53.456);
        assert_eq!(light.status, BmiStatus::Light);
        assert_eq!(light.value, 18.5);

        // 24.9962 rounds to 25.0 but is still NORMAL
        let normal = t().classify_bmi(170.0, 72.239);
        assert_eq!(normal.status, BmiStatus::Normal);
        assert_eq!(normal.value, 25.0);
    }

    #[test]
    fn test_classify_bmi_is_deterministic() {
        let first = t().classify_bmi(165.0, 70.0);
        for _ in 0..10 {
            assert_eq!(t().classify_bmi(165.0, 70.0), first);
        }
    }

    #[test]
    fn test_classify_levels() {
        assert_eq!(t().classify_cholesterol(239.9).status, LevelStatus::Normal);
        assert_eq!(t().classify_cholesterol(240.0).status, LevelStatus::Critical);

        assert_eq!(t().classify_glucose(69.9).status, LevelStatus::Critical);
        assert_eq!(t().classify_glucose(70.0).status, LevelStatus::Normal);
        assert_eq!(t().classify_glucose(125.9).status, LevelStatus::Normal);
        assert_eq!(t().classify_glucose(126.0).status, LevelStatus::Critical);

        assert_eq!(t().classify_heart_rate(59.0).status, LevelStatus::Critical);
        assert_eq!(t().classify_heart_rate(60.0).status, LevelStatus::Normal);
        assert_eq!(t().classify_heart_rate(100.0).status, LevelStatus::Normal);
        assert_eq!(t().classify_heart_rate(101.0).status, LevelStatus::Critical);
    }

    #[test]
    fn test_classify_blood_pressure() {
        assert_eq!(t().classify_blood_pressure(150.0, 95.0).status, BloodPressureStatus::High);
        assert_eq!(t().classify_blood_pressure(120.0, 90.0).status, BloodPressureStatus::High);
        assert_eq!(t().classify_blood_pressure(85.0, 70.0).status, BloodPressureStatus::Low);
        assert_eq!(t().classify_blood_pressure(110.0, 59.0).status, BloodPressureStatus::Low);
        assert_eq!(t().classify_blood_pressure(120.0, 80.0).status, BloodPressureStatus::Normal);
        // both rules match
        assert_eq!(t().classify_blood_pressure(145.0, 55.0).status, BloodPressureStatus::High);
    }

    #[test]
    fn test_status_for_abnormal_count() {
        let expected = [
            HealthStatus::Safe,
            HealthStatus::Safe,
            HealthStatus::Danger,
            HealthStatus::Danger,
            HealthStatus::Critical,
            HealthStatus::Critical,
        ];
        for (count, status) in expected.iter().enumerate() {
            assert_eq!(status_for_abnormal_count(count), *status, "count {}", count);
        }
    }

    #[test]
    fn test_assess_all_normal_is_safe() {
        let t = t();
        let assessment = assess(
            &t.classify_bmi(170.0, 65.0),
            &t.classify_blood_pressure(120.0, 80.0),
            &t.classify_cholesterol(180.0),
            &t.classify_glucose(90.0),
            &t.classify_heart_rate(72.0),
        );
        assert_eq!(assessment.status, HealthStatus::Safe);
        assert!(assessment.abnormal.is_empty());
    }

    #[test]
    fn test_assess_orders_abnormal_metrics() {
        let t = t();
        let assessment = assess(
            &t.classify_bmi(170.0, 80.0),
            &t.classify_blood_pressure(120.0, 80.0),
            &t.classify_cholesterol(180.0),
            &t.classify_glucose(150.0),
            &t.classify_heart_rate(72.0),
        );
        assert_eq!(assessment.status, HealthStatus::Danger);
        assert_eq!(assessment.abnormal, vec![Metric::Bmi, Metric::Glucose]);

        let everything = assess(
            &t.classify_bmi(170.0, 51.0),
            &t.classify_blood_pressure(150.0, 95.0),
            &t.classify_cholesterol(260.0),
            &t.classify_glucose(50.0),
            &t.classify_heart_rate(130.0),
        );
        assert_eq!(everything.status, HealthStatus::Critical);
        assert_eq!(
            everything.abnormal,
            vec![
                Metric::Bmi,
                Metric::BloodPressure,
                Metric::Cholesterol,
                Metric::Glucose,
                Metric::HeartRate
            ]
        );
    }

    #[test]
    fn test_thresholds_from_lookup() {
        let vars = std::collections::HashMap::from([
            ("VITALS_CHOLESTEROL_CRITICAL_FROM", "200"),
            ("VITALS_HEART_RATE_MAX", "not-a-number"),
            ("VITALS_GLUCOSE_HIGH_FROM", "inf"),
        ]);

        let thresholds = VitalThresholds::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(thresholds.cholesterol_critical_from, 200.0);
        assert_eq!(thresholds.heart_rate_max, 100.0);
        assert_eq!(thresholds.glucose_high_from, 126.0);
        assert_eq!(thresholds.bmi_fat_from, 25.0);
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        assert_eq!(VitalThresholds::from_lookup(|_| None), VitalThresholds::default());
    }
}
