use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::entities::account::Role;
use crate::entities::conversions;
use crate::entities::health_record::{
    DailyHistoryEntry, DailyReadings, DailySummary, HealthRecord, Metric, MetricReading, UpdateReadingRequest,
    VitalSigns,
};
use crate::entities::notification::{NewNotification, Notification, NotificationType};
use crate::entities::{validation_message, Pagination};
use crate::services::geolocation::GeolocationProvider;
use crate::services::notification::{dispatch_logged, NotificationServiceTrait};
use crate::services::vitals::{self, VitalThresholds};
use vital_care_data::models::account::Patient as StoredPatient;
use vital_care_data::models::health_record::{DailyReadingsRequest, HealthRecord as StoredHealthRecord};
use vital_care_data::repository::{AccountRepositoryTrait, HealthRecordRepositoryTrait, RepositoryError};

fn metric_labels(metrics: &[Metric]) -> String {
    metrics.iter().map(|m| m.label()).collect::<Vec<_>>().join(", ")
}

/// Health record service errors
#[derive(Debug, Error)]
pub enum HealthRecordServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A reading of the day is still missing after the write phase
    #[error("Incomplete submission, missing: {}", metric_labels(.0))]
    IncompleteSubmission(Vec<Metric>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

/// Inclusive UTC bounds of the calendar day containing `at`
pub fn day_bounds(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN));
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Classify a day's readings and aggregate them into a summary.
///
/// Fails with the missing metrics, in reporting order, when the day is incomplete.
pub fn summarize_day(
    thresholds: &VitalThresholds,
    recorded_at: DateTime<Utc>,
    day: &DailyReadings,
) -> Result<DailySummary, Vec<Metric>> {
    let bmi = match (day.height, day.weight, day.index_bmi) {
        (Some(height), Some(weight), Some(index_bmi)) => Some((height, weight, index_bmi)),
        _ => None,
    };
    let blood_pressure = day.systolic.zip(day.diastolic);

    let mut missing = Vec::new();
    if bmi.is_none() {
        missing.push(Metric::Bmi);
    }
    if blood_pressure.is_none() {
        missing.push(Metric::BloodPressure);
    }
    if day.cholesterol.is_none() {
        missing.push(Metric::Cholesterol);
    }
    if day.glucose.is_none() {
        missing.push(Metric::Glucose);
    }
    if day.heart_rate.is_none() {
        missing.push(Metric::HeartRate);
    }

    let (
        Some((height, weight, index_bmi)),
        Some((systolic, diastolic)),
        Some(cholesterol),
        Some(glucose),
        Some(heart_rate),
    ) = (bmi, blood_pressure, day.cholesterol, day.glucose, day.heart_rate)
    else {
        return Err(missing);
    };

    let bmi = thresholds.classify_bmi(height, weight);
    let blood_pressure = thresholds.classify_blood_pressure(systolic, diastolic);
    let cholesterol = thresholds.classify_cholesterol(cholesterol);
    let glucose = thresholds.classify_glucose(glucose);
    let heart_rate = thresholds.classify_heart_rate(heart_rate);
    let assessment = vitals::assess(&bmi, &blood_pressure, &cholesterol, &glucose, &heart_rate);

    Ok(DailySummary {
        health_record_id: day.health_record_id.clone(),
        recorded_at,
        height,
        weight,
        index_bmi,
        bmi,
        blood_pressure,
        cholesterol,
        glucose,
        heart_rate,
        status: assessment.status,
        abnormal: assessment.abnormal,
    })
}

/// Merge a correction into a stored reading, giving the value columns in storage order
fn corrected_values(
    metric: Metric,
    current: &MetricReading,
    request: &UpdateReadingRequest,
) -> Result<Vec<f64>, HealthRecordServiceError> {
    let pick = |update: Option<f64>, stored: Option<f64>, field: &str| {
        update.or(stored).ok_or_else(|| {
            HealthRecordServiceError::RepositoryError(format!(
                "{} reading {} has no stored {}",
                metric.label(),
                current.id,
                field
            ))
        })
    };

    match metric {
        Metric::Bmi => {
            let height = pick(request.height, current.height, "height")?;
            let weight = pick(request.weight, current.weight, "weight")?;
            Ok(vec![height, weight, vitals::bmi_index(height, weight)])
        }
        Metric::BloodPressure => {
            let systolic = pick(request.systolic, current.systolic, "systolic")?;
            let diastolic = pick(request.diastolic, current.diastolic, "diastolic")?;
            Ok(vec![systolic, diastolic])
        }
        Metric::HeartRate => {
            let value = pick(request.value, current.value, "value")?;
            if value > 300.0 {
                return Err(HealthRecordServiceError::ValidationError(
                    "value: Heart rate must not exceed 300 bpm".to_string(),
                ));
            }
            Ok(vec![value])
        }
        Metric::Cholesterol | Metric::Glucose => Ok(vec![pick(request.value, current.value, "value")?]),
    }
}

/// Trait for health record operations
#[async_trait]
pub trait HealthRecordServiceTrait: Send + Sync {
    /// Record the day's vitals, re-evaluate the record status and warn the doctor if needed
    async fn submit(&self, patient_id: &str, vitals: VitalSigns) -> Result<DailySummary, HealthRecordServiceError>;

    /// Get a health record by ID
    async fn find_one(&self, id: &str) -> Result<HealthRecord, HealthRecordServiceError>;

    /// The health record of a patient
    async fn my_record(&self, patient_id: &str) -> Result<HealthRecord, HealthRecordServiceError>;

    /// All health records, newest first
    async fn find_all(&self, page: Pagination) -> Result<(Vec<HealthRecord>, usize), HealthRecordServiceError>;

    /// Readings recorded today; missing metrics are null
    async fn today(&self, patient_id: &str) -> Result<DailyReadings, HealthRecordServiceError>;

    /// One entry per blood pressure day, joined with the other metrics of that day.
    /// Patients may only read their own history, doctors the history of their patients.
    async fn history(
        &self,
        requester_id: &str,
        requester_role: Role,
        patient_id: &str,
        page: Pagination,
    ) -> Result<(Vec<DailyHistoryEntry>, usize), HealthRecordServiceError>;

    /// Readings of one metric for a patient, newest first
    async fn list_readings(
        &self,
        patient_id: &str,
        metric: Metric,
        page: Pagination,
    ) -> Result<(Vec<MetricReading>, usize), HealthRecordServiceError>;

    /// One reading of a metric
    async fn get_reading(
        &self,
        patient_id: &str,
        metric: Metric,
        id: &str,
    ) -> Result<MetricReading, HealthRecordServiceError>;

    /// Correct one reading. A reading of today re-evaluates and persists the record status.
    async fn update_reading(
        &self,
        patient_id: &str,
        metric: Metric,
        id: &str,
        request: UpdateReadingRequest,
    ) -> Result<MetricReading, HealthRecordServiceError>;

    /// Remove one reading of a past day. Today's readings are refused since the day would become incomplete.
    async fn delete_reading(&self, patient_id: &str, metric: Metric, id: &str) -> Result<(), HealthRecordServiceError>;

    /// Alert the patient's doctor, with a map link when the location is known
    async fn emergency(&self, patient_id: &str) -> Result<Notification, HealthRecordServiceError>;
}

/// Health record aggregator
pub struct HealthRecordService<H: HealthRecordRepositoryTrait, A: AccountRepositoryTrait> {
    health_records: H,
    accounts: A,
    dispatcher: Arc<dyn NotificationServiceTrait>,
    geolocation: Arc<dyn GeolocationProvider>,
    thresholds: VitalThresholds,
}

impl<H, A> HealthRecordService<H, A>
where
    H: HealthRecordRepositoryTrait + Send + Sync,
    A: AccountRepositoryTrait + Send + Sync,
{
    pub fn new(
        health_records: H,
        accounts: A,
        dispatcher: Arc<dyn NotificationServiceTrait>,
        geolocation: Arc<dyn GeolocationProvider>,
        thresholds: VitalThresholds,
    ) -> Self {
        Self {
            health_records,
            accounts,
            dispatcher,
            geolocation,
            thresholds,
        }
    }

    fn map_repo_error(&self, err: RepositoryError) -> HealthRecordServiceError {
        match err {
            RepositoryError::NotFound(msg) => HealthRecordServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => HealthRecordServiceError::ValidationError(msg),
            _ => HealthRecordServiceError::RepositoryError(err.to_string()),
        }
    }

    fn to_domain(&self, record: StoredHealthRecord) -> Result<HealthRecord, HealthRecordServiceError> {
        conversions::convert_to_domain_health_record(record).map_err(HealthRecordServiceError::RepositoryError)
    }

    async fn patient(&self, patient_id: &str) -> Result<StoredPatient, HealthRecordServiceError> {
        self.accounts
            .find_patient(patient_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| HealthRecordServiceError::NotFound(format!("Patient with ID {} not found", patient_id)))
    }

    async fn record_of(&self, patient_id: &str) -> Result<StoredHealthRecord, HealthRecordServiceError> {
        self.health_records
            .get_by_patient(patient_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| {
                HealthRecordServiceError::NotFound(format!("Health record of patient {} not found", patient_id))
            })
    }

    /// Summarize the stored readings of the day containing `recorded_at`
    async fn summarize_stored_day(
        &self,
        record_id: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<Result<DailySummary, Vec<Metric>>, HealthRecordServiceError> {
        let (day_start, day_end) = day_bounds(recorded_at);
        let stored = self
            .health_records
            .readings_for_day(record_id, day_start, day_end)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let day = conversions::convert_to_domain_daily_readings(record_id, &stored);
        Ok(summarize_day(&self.thresholds, recorded_at, &day))
    }

    /// Persist the status of a complete day, failing with the missing metrics otherwise
    async fn apply_day(
        &self,
        record_id: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<DailySummary, HealthRecordServiceError> {
        let summary = self.summarize_stored_day(record_id, recorded_at).await?.map_err(|missing| {
            warn!("Day of record {} is incomplete: {}", record_id, metric_labels(&missing));
            HealthRecordServiceError::IncompleteSubmission(missing)
        })?;

        self.health_records
            .update_status(record_id, summary.status.as_str())
            .await
            .map_err(|e| self.map_repo_error(e))?;
        debug!(
            "Record {} is {} with {} abnormal metrics",
            record_id,
            summary.status,
            summary.abnormal.len()
        );
        Ok(summary)
    }

    async fn warn_doctor(&self, patient: &StoredPatient, summary: &DailySummary) {
        let Some(doctor_id) = patient.doctor_id.as_deref() else {
            warn!(
                "Patient {} has abnormal {} but no assigned doctor to warn",
                patient.id,
                metric_labels(&summary.abnormal)
            );
            return;
        };

        let content = format!(
            "Patient {} has abnormal {} on {}",
            patient.full_name,
            metric_labels(&summary.abnormal),
            summary.recorded_at.format("%d/%m/%Y")
        );
        let notification = NewNotification::new(doctor_id, NotificationType::Warning, "Health warning", content);
        dispatch_logged(self.dispatcher.as_ref(), notification).await;
    }
}

#[async_trait]
impl<H, A> HealthRecordServiceTrait for HealthRecordService<H, A>
where
    H: HealthRecordRepositoryTrait + Send + Sync,
    A: AccountRepositoryTrait + Send + Sync,
{
    async fn submit(&self, patient_id: &str, vitals: VitalSigns) -> Result<DailySummary, HealthRecordServiceError> {
        info!("Recording daily vitals for patient {}", patient_id);

        vitals
            .validate()
            .map_err(|e| HealthRecordServiceError::ValidationError(validation_message(&e)))?;
        let non_positive = vitals.non_positive_fields();
        if !non_positive.is_empty() {
            return Err(HealthRecordServiceError::ValidationError(format!(
                "Values must be positive: {}",
                non_positive.join(", ")
            )));
        }

        let patient = self.patient(patient_id).await?;
        let record = self.record_of(patient_id).await?;

        let recorded_at = Utc::now();
        let (day_start, day_end) = day_bounds(recorded_at);

        self.health_records
            .upsert_daily_readings(DailyReadingsRequest {
                health_record_id: record.id.clone(),
                height: vitals.height,
                weight: vitals.weight,
                index_bmi: vitals::bmi_index(vitals.height, vitals.weight),
                cholesterol: vitals.cholesterol,
                glucose: vitals.glucose,
                heart_rate: vitals.heart_rate,
                systolic: vitals.systolic,
                diastolic: vitals.diastolic,
                recorded_by: patient_id.to_string(),
                recorded_at,
                day_start,
                day_end,
            })
            .await
            .map_err(|e| self.map_repo_error(e))?;

        let summary = self.apply_day(&record.id, recorded_at).await?;
        if !summary.abnormal.is_empty() {
            self.warn_doctor(&patient, &summary).await;
        }

        Ok(summary)
    }

    async fn find_one(&self, id: &str) -> Result<HealthRecord, HealthRecordServiceError> {
        let record = self
            .health_records
            .get_by_id(id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| HealthRecordServiceError::NotFound(format!("Health record with ID {} not found", id)))?;
        self.to_domain(record)
    }

    async fn my_record(&self, patient_id: &str) -> Result<HealthRecord, HealthRecordServiceError> {
        let record = self.record_of(patient_id).await?;
        self.to_domain(record)
    }

    async fn find_all(&self, page: Pagination) -> Result<(Vec<HealthRecord>, usize), HealthRecordServiceError> {
        let (records, total) = self
            .health_records
            .list(page)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let records = records
            .into_iter()
            .map(|r| self.to_domain(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }

    async fn today(&self, patient_id: &str) -> Result<DailyReadings, HealthRecordServiceError> {
        let record = self.record_of(patient_id).await?;
        let (day_start, day_end) = day_bounds(Utc::now());
        let stored = self
            .health_records
            .readings_for_day(&record.id, day_start, day_end)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        Ok(conversions::convert_to_domain_daily_readings(&record.id, &stored))
    }

    async fn history(
        &self,
        requester_id: &str,
        requester_role: Role,
        patient_id: &str,
        page: Pagination,
    ) -> Result<(Vec<DailyHistoryEntry>, usize), HealthRecordServiceError> {
        match requester_role {
            Role::Patient if requester_id != patient_id => {
                return Err(HealthRecordServiceError::Forbidden(
                    "Patients may only read their own history".to_string(),
                ));
            }
            Role::Doctor => {
                let patient = self.patient(patient_id).await?;
                if patient.doctor_id.as_deref() != Some(requester_id) {
                    return Err(HealthRecordServiceError::Forbidden(format!(
                        "Patient {} is not assigned to doctor {}",
                        patient_id, requester_id
                    )));
                }
            }
            Role::Patient => {}
        }

        let record = self.record_of(patient_id).await?;
        let (readings, total) = self
            .health_records
            .blood_pressure_history(&record.id, page)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        // One query per day; each call releases its connection before the next
        let mut entries = Vec::with_capacity(readings.len());
        for reading in readings {
            let (day_start, day_end) = day_bounds(reading.meta.created_at);
            let day = self
                .health_records
                .readings_for_day(&record.id, day_start, day_end)
                .await
                .map_err(|e| self.map_repo_error(e))?;
            entries.push(conversions::convert_to_domain_history_entry(reading, &day));
        }

        Ok((entries, total))
    }

    async fn list_readings(
        &self,
        patient_id: &str,
        metric: Metric,
        page: Pagination,
    ) -> Result<(Vec<MetricReading>, usize), HealthRecordServiceError> {
        let record = self.record_of(patient_id).await?;
        let (readings, total) = self
            .health_records
            .list_metric_readings(&record.id, conversions::convert_to_data_metric_kind(metric), page)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let readings = readings
            .into_iter()
            .map(conversions::convert_to_domain_metric_reading)
            .collect();
        Ok((readings, total))
    }

    async fn get_reading(
        &self,
        patient_id: &str,
        metric: Metric,
        id: &str,
    ) -> Result<MetricReading, HealthRecordServiceError> {
        let record = self.record_of(patient_id).await?;
        self.health_records
            .get_metric_reading(&record.id, conversions::convert_to_data_metric_kind(metric), id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .map(conversions::convert_to_domain_metric_reading)
            .ok_or_else(|| {
                HealthRecordServiceError::NotFound(format!("{} reading with ID {} not found", metric.label(), id))
            })
    }

    async fn update_reading(
        &self,
        patient_id: &str,
        metric: Metric,
        id: &str,
        request: UpdateReadingRequest,
    ) -> Result<MetricReading, HealthRecordServiceError> {
        info!("Correcting {} reading {} of patient {}", metric.label(), id, patient_id);

        request
            .validate()
            .map_err(|e| HealthRecordServiceError::ValidationError(validation_message(&e)))?;
        if request.is_empty() {
            return Err(HealthRecordServiceError::ValidationError(
                "At least one value must be given".to_string(),
            ));
        }
        let foreign = request.foreign_fields(metric);
        if !foreign.is_empty() {
            return Err(HealthRecordServiceError::ValidationError(format!(
                "Fields do not apply to {} readings: {}",
                metric.label(),
                foreign.join(", ")
            )));
        }
        let non_positive = request.non_positive_fields();
        if !non_positive.is_empty() {
            return Err(HealthRecordServiceError::ValidationError(format!(
                "Values must be positive: {}",
                non_positive.join(", ")
            )));
        }

        let patient = self.patient(patient_id).await?;
        let record = self.record_of(patient_id).await?;
        let current = self.get_reading(patient_id, metric, id).await?;
        let values = corrected_values(metric, &current, &request)?;

        let now = Utc::now();
        let (day_start, day_end) = day_bounds(now);
        let is_today = current.created_at >= day_start && current.created_at <= day_end;
        let before = if is_today {
            self.summarize_stored_day(&record.id, now).await?.ok()
        } else {
            None
        };

        let updated = self
            .health_records
            .update_metric_reading(
                &record.id,
                conversions::convert_to_data_metric_kind(metric),
                id,
                &values,
                patient_id,
            )
            .await
            .map_err(|e| self.map_repo_error(e))?;

        if is_today {
            let summary = self.apply_day(&record.id, now).await?;
            let newly_abnormal = summary
                .abnormal
                .iter()
                .any(|m| !before.as_ref().is_some_and(|b| b.abnormal.contains(m)));
            if newly_abnormal {
                self.warn_doctor(&patient, &summary).await;
            }
        } else {
            debug!("Reading {} is from a past day; record status unchanged", id);
        }

        Ok(conversions::convert_to_domain_metric_reading(updated))
    }

    async fn delete_reading(&self, patient_id: &str, metric: Metric, id: &str) -> Result<(), HealthRecordServiceError> {
        info!("Deleting {} reading {} of patient {}", metric.label(), id, patient_id);

        let record = self.record_of(patient_id).await?;
        let current = self.get_reading(patient_id, metric, id).await?;

        let (day_start, day_end) = day_bounds(Utc::now());
        if current.created_at >= day_start && current.created_at <= day_end {
            warn!("Refusing to delete today's {} reading {} of record {}", metric.label(), id, record.id);
            return Err(HealthRecordServiceError::IncompleteSubmission(vec![metric]));
        }

        self.health_records
            .delete_metric_reading(&record.id, conversions::convert_to_data_metric_kind(metric), id)
            .await
            .map_err(|e| self.map_repo_error(e))
    }

    async fn emergency(&self, patient_id: &str) -> Result<Notification, HealthRecordServiceError> {
        info!("Emergency requested by patient {}", patient_id);

        let patient = self.patient(patient_id).await?;
        let doctor_id = patient.doctor_id.as_deref().ok_or_else(|| {
            warn!("Emergency from patient {} who has no assigned doctor", patient_id);
            HealthRecordServiceError::NotFound(format!("Patient {} has no assigned doctor", patient_id))
        })?;

        let map_url = match self.geolocation.locate().await {
            Ok(location) => Some(location.map_url()),
            Err(e) => {
                warn!("Sending emergency for patient {} without location: {}", patient_id, e);
                None
            }
        };

        let mut notification = NewNotification::new(
            doctor_id,
            NotificationType::Emergency,
            "Emergency",
            format!("Patient {} sent an emergency request", patient.full_name),
        );
        if let Some(url) = map_url {
            notification = notification.with_url(url);
        }

        self.dispatcher
            .dispatch(notification)
            .await
            .map_err(|e| HealthRecordServiceError::RepositoryError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::health_record::HealthStatus;
    use crate::services::geolocation::Location;
    use crate::services::notification::NotificationDispatcher;
    use crate::testing::{seed_doctor, seed_patient, FailingGeolocation, RecordingPushChannel, StaticGeolocation};
    use vital_care_data::database::DatabasePool;
    use vital_care_data::repository::{AccountRepository, HealthRecordRepository, NotificationRepository};

    struct Fixture {
        service: HealthRecordService<HealthRecordRepository, AccountRepository>,
        notifications: Arc<dyn NotificationServiceTrait>,
        doctor_id: String,
        patient_id: String,
    }

    async fn fixture_with(geolocation: Arc<dyn GeolocationProvider>, with_doctor: bool) -> Fixture {
        let pool = DatabasePool::in_memory().unwrap();
        let doctor = seed_doctor(&pool, "Dr. Lan", "0900000001").await.unwrap();
        let doctor_id = with_doctor.then_some(doctor.id.as_str());
        let (patient, _) = seed_patient(&pool, "Minh", "0900000002", doctor_id).await.unwrap();

        let notifications: Arc<dyn NotificationServiceTrait> = Arc::new(NotificationDispatcher::new(
            NotificationRepository::new(pool.clone()),
            Arc::new(RecordingPushChannel::new()),
        ));
        let service = HealthRecordService::new(
            HealthRecordRepository::new(pool.clone()),
            AccountRepository::new(pool),
            notifications.clone(),
            geolocation,
            VitalThresholds::default(),
        );

        Fixture {
            service,
            notifications,
            doctor_id: doctor.id,
            patient_id: patient.id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(Arc::new(FailingGeolocation), true).await
    }

    fn normal_vitals() -> VitalSigns {
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

    async fn inbox(f: &Fixture) -> Vec<Notification> {
        f.notifications
            .list_for_user(&f.doctor_id, Pagination::default())
            .await
            .unwrap()
            .0
    }

    #[test]
    fn test_day_bounds_cover_the_utc_day() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 12).unwrap();
        let (start, end) = day_bounds(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap() - Duration::milliseconds(1));
    }

    #[test]
    fn test_summarize_day_lists_missing_metrics_in_order() {
        let day = DailyReadings {
            health_record_id: "record-1".to_string(),
            cholesterol: Some(180.0),
            systolic: Some(120.0),
            ..Default::default()
        };
        let missing = summarize_day(&VitalThresholds::default(), Utc::now(), &day).unwrap_err();
        assert_eq!(missing, vec![Metric::Bmi, Metric::BloodPressure, Metric::Glucose, Metric::HeartRate]);
    }

    #[tokio::test]
    async fn test_all_normal_is_safe_without_warning() {
        let f = fixture().await;
        let summary = f.service.submit(&f.patient_id, normal_vitals()).await.unwrap();

        assert_eq!(summary.status, HealthStatus::Safe);
        assert!(summary.abnormal.is_empty());
        assert_eq!(summary.index_bmi, 22.49);
        assert!(inbox(&f).await.is_empty());
        assert_eq!(f.service.my_record(&f.patient_id).await.unwrap().status, HealthStatus::Safe);
    }

    #[tokio::test]
    async fn test_fat_and_high_glucose_is_danger_and_warns_doctor() {
        let f = fixture().await;
        let vitals = VitalSigns {
            weight: 90.0,
            glucose: 150.0,
            ..normal_vitals()
        };

        let summary = f.service.submit(&f.patient_id, vitals).await.unwrap();
        assert_eq!(summary.status, HealthStatus::Danger);
        assert_eq!(summary.abnormal, vec![Metric::Bmi, Metric::Glucose]);

        let warnings = inbox(&f).await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].notification_type, NotificationType::Warning);
        let expected_day = summary.recorded_at.format("%d/%m/%Y").to_string();
        assert_eq!(
            warnings[0].content,
            format!("Patient Minh has abnormal BMI, glucose on {}", expected_day)
        );
        assert_eq!(f.service.my_record(&f.patient_id).await.unwrap().status, HealthStatus::Danger);
    }

    #[tokio::test]
    async fn test_same_day_resubmission_reflects_latest_values() {
        let f = fixture().await;
        let first = VitalSigns {
            weight: 51.0,
            systolic: 150.0,
            diastolic: 95.0,
            ..normal_vitals()
        };
        let summary = f.service.submit(&f.patient_id, first).await.unwrap();
        assert_eq!(summary.abnormal, vec![Metric::Bmi, Metric::BloodPressure]);

        let summary = f.service.submit(&f.patient_id, normal_vitals()).await.unwrap();
        assert_eq!(summary.status, HealthStatus::Safe);

        let (bmi_rows, total) = f
            .service
            .list_readings(&f.patient_id, Metric::Bmi, Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(bmi_rows[0].weight, Some(65.0));

        let today = f.service.today(&f.patient_id).await.unwrap();
        assert_eq!(today.systolic, Some(120.0));
    }

    #[tokio::test]
    async fn test_invalid_vitals_are_rejected_before_writing() {
        let f = fixture().await;
        let vitals = VitalSigns {
            heart_rate: 0.0,
            ..normal_vitals()
        };
        assert!(matches!(
            f.service.submit(&f.patient_id, vitals).await,
            Err(HealthRecordServiceError::ValidationError(msg)) if msg.contains("heart_rate")
        ));

        let today = f.service.today(&f.patient_id).await.unwrap();
        assert_eq!(today.height, None);
    }

    #[tokio::test]
    async fn test_unknown_patient_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.service.submit("missing", normal_vitals()).await,
            Err(HealthRecordServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_history_joins_the_day_and_checks_access() {
        let f = fixture().await;
        f.service.submit(&f.patient_id, normal_vitals()).await.unwrap();

        let (entries, total) = f
            .service
            .history(&f.patient_id, Role::Patient, &f.patient_id, Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].systolic, 120.0);
        assert_eq!(entries[0].cholesterol, Some(180.0));
        assert_eq!(entries[0].index_bmi, Some(22.49));

        assert!(f
            .service
            .history(&f.doctor_id, Role::Doctor, &f.patient_id, Pagination::default())
            .await
            .is_ok());
        assert!(matches!(
            f.service
                .history("someone-else", Role::Patient, &f.patient_id, Pagination::default())
                .await,
            Err(HealthRecordServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service
                .history("other-doctor", Role::Doctor, &f.patient_id, Pagination::default())
                .await,
            Err(HealthRecordServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_get_reading_by_id() {
        let f = fixture().await;
        f.service.submit(&f.patient_id, normal_vitals()).await.unwrap();

        let (readings, _) = f
            .service
            .list_readings(&f.patient_id, Metric::HeartRate, Pagination::default())
            .await
            .unwrap();
        let reading = f
            .service
            .get_reading(&f.patient_id, Metric::HeartRate, &readings[0].id)
            .await
            .unwrap();
        assert_eq!(reading.value, Some(72.0));

        assert!(matches!(
            f.service.get_reading(&f.patient_id, Metric::Glucose, &readings[0].id).await,
            Err(HealthRecordServiceError::NotFound(_))
        ));
    }

    async fn reading_id(f: &Fixture, metric: Metric) -> String {
        let (readings, _) = f
            .service
            .list_readings(&f.patient_id, metric, Pagination::default())
            .await
            .unwrap();
        readings[0].id.clone()
    }

    async fn seed_yesterday(f: &Fixture) {
        let record_id = f.service.my_record(&f.patient_id).await.unwrap().id;
        let at = Utc::now() - Duration::days(1);
        let (day_start, day_end) = day_bounds(at);
        f.service
            .health_records
            .upsert_daily_readings(DailyReadingsRequest {
                health_record_id: record_id,
                height: 170.0,
                weight: 65.0,
                index_bmi: 22.49,
                cholesterol: 180.0,
                glucose: 90.0,
                heart_rate: 72.0,
                systolic: 120.0,
                diastolic: 80.0,
                recorded_by: f.patient_id.clone(),
                recorded_at: at,
                day_start,
                day_end,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_today_reading_recomputes_status() {
        let f = fixture().await;
        f.service
            .submit(&f.patient_id, VitalSigns { weight: 51.0, ..normal_vitals() })
            .await
            .unwrap();
        assert_eq!(inbox(&f).await.len(), 1);

        let glucose_id = reading_id(&f, Metric::Glucose).await;
        let updated = f
            .service
            .update_reading(
                &f.patient_id,
                Metric::Glucose,
                &glucose_id,
                UpdateReadingRequest {
                    value: Some(150.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.value, Some(150.0));
        assert_eq!(f.service.my_record(&f.patient_id).await.unwrap().status, HealthStatus::Danger);

        let warnings = inbox(&f).await;
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.content.contains("abnormal BMI, glucose")));

        // Correcting back to normal drops the status without a new warning
        let bmi_id = reading_id(&f, Metric::Bmi).await;
        let bmi = f
            .service
            .update_reading(
                &f.patient_id,
                Metric::Bmi,
                &bmi_id,
                UpdateReadingRequest {
                    weight: Some(65.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(bmi.index_bmi, Some(22.49));
        f.service
            .update_reading(
                &f.patient_id,
                Metric::Glucose,
                &glucose_id,
                UpdateReadingRequest {
                    value: Some(95.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(f.service.my_record(&f.patient_id).await.unwrap().status, HealthStatus::Safe);
        assert_eq!(inbox(&f).await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_rejects_fields_of_other_metrics() {
        let f = fixture().await;
        f.service.submit(&f.patient_id, normal_vitals()).await.unwrap();
        let heart_rate_id = reading_id(&f, Metric::HeartRate).await;

        let result = f
            .service
            .update_reading(
                &f.patient_id,
                Metric::HeartRate,
                &heart_rate_id,
                UpdateReadingRequest {
                    systolic: Some(130.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(HealthRecordServiceError::ValidationError(msg)) if msg.contains("systolic")));

        let result = f
            .service
            .update_reading(
                &f.patient_id,
                Metric::HeartRate,
                &heart_rate_id,
                UpdateReadingRequest {
                    value: Some(320.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(HealthRecordServiceError::ValidationError(_))));

        let result = f
            .service
            .update_reading(
                &f.patient_id,
                Metric::HeartRate,
                "missing",
                UpdateReadingRequest {
                    value: Some(80.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(HealthRecordServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_today_reading_is_incomplete() {
        let f = fixture().await;
        f.service.submit(&f.patient_id, normal_vitals()).await.unwrap();
        let glucose_id = reading_id(&f, Metric::Glucose).await;

        let result = f.service.delete_reading(&f.patient_id, Metric::Glucose, &glucose_id).await;
        assert!(matches!(
            result,
            Err(HealthRecordServiceError::IncompleteSubmission(missing)) if missing == vec![Metric::Glucose]
        ));
        assert_eq!(f.service.today(&f.patient_id).await.unwrap().glucose, Some(90.0));
        assert_eq!(f.service.my_record(&f.patient_id).await.unwrap().status, HealthStatus::Safe);
    }

    #[tokio::test]
    async fn test_past_day_reading_changes_leave_status() {
        let f = fixture().await;
        seed_yesterday(&f).await;
        let glucose_id = reading_id(&f, Metric::Glucose).await;

        let updated = f
            .service
            .update_reading(
                &f.patient_id,
                Metric::Glucose,
                &glucose_id,
                UpdateReadingRequest {
                    value: Some(200.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.value, Some(200.0));
        assert_eq!(f.service.my_record(&f.patient_id).await.unwrap().status, HealthStatus::Safe);
        assert!(inbox(&f).await.is_empty());

        f.service
            .delete_reading(&f.patient_id, Metric::Glucose, &glucose_id)
            .await
            .unwrap();
        assert!(matches!(
            f.service.get_reading(&f.patient_id, Metric::Glucose, &glucose_id).await,
            Err(HealthRecordServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_emergency_without_location_has_no_url() {
        let f = fixture().await;
        let sent = f.service.emergency(&f.patient_id).await.unwrap();

        assert_eq!(sent.user_id, f.doctor_id);
        assert_eq!(sent.notification_type, NotificationType::Emergency);
        assert_eq!(sent.content, "Patient Minh sent an emergency request");
        assert_eq!(sent.url, None);
    }

    #[tokio::test]
    async fn test_emergency_with_location_links_the_map() {
        let location = Location { lat: 21.03, lng: 105.85 };
        let f = fixture_with(Arc::new(StaticGeolocation(location)), true).await;

        let sent = f.service.emergency(&f.patient_id).await.unwrap();
        assert_eq!(sent.url, Some(location.map_url()));
    }

    #[tokio::test]
    async fn test_patient_without_doctor() {
        let f = fixture_with(Arc::new(FailingGeolocation), false).await;

        let summary = f
            .service
            .submit(&f.patient_id, VitalSigns { weight: 51.0, ..normal_vitals() })
            .await
            .unwrap();
        assert_eq!(summary.abnormal, vec![Metric::Bmi]);
        assert!(inbox(&f).await.is_empty());

        assert!(matches!(
            f.service.emergency(&f.patient_id).await,
            Err(HealthRecordServiceError::NotFound(_))
        ));
    }
}
