use uuid::Uuid;

use vital_care_data::models::{
    account as data_account, appointment as data_appointment, health_record as data_health_record,
    notification as data_notification,
};

use crate::entities::account::{Doctor, Patient};
use crate::entities::appointment::{
    Appointment, AppointmentFilter, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::entities::health_record::{DailyHistoryEntry, DailyReadings, HealthRecord, Metric, MetricReading};
use crate::entities::notification::{NewNotification, Notification};

// Conversion functions between domain entities and data models,
// named convert_to_[target_layer]_[model_name]

/// Parse a string ID into a UUID, with a descriptive error message
pub fn parse_string_to_uuid(id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|_| format!("Invalid UUID format: {}", id))
}

pub fn convert_to_domain_patient(data: data_account::Patient) -> Patient {
    Patient {
        id: data.id,
        full_name: data.full_name,
        phone: data.phone,
        date_of_birth: data.date_of_birth,
        doctor_id: data.doctor_id,
        created_at: data.created_at,
    }
}

pub fn convert_to_domain_doctor(data: data_account::Doctor) -> Doctor {
    Doctor {
        id: data.id,
        full_name: data.full_name,
        phone: data.phone,
        speciality: data.speciality,
        created_at: data.created_at,
    }
}

/// Fails when the stored status is not a known lifecycle state
pub fn convert_to_domain_appointment(data: data_appointment::Appointment) -> Result<Appointment, String> {
    Ok(Appointment {
        status: data.status.parse()?,
        id: data.id,
        patient_id: data.patient_id,
        doctor_id: data.doctor_id,
        full_name: data.full_name,
        phone: data.phone,
        notes: data.notes,
        reason: data.reason,
        date_of_birth: data.date_of_birth,
        date_meeting: data.date_meeting,
        time_meeting: data.time_meeting,
        created_by: data.created_by,
        updated_by: data.updated_by,
        created_at: data.created_at,
        updated_at: data.updated_at,
    })
}

pub fn convert_to_data_create_appointment(
    request: &CreateAppointmentRequest,
    patient_id: &str,
    doctor_id: &str,
    status: AppointmentStatus,
    created_by: &str,
) -> data_appointment::CreateAppointmentRequest {
    data_appointment::CreateAppointmentRequest {
        patient_id: patient_id.to_string(),
        doctor_id: doctor_id.to_string(),
        full_name: request.full_name.clone(),
        phone: request.phone.clone(),
        notes: request.notes.clone(),
        reason: request.reason.clone(),
        date_of_birth: request.date_of_birth,
        date_meeting: request.date_meeting,
        time_meeting: request.time_meeting.clone(),
        status: status.as_str().to_string(),
        created_by: created_by.to_string(),
    }
}

pub fn convert_to_data_update_appointment(
    request: &UpdateAppointmentRequest,
    updated_by: &str,
) -> data_appointment::UpdateAppointmentDetails {
    data_appointment::UpdateAppointmentDetails {
        full_name: request.full_name.clone(),
        phone: request.phone.clone(),
        notes: request.notes.clone(),
        reason: request.reason.clone(),
        date_of_birth: request.date_of_birth,
        date_meeting: request.date_meeting,
        time_meeting: request.time_meeting.clone(),
        updated_by: updated_by.to_string(),
    }
}

pub fn convert_to_data_appointment_filter(
    filter: &AppointmentFilter,
    doctor_id: Option<&str>,
    patient_id: Option<&str>,
) -> data_appointment::AppointmentFilter {
    data_appointment::AppointmentFilter {
        doctor_id: doctor_id.map(String::from),
        patient_id: patient_id.map(String::from),
        status: filter.status.map(|s| s.as_str().to_string()),
        created_from: filter.created_from,
        created_to: filter.created_to,
        search: filter.search.clone(),
        ids: filter.ids.clone(),
    }
}

pub fn convert_to_domain_health_record(data: data_health_record::HealthRecord) -> Result<HealthRecord, String> {
    Ok(HealthRecord {
        status: data.status.parse()?,
        id: data.id,
        patient_id: data.patient_id,
        created_at: data.created_at,
        updated_at: data.updated_at,
    })
}

pub fn convert_to_data_metric_kind(metric: Metric) -> data_health_record::MetricKind {
    match metric {
        Metric::Bmi => data_health_record::MetricKind::Bmi,
        Metric::BloodPressure => data_health_record::MetricKind::BloodPressure,
        Metric::Cholesterol => data_health_record::MetricKind::Cholesterol,
        Metric::Glucose => data_health_record::MetricKind::Glucose,
        Metric::HeartRate => data_health_record::MetricKind::Heartbeat,
    }
}

pub fn convert_to_domain_metric_reading(data: data_health_record::MetricReading) -> MetricReading {
    use data_health_record::MetricReading as Data;

    let meta = data.meta().clone();
    let mut reading = MetricReading {
        id: meta.id,
        health_record_id: meta.health_record_id,
        metric: Metric::Bmi,
        height: None,
        weight: None,
        index_bmi: None,
        value: None,
        systolic: None,
        diastolic: None,
        created_at: meta.created_at,
        updated_at: meta.updated_at,
    };

    match data {
        Data::Bmi(r) => {
            reading.height = Some(r.height);
            reading.weight = Some(r.weight);
            reading.index_bmi = Some(r.index_bmi);
        }
        Data::Cholesterol(r) => {
            reading.metric = Metric::Cholesterol;
            reading.value = Some(r.value);
        }
        Data::Glucose(r) => {
            reading.metric = Metric::Glucose;
            reading.value = Some(r.value);
        }
        Data::Heartbeat(r) => {
            reading.metric = Metric::HeartRate;
            reading.value = Some(r.value);
        }
        Data::BloodPressure(r) => {
            reading.metric = Metric::BloodPressure;
            reading.systolic = Some(r.systolic);
            reading.diastolic = Some(r.diastolic);
        }
    }
    reading
}

pub fn convert_to_domain_daily_readings(
    health_record_id: &str,
    data: &data_health_record::DailyReadings,
) -> DailyReadings {
    DailyReadings {
        health_record_id: health_record_id.to_string(),
        height: data.bmi.as_ref().map(|r| r.height),
        weight: data.bmi.as_ref().map(|r| r.weight),
        index_bmi: data.bmi.as_ref().map(|r| r.index_bmi),
        cholesterol: data.cholesterol.as_ref().map(|r| r.value),
        glucose: data.glucose.as_ref().map(|r| r.value),
        heart_rate: data.heartbeat.as_ref().map(|r| r.value),
        systolic: data.blood_pressure.as_ref().map(|r| r.systolic),
        diastolic: data.blood_pressure.as_ref().map(|r| r.diastolic),
    }
}

/// Join a blood pressure reading with the other metrics of its day
pub fn convert_to_domain_history_entry(
    blood_pressure: data_health_record::BloodPressureReading,
    day: &data_health_record::DailyReadings,
) -> DailyHistoryEntry {
    DailyHistoryEntry {
        id: blood_pressure.meta.id,
        health_record_id: blood_pressure.meta.health_record_id,
        created_at: blood_pressure.meta.created_at,
        systolic: blood_pressure.systolic,
        diastolic: blood_pressure.diastolic,
        height: day.bmi.as_ref().map(|r| r.height),
        weight: day.bmi.as_ref().map(|r| r.weight),
        index_bmi: day.bmi.as_ref().map(|r| r.index_bmi),
        heart_rate: day.heartbeat.as_ref().map(|r| r.value),
        glucose: day.glucose.as_ref().map(|r| r.value),
        cholesterol: day.cholesterol.as_ref().map(|r| r.value),
    }
}

pub fn convert_to_data_create_notification(
    notification: &NewNotification,
) -> data_notification::CreateNotificationRequest {
    data_notification::CreateNotificationRequest {
        user_id: notification.user_id.clone(),
        title: notification.title.clone(),
        content: notification.content.clone(),
        notification_type: notification.notification_type.as_str().to_string(),
        url: notification.url.clone(),
    }
}

pub fn convert_to_domain_notification(data: data_notification::Notification) -> Result<Notification, String> {
    Ok(Notification {
        notification_type: data.notification_type.parse()?,
        id: data.id,
        user_id: data.user_id,
        title: data.title,
        content: data.content,
        url: data.url,
        is_read: data.is_read,
        created_at: data.created_at,
    })
}
