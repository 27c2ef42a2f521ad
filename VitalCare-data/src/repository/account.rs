use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::time::{parse_db_date, parse_db_timestamp, to_db_date, to_db_timestamp};
use crate::database::DatabasePool;
use crate::models::account::{CreateDoctorRequest, CreatePatientRequest, Doctor, Patient};
use crate::models::health_record::HealthRecord;

/// Repository trait for patient and doctor accounts
#[async_trait]
pub trait AccountRepositoryTrait {
    /// Create a patient and its empty health record in one transaction
    async fn create_patient(&self, request: CreatePatientRequest) -> Result<(Patient, HealthRecord), RepositoryError>;

    /// Create a doctor
    async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, RepositoryError>;

    /// Get a patient by ID
    async fn find_patient(&self, id: &str) -> Result<Option<Patient>, RepositoryError>;

    /// Get a doctor by ID
    async fn find_doctor(&self, id: &str) -> Result<Option<Doctor>, RepositoryError>;

    /// Get a patient by phone number
    async fn find_patient_by_phone(&self, phone: &str) -> Result<Option<Patient>, RepositoryError>;

    /// Get a doctor by phone number
    async fn find_doctor_by_phone(&self, phone: &str) -> Result<Option<Doctor>, RepositoryError>;
}

/// SQLite-backed account repository
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: DatabasePool,
}

impl AccountRepository {
    /// Create a new repository over the given pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const PATIENT_COLUMNS: &str =
    "id, full_name, phone, password_hash, date_of_birth, doctor_id, created_at, updated_at";
const DOCTOR_COLUMNS: &str = "id, full_name, phone, password_hash, speciality, created_at, updated_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        phone: row.get(2)?,
        password_hash: row.get(3)?,
        date_of_birth: parse_db_date(4, row.get(4)?)?,
        doctor_id: row.get(5)?,
        created_at: parse_db_timestamp(6, row.get(6)?)?,
        updated_at: parse_db_timestamp(7, row.get(7)?)?,
    })
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        full_name: row.get(1)?,
        phone: row.get(2)?,
        password_hash: row.get(3)?,
        speciality: row.get(4)?,
        created_at: parse_db_timestamp(5, row.get(5)?)?,
        updated_at: parse_db_timestamp(6, row.get(6)?)?,
    })
}

#[async_trait]
impl AccountRepositoryTrait for AccountRepository {
    async fn create_patient(&self, request: CreatePatientRequest) -> Result<(Patient, HealthRecord), RepositoryError> {
        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4().to_string(),
            full_name: request.full_name,
            phone: request.phone,
            password_hash: request.password_hash,
            date_of_birth: request.date_of_birth,
            doctor_id: request.doctor_id,
            created_at: now,
            updated_at: now,
        };
        let record = HealthRecord {
            id: Uuid::new_v4().to_string(),
            patient_id: patient.id.clone(),
            status: "SAFE".to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        debug!("Storing patient {} with health record {}", patient.id, record.id);

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!("INSERT INTO patients ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", PATIENT_COLUMNS),
            params![
                patient.id,
                patient.full_name,
                patient.phone,
                patient.password_hash,
                patient.date_of_birth.as_ref().map(to_db_date),
                patient.doctor_id,
                to_db_timestamp(&patient.created_at),
                to_db_timestamp(&patient.updated_at),
            ],
        )?;
        tx.execute(
            "INSERT INTO health_records (id, patient_id, status, is_deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5)",
            params![
                record.id,
                record.patient_id,
                record.status,
                to_db_timestamp(&record.created_at),
                to_db_timestamp(&record.updated_at),
            ],
        )?;
        tx.commit()?;

        Ok((patient, record))
    }

    async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, RepositoryError> {
        let now = Utc::now();
        let doctor = Doctor {
            id: Uuid::new_v4().to_string(),
            full_name: request.full_name,
            phone: request.phone,
            password_hash: request.password_hash,
            speciality: request.speciality,
            created_at: now,
            updated_at: now,
        };

        debug!("Storing doctor {}", doctor.id);

        let conn = self.pool.get()?;
        conn.execute(
            &format!("INSERT INTO doctors ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)", DOCTOR_COLUMNS),
            params![
                doctor.id,
                doctor.full_name,
                doctor.phone,
                doctor.password_hash,
                doctor.speciality,
                to_db_timestamp(&doctor.created_at),
                to_db_timestamp(&doctor.updated_at),
            ],
        )?;

        Ok(doctor)
    }

    async fn find_patient(&self, id: &str) -> Result<Option<Patient>, RepositoryError> {
        let conn = self.pool.get()?;
        let patient = conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?1", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()?;
        Ok(patient)
    }

    async fn find_doctor(&self, id: &str) -> Result<Option<Doctor>, RepositoryError> {
        let conn = self.pool.get()?;
        let doctor = conn
            .query_row(
                &format!("SELECT {} FROM doctors WHERE id = ?1", DOCTOR_COLUMNS),
                [id],
                doctor_from_row,
            )
            .optional()?;
        Ok(doctor)
    }

    async fn find_patient_by_phone(&self, phone: &str) -> Result<Option<Patient>, RepositoryError> {
        let conn = self.pool.get()?;
        let patient = conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE phone = ?1", PATIENT_COLUMNS),
                [phone],
                patient_from_row,
            )
            .optional()?;
        Ok(patient)
    }

    async fn find_doctor_by_phone(&self, phone: &str) -> Result<Option<Doctor>, RepositoryError> {
        let conn = self.pool.get()?;
        let doctor = conn
            .query_row(
                &format!("SELECT {} FROM doctors WHERE phone = ?1", DOCTOR_COLUMNS),
                [phone],
                doctor_from_row,
            )
            .optional()?;
        Ok(doctor)
    }
}
