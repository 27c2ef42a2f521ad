use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::time::{parse_db_date, parse_db_timestamp, to_db_date, to_db_timestamp};
use crate::database::DatabasePool;
use crate::models::appointment::{
    Appointment, AppointmentFilter, CreateAppointmentRequest, UpdateAppointmentDetails,
};
use crate::models::Pagination;

/// Repository trait for appointments
#[async_trait]
pub trait AppointmentRepositoryTrait {
    /// Create a new appointment
    async fn create(&self, request: CreateAppointmentRequest) -> Result<Appointment, RepositoryError>;

    /// Get a non-deleted appointment by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Appointment>, RepositoryError>;

    /// Set the lifecycle status of an appointment
    async fn update_status(&self, id: &str, status: &str, updated_by: &str) -> Result<Appointment, RepositoryError>;

    /// Change the details of an appointment
    async fn update_details(&self, id: &str, details: UpdateAppointmentDetails) -> Result<Appointment, RepositoryError>;

    /// Mark an appointment as deleted
    async fn soft_delete(&self, id: &str, deleted_by: &str) -> Result<(), RepositoryError>;

    /// List appointments matching a filter, newest first, with the total count
    async fn list(&self, filter: AppointmentFilter, page: Pagination) -> Result<(Vec<Appointment>, usize), RepositoryError>;

    /// Move a patient's APPROVED appointments whose meeting time has passed to COMPLETED
    async fn complete_expired(&self, patient_id: &str, now: DateTime<Utc>) -> Result<usize, RepositoryError>;
}

/// SQLite-backed appointment repository
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    pool: DatabasePool,
}

impl AppointmentRepository {
    /// Create a new repository over the given pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, full_name, phone, notes, reason, date_of_birth, \
     date_meeting, time_meeting, status, is_deleted, created_by, updated_by, deleted_by, created_at, updated_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        full_name: row.get(3)?,
        phone: row.get(4)?,
        notes: row.get(5)?,
        reason: row.get(6)?,
        date_of_birth: parse_db_date(7, row.get(7)?)?,
        date_meeting: parse_db_timestamp(8, row.get(8)?)?,
        time_meeting: row.get(9)?,
        status: row.get(10)?,
        is_deleted: row.get(11)?,
        created_by: row.get(12)?,
        updated_by: row.get(13)?,
        deleted_by: row.get(14)?,
        created_at: parse_db_timestamp(15, row.get(15)?)?,
        updated_at: parse_db_timestamp(16, row.get(16)?)?,
    })
}

/// Substring pattern for `LIKE ... ESCAPE '\'`; wildcards in the term match literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Build the WHERE clause and its positional arguments for a filter
fn filter_clause(filter: &AppointmentFilter) -> (String, Vec<String>) {
    let mut conditions = vec!["is_deleted = 0".to_string()];
    let mut args: Vec<String> = Vec::new();

    if let Some(doctor_id) = &filter.doctor_id {
        args.push(doctor_id.clone());
        conditions.push(format!("doctor_id = ?{}", args.len()));
    }
    if let Some(patient_id) = &filter.patient_id {
        args.push(patient_id.clone());
        conditions.push(format!("patient_id = ?{}", args.len()));
    }
    if let Some(status) = &filter.status {
        args.push(status.clone());
        conditions.push(format!("status = ?{}", args.len()));
    }
    if let Some(from) = &filter.created_from {
        args.push(to_db_timestamp(from));
        conditions.push(format!("created_at >= ?{}", args.len()));
    }
    if let Some(to) = &filter.created_to {
        args.push(to_db_timestamp(to));
        conditions.push(format!("created_at <= ?{}", args.len()));
    }
    if let Some(search) = &filter.search {
        args.push(contains_pattern(search));
        conditions.push(format!("id LIKE ?{} ESCAPE '\\'", args.len()));
    }
    if !filter.ids.is_empty() {
        let mut placeholders = Vec::with_capacity(filter.ids.len());
        for id in &filter.ids {
            args.push(id.clone());
            placeholders.push(format!("?{}", args.len()));
        }
        conditions.push(format!("id IN ({})", placeholders.join(", ")));
    }

    (conditions.join(" AND "), args)
}

impl AppointmentRepository {
    fn fetch(&self, id: &str) -> Result<Option<Appointment>, RepositoryError> {
        let conn = self.pool.get()?;
        let appointment = conn
            .query_row(
                &format!(
                    "SELECT {} FROM appointments WHERE id = ?1 AND is_deleted = 0",
                    APPOINTMENT_COLUMNS
                ),
                [id],
                appointment_from_row,
            )
            .optional()?;
        Ok(appointment)
    }

    fn fetch_existing(&self, id: &str) -> Result<Appointment, RepositoryError> {
        self.fetch(id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("Appointment with ID {} not found", id)))
    }
}

#[async_trait]
impl AppointmentRepositoryTrait for AppointmentRepository {
    async fn create(&self, request: CreateAppointmentRequest) -> Result<Appointment, RepositoryError> {
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            full_name: request.full_name,
            phone: request.phone,
            notes: request.notes,
            reason: request.reason,
            date_of_birth: request.date_of_birth,
            date_meeting: request.date_meeting,
            time_meeting: request.time_meeting,
            status: request.status,
            is_deleted: false,
            created_by: request.created_by,
            updated_by: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        };

        debug!("Storing appointment {} with status {}", appointment.id, appointment.status);

        let conn = self.pool.get()?;
        conn.execute(
            &format!(
                "INSERT INTO appointments ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, NULL, NULL, ?13, ?14)",
                APPOINTMENT_COLUMNS
            ),
            params![
                appointment.id,
                appointment.patient_id,
                appointment.doctor_id,
                appointment.full_name,
                appointment.phone,
                appointment.notes,
                appointment.reason,
                appointment.date_of_birth.as_ref().map(to_db_date),
                to_db_timestamp(&appointment.date_meeting),
                appointment.time_meeting,
                appointment.status,
                appointment.created_by,
                to_db_timestamp(&appointment.created_at),
                to_db_timestamp(&appointment.updated_at),
            ],
        )?;

        Ok(appointment)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Appointment>, RepositoryError> {
        self.fetch(id)
    }

    async fn update_status(&self, id: &str, status: &str, updated_by: &str) -> Result<Appointment, RepositoryError> {
        debug!("Setting appointment {} status to {}", id, status);
        {
            let conn = self.pool.get()?;
            let changed = conn.execute(
                "UPDATE appointments SET status = ?1, updated_by = ?2, updated_at = ?3
                 WHERE id = ?4 AND is_deleted = 0",
                params![status, updated_by, to_db_timestamp(&Utc::now()), id],
            )?;
            if changed == 0 {
                return Err(RepositoryError::NotFound(format!("Appointment with ID {} not found", id)));
            }
        }
        self.fetch_existing(id)
    }

    async fn update_details(&self, id: &str, details: UpdateAppointmentDetails) -> Result<Appointment, RepositoryError> {
        debug!("Updating details of appointment {}", id);
        {
            let conn = self.pool.get()?;
            let changed = conn.execute(
                "UPDATE appointments SET
                    full_name = COALESCE(?1, full_name),
                    phone = COALESCE(?2, phone),
                    notes = COALESCE(?3, notes),
                    reason = COALESCE(?4, reason),
                    date_of_birth = COALESCE(?5, date_of_birth),
                    date_meeting = COALESCE(?6, date_meeting),
                    time_meeting = COALESCE(?7, time_meeting),
                    updated_by = ?8,
                    updated_at = ?9
                 WHERE id = ?10 AND is_deleted = 0",
                params![
                    details.full_name,
                    details.phone,
                    details.notes,
                    details.reason,
                    details.date_of_birth.as_ref().map(to_db_date),
                    details.date_meeting.as_ref().map(to_db_timestamp),
                    details.time_meeting,
                    details.updated_by,
                    to_db_timestamp(&Utc::now()),
                    id,
                ],
            )?;
            if changed == 0 {
                return Err(RepositoryError::NotFound(format!("Appointment with ID {} not found", id)));
            }
        }
        self.fetch_existing(id)
    }

    async fn soft_delete(&self, id: &str, deleted_by: &str) -> Result<(), RepositoryError> {
        debug!("Soft deleting appointment {}", id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE appointments SET is_deleted = 1, deleted_by = ?1, updated_at = ?2
             WHERE id = ?3 AND is_deleted = 0",
            params![deleted_by, to_db_timestamp(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Appointment with ID {} not found", id)));
        }
        Ok(())
    }

    async fn list(&self, filter: AppointmentFilter, page: Pagination) -> Result<(Vec<Appointment>, usize), RepositoryError> {
        let (where_clause, args) = filter_clause(&filter);
        let conn = self.pool.get()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM appointments WHERE {}", where_clause),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM appointments WHERE {} ORDER BY created_at DESC LIMIT {} OFFSET {}",
            APPOINTMENT_COLUMNS, where_clause, page.limit, page.offset
        ))?;
        let rows = stmt.query_map(params_from_iter(args.iter()), appointment_from_row)?;

        let mut result = Vec::new();
        for appointment in rows {
            result.push(appointment?);
        }

        Ok((result, total as usize))
    }

    async fn complete_expired(&self, patient_id: &str, now: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE appointments SET status = 'COMPLETED', updated_at = ?1
             WHERE patient_id = ?2 AND status = 'APPROVED' AND is_deleted = 0 AND date_meeting < ?1",
            params![to_db_timestamp(&now), patient_id],
        )?;
        if changed > 0 {
            debug!("Completed {} expired appointments for patient {}", changed, patient_id);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::{CreateDoctorRequest, CreatePatientRequest};
    use crate::repository::{AccountRepository, AccountRepositoryTrait};
    use chrono::Duration;

    async fn setup() -> (AppointmentRepository, String, String) {
        let pool = DatabasePool::in_memory().unwrap();
        let accounts = AccountRepository::new(pool.clone());
        let doctor = accounts
            .create_doctor(CreateDoctorRequest {
                full_name: "Dr. Hoa".to_string(),
                phone: "0911".to_string(),
                password_hash: "hash".to_string(),
                speciality: None,
            })
            .await
            .unwrap();
        let (patient, _) = accounts
            .create_patient(CreatePatientRequest {
                full_name: "An".to_string(),
                phone: "0922".to_string(),
                password_hash: "hash".to_string(),
                date_of_birth: None,
                doctor_id: Some(doctor.id.clone()),
            })
            .await
            .unwrap();
        (AppointmentRepository::new(pool), patient.id, doctor.id)
    }

    fn request(patient_id: &str, doctor_id: &str, status: &str, meeting: DateTime<Utc>) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
            full_name: "An".to_string(),
            phone: "0922".to_string(),
            notes: None,
            reason: Some("Checkup".to_string()),
            date_of_birth: None,
            date_meeting: meeting,
            time_meeting: "09:00 - 09:30".to_string(),
            status: status.to_string(),
            created_by: patient_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_update_and_soft_delete() {
        let (repo, patient_id, doctor_id) = setup().await;
        let created = repo
            .create(request(&patient_id, &doctor_id, "CREATED", Utc::now() + Duration::days(2)))
            .await
            .unwrap();

        let approved = repo.update_status(&created.id, "APPROVED", &doctor_id).await.unwrap();
        assert_eq!(approved.status, "APPROVED");
        assert_eq!(approved.updated_by.as_deref(), Some(doctor_id.as_str()));

        let updated = repo
            .update_details(
                &created.id,
                UpdateAppointmentDetails {
                    notes: Some("Bring lab results".to_string()),
                    updated_by: patient_id.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Bring lab results"));
        assert_eq!(updated.reason.as_deref(), Some("Checkup"));

        repo.soft_delete(&created.id, &patient_id).await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.update_status(&created.id, "CANCELED", &patient_id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let (repo, patient_id, doctor_id) = setup().await;
        let meeting = Utc::now() + Duration::days(1);
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(repo.create(request(&patient_id, &doctor_id, "CREATED", meeting)).await.unwrap().id);
        }
        repo.update_status(&ids[0], "APPROVED", &doctor_id).await.unwrap();

        let filter = AppointmentFilter { doctor_id: Some(doctor_id.clone()), ..Default::default() };
        let (page, total) = repo.list(filter, Pagination { limit: 2, offset: 0 }).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);

        let filter = AppointmentFilter { status: Some("APPROVED".to_string()), ..Default::default() };
        let (page, total) = repo.list(filter, Pagination::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, ids[0]);

        let filter = AppointmentFilter { ids: vec![ids[1].clone(), ids[2].clone()], ..Default::default() };
        let (_, total) = repo.list(filter, Pagination::default()).await.unwrap();
        assert_eq!(total, 2);

        let filter = AppointmentFilter { search: Some(ids[2][..8].to_string()), ..Default::default() };
        let (page, _) = repo.list(filter, Pagination::default()).await.unwrap();
        assert!(page.iter().any(|a| a.id == ids[2]));
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("ab"), "%ab%");
        assert_eq!(contains_pattern("a_b%c\\"), "%a\\_b\\%c\\\\%");
    }

    #[tokio::test]
    async fn test_search_wildcards_match_literally() {
        let (repo, patient_id, doctor_id) = setup().await;
        let meeting = Utc::now() + Duration::days(1);
        repo.create(request(&patient_id, &doctor_id, "CREATED", meeting)).await.unwrap();

        for term in ["_", "%", "\\"] {
            let filter = AppointmentFilter { search: Some(term.to_string()), ..Default::default() };
            let (page, total) = repo.list(filter, Pagination::default()).await.unwrap();
            assert_eq!(total, 0, "search {:?} matched {:?}", term, page);
        }

        let filter = AppointmentFilter { search: Some("-".to_string()), ..Default::default() };
        let (_, total) = repo.list(filter, Pagination::default()).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_complete_expired_only_touches_past_approved() {
        let (repo, patient_id, doctor_id) = setup().await;
        let past = repo
            .create(request(&patient_id, &doctor_id, "APPROVED", Utc::now() - Duration::hours(1)))
            .await
            .unwrap();
        let future = repo
            .create(request(&patient_id, &doctor_id, "APPROVED", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();
        let pending = repo
            .create(request(&patient_id, &doctor_id, "CREATED", Utc::now() - Duration::hours(1)))
            .await
            .unwrap();

        let changed = repo.complete_expired(&patient_id, Utc::now()).await.unwrap();
        assert_eq!(changed, 1);

        assert_eq!(repo.get_by_id(&past.id).await.unwrap().unwrap().status, "COMPLETED");
        assert_eq!(repo.get_by_id(&future.id).await.unwrap().unwrap().status, "APPROVED");
        assert_eq!(repo.get_by_id(&pending.id).await.unwrap().unwrap().status, "CREATED");
    }
}
