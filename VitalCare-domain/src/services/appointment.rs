use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::entities::appointment::{
    Appointment, AppointmentFilter, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::entities::conversions;
use crate::entities::notification::{NewNotification, NotificationType};
use crate::entities::{validation_message, Pagination};
use crate::services::notification::{dispatch_logged, NotificationServiceTrait};
use vital_care_data::repository::{AccountRepositoryTrait, AppointmentRepositoryTrait, RepositoryError};

/// Appointment service errors
#[derive(Debug, Error)]
pub enum AppointmentServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// Completed, refused and canceled appointments keep their details
    #[error("Appointment is {0} and can no longer be edited")]
    Closed(AppointmentStatus),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

/// Trait for appointment lifecycle operations
#[async_trait]
pub trait AppointmentServiceTrait: Send + Sync {
    /// Request an appointment with the patient's assigned doctor
    async fn create(
        &self,
        patient_id: &str,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentServiceError>;

    /// Book an already approved appointment for a patient
    async fn book_for_patient(
        &self,
        doctor_id: &str,
        patient_id: &str,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentServiceError>;

    async fn approve(&self, doctor_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError>;

    async fn refuse(&self, doctor_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError>;

    /// Cancel on behalf of either participant
    async fn cancel(&self, member_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError>;

    /// Edit appointment details on behalf of either participant
    async fn update(
        &self,
        member_id: &str,
        id: &str,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentServiceError>;

    /// Soft delete on behalf of either participant
    async fn delete(&self, member_id: &str, id: &str) -> Result<(), AppointmentServiceError>;

    async fn find_one(&self, id: &str) -> Result<Appointment, AppointmentServiceError>;

    async fn find_all(
        &self,
        filter: AppointmentFilter,
        page: Pagination,
    ) -> Result<(Vec<Appointment>, usize), AppointmentServiceError>;

    async fn list_for_doctor(
        &self,
        doctor_id: &str,
        filter: AppointmentFilter,
        page: Pagination,
    ) -> Result<(Vec<Appointment>, usize), AppointmentServiceError>;

    /// Completes the patient's past approved appointments before listing
    async fn list_for_patient(
        &self,
        patient_id: &str,
        filter: AppointmentFilter,
        page: Pagination,
    ) -> Result<(Vec<Appointment>, usize), AppointmentServiceError>;
}

/// Appointment lifecycle service
pub struct AppointmentService<R: AppointmentRepositoryTrait, A: AccountRepositoryTrait> {
    appointments: R,
    accounts: A,
    dispatcher: Arc<dyn NotificationServiceTrait>,
}

fn slot(appointment: &Appointment) -> String {
    format!(
        "{} at {}",
        appointment.date_meeting.format("%d/%m/%Y"),
        appointment.time_meeting
    )
}

impl<R, A> AppointmentService<R, A>
where
    R: AppointmentRepositoryTrait + Send + Sync,
    A: AccountRepositoryTrait + Send + Sync,
{
    pub fn new(appointments: R, accounts: A, dispatcher: Arc<dyn NotificationServiceTrait>) -> Self {
        Self {
            appointments,
            accounts,
            dispatcher,
        }
    }

    fn map_repo_error(&self, err: RepositoryError) -> AppointmentServiceError {
        match err {
            RepositoryError::NotFound(msg) => AppointmentServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => AppointmentServiceError::ValidationError(msg),
            _ => AppointmentServiceError::RepositoryError(err.to_string()),
        }
    }

    fn to_domain(
        &self,
        appointment: vital_care_data::models::appointment::Appointment,
    ) -> Result<Appointment, AppointmentServiceError> {
        conversions::convert_to_domain_appointment(appointment).map_err(AppointmentServiceError::RepositoryError)
    }

    fn to_domain_page(
        &self,
        (appointments, total): (Vec<vital_care_data::models::appointment::Appointment>, usize),
    ) -> Result<(Vec<Appointment>, usize), AppointmentServiceError> {
        let appointments = appointments
            .into_iter()
            .map(|a| self.to_domain(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((appointments, total))
    }

    async fn load(&self, id: &str) -> Result<Appointment, AppointmentServiceError> {
        let appointment = self
            .appointments
            .get_by_id(id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| AppointmentServiceError::NotFound(format!("Appointment with ID {} not found", id)))?;
        self.to_domain(appointment)
    }

    /// Load an appointment the actor takes part in
    async fn load_as_member(&self, member_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError> {
        let appointment = self.load(id).await?;
        if appointment.patient_id != member_id && appointment.doctor_id != member_id {
            warn!("{} is not a participant of appointment {}", member_id, id);
            return Err(AppointmentServiceError::Forbidden(format!(
                "Not a participant of appointment {}",
                id
            )));
        }
        Ok(appointment)
    }

    /// Load an appointment that belongs to the acting doctor
    async fn load_as_doctor(&self, doctor_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError> {
        let appointment = self.load(id).await?;
        if appointment.doctor_id != doctor_id {
            warn!("Doctor {} does not own appointment {}", doctor_id, id);
            return Err(AppointmentServiceError::Forbidden(format!(
                "Appointment {} belongs to another doctor",
                id
            )));
        }
        Ok(appointment)
    }

    async fn transition(
        &self,
        actor_id: &str,
        appointment: &Appointment,
        next: AppointmentStatus,
    ) -> Result<Appointment, AppointmentServiceError> {
        if !appointment.status.can_transition_to(next) {
            warn!(
                "Rejected transition of appointment {} from {} to {}",
                appointment.id, appointment.status, next
            );
            return Err(AppointmentServiceError::InvalidTransition {
                from: appointment.status,
                to: next,
            });
        }

        let updated = self
            .appointments
            .update_status(&appointment.id, next.as_str(), actor_id)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        debug!("Appointment {} is now {}", appointment.id, next);
        self.to_domain(updated)
    }

    async fn notify(&self, user_id: &str, title: &str, content: String) {
        let notification = NewNotification::new(user_id, NotificationType::Appointment, title, content);
        dispatch_logged(self.dispatcher.as_ref(), notification).await;
    }

    fn validate_create(request: &CreateAppointmentRequest) -> Result<(), AppointmentServiceError> {
        request
            .validate()
            .map_err(|e| AppointmentServiceError::ValidationError(validation_message(&e)))
    }
}

#[async_trait]
impl<R, A> AppointmentServiceTrait for AppointmentService<R, A>
where
    R: AppointmentRepositoryTrait + Send + Sync,
    A: AccountRepositoryTrait + Send + Sync,
{
    async fn create(
        &self,
        patient_id: &str,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentServiceError> {
        info!("Patient {} requests an appointment", patient_id);
        Self::validate_create(&request)?;

        let patient = self
            .accounts
            .find_patient(patient_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| AppointmentServiceError::NotFound(format!("Patient with ID {} not found", patient_id)))?;
        let doctor_id = patient.doctor_id.as_deref().ok_or_else(|| {
            AppointmentServiceError::ValidationError(format!("Patient {} has no assigned doctor", patient_id))
        })?;

        let data = conversions::convert_to_data_create_appointment(
            &request,
            patient_id,
            doctor_id,
            AppointmentStatus::Created,
            patient_id,
        );
        let created = self.appointments.create(data).await.map_err(|e| self.map_repo_error(e))?;
        let created = self.to_domain(created)?;

        self.notify(
            doctor_id,
            "New appointment",
            format!("Patient {} requested an appointment on {}", patient.full_name, slot(&created)),
        )
        .await;

        Ok(created)
    }

    async fn book_for_patient(
        &self,
        doctor_id: &str,
        patient_id: &str,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentServiceError> {
        info!("Doctor {} books an appointment for patient {}", doctor_id, patient_id);
        Self::validate_create(&request)?;

        let doctor = self
            .accounts
            .find_doctor(doctor_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| AppointmentServiceError::NotFound(format!("Doctor with ID {} not found", doctor_id)))?;
        self.accounts
            .find_patient(patient_id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| AppointmentServiceError::NotFound(format!("Patient with ID {} not found", patient_id)))?;

        let data = conversions::convert_to_data_create_appointment(
            &request,
            patient_id,
            doctor_id,
            AppointmentStatus::Approved,
            doctor_id,
        );
        let booked = self.appointments.create(data).await.map_err(|e| self.map_repo_error(e))?;
        let booked = self.to_domain(booked)?;

        self.notify(
            patient_id,
            "Appointment booked",
            format!("Doctor {} booked an appointment for you on {}", doctor.full_name, slot(&booked)),
        )
        .await;

        Ok(booked)
    }

    async fn approve(&self, doctor_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError> {
        info!("Doctor {} approves appointment {}", doctor_id, id);
        let appointment = self.load_as_doctor(doctor_id, id).await?;
        let approved = self.transition(doctor_id, &appointment, AppointmentStatus::Approved).await?;

        self.notify(
            &approved.patient_id,
            "Appointment approved",
            format!("Your appointment on {} was approved", slot(&approved)),
        )
        .await;

        Ok(approved)
    }

    async fn refuse(&self, doctor_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError> {
        info!("Doctor {} refuses appointment {}", doctor_id, id);
        let appointment = self.load_as_doctor(doctor_id, id).await?;
        let refused = self.transition(doctor_id, &appointment, AppointmentStatus::Refused).await?;

        self.notify(
            &refused.patient_id,
            "Appointment refused",
            format!("Your appointment on {} was refused", slot(&refused)),
        )
        .await;

        Ok(refused)
    }

    async fn cancel(&self, member_id: &str, id: &str) -> Result<Appointment, AppointmentServiceError> {
        info!("{} cancels appointment {}", member_id, id);
        let appointment = self.load_as_member(member_id, id).await?;
        let canceled = self.transition(member_id, &appointment, AppointmentStatus::Canceled).await?;

        let (counterpart, by) = if member_id == canceled.patient_id {
            (canceled.doctor_id.as_str(), "the patient")
        } else {
            (canceled.patient_id.as_str(), "the doctor")
        };
        self.notify(
            counterpart,
            "Appointment canceled",
            format!("The appointment on {} was canceled by {}", slot(&canceled), by),
        )
        .await;

        Ok(canceled)
    }

    async fn update(
        &self,
        member_id: &str,
        id: &str,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentServiceError> {
        info!("{} updates appointment {}", member_id, id);
        request
            .validate()
            .map_err(|e| AppointmentServiceError::ValidationError(validation_message(&e)))?;

        let appointment = self.load_as_member(member_id, id).await?;
        if appointment.status.is_terminal() {
            warn!("Refusing to edit {} appointment {}", appointment.status, id);
            return Err(AppointmentServiceError::Closed(appointment.status));
        }
        let updated = self
            .appointments
            .update_details(id, conversions::convert_to_data_update_appointment(&request, member_id))
            .await
            .map_err(|e| self.map_repo_error(e))?;
        let updated = self.to_domain(updated)?;

        let counterpart = if member_id == appointment.patient_id {
            &appointment.doctor_id
        } else {
            &appointment.patient_id
        };
        self.notify(
            counterpart,
            "Appointment updated",
            format!("The appointment is now on {}", slot(&updated)),
        )
        .await;

        Ok(updated)
    }

    async fn delete(&self, member_id: &str, id: &str) -> Result<(), AppointmentServiceError> {
        info!("{} deletes appointment {}", member_id, id);
        self.load_as_member(member_id, id).await?;
        self.appointments
            .soft_delete(id, member_id)
            .await
            .map_err(|e| self.map_repo_error(e))
    }

    async fn find_one(&self, id: &str) -> Result<Appointment, AppointmentServiceError> {
        self.load(id).await
    }

    async fn find_all(
        &self,
        filter: AppointmentFilter,
        page: Pagination,
    ) -> Result<(Vec<Appointment>, usize), AppointmentServiceError> {
        let result = self
            .appointments
            .list(conversions::convert_to_data_appointment_filter(&filter, None, None), page)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        self.to_domain_page(result)
    }

    async fn list_for_doctor(
        &self,
        doctor_id: &str,
        filter: AppointmentFilter,
        page: Pagination,
    ) -> Result<(Vec<Appointment>, usize), AppointmentServiceError> {
        let result = self
            .appointments
            .list(
                conversions::convert_to_data_appointment_filter(&filter, Some(doctor_id), None),
                page,
            )
            .await
            .map_err(|e| self.map_repo_error(e))?;
        self.to_domain_page(result)
    }

    async fn list_for_patient(
        &self,
        patient_id: &str,
        filter: AppointmentFilter,
        page: Pagination,
    ) -> Result<(Vec<Appointment>, usize), AppointmentServiceError> {
        let completed = self
            .appointments
            .complete_expired(patient_id, Utc::now())
            .await
            .map_err(|e| self.map_repo_error(e))?;
        if completed > 0 {
            info!("Completed {} past appointments of patient {}", completed, patient_id);
        }

        let result = self
            .appointments
            .list(
                conversions::convert_to_data_appointment_filter(&filter, None, Some(patient_id)),
                page,
            )
            .await
            .map_err(|e| self.map_repo_error(e))?;
        self.to_domain_page(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::notification::Notification;
    use crate::services::notification::NotificationDispatcher;
    use crate::testing::{seed_doctor, seed_patient, RecordingPushChannel};
    use chrono::Duration;
    use vital_care_data::database::DatabasePool;
    use vital_care_data::repository::{AccountRepository, AppointmentRepository, NotificationRepository};

    struct Fixture {
        service: AppointmentService<AppointmentRepository, AccountRepository>,
        notifications: Arc<dyn NotificationServiceTrait>,
        channel: Arc<RecordingPushChannel>,
        doctor_id: String,
        patient_id: String,
    }

    async fn fixture() -> Fixture {
        let pool = DatabasePool::in_memory().unwrap();
        let doctor = seed_doctor(&pool, "Lan", "0900000001").await.unwrap();
        let (patient, _) = seed_patient(&pool, "Minh", "0900000002", Some(&doctor.id)).await.unwrap();

        let channel = Arc::new(RecordingPushChannel::new());
        let notifications: Arc<dyn NotificationServiceTrait> = Arc::new(NotificationDispatcher::new(
            NotificationRepository::new(pool.clone()),
            channel.clone(),
        ));
        let service = AppointmentService::new(
            AppointmentRepository::new(pool.clone()),
            AccountRepository::new(pool),
            notifications.clone(),
        );

        Fixture {
            service,
            notifications,
            channel,
            doctor_id: doctor.id,
            patient_id: patient.id,
        }
    }

    fn request(days_ahead: i64) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            full_name: "Minh".to_string(),
            phone: "0900000002".to_string(),
            notes: None,
            reason: Some("Check-up".to_string()),
            date_of_birth: None,
            date_meeting: Utc::now() + Duration::days(days_ahead),
            time_meeting: "09:30".to_string(),
        }
    }

    async fn inbox(f: &Fixture, user_id: &str) -> Vec<Notification> {
        f.notifications
            .list_for_user(user_id, Pagination::default())
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_create_notifies_doctor() {
        let f = fixture().await;
        let created = f.service.create(&f.patient_id, request(3)).await.unwrap();

        assert_eq!(created.status, AppointmentStatus::Created);
        assert_eq!(created.doctor_id, f.doctor_id);

        let doctor_inbox = inbox(&f, &f.doctor_id).await;
        assert_eq!(doctor_inbox.len(), 1);
        assert_eq!(doctor_inbox[0].notification_type, NotificationType::Appointment);
        assert!(doctor_inbox[0].content.starts_with("Patient Minh requested an appointment on"));
        assert_eq!(f.channel.pushed_to(&f.doctor_id).len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_request() {
        let f = fixture().await;
        let invalid = CreateAppointmentRequest {
            phone: "abc".to_string(),
            ..request(3)
        };
        assert!(matches!(
            f.service.create(&f.patient_id, invalid).await,
            Err(AppointmentServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.create("missing", request(3)).await,
            Err(AppointmentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_approve_then_cancel_notifies_each_counterpart() {
        let f = fixture().await;
        let created = f.service.create(&f.patient_id, request(3)).await.unwrap();

        let approved = f.service.approve(&f.doctor_id, &created.id).await.unwrap();
        assert_eq!(approved.status, AppointmentStatus::Approved);
        assert_eq!(inbox(&f, &f.patient_id).await.len(), 1);

        let canceled = f.service.cancel(&f.patient_id, &created.id).await.unwrap();
        assert_eq!(canceled.status, AppointmentStatus::Canceled);
        let doctor_inbox = inbox(&f, &f.doctor_id).await;
        assert_eq!(doctor_inbox.len(), 2);
        assert!(doctor_inbox[0].content.ends_with("canceled by the patient"));
    }

    #[tokio::test]
    async fn test_terminal_states_reject_transitions() {
        let f = fixture().await;
        let created = f.service.create(&f.patient_id, request(3)).await.unwrap();
        f.service.refuse(&f.doctor_id, &created.id).await.unwrap();

        assert!(matches!(
            f.service.approve(&f.doctor_id, &created.id).await,
            Err(AppointmentServiceError::InvalidTransition {
                from: AppointmentStatus::Refused,
                to: AppointmentStatus::Approved
            })
        ));
        assert!(matches!(
            f.service.cancel(&f.patient_id, &created.id).await,
            Err(AppointmentServiceError::InvalidTransition { .. })
        ));
        // create + refuse only
        assert_eq!(inbox(&f, &f.patient_id).await.len(), 1);
        assert_eq!(inbox(&f, &f.doctor_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_only_participants_may_act() {
        let f = fixture().await;
        let created = f.service.create(&f.patient_id, request(3)).await.unwrap();

        assert!(matches!(
            f.service.approve("other-doctor", &created.id).await,
            Err(AppointmentServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.cancel("stranger", &created.id).await,
            Err(AppointmentServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.delete("stranger", &created.id).await,
            Err(AppointmentServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_booked_appointment_completes_once_past() {
        let f = fixture().await;
        let booked = f
            .service
            .book_for_patient(&f.doctor_id, &f.patient_id, request(-1))
            .await
            .unwrap();
        assert_eq!(booked.status, AppointmentStatus::Approved);
        assert!(inbox(&f, &f.patient_id).await[0].content.starts_with("Doctor Lan booked"));

        let upcoming = f
            .service
            .book_for_patient(&f.doctor_id, &f.patient_id, request(2))
            .await
            .unwrap();

        let (listed, total) = f
            .service
            .list_for_patient(&f.patient_id, AppointmentFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        let status_of = |id: &str| listed.iter().find(|a| a.id == id).map(|a| a.status);
        assert_eq!(status_of(&booked.id), Some(AppointmentStatus::Completed));
        assert_eq!(status_of(&upcoming.id), Some(AppointmentStatus::Approved));
    }

    #[tokio::test]
    async fn test_closed_appointment_cannot_be_edited() {
        let f = fixture().await;
        let created = f.service.create(&f.patient_id, request(3)).await.unwrap();
        f.service.cancel(&f.patient_id, &created.id).await.unwrap();

        let result = f
            .service
            .update(
                &f.doctor_id,
                &created.id,
                UpdateAppointmentRequest {
                    time_meeting: Some("14:00".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppointmentServiceError::Closed(AppointmentStatus::Canceled))));
        assert_ne!(f.service.find_one(&created.id).await.unwrap().time_meeting, "14:00");
        // create + cancel only
        assert_eq!(inbox(&f, &f.doctor_id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_soft_delete() {
        let f = fixture().await;
        let created = f.service.create(&f.patient_id, request(3)).await.unwrap();

        let updated = f
            .service
            .update(
                &f.doctor_id,
                &created.id,
                UpdateAppointmentRequest {
                    time_meeting: Some("14:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.time_meeting, "14:00");
        assert_eq!(updated.reason.as_deref(), Some("Check-up"));

        f.service.delete(&f.patient_id, &created.id).await.unwrap();
        assert!(matches!(
            f.service.find_one(&created.id).await,
            Err(AppointmentServiceError::NotFound(_))
        ));

        let (doctor_list, total) = f
            .service
            .list_for_doctor(&f.doctor_id, AppointmentFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(doctor_list.is_empty());
    }
}
