use axum::extract::FromRef;
use std::sync::Arc;

use vital_care_data::database::DatabasePool;
use vital_care_data::repository::{
    AccountRepository, AppointmentRepository, HealthRecordRepository, NotificationRepository,
};
use vital_care_domain::health::{DatabaseHealthService, HealthServiceTrait};
use vital_care_domain::services::{
    AccountService, AccountServiceTrait, AppointmentService, AppointmentServiceTrait, ConnectionRegistry,
    GeolocationProvider, HealthRecordService, HealthRecordServiceTrait, NotificationDispatcher,
    NotificationServiceTrait, VitalThresholds,
};

pub type AccountServiceHandle = Arc<dyn AccountServiceTrait>;
pub type AppointmentServiceHandle = Arc<dyn AppointmentServiceTrait>;
pub type HealthRecordServiceHandle = Arc<dyn HealthRecordServiceTrait>;
pub type NotificationServiceHandle = Arc<dyn NotificationServiceTrait>;
pub type HealthServiceHandle = Arc<dyn HealthServiceTrait>;

/// Services shared by every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub accounts: AccountServiceHandle,
    pub appointments: AppointmentServiceHandle,
    pub health_records: HealthRecordServiceHandle,
    pub notifications: NotificationServiceHandle,
    pub connections: Arc<ConnectionRegistry>,
    pub health: HealthServiceHandle,
}

impl AppState {
    /// Wire repositories and services over one database pool
    pub fn new(pool: DatabasePool, geolocation: Arc<dyn GeolocationProvider>, thresholds: VitalThresholds) -> Self {
        let connections = Arc::new(ConnectionRegistry::new());
        let notifications: NotificationServiceHandle = Arc::new(NotificationDispatcher::new(
            NotificationRepository::new(pool.clone()),
            connections.clone(),
        ));

        let accounts = Arc::new(AccountService::new(AccountRepository::new(pool.clone())));
        let appointments = Arc::new(AppointmentService::new(
            AppointmentRepository::new(pool.clone()),
            AccountRepository::new(pool.clone()),
            notifications.clone(),
        ));
        let health_records = Arc::new(HealthRecordService::new(
            HealthRecordRepository::new(pool.clone()),
            AccountRepository::new(pool.clone()),
            notifications.clone(),
            geolocation,
            thresholds,
        ));

        Self {
            accounts,
            appointments,
            health_records,
            notifications,
            connections,
            health: Arc::new(DatabaseHealthService::new(pool)),
        }
    }
}
