// Testing utilities and fakes for the domain layer
// Available to unit tests and, with the "mock" feature, to the API crate

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::auth::password::hash_password;
use crate::entities::notification::NotificationPush;
use crate::health::{overall_status, ComponentStatus, HealthComponent, HealthServiceTrait, SystemHealth, SystemStatus};
use crate::services::geolocation::{GeolocationError, GeolocationProvider, Location};
use crate::services::notification::PushChannel;
use vital_care_data::database::DatabasePool;
use vital_care_data::models::account::{CreateDoctorRequest, CreatePatientRequest, Doctor, Patient};
use vital_care_data::models::health_record::HealthRecord;
use vital_care_data::repository::{AccountRepository, AccountRepositoryTrait, RepositoryError};

/// Password given to every seeded account
pub const SEED_PASSWORD: &str = "password123";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Push channel that records every frame and reports a configurable delivery result
#[derive(Debug)]
pub struct RecordingPushChannel {
    pushed: Mutex<Vec<(String, NotificationPush)>>,
    connected: bool,
}

impl Default for RecordingPushChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingPushChannel {
    /// Channel where every addressee has a live connection
    pub fn new() -> Self {
        Self {
            pushed: Mutex::new(Vec::new()),
            connected: true,
        }
    }

    /// Channel where no addressee is connected
    pub fn disconnected() -> Self {
        Self {
            pushed: Mutex::new(Vec::new()),
            connected: false,
        }
    }

    /// Frames pushed so far, with their addressee
    pub fn pushed(&self) -> Vec<(String, NotificationPush)> {
        lock(&self.pushed).clone()
    }

    /// Frames pushed to one user
    pub fn pushed_to(&self, user_id: &str) -> Vec<NotificationPush> {
        lock(&self.pushed)
            .iter()
            .filter(|(to, _)| to == user_id)
            .map(|(_, push)| push.clone())
            .collect()
    }
}

impl PushChannel for RecordingPushChannel {
    fn push(&self, user_id: &str, payload: NotificationPush) -> bool {
        lock(&self.pushed).push((user_id.to_string(), payload));
        self.connected
    }
}

/// Geolocation provider that always answers the same location
#[derive(Debug, Clone, Copy)]
pub struct StaticGeolocation(pub Location);

#[async_trait]
impl GeolocationProvider for StaticGeolocation {
    async fn locate(&self) -> Result<Location, GeolocationError> {
        Ok(self.0)
    }
}

/// Geolocation provider that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingGeolocation;

#[async_trait]
impl GeolocationProvider for FailingGeolocation {
    async fn locate(&self) -> Result<Location, GeolocationError> {
        Err(GeolocationError::Status(503))
    }
}

/// Store a doctor with [`SEED_PASSWORD`]
pub async fn seed_doctor(pool: &DatabasePool, full_name: &str, phone: &str) -> Result<Doctor, RepositoryError> {
    AccountRepository::new(pool.clone())
        .create_doctor(CreateDoctorRequest {
            full_name: full_name.to_string(),
            phone: phone.to_string(),
            password_hash: hash_password(SEED_PASSWORD),
            speciality: Some("General practice".to_string()),
        })
        .await
}

/// Store a patient, and their health record, with [`SEED_PASSWORD`]
pub async fn seed_patient(
    pool: &DatabasePool,
    full_name: &str,
    phone: &str,
    doctor_id: Option<&str>,
) -> Result<(Patient, HealthRecord), RepositoryError> {
    AccountRepository::new(pool.clone())
        .create_patient(CreatePatientRequest {
            full_name: full_name.to_string(),
            phone: phone.to_string(),
            password_hash: hash_password(SEED_PASSWORD),
            date_of_birth: None,
            doctor_id: doctor_id.map(String::from),
        })
        .await
}

/// Mock implementation of health services for testing system health
#[derive(Debug)]
pub struct MockHealthService {
    database_status: ComponentStatus,
    /// Overrides the status derived from the components
    system_status: Option<SystemStatus>,
    components: HashMap<String, HealthComponent>,
    uptime_seconds: u64,
}

impl Default for MockHealthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHealthService {
    /// A mock where every component is healthy
    pub fn new() -> Self {
        Self {
            database_status: ComponentStatus::Healthy,
            system_status: None,
            components: HashMap::new(),
            uptime_seconds: 42,
        }
    }

    pub fn with_degraded_database(mut self) -> Self {
        self.database_status = ComponentStatus::Degraded;
        self
    }

    pub fn with_unhealthy_database(mut self) -> Self {
        self.database_status = ComponentStatus::Unhealthy;
        self
    }

    pub fn with_system_status(mut self, status: SystemStatus) -> Self {
        self.system_status = Some(status);
        self
    }

    /// Add a custom component with a specific status
    pub fn with_component(mut self, name: &str, status: ComponentStatus, details: Option<String>) -> Self {
        self.components.insert(name.to_string(), HealthComponent { status, details });
        self
    }
}

#[async_trait]
impl HealthServiceTrait for MockHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = self.components.clone();
        components.insert(
            "database".to_string(),
            HealthComponent {
                status: self.database_status,
                details: match self.database_status {
                    ComponentStatus::Healthy => None,
                    ComponentStatus::Degraded => Some("Database is responding slowly".to_string()),
                    ComponentStatus::Unhealthy => Some("Database connection failed".to_string()),
                },
            },
        );

        SystemHealth {
            status: self.system_status.unwrap_or_else(|| overall_status(components.values())),
            components,
            uptime_seconds: self.uptime_seconds,
        }
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        match self.database_status {
            ComponentStatus::Healthy => Ok(true),
            ComponentStatus::Degraded => Ok(false),
            ComponentStatus::Unhealthy => Err("Database connection failed".to_string()),
        }
    }
}
