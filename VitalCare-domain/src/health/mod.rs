//! Domain layer health check functionality
//! Reports database reachability and process uptime

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error};

use vital_care_data::database::DatabasePool;

/// System health status
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// A health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// The overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
    /// Seconds since the service started
    pub uptime_seconds: u64,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Check the status of the database.
    /// Returns an error when the database cannot be reached.
    async fn check_database_status(&self) -> Result<bool, String>;
}

/// Worst component status decides the system status
pub fn overall_status<'a>(components: impl IntoIterator<Item = &'a HealthComponent>) -> SystemStatus {
    let mut status = SystemStatus::Healthy;
    for component in components {
        match component.status {
            ComponentStatus::Unhealthy => return SystemStatus::Unhealthy,
            ComponentStatus::Degraded => status = SystemStatus::Degraded,
            ComponentStatus::Healthy => {}
        }
    }
    status
}

/// Health service backed by the SQLite pool
#[derive(Debug, Clone)]
pub struct DatabaseHealthService {
    pool: DatabasePool,
    started_at: Instant,
}

impl DatabaseHealthService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            pool,
            started_at: Instant::now(),
        }
    }
}

#[async_trait]
impl HealthServiceTrait for DatabaseHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let database = match self.check_database_status().await {
            Ok(_) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(self.pool.connection_info()),
            },
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e),
            },
        };

        let components: HashMap<String, HealthComponent> = [("database".to_string(), database)].into_iter().collect();

        SystemHealth {
            status: overall_status(components.values()),
            components,
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        match self.pool.ping() {
            Ok(()) => {
                debug!("Database ping succeeded");
                Ok(true)
            }
            Err(e) => {
                error!("Database health check failed: {}", e);
                Err(format!("Database connection error: {}", e))
            }
        }
    }
}
