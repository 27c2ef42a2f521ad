use rusqlite::Connection;
use tracing::{debug, info};

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    info!("Running SQLite migrations");

    create_account_tables(conn)?;
    create_health_record_table(conn)?;
    for (table, columns) in READING_TABLES {
        create_reading_table(conn, table, columns)?;
    }
    create_appointment_table(conn)?;
    create_notification_table(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

/// Per-metric tables and their value columns
const READING_TABLES: [(&str, &str); 5] = [
    ("bmi_readings", "height REAL NOT NULL, weight REAL NOT NULL, index_bmi REAL NOT NULL"),
    ("cholesterol_readings", "cholesterol REAL NOT NULL"),
    ("glucose_readings", "glucose REAL NOT NULL"),
    ("heartbeat_readings", "heart_rate REAL NOT NULL"),
    ("blood_pressure_readings", "systolic REAL NOT NULL, diastolic REAL NOT NULL"),
];

fn create_account_tables(conn: &Connection) -> Result<(), String> {
    info!("Creating doctors and patients tables if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS doctors (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            phone TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            speciality TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS patients (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            phone TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            date_of_birth TEXT,
            doctor_id TEXT REFERENCES doctors (id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .map_err(|e| format!("Failed to create account tables: {}", e))
}

fn create_health_record_table(conn: &Connection) -> Result<(), String> {
    info!("Creating health_records table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS health_records (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL UNIQUE REFERENCES patients (id),
            status TEXT NOT NULL DEFAULT 'SAFE',
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| e.to_string())?;

    Ok(())
}

fn create_reading_table(conn: &Connection, table: &str, columns: &str) -> Result<(), String> {
    debug!("Creating {} table if not exists", table);

    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            health_record_id TEXT NOT NULL REFERENCES health_records (id),
            {columns},
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            created_by TEXT,
            updated_by TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_record_created
        ON {table} (health_record_id, created_at DESC);"
    ))
    .map_err(|e| format!("Failed to create {}: {}", table, e))
}

fn create_appointment_table(conn: &Connection) -> Result<(), String> {
    info!("Creating appointments table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL REFERENCES patients (id),
            doctor_id TEXT NOT NULL REFERENCES doctors (id),
            full_name TEXT NOT NULL,
            phone TEXT NOT NULL,
            notes TEXT,
            reason TEXT,
            date_of_birth TEXT,
            date_meeting TEXT NOT NULL,
            time_meeting TEXT NOT NULL,
            status TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_by TEXT NOT NULL,
            updated_by TEXT,
            deleted_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments (patient_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_appointments_doctor ON appointments (doctor_id, created_at DESC);",
    )
    .map_err(|e| format!("Failed to create appointments: {}", e))
}

fn create_notification_table(conn: &Connection) -> Result<(), String> {
    info!("Creating notifications table if not exists");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            notification_type TEXT NOT NULL,
            url TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications (user_id, created_at DESC);",
    )
    .map_err(|e| format!("Failed to create notifications: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name LIKE '%_readings'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 5);
    }
}
