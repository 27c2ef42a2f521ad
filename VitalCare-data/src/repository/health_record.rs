use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::errors::RepositoryError;
use crate::database::time::{parse_db_timestamp, to_db_timestamp};
use crate::database::DatabasePool;
use crate::models::health_record::{
    BloodPressureReading, BmiReading, DailyReadings, DailyReadingsRequest, HealthRecord, LevelReading,
    MetricKind, MetricReading, ReadingMeta,
};
use crate::models::Pagination;

/// Repository trait for health records and their vital sign readings
#[async_trait]
pub trait HealthRecordRepositoryTrait {
    /// Get the health record of a patient
    async fn get_by_patient(&self, patient_id: &str) -> Result<Option<HealthRecord>, RepositoryError>;

    /// Get a health record by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<HealthRecord>, RepositoryError>;

    /// List non-deleted health records, newest first, with the total count
    async fn list(&self, page: Pagination) -> Result<(Vec<HealthRecord>, usize), RepositoryError>;

    /// Set the aggregate status of a health record
    async fn update_status(&self, id: &str, status: &str) -> Result<(), RepositoryError>;

    /// Write all five readings of a day in one transaction.
    ///
    /// A metric that already has a row inside `[day_start, day_end]` is updated
    /// in place, otherwise a new row is inserted.
    async fn upsert_daily_readings(&self, request: DailyReadingsRequest) -> Result<(), RepositoryError>;

    /// Read back the latest reading of each metric inside a time range
    async fn readings_for_day(
        &self,
        health_record_id: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<DailyReadings, RepositoryError>;

    /// Blood pressure readings of a record, newest first, with the total count
    async fn blood_pressure_history(
        &self,
        health_record_id: &str,
        page: Pagination,
    ) -> Result<(Vec<BloodPressureReading>, usize), RepositoryError>;

    /// Readings of one metric, newest first, with the total count
    async fn list_metric_readings(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        page: Pagination,
    ) -> Result<(Vec<MetricReading>, usize), RepositoryError>;

    /// Get one reading of a metric by ID
    async fn get_metric_reading(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        id: &str,
    ) -> Result<Option<MetricReading>, RepositoryError>;

    /// Overwrite the value columns of one reading, in `MetricKind::value_columns` order
    async fn update_metric_reading(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        id: &str,
        values: &[f64],
        updated_by: &str,
    ) -> Result<MetricReading, RepositoryError>;

    /// Remove one reading
    async fn delete_metric_reading(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        id: &str,
    ) -> Result<(), RepositoryError>;
}

/// SQLite-backed health record repository
#[derive(Debug, Clone)]
pub struct HealthRecordRepository {
    pool: DatabasePool,
}

impl HealthRecordRepository {
    /// Create a new repository over the given pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const RECORD_COLUMNS: &str = "id, patient_id, status, is_deleted, created_at, updated_at";
const META_COLUMNS: &str = "id, health_record_id, created_at, updated_at, created_by, updated_by";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HealthRecord> {
    Ok(HealthRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        status: row.get(2)?,
        is_deleted: row.get(3)?,
        created_at: parse_db_timestamp(4, row.get(4)?)?,
        updated_at: parse_db_timestamp(5, row.get(5)?)?,
    })
}

fn meta_from_row(row: &Row<'_>) -> rusqlite::Result<ReadingMeta> {
    Ok(ReadingMeta {
        id: row.get(0)?,
        health_record_id: row.get(1)?,
        created_at: parse_db_timestamp(2, row.get(2)?)?,
        updated_at: parse_db_timestamp(3, row.get(3)?)?,
        created_by: row.get(4)?,
        updated_by: row.get(5)?,
    })
}

/// Map a row selected with `META_COLUMNS` followed by the metric's value columns
fn reading_from_row(kind: MetricKind, row: &Row<'_>) -> rusqlite::Result<MetricReading> {
    let meta = meta_from_row(row)?;
    let reading = match kind {
        MetricKind::Bmi => MetricReading::Bmi(BmiReading {
            meta,
            height: row.get(6)?,
            weight: row.get(7)?,
            index_bmi: row.get(8)?,
        }),
        MetricKind::Cholesterol => MetricReading::Cholesterol(LevelReading { meta, value: row.get(6)? }),
        MetricKind::Glucose => MetricReading::Glucose(LevelReading { meta, value: row.get(6)? }),
        MetricKind::Heartbeat => MetricReading::Heartbeat(LevelReading { meta, value: row.get(6)? }),
        MetricKind::BloodPressure => MetricReading::BloodPressure(BloodPressureReading {
            meta,
            systolic: row.get(6)?,
            diastolic: row.get(7)?,
        }),
    };
    Ok(reading)
}

fn select_reading_sql(kind: MetricKind, condition: &str, suffix: &str) -> String {
    format!(
        "SELECT {}, {} FROM {} WHERE {} {}",
        META_COLUMNS,
        kind.value_columns(),
        kind.table(),
        condition,
        suffix
    )
}

/// Insert or update one metric row of a day inside an open transaction
fn upsert_metric(
    conn: &Connection,
    kind: MetricKind,
    values: &[f64],
    request: &DailyReadingsRequest,
) -> Result<(), RepositoryError> {
    let existing: Option<String> = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE health_record_id = ?1 AND created_at >= ?2 AND created_at <= ?3
                 ORDER BY created_at DESC LIMIT 1",
                kind.table()
            ),
            params![
                request.health_record_id,
                to_db_timestamp(&request.day_start),
                to_db_timestamp(&request.day_end),
            ],
            |row| row.get(0),
        )
        .optional()?;

    let columns: Vec<&str> = kind.value_columns().split(", ").collect();
    let mut args: Vec<Value> = values.iter().map(|v| Value::Real(*v)).collect();
    let timestamp = to_db_timestamp(&request.recorded_at);

    match existing {
        Some(id) => {
            debug!("Updating {} row {} for record {}", kind.table(), id, request.health_record_id);
            let assignments: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, column)| format!("{} = ?{}", column, i + 1))
                .collect();
            let n = args.len();
            args.push(Value::Text(timestamp));
            args.push(Value::Text(request.recorded_by.clone()));
            args.push(Value::Text(id));
            conn.execute(
                &format!(
                    "UPDATE {} SET {}, updated_at = ?{}, updated_by = ?{} WHERE id = ?{}",
                    kind.table(),
                    assignments.join(", "),
                    n + 1,
                    n + 2,
                    n + 3
                ),
                params_from_iter(args.iter()),
            )?;
        }
        None => {
            debug!("Inserting {} row for record {}", kind.table(), request.health_record_id);
            args.insert(0, Value::Text(request.health_record_id.clone()));
            args.insert(0, Value::Text(Uuid::new_v4().to_string()));
            args.push(Value::Text(timestamp.clone()));
            args.push(Value::Text(timestamp));
            args.push(Value::Text(request.recorded_by.clone()));
            args.push(Value::Text(request.recorded_by.clone()));
            let placeholders: Vec<String> = (1..=args.len()).map(|i| format!("?{}", i)).collect();
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, health_record_id, {}, created_at, updated_at, created_by, updated_by)
                     VALUES ({})",
                    kind.table(),
                    kind.value_columns(),
                    placeholders.join(", ")
                ),
                params_from_iter(args.iter()),
            )?;
        }
    }

    Ok(())
}

fn latest_in_range(
    conn: &Connection,
    kind: MetricKind,
    health_record_id: &str,
    start: &str,
    end: &str,
) -> Result<Option<MetricReading>, RepositoryError> {
    let reading = conn
        .query_row(
            &select_reading_sql(
                kind,
                "health_record_id = ?1 AND created_at >= ?2 AND created_at <= ?3",
                "ORDER BY created_at DESC LIMIT 1",
            ),
            params![health_record_id, start, end],
            |row| reading_from_row(kind, row),
        )
        .optional()?;
    Ok(reading)
}

#[async_trait]
impl HealthRecordRepositoryTrait for HealthRecordRepository {
    async fn get_by_patient(&self, patient_id: &str) -> Result<Option<HealthRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM health_records WHERE patient_id = ?1 AND is_deleted = 0",
                    RECORD_COLUMNS
                ),
                [patient_id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<HealthRecord>, RepositoryError> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM health_records WHERE id = ?1 AND is_deleted = 0", RECORD_COLUMNS),
                [id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<HealthRecord>, usize), RepositoryError> {
        let conn = self.pool.get()?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM health_records WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM health_records WHERE is_deleted = 0 ORDER BY created_at DESC LIMIT {} OFFSET {}",
            RECORD_COLUMNS, page.limit, page.offset
        ))?;
        let rows = stmt.query_map([], record_from_row)?;

        let mut result = Vec::new();
        for record in rows {
            result.push(record?);
        }
        Ok((result, total as usize))
    }

    async fn update_status(&self, id: &str, status: &str) -> Result<(), RepositoryError> {
        debug!("Setting health record {} status to {}", id, status);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE health_records SET status = ?1, updated_at = ?2 WHERE id = ?3 AND is_deleted = 0",
            params![status, to_db_timestamp(&Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Health record with ID {} not found", id)));
        }
        Ok(())
    }

    async fn upsert_daily_readings(&self, request: DailyReadingsRequest) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        upsert_metric(&tx, MetricKind::Bmi, &[request.height, request.weight, request.index_bmi], &request)?;
        upsert_metric(&tx, MetricKind::Cholesterol, &[request.cholesterol], &request)?;
        upsert_metric(&tx, MetricKind::Glucose, &[request.glucose], &request)?;
        upsert_metric(&tx, MetricKind::Heartbeat, &[request.heart_rate], &request)?;
        upsert_metric(&tx, MetricKind::BloodPressure, &[request.systolic, request.diastolic], &request)?;

        tx.commit()?;
        Ok(())
    }

    async fn readings_for_day(
        &self,
        health_record_id: &str,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<DailyReadings, RepositoryError> {
        let conn = self.pool.get()?;
        let start = to_db_timestamp(&day_start);
        let end = to_db_timestamp(&day_end);

        let mut readings = DailyReadings::default();
        for kind in MetricKind::ALL {
            match latest_in_range(&conn, kind, health_record_id, &start, &end)? {
                Some(MetricReading::Bmi(r)) => readings.bmi = Some(r),
                Some(MetricReading::Cholesterol(r)) => readings.cholesterol = Some(r),
                Some(MetricReading::Glucose(r)) => readings.glucose = Some(r),
                Some(MetricReading::Heartbeat(r)) => readings.heartbeat = Some(r),
                Some(MetricReading::BloodPressure(r)) => readings.blood_pressure = Some(r),
                None => {}
            }
        }
        Ok(readings)
    }

    async fn blood_pressure_history(
        &self,
        health_record_id: &str,
        page: Pagination,
    ) -> Result<(Vec<BloodPressureReading>, usize), RepositoryError> {
        let (readings, total) = self
            .list_metric_readings(health_record_id, MetricKind::BloodPressure, page)
            .await?;
        let readings = readings
            .into_iter()
            .filter_map(|reading| match reading {
                MetricReading::BloodPressure(r) => Some(r),
                _ => None,
            })
            .collect();
        Ok((readings, total))
    }

    async fn list_metric_readings(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        page: Pagination,
    ) -> Result<(Vec<MetricReading>, usize), RepositoryError> {
        let conn = self.pool.get()?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE health_record_id = ?1", kind.table()),
            [health_record_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&select_reading_sql(
            kind,
            "health_record_id = ?1",
            &format!("ORDER BY created_at DESC LIMIT {} OFFSET {}", page.limit, page.offset),
        ))?;
        let rows = stmt.query_map([health_record_id], |row| reading_from_row(kind, row))?;

        let mut result = Vec::new();
        for reading in rows {
            result.push(reading?);
        }
        Ok((result, total as usize))
    }

    async fn get_metric_reading(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        id: &str,
    ) -> Result<Option<MetricReading>, RepositoryError> {
        let conn = self.pool.get()?;
        let reading = conn
            .query_row(
                &select_reading_sql(kind, "health_record_id = ?1 AND id = ?2", ""),
                params![health_record_id, id],
                |row| reading_from_row(kind, row),
            )
            .optional()?;
        Ok(reading)
    }

    async fn update_metric_reading(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        id: &str,
        values: &[f64],
        updated_by: &str,
    ) -> Result<MetricReading, RepositoryError> {
        let columns: Vec<&str> = kind.value_columns().split(", ").collect();
        if columns.len() != values.len() {
            return Err(RepositoryError::Validation(format!(
                "{} takes {} values, got {}",
                kind.table(),
                columns.len(),
                values.len()
            )));
        }

        debug!("Updating {} row {} for record {}", kind.table(), id, health_record_id);
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let n = values.len();
        let mut args: Vec<Value> = values.iter().map(|v| Value::Real(*v)).collect();
        args.push(Value::Text(to_db_timestamp(&Utc::now())));
        args.push(Value::Text(updated_by.to_string()));
        args.push(Value::Text(id.to_string()));
        args.push(Value::Text(health_record_id.to_string()));

        let conn = self.pool.get()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET {}, updated_at = ?{}, updated_by = ?{} WHERE id = ?{} AND health_record_id = ?{}",
                kind.table(),
                assignments.join(", "),
                n + 1,
                n + 2,
                n + 3,
                n + 4
            ),
            params_from_iter(args.iter()),
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Reading with ID {} not found", id)));
        }

        let reading = conn.query_row(
            &select_reading_sql(kind, "health_record_id = ?1 AND id = ?2", ""),
            params![health_record_id, id],
            |row| reading_from_row(kind, row),
        )?;
        Ok(reading)
    }

    async fn delete_metric_reading(
        &self,
        health_record_id: &str,
        kind: MetricKind,
        id: &str,
    ) -> Result<(), RepositoryError> {
        debug!("Deleting {} row {} for record {}", kind.table(), id, health_record_id);
        let conn = self.pool.get()?;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1 AND health_record_id = ?2", kind.table()),
            params![id, health_record_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound(format!("Reading with ID {} not found", id)));
        }
        Ok(())
    }
}
