//! Postgres store implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Bounded query deadlines (a blown deadline surfaces as a timeout, it
//!   is never retried here)
//! - Automatic migration execution at startup
//! - Double-booking closed inside the database: `book_if_free` and
//!   `move_if_free` run the overlap check and the write in one
//!   serializable transaction, backed by the `appointments_no_overlap`
//!   exclusion constraint
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL`: connection string (required)
//! - `PG_POOL_MAX`: maximum pool size (default: 10)
//! - `PG_POOL_MIN`: minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: connection timeout in seconds (default: 30)
//! - `PG_QUERY_TIMEOUT_SEC`: per-query deadline in seconds (default: 10)

use async_trait::async_trait;
use chrono::{Utc, Weekday};
use diesel::dsl::sql;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::{Bool, Text};
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::Value;
use std::time::Duration;
use tokio::task;

use crate::api::{RecordId, TenantId};
use crate::db::error::{ErrorContext, StoreError, StoreResult};
use crate::db::store::{AppointmentStore, BookingOutcome, EntityStore};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, DoctorId, DoctorSchedule, EntityRecord,
    FieldMap, TimeInterval,
};
use crate::registry::{FilterOp, ResolvedQuery, SortDirection};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Name of the exclusion constraint guarding appointment overlap.
const NO_OVERLAP_CONSTRAINT: &str = "appointments_no_overlap";

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub query_timeout_sec: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            query_timeout_sec: 10,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let read = |name: &str, default: u64| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            database_url,
            max_pool_size: read("PG_POOL_MAX", 10) as u32,
            min_pool_size: read("PG_POOL_MIN", 1) as u32,
            connection_timeout_sec: read("PG_CONN_TIMEOUT_SEC", 30),
            query_timeout_sec: read("PG_QUERY_TIMEOUT_SEC", 10),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed store for Postgres.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresStore {
    /// Create a new store and run pending migrations. A connection
    /// failure here is a startup error for the caller; the factory never
    /// falls back to another backend.
    pub fn new(config: PostgresConfig) -> StoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                StoreError::Connection {
                    message: e.to_string(),
                    context: ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                }
            })?;

        let mut conn = pool.get().map_err(StoreError::from)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::configuration(format!("migration failure: {}", e)))?;

        Ok(Self { pool, config })
    }

    /// Run a blocking Diesel closure on the pool under the query deadline.
    async fn run<T, F>(&self, operation: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let deadline = Duration::from_secs(self.config.query_timeout_sec);
        let handle = task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(StoreError::from)?;
            f(&mut conn)
        });

        match tokio::time::timeout(deadline, handle).await {
            Err(_) => Err(StoreError::timeout("query deadline exceeded").with_operation(operation)),
            Ok(Err(join_err)) => Err(StoreError::internal(format!(
                "blocking task failed: {}",
                join_err
            ))
            .with_operation(operation)),
            Ok(Ok(result)) => result.map_err(|e| e.with_operation(operation)),
        }
    }
}

fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// WHERE fragment for `query` over the jsonb `fields` column.
///
/// Field names come straight from the validated descriptor and values are
/// rendered as quoted literals, so the fragment carries no caller-supplied
/// SQL.
fn query_predicate(query: &ResolvedQuery) -> String {
    let mut clauses = Vec::new();

    for filter in &query.filters {
        let field = quote_literal(&filter.field);
        let op = match filter.op {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
        };
        let clause = match &filter.value {
            // Numeric comparisons cast the json text; everything else
            // compares the extracted text directly.
            Value::Number(n) => {
                format!("(fields ->> {})::double precision {} {}", field, op, n)
            }
            Value::Bool(b) => format!("fields ->> {} {} {}", field, op, quote_literal(if *b { "true" } else { "false" })),
            Value::String(s) => format!("fields ->> {} {} {}", field, op, quote_literal(s)),
            other => format!(
                "fields ->> {} {} {}",
                field,
                op,
                quote_literal(&other.to_string())
            ),
        };
        clauses.push(clause);
    }

    if let Some(needle) = &query.search {
        let pattern = quote_literal(&format!("%{}%", escape_like(needle)));
        let ors: Vec<String> = query
            .search_fields
            .iter()
            .map(|field| format!("fields ->> {} ILIKE {}", quote_literal(field), pattern))
            .collect();
        if !ors.is_empty() {
            clauses.push(format!("({})", ors.join(" OR ")));
        }
    }

    if clauses.is_empty() {
        "TRUE".to_string()
    } else {
        clauses.join(" AND ")
    }
}

fn order_clause(query: &ResolvedQuery) -> String {
    match &query.sort {
        Some((field, direction)) => format!(
            "fields ->> {} {}, id ASC",
            quote_literal(field),
            match direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            }
        ),
        None => "created_at ASC, id ASC".to_string(),
    }
}

fn active_status_strings() -> Vec<String> {
    AppointmentStatus::ACTIVE
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Whether a store error is the database-side overlap guard firing.
fn is_overlap_violation(err: &StoreError) -> bool {
    match err {
        StoreError::Conflict { .. } => true,
        StoreError::Query { message, .. } => message.contains(NO_OVERLAP_CONSTRAINT),
        _ => false,
    }
}

#[async_trait]
impl EntityStore for PostgresStore {
    async fn fetch_page(
        &self,
        entity: &str,
        tenant: &TenantId,
        query: &ResolvedQuery,
    ) -> StoreResult<Vec<EntityRecord>> {
        let entity = entity.to_string();
        let tenant = tenant.as_str().to_string();
        let query = query.clone();

        self.run("fetch_page", move |conn| {
            let predicate = query_predicate(&query);
            let ordering = order_clause(&query);
            let rows: Vec<EntityRecordRow> = entity_records::table
                .filter(entity_records::entity.eq(&entity))
                .filter(entity_records::tenant.eq(&tenant))
                .filter(sql::<Bool>(&predicate))
                .order(sql::<Text>(&ordering))
                .offset(query.offset() as i64)
                .limit(query.page_size as i64)
                .load(conn)
                .map_err(StoreError::from)?;

            rows.into_iter().map(EntityRecordRow::into_domain).collect()
        })
        .await
    }

    async fn count(
        &self,
        entity: &str,
        tenant: &TenantId,
        query: &ResolvedQuery,
    ) -> StoreResult<u64> {
        let entity = entity.to_string();
        let tenant = tenant.as_str().to_string();
        let query = query.clone();

        self.run("count", move |conn| {
            let predicate = query_predicate(&query);
            let total: i64 = entity_records::table
                .filter(entity_records::entity.eq(&entity))
                .filter(entity_records::tenant.eq(&tenant))
                .filter(sql::<Bool>(&predicate))
                .count()
                .get_result(conn)
                .map_err(StoreError::from)?;
            Ok(total.max(0) as u64)
        })
        .await
    }

    async fn fetch(
        &self,
        entity: &str,
        tenant: &TenantId,
        id: &RecordId,
    ) -> StoreResult<Option<EntityRecord>> {
        let entity = entity.to_string();
        let tenant = tenant.as_str().to_string();
        let id = id.value();

        self.run("fetch", move |conn| {
            let row: Option<EntityRecordRow> = entity_records::table
                .find(id)
                .filter(entity_records::entity.eq(&entity))
                .filter(entity_records::tenant.eq(&tenant))
                .first(conn)
                .optional()
                .map_err(StoreError::from)?;

            row.map(EntityRecordRow::into_domain).transpose()
        })
        .await
    }

    async fn insert(&self, entity: &str, record: EntityRecord) -> StoreResult<EntityRecord> {
        let row = EntityRecordRow::from_domain(entity, &record);

        self.run("insert", move |conn| {
            diesel::insert_into(entity_records::table)
                .values(&row)
                .execute(conn)
                .map_err(StoreError::from)?;
            Ok(())
        })
        .await?;
        Ok(record)
    }

    async fn update(
        &self,
        entity: &str,
        tenant: &TenantId,
        id: &RecordId,
        fields: FieldMap,
    ) -> StoreResult<Option<EntityRecord>> {
        let entity = entity.to_string();
        let tenant = tenant.as_str().to_string();
        let id = id.value();

        self.run("update", move |conn| {
            let target = entity_records::table
                .find(id)
                .filter(entity_records::entity.eq(&entity))
                .filter(entity_records::tenant.eq(&tenant));

            let row: Option<EntityRecordRow> = diesel::update(target)
                .set((
                    entity_records::fields.eq(Value::Object(fields)),
                    entity_records::updated_at.eq(Utc::now()),
                ))
                .get_result(conn)
                .optional()
                .map_err(StoreError::from)?;

            row.map(EntityRecordRow::into_domain).transpose()
        })
        .await
    }

    async fn delete(&self, entity: &str, tenant: &TenantId, id: &RecordId) -> StoreResult<bool> {
        let entity = entity.to_string();
        let tenant = tenant.as_str().to_string();
        let id = id.value();

        self.run("delete", move |conn| {
            let target = entity_records::table
                .find(id)
                .filter(entity_records::entity.eq(&entity))
                .filter(entity_records::tenant.eq(&tenant));
            let removed = diesel::delete(target).execute(conn).map_err(StoreError::from)?;
            Ok(removed > 0)
        })
        .await
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.run("health_check", move |conn| {
            sql_query("SELECT 1").execute(conn).map_err(StoreError::from)?;
            Ok(true)
        })
        .await
    }
}

#[async_trait]
impl AppointmentStore for PostgresStore {
    async fn weekly_schedule(
        &self,
        doctor: &DoctorId,
        weekday: Weekday,
    ) -> StoreResult<Vec<DoctorSchedule>> {
        let doctor = doctor.value();
        let weekday = weekday_to_i16(weekday);

        self.run("weekly_schedule", move |conn| {
            let rows: Vec<ScheduleRow> = doctor_schedules::table
                .filter(doctor_schedules::doctor_id.eq(doctor))
                .filter(doctor_schedules::weekday.eq(weekday))
                .order(doctor_schedules::start_time.asc())
                .load(conn)
                .map_err(StoreError::from)?;

            rows.into_iter().map(ScheduleRow::into_domain).collect()
        })
        .await
    }

    async fn put_schedule(&self, schedule: DoctorSchedule) -> StoreResult<()> {
        let row = NewScheduleRow::from_domain(&schedule);

        self.run("put_schedule", move |conn| {
            diesel::insert_into(doctor_schedules::table)
                .values(&row)
                .on_conflict((
                    doctor_schedules::doctor_id,
                    doctor_schedules::weekday,
                    doctor_schedules::start_time,
                ))
                .do_update()
                .set((
                    doctor_schedules::end_time.eq(excluded(doctor_schedules::end_time)),
                    doctor_schedules::slot_minutes.eq(excluded(doctor_schedules::slot_minutes)),
                ))
                .execute(conn)
                .map_err(StoreError::from)?;
            Ok(())
        })
        .await
    }

    async fn appointments_overlapping(
        &self,
        doctor: &DoctorId,
        window: TimeInterval,
        statuses: &[AppointmentStatus],
    ) -> StoreResult<Vec<Appointment>> {
        let doctor = doctor.value();
        let statuses: Vec<String> = statuses.iter().map(ToString::to_string).collect();

        self.run("appointments_overlapping", move |conn| {
            let rows: Vec<AppointmentRow> = appointments::table
                .filter(appointments::doctor_id.eq(doctor))
                .filter(appointments::status.eq_any(&statuses))
                .filter(appointments::start_at.lt(window.end))
                .filter(appointments::end_at.gt(window.start))
                .order(appointments::start_at.asc())
                .load(conn)
                .map_err(StoreError::from)?;

            rows.into_iter().map(AppointmentRow::into_domain).collect()
        })
        .await
    }

    async fn fetch_appointment(&self, id: &AppointmentId) -> StoreResult<Option<Appointment>> {
        let id = id.value();

        self.run("fetch_appointment", move |conn| {
            let row: Option<AppointmentRow> = appointments::table
                .find(id)
                .first(conn)
                .optional()
                .map_err(StoreError::from)?;
            row.map(AppointmentRow::into_domain).transpose()
        })
        .await
    }

    async fn book_if_free(&self, appointment: Appointment) -> StoreResult<BookingOutcome> {
        let row = AppointmentRow::from_domain(&appointment);

        let result = self
            .run("book_if_free", move |conn| {
                conn.build_transaction().serializable().run(|conn| {
                    let overlapping: i64 = appointments::table
                        .filter(appointments::doctor_id.eq(row.doctor_id))
                        .filter(appointments::status.eq_any(active_status_strings()))
                        .filter(appointments::start_at.lt(row.end_at))
                        .filter(appointments::end_at.gt(row.start_at))
                        .count()
                        .get_result(conn)
                        .map_err(StoreError::from)?;
                    if overlapping > 0 {
                        return Ok(BookingOutcome::Conflict);
                    }

                    diesel::insert_into(appointments::table)
                        .values(&row)
                        .execute(conn)
                        .map_err(StoreError::from)?;
                    Ok(BookingOutcome::Booked(appointment.clone()))
                })
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            // A racing writer that slipped past the pre-check trips the
            // serializable isolation or the exclusion constraint; both are
            // conflicts, not crashes.
            Err(err) if is_overlap_violation(&err) => Ok(BookingOutcome::Conflict),
            Err(err) => Err(err),
        }
    }

    async fn update_status(
        &self,
        id: &AppointmentId,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        let id = id.value();
        let status = status.to_string();

        self.run("update_status", move |conn| {
            let row: Option<AppointmentRow> = diesel::update(appointments::table.find(id))
                .set((
                    appointments::status.eq(&status),
                    appointments::updated_at.eq(Utc::now()),
                ))
                .get_result(conn)
                .optional()
                .map_err(StoreError::from)?;

            row.ok_or_else(|| StoreError::not_found(format!("appointment {}", id)))?
                .into_domain()
        })
        .await
    }

    async fn move_if_free(
        &self,
        id: &AppointmentId,
        interval: TimeInterval,
    ) -> StoreResult<BookingOutcome> {
        let id = id.value();

        let result = self
            .run("move_if_free", move |conn| {
                conn.build_transaction().serializable().run(|conn| {
                    let existing: Option<AppointmentRow> = appointments::table
                        .find(id)
                        .for_update()
                        .first(conn)
                        .optional()
                        .map_err(StoreError::from)?;
                    let existing = existing
                        .ok_or_else(|| StoreError::not_found(format!("appointment {}", id)))?;

                    let overlapping: i64 = appointments::table
                        .filter(appointments::id.ne(id))
                        .filter(appointments::doctor_id.eq(existing.doctor_id))
                        .filter(appointments::status.eq_any(active_status_strings()))
                        .filter(appointments::start_at.lt(interval.end))
                        .filter(appointments::end_at.gt(interval.start))
                        .count()
                        .get_result(conn)
                        .map_err(StoreError::from)?;
                    if overlapping > 0 {
                        return Ok(BookingOutcome::Conflict);
                    }

                    let updated: AppointmentRow = diesel::update(appointments::table.find(id))
                        .set((
                            appointments::start_at.eq(interval.start),
                            appointments::end_at.eq(interval.end),
                            appointments::updated_at.eq(Utc::now()),
                        ))
                        .get_result(conn)
                        .map_err(StoreError::from)?;

                    updated.into_domain().map(BookingOutcome::Booked)
                })
            })
            .await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if is_overlap_violation(&err) => Ok(BookingOutcome::Conflict),
            Err(err) => Err(err),
        }
    }
}
