// SPDX-License-Identifier: BUSL-1.1
//! Trip request and assignment persistence.
//!
//! All functions take a `&PgPool` and operate on the `service_requests`
//! and `assignments` tables. Naming convention:
//! - `insert` / `update` / `delete` — single-row statements
//! - `upsert_assignment` — INSERT ... ON CONFLICT (request_id) DO UPDATE
//! - `load_all` — full startup load, joined with assignments in memory

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coachlink_core::{AssignmentId, DriverId, RequestId, RequestStatus, VehicleId};
use sqlx::PgPool;

use crate::state::{AssignmentRecord, ServiceRequestRecord};

/// Insert a new request row.
pub async fn insert(pool: &PgPool, record: &ServiceRequestRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO service_requests (id, customer_name, phone, pickup_location,
         dropoff_location, pickup_time, passengers, notes, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(record.id.as_i64())
    .bind(&record.customer_name)
    .bind(&record.phone)
    .bind(&record.pickup_location)
    .bind(&record.dropoff_location)
    .bind(record.pickup_time)
    .bind(record.passengers)
    .bind(&record.notes)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Update the mutable columns of a request row.
pub async fn update(pool: &PgPool, record: &ServiceRequestRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE service_requests
         SET status = $1, notes = $2, pickup_location = $3, dropoff_location = $4,
             updated_at = $5
         WHERE id = $6",
    )
    .bind(record.status.as_str())
    .bind(&record.notes)
    .bind(&record.pickup_location)
    .bind(&record.dropoff_location)
    .bind(record.updated_at)
    .bind(record.id.as_i64())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Upsert the assignment row for a request.
pub async fn upsert_assignment(
    pool: &PgPool,
    assignment: &AssignmentRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO assignments (id, request_id, driver_id, vehicle_id, scheduled_time,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (request_id) DO UPDATE SET
             driver_id = EXCLUDED.driver_id,
             vehicle_id = EXCLUDED.vehicle_id,
             scheduled_time = EXCLUDED.scheduled_time,
             updated_at = EXCLUDED.updated_at",
    )
    .bind(assignment.id.as_i64())
    .bind(assignment.request_id.as_i64())
    .bind(assignment.driver_id.as_i64())
    .bind(assignment.vehicle_id.as_i64())
    .bind(assignment.scheduled_time)
    .bind(assignment.created_at)
    .bind(assignment.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a request row. The assignment cascades at the database level.
pub async fn delete(pool: &PgPool, id: RequestId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM service_requests WHERE id = $1")
        .bind(id.as_i64())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load every request with its assignment for the startup restore.
pub async fn load_all(
    pool: &PgPool,
) -> Result<Vec<(ServiceRequestRecord, Option<AssignmentRecord>)>, sqlx::Error> {
    let request_rows = sqlx::query_as::<_, RequestRow>(
        "SELECT id, customer_name, phone, pickup_location, dropoff_location, pickup_time,
         passengers, notes, status, created_at, updated_at
         FROM service_requests ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let assignment_rows = sqlx::query_as::<_, AssignmentRow>(
        "SELECT id, request_id, driver_id, vehicle_id, scheduled_time, created_at, updated_at
         FROM assignments",
    )
    .fetch_all(pool)
    .await?;

    let mut by_request: HashMap<i64, AssignmentRecord> = assignment_rows
        .into_iter()
        .map(|row| (row.request_id, row.into_record()))
        .collect();

    let mut records = Vec::with_capacity(request_rows.len());
    for row in request_rows {
        let assignment = by_request.remove(&row.id);
        match row.into_record() {
            Some(record) => records.push((record, assignment)),
            None => {
                tracing::error!("skipping service request row with invalid status during load_all");
            }
        }
    }
    Ok(records)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RequestRow {
    id: i64,
    customer_name: String,
    phone: String,
    pickup_location: Option<String>,
    dropoff_location: Option<String>,
    pickup_time: DateTime<Utc>,
    passengers: Option<i32>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_record(self) -> Option<ServiceRequestRecord> {
        let status = match RequestStatus::parse(&self.status) {
            Some(status) => status,
            None => {
                tracing::warn!(
                    id = self.id,
                    status = %self.status,
                    "skipping service request row with unknown status"
                );
                return None;
            }
        };
        Some(ServiceRequestRecord {
            id: RequestId::new(self.id),
            customer_name: self.customer_name,
            phone: self.phone,
            pickup_location: self.pickup_location,
            dropoff_location: self.dropoff_location,
            pickup_time: self.pickup_time,
            passengers: self.passengers,
            notes: self.notes,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: i64,
    request_id: i64,
    driver_id: i64,
    vehicle_id: i64,
    scheduled_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn into_record(self) -> AssignmentRecord {
        AssignmentRecord {
            id: AssignmentId::new(self.id),
            request_id: RequestId::new(self.request_id),
            driver_id: DriverId::new(self.driver_id),
            vehicle_id: VehicleId::new(self.vehicle_id),
            scheduled_time: self.scheduled_time,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
