// SPDX-License-Identifier: BUSL-1.1
//! Driver and vehicle persistence.
//!
//! Reference data changes rarely (seeding and operator SQL), so only
//! insert-or-ignore and full loads are needed here.

use chrono::{DateTime, Utc};
use coachlink_core::{DriverId, VehicleId};
use sqlx::PgPool;

use crate::state::{DriverRecord, VehicleRecord};

/// Insert a driver row unless one with the same id exists.
pub async fn insert_driver(pool: &PgPool, record: &DriverRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO drivers (id, name, phone, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(record.id.as_i64())
    .bind(&record.name)
    .bind(&record.phone)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert a vehicle row unless one with the same id exists.
pub async fn insert_vehicle(pool: &PgPool, record: &VehicleRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO vehicles (id, plate, capacity, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(record.id.as_i64())
    .bind(&record.plate)
    .bind(record.capacity)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all drivers.
pub async fn load_drivers(pool: &PgPool) -> Result<Vec<DriverRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DriverRow>(
        "SELECT id, name, phone, created_at, updated_at FROM drivers ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(DriverRow::into_record).collect())
}

/// Load all vehicles.
pub async fn load_vehicles(pool: &PgPool) -> Result<Vec<VehicleRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VehicleRow>(
        "SELECT id, plate, capacity, created_at, updated_at FROM vehicles ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(VehicleRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct DriverRow {
    id: i64,
    name: String,
    phone: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DriverRow {
    fn into_record(self) -> DriverRecord {
        DriverRecord {
            id: DriverId::new(self.id),
            name: self.name,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: i64,
    plate: String,
    capacity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VehicleRow {
    fn into_record(self) -> VehicleRecord {
        VehicleRecord {
            id: VehicleId::new(self.id),
            plate: self.plate,
            capacity: self.capacity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
