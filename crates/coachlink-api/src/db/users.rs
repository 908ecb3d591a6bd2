// SPDX-License-Identifier: BUSL-1.1
//! User credential persistence.

use coachlink_core::Role;
use sqlx::PgPool;

use crate::state::UserRecord;

/// Insert a user row unless the username is taken.
pub async fn insert_user(pool: &PgPool, record: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (username, password_hash, role, full_name, is_active)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(&record.username)
    .bind(&record.password_hash)
    .bind(record.role.as_str())
    .bind(&record.full_name)
    .bind(record.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load all users.
pub async fn load_users(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT username, password_hash, role, full_name, is_active FROM users",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_record() {
            Some(record) => records.push(record),
            None => tracing::warn!("skipping user row with unknown role"),
        }
    }
    Ok(records)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password_hash: String,
    role: String,
    full_name: String,
    is_active: bool,
}

impl UserRow {
    fn into_record(self) -> Option<UserRecord> {
        let role = Role::parse(&self.role)?;
        Some(UserRecord {
            username: self.username,
            password_hash: self.password_hash,
            role,
            full_name: self.full_name,
            is_active: self.is_active,
        })
    }
}
