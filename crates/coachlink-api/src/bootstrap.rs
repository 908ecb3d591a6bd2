//! # Startup Bootstrap
//!
//! Restores state from the database (when configured) and seeds the
//! default users and reference fleet on first boot so a fresh deployment
//! is immediately usable.

use chrono::Utc;
use coachlink_core::{DriverId, Role, VehicleId};

use crate::auth::hash_password;
use crate::error::AppError;
use crate::state::{AppState, DriverRecord, UserRecord, VehicleRecord};

/// Restore persisted state, then fill any empty store with seed data.
pub async fn initialize(state: &AppState) -> anyhow::Result<()> {
    if let Some(pool) = &state.db_pool {
        for user in crate::db::users::load_users(pool).await? {
            state.users.insert(user.username.clone(), user);
        }
        for driver in crate::db::reference::load_drivers(pool).await? {
            state.drivers.insert(driver.id, driver);
        }
        for vehicle in crate::db::reference::load_vehicles(pool).await? {
            state.vehicles.insert(vehicle.id, vehicle);
        }
        let requests = crate::db::requests::load_all(pool).await?;
        let count = requests.len();
        for (request, assignment) in requests {
            state.fleet.restore(request, assignment);
        }
        tracing::info!(requests = count, "restored state from database");
    }

    if state.users.is_empty() {
        seed_users(state).await?;
    }
    if state.drivers.is_empty() && state.vehicles.is_empty() {
        seed_reference_fleet(state).await?;
    }

    Ok(())
}

/// Seed the default users. Passwords come from `COORDINATOR_PASSWORD`,
/// `VIEWER_PASSWORD`, and `ADMIN_PASSWORD`; development defaults are used
/// (and logged) when unset.
pub async fn seed_users(state: &AppState) -> anyhow::Result<()> {
    let defaults = [
        ("coordinator", "COORDINATOR_PASSWORD", "password", Role::Coordinator, "System Coordinator"),
        ("viewer", "VIEWER_PASSWORD", "viewer123", Role::Viewer, "System Viewer"),
        ("admin", "ADMIN_PASSWORD", "admin123", Role::Coordinator, "Admin User"),
    ];

    for (username, env_var, fallback, role, full_name) in defaults {
        let password = match std::env::var(env_var) {
            Ok(password) if !password.is_empty() => password,
            _ => {
                tracing::warn!(
                    username,
                    "{env_var} not set — seeding with the development default password"
                );
                fallback.to_string()
            }
        };
        let record = UserRecord {
            username: username.to_string(),
            password_hash: hash_password(&password).map_err(seed_error)?,
            role,
            full_name: full_name.to_string(),
            is_active: true,
        };
        if let Some(pool) = &state.db_pool {
            crate::db::users::insert_user(pool, &record).await?;
        }
        state.users.insert(record.username.clone(), record);
    }

    tracing::info!("seeded default users (coordinator, viewer, admin)");
    Ok(())
}

/// Seed the starter reference fleet: three drivers, three coaches.
pub async fn seed_reference_fleet(state: &AppState) -> anyhow::Result<()> {
    let now = Utc::now();

    let drivers = [
        (1, "John Doe", "123-456-7890"),
        (2, "Jane Smith", "234-567-8901"),
        (3, "Michael Johnson", "345-678-9012"),
    ];
    for (id, name, phone) in drivers {
        let record = DriverRecord {
            id: DriverId::new(id),
            name: name.to_string(),
            phone: phone.to_string(),
            created_at: now,
            updated_at: now,
        };
        if let Some(pool) = &state.db_pool {
            crate::db::reference::insert_driver(pool, &record).await?;
        }
        state.drivers.insert(record.id, record);
    }

    let vehicles = [(1, "ABC123", 50), (2, "XYZ789", 45), (3, "DEF456", 55)];
    for (id, plate, capacity) in vehicles {
        let record = VehicleRecord {
            id: VehicleId::new(id),
            plate: plate.to_string(),
            capacity,
            created_at: now,
            updated_at: now,
        };
        if let Some(pool) = &state.db_pool {
            crate::db::reference::insert_vehicle(pool, &record).await?;
        }
        state.vehicles.insert(record.id, record);
    }

    tracing::info!("seeded reference fleet (3 drivers, 3 vehicles)");
    Ok(())
}

fn seed_error(err: AppError) -> anyhow::Error {
    anyhow::anyhow!("user seeding failed: {err}")
}
