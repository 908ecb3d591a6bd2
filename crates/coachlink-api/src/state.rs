//! # Application State & Entity Store
//!
//! In-memory entity store shared across handlers, plus the `AppState`
//! container Axum threads through every route.
//!
//! The store is authoritative at runtime. Requests and their assignments
//! live behind **one** `RwLock` ([`FleetStore`]) so that a transition's
//! read-validate-write sequence runs as a single critical section:
//! concurrent transitions against the same request serialize, and a
//! half-applied mix of two updates is unrepresentable. Assignments are
//! keyed by their owning request id, which makes a second assignment for
//! the same request unrepresentable too.
//!
//! Reference data (drivers, vehicles) and users change rarely and have no
//! cross-entity invariants, so they use plain `DashMap`s.
//!
//! When a database pool is configured the store is write-through: see the
//! [`crate::db`] module.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use coachlink_core::{AssignmentId, DriverId, RequestId, RequestStatus, Role, VehicleId};
use coachlink_events::EventBus;
use coachlink_state::{ScheduleDetails, TransitionError};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::config::AppConfig;

// ---------------------------------------------------------------------------
// Records (stored shapes)
// ---------------------------------------------------------------------------

/// A stored trip request.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRequestRecord {
    pub id: RequestId,
    pub customer_name: String,
    pub phone: String,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: DateTime<Utc>,
    pub passengers: Option<i32>,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored driver/vehicle assignment. At most one exists per request.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub request_id: RequestId,
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,
    pub scheduled_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored driver.
#[derive(Debug, Clone, Serialize)]
pub struct DriverRecord {
    pub id: DriverId,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored vehicle.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub plate: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored user credential.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    /// Argon2 PHC string, never the plaintext.
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Views (hydrated response shapes)
// ---------------------------------------------------------------------------

/// A driver as it appears nested inside responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverView {
    pub id: i64,
    pub name: String,
    pub phone: String,
}

/// A vehicle as it appears nested inside responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VehicleView {
    pub id: i64,
    pub plate: String,
    pub capacity: i32,
}

/// An assignment hydrated with its driver and vehicle.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignmentView {
    pub id: i64,
    pub request_id: i64,
    pub driver_id: i64,
    pub vehicle_id: i64,
    pub scheduled_time: DateTime<Utc>,
    pub driver: Option<DriverView>,
    pub vehicle: Option<VehicleView>,
}

/// A request hydrated with its assignment (if any).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestView {
    pub id: i64,
    pub customer_name: String,
    pub phone: String,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: DateTime<Utc>,
    pub passengers: Option<i32>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignment: Option<AssignmentView>,
}

// ---------------------------------------------------------------------------
// Fleet store (requests + assignments, one lock)
// ---------------------------------------------------------------------------

/// Fields accepted when creating a request. Status is not among them —
/// new requests are always pending.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub customer_name: String,
    pub phone: String,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub pickup_time: DateTime<Utc>,
    pub passengers: Option<i32>,
    pub notes: Option<String>,
}

/// Whitelisted editable fields on update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RequestEdits {
    pub notes: Option<String>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
}

impl RequestEdits {
    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.pickup_location.is_none() && self.dropoff_location.is_none()
    }
}

/// Filter and pagination parameters for request listings.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Case-insensitive substring match on customer name or phone.
    pub search: Option<String>,
    /// Exact status match.
    pub status: Option<RequestStatus>,
    /// 1-based page number.
    pub page: usize,
    /// Page size, already clamped by the boundary to 1..=100.
    pub limit: usize,
}

/// The result of an applied transition/update.
#[derive(Debug, Clone)]
pub struct TransitionApplied {
    pub old_status: RequestStatus,
    pub request: ServiceRequestRecord,
    pub assignment: Option<AssignmentRecord>,
}

#[derive(Default)]
struct FleetInner {
    requests: HashMap<i64, ServiceRequestRecord>,
    /// Keyed by owning request id — the 1:1 invariant is structural.
    assignments: HashMap<i64, AssignmentRecord>,
    next_request_id: i64,
    next_assignment_id: i64,
}

impl FleetInner {
    fn alloc_request_id(&mut self) -> RequestId {
        self.next_request_id += 1;
        RequestId::new(self.next_request_id)
    }

    fn alloc_assignment_id(&mut self) -> AssignmentId {
        self.next_assignment_id += 1;
        AssignmentId::new(self.next_assignment_id)
    }
}

/// Requests and assignments behind a single lock.
pub struct FleetStore {
    inner: RwLock<FleetInner>,
}

impl FleetStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(FleetInner::default()),
        }
    }

    /// Insert a new request. Always persists as `pending`.
    pub fn create(&self, fields: NewRequest) -> ServiceRequestRecord {
        let now = Utc::now();
        let mut inner = self.inner.write();
        let id = inner.alloc_request_id();
        let record = ServiceRequestRecord {
            id,
            customer_name: fields.customer_name,
            phone: fields.phone,
            pickup_location: fields.pickup_location,
            dropoff_location: fields.dropoff_location,
            pickup_time: fields.pickup_time,
            passengers: fields.passengers,
            notes: fields.notes,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.requests.insert(id.as_i64(), record.clone());
        record
    }

    /// Fetch a request together with its assignment.
    pub fn get(&self, id: RequestId) -> Option<(ServiceRequestRecord, Option<AssignmentRecord>)> {
        let inner = self.inner.read();
        let request = inner.requests.get(&id.as_i64())?.clone();
        let assignment = inner.assignments.get(&id.as_i64()).cloned();
        Some((request, assignment))
    }

    /// Apply a status transition and/or field edits atomically.
    ///
    /// Runs entirely under the write lock: existence check, status write,
    /// and assignment upsert commit together or not at all. The scheduling
    /// gates (driver/vehicle existence, capacity) have already passed by
    /// the time a `schedule` is handed in — see [`crate::transition`].
    ///
    /// The assignment upsert is an explicit two-branch operation: update
    /// the three schedule fields when a row exists, insert otherwise.
    pub fn apply_transition(
        &self,
        id: RequestId,
        target: Option<RequestStatus>,
        schedule: Option<ScheduleDetails>,
        edits: &RequestEdits,
    ) -> Result<TransitionApplied, TransitionError> {
        let now = Utc::now();
        let mut inner = self.inner.write();

        let request = inner
            .requests
            .get(&id.as_i64())
            .cloned()
            .ok_or(TransitionError::NotFound(id))?;
        let old_status = request.status;

        // Upsert the assignment first so a failure cannot leave a
        // scheduled request without one. (Within the lock nothing else
        // observes the intermediate state either way.)
        if let Some(schedule) = schedule {
            match inner.assignments.get_mut(&id.as_i64()) {
                Some(existing) => {
                    existing.driver_id = schedule.driver_id;
                    existing.vehicle_id = schedule.vehicle_id;
                    existing.scheduled_time = schedule.scheduled_time;
                    existing.updated_at = now;
                }
                None => {
                    let assignment_id = inner.alloc_assignment_id();
                    inner.assignments.insert(
                        id.as_i64(),
                        AssignmentRecord {
                            id: assignment_id,
                            request_id: id,
                            driver_id: schedule.driver_id,
                            vehicle_id: schedule.vehicle_id,
                            scheduled_time: schedule.scheduled_time,
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
            }
        }

        let request = inner
            .requests
            .get_mut(&id.as_i64())
            .ok_or(TransitionError::NotFound(id))?;
        if let Some(status) = target {
            request.status = status;
        }
        if let Some(notes) = &edits.notes {
            request.notes = Some(notes.clone());
        }
        if let Some(pickup) = &edits.pickup_location {
            request.pickup_location = Some(pickup.clone());
        }
        if let Some(dropoff) = &edits.dropoff_location {
            request.dropoff_location = Some(dropoff.clone());
        }
        request.updated_at = now;
        let request = request.clone();
        let assignment = inner.assignments.get(&id.as_i64()).cloned();

        Ok(TransitionApplied {
            old_status,
            request,
            assignment,
        })
    }

    /// Delete a request, cascading to its assignment.
    pub fn remove(
        &self,
        id: RequestId,
    ) -> Option<(ServiceRequestRecord, Option<AssignmentRecord>)> {
        let mut inner = self.inner.write();
        let request = inner.requests.remove(&id.as_i64())?;
        let assignment = inner.assignments.remove(&id.as_i64());
        Some((request, assignment))
    }

    /// List requests newest-first with filters and pagination.
    ///
    /// Returns the requested page (with assignments) and the total count
    /// of matching requests across all pages.
    pub fn list(
        &self,
        filter: &ListFilter,
    ) -> (Vec<(ServiceRequestRecord, Option<AssignmentRecord>)>, usize) {
        let inner = self.inner.read();
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let mut matching: Vec<&ServiceRequestRecord> = inner
            .requests
            .values()
            .filter(|r| match filter.status {
                Some(status) => r.status == status,
                None => true,
            })
            .filter(|r| match &needle {
                Some(needle) => {
                    r.customer_name.to_lowercase().contains(needle)
                        || r.phone.to_lowercase().contains(needle)
                }
                None => true,
            })
            .collect();

        // Newest first; id breaks ties for a stable order when several
        // requests share a creation timestamp.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });

        let total = matching.len();
        let offset = filter.page.saturating_sub(1) * filter.limit;
        let page = matching
            .into_iter()
            .skip(offset)
            .take(filter.limit)
            .map(|r| {
                (
                    r.clone(),
                    inner.assignments.get(&r.id.as_i64()).cloned(),
                )
            })
            .collect();
        (page, total)
    }

    /// All requests, unordered. Used by analytics and persistence.
    pub fn all(&self) -> Vec<ServiceRequestRecord> {
        self.inner.read().requests.values().cloned().collect()
    }

    /// Count of stored requests.
    pub fn len(&self) -> usize {
        self.inner.read().requests.len()
    }

    /// Count of stored assignments.
    pub fn assignment_count(&self) -> usize {
        self.inner.read().assignments.len()
    }

    /// Requests per status, for analytics and metrics gauges.
    pub fn status_counts(&self) -> HashMap<RequestStatus, usize> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        for request in inner.requests.values() {
            *counts.entry(request.status).or_insert(0) += 1;
        }
        counts
    }

    /// Restore a request (and optional assignment) loaded from the
    /// database, advancing the id allocators past the loaded ids.
    pub fn restore(&self, request: ServiceRequestRecord, assignment: Option<AssignmentRecord>) {
        let mut inner = self.inner.write();
        inner.next_request_id = inner.next_request_id.max(request.id.as_i64());
        if let Some(assignment) = &assignment {
            inner.next_assignment_id = inner.next_assignment_id.max(assignment.id.as_i64());
        }
        let key = request.id.as_i64();
        inner.requests.insert(key, request);
        if let Some(assignment) = assignment {
            inner.assignments.insert(key, assignment);
        }
    }
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state. Cheaply cloneable — all clones share the
/// same stores, event bus, and configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub fleet: Arc<FleetStore>,
    pub drivers: Arc<DashMap<DriverId, DriverRecord>>,
    pub vehicles: Arc<DashMap<VehicleId, VehicleRecord>>,
    pub users: Arc<DashMap<String, UserRecord>>,
    pub events: EventBus,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Build state with no database pool (in-memory-only mode).
    pub fn new(config: AppConfig) -> Self {
        Self::with_pool(config, None)
    }

    /// Build state with an optional database pool.
    pub fn with_pool(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            config: Arc::new(config),
            fleet: Arc::new(FleetStore::new()),
            drivers: Arc::new(DashMap::new()),
            vehicles: Arc::new(DashMap::new()),
            users: Arc::new(DashMap::new()),
            events: EventBus::new(),
            db_pool,
        }
    }

    /// Hydrate a request record into its response view, resolving the
    /// assignment's driver and vehicle from the reference stores.
    pub fn view(
        &self,
        request: &ServiceRequestRecord,
        assignment: Option<&AssignmentRecord>,
    ) -> RequestView {
        RequestView {
            id: request.id.as_i64(),
            customer_name: request.customer_name.clone(),
            phone: request.phone.clone(),
            pickup_location: request.pickup_location.clone(),
            dropoff_location: request.dropoff_location.clone(),
            pickup_time: request.pickup_time,
            passengers: request.passengers,
            notes: request.notes.clone(),
            status: request.status.as_str().to_string(),
            created_at: request.created_at,
            updated_at: request.updated_at,
            assignment: assignment.map(|a| AssignmentView {
                id: a.id.as_i64(),
                request_id: a.request_id.as_i64(),
                driver_id: a.driver_id.as_i64(),
                vehicle_id: a.vehicle_id.as_i64(),
                scheduled_time: a.scheduled_time,
                driver: self.drivers.get(&a.driver_id).map(|d| DriverView {
                    id: d.id.as_i64(),
                    name: d.name.clone(),
                    phone: d.phone.clone(),
                }),
                vehicle: self.vehicles.get(&a.vehicle_id).map(|v| VehicleView {
                    id: v.id.as_i64(),
                    plate: v.plate.clone(),
                    capacity: v.capacity,
                }),
            }),
        }
    }
}
