//! # Status Transition Engine
//!
//! Applies a requested status change (and whitelisted field edits) to a
//! trip request: runs every validation gate, commits the mutation
//! atomically against the fleet store, writes through to the database
//! when one is configured, and only then notifies subscribers.
//!
//! The gate order is fixed and nothing mutates until every gate has
//! passed:
//!
//! 1. the request exists;
//! 2. (boundary) the target status parsed into the four-value enum;
//! 3. for `scheduled`: the schedule triple is complete, the driver and
//!    vehicle exist, and the vehicle seats the request's passengers.
//!
//! A storage failure after the in-memory commit is surfaced as a 500 and
//! suppresses the notifications — subscribers never hear about a change
//! the database may not hold.

use coachlink_core::{RequestId, RequestStatus};
use coachlink_events::{RequestEvent, UpdateAction};
use coachlink_state::{check_capacity, complete_schedule, ScheduleFields, TransitionError};

use crate::error::AppError;
use crate::state::{AppState, RequestEdits, RequestView};

/// A parsed, not-yet-validated transition/update command.
#[derive(Debug, Clone, Default)]
pub struct TransitionCommand {
    /// Target status, when the update includes one.
    pub target: Option<RequestStatus>,
    /// Raw schedule fields; only consulted when `target` is `scheduled`.
    pub schedule_fields: ScheduleFields,
    /// Whitelisted field edits applied alongside.
    pub edits: RequestEdits,
}

/// Validate and apply a transition, returning the hydrated request.
pub async fn apply(
    state: &AppState,
    id: RequestId,
    cmd: TransitionCommand,
) -> Result<RequestView, AppError> {
    // Gate 1: the request must exist. Also snapshots the passenger count
    // for the capacity gate; passengers are not editable, so the snapshot
    // cannot go stale before the atomic apply below.
    let (request, _) = state
        .fleet
        .get(id)
        .ok_or(TransitionError::NotFound(id))?;

    // Gate 3: scheduling requirements.
    let schedule = match cmd.target {
        Some(RequestStatus::Scheduled) => {
            let details = complete_schedule(&cmd.schedule_fields)?;
            if !state.drivers.contains_key(&details.driver_id) {
                return Err(TransitionError::DriverNotFound(details.driver_id).into());
            }
            let capacity = state
                .vehicles
                .get(&details.vehicle_id)
                .map(|v| v.capacity)
                .ok_or(TransitionError::VehicleNotFound(details.vehicle_id))?;
            check_capacity(request.passengers, capacity)?;
            Some(details)
        }
        _ => None,
    };

    // Commit atomically. A concurrent delete between the gate checks and
    // here surfaces as NotFound from the store.
    let applied = state
        .fleet
        .apply_transition(id, cmd.target, schedule, &cmd.edits)?;

    // Write-through persistence. Failure aborts the operation from the
    // caller's perspective and suppresses notifications; the in-memory
    // state may run ahead of the database until the client retries.
    if let Some(pool) = &state.db_pool {
        let result = async {
            crate::db::requests::update(pool, &applied.request).await?;
            if let Some(assignment) = &applied.assignment {
                crate::db::requests::upsert_assignment(pool, assignment).await?;
            }
            Ok::<(), sqlx::Error>(())
        }
        .await;
        if let Err(e) = result {
            tracing::error!(request_id = %id, error = %e, "failed to persist transition");
            return Err(TransitionError::Storage(e.to_string()).into());
        }
    }

    let view = state.view(&applied.request, applied.assignment.as_ref());

    // Notify subscribers: one statusChange per transition, plus the
    // generic requestUpdate stream.
    if let Some(new_status) = cmd.target {
        state.events.publish(RequestEvent::StatusChange {
            request_id: id,
            old_status: applied.old_status,
            new_status,
            driver_id: applied.assignment.as_ref().map(|a| a.driver_id),
            vehicle_id: applied.assignment.as_ref().map(|a| a.vehicle_id),
            scheduled_time: applied.assignment.as_ref().map(|a| a.scheduled_time),
        });
    }
    let action = match cmd.target {
        Some(RequestStatus::Scheduled) => UpdateAction::Scheduled,
        _ => UpdateAction::Updated,
    };
    match serde_json::to_value(&view) {
        Ok(request_json) => state.events.publish(RequestEvent::RequestUpdate {
            action,
            request: request_json,
        }),
        Err(e) => tracing::error!(request_id = %id, error = %e, "failed to serialize request view"),
    }

    tracing::info!(
        request_id = %id,
        old_status = %applied.old_status,
        new_status = cmd.target.map(|s| s.as_str()).unwrap_or("unchanged"),
        "request transition committed"
    );

    Ok(view)
}
