//! # coachlink-events — Request Event Broadcaster
//!
//! One [`EventBus`] is constructed per process and handed to every
//! component that publishes or subscribes — there are no ambient globals.
//! The bus wraps `tokio::sync::broadcast`: each subscriber owns an
//! independent FIFO receiver, publishing never blocks on a slow consumer,
//! and a receiver that falls behind misses events rather than stalling the
//! publisher. Freshness matters more than completeness here — consumers
//! treat the entity store as ground truth and reconcile by re-fetching.
//!
//! Delivery is best-effort to present subscribers only: a client that
//! connects after an event was published never sees it (no replay).
//!
//! ## Wire Shape
//!
//! Each published event is wrapped in an [`EventEnvelope`] carrying the
//! event kind, the JSON payload, and the emission timestamp. The SSE route
//! in the API crate turns envelopes into named `event:`/`data:` frames.

use chrono::{DateTime, Utc};
use coachlink_core::{DriverId, RequestId, RequestStatus, VehicleId};
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default broadcast buffer capacity. A subscriber more than this many
/// events behind starts missing events instead of blocking the publisher.
pub const DEFAULT_CAPACITY: usize = 256;

/// What happened to a request, for the generic `requestUpdate` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Created,
    Updated,
    Scheduled,
    Deleted,
}

impl UpdateAction {
    /// The wire tag for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateAction::Created => "created",
            UpdateAction::Updated => "updated",
            UpdateAction::Scheduled => "scheduled",
            UpdateAction::Deleted => "deleted",
        }
    }
}

/// A request lifecycle event, before envelope wrapping.
#[derive(Debug, Clone)]
pub enum RequestEvent {
    /// Any change to a request: creation, field edit, transition, deletion.
    /// Carries the hydrated request as the boundary layer serializes it.
    RequestUpdate {
        action: UpdateAction,
        request: serde_json::Value,
    },
    /// A committed status transition, with schedule extras when the target
    /// was `scheduled`.
    StatusChange {
        request_id: RequestId,
        old_status: RequestStatus,
        new_status: RequestStatus,
        driver_id: Option<DriverId>,
        vehicle_id: Option<VehicleId>,
        scheduled_time: Option<DateTime<Utc>>,
    },
}

impl RequestEvent {
    /// The SSE event name for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestEvent::RequestUpdate { .. } => "requestUpdate",
            RequestEvent::StatusChange { .. } => "statusChange",
        }
    }

    /// Serialize the `data:` payload for this event.
    ///
    /// `statusChange` keys are camelCase and schedule extras are omitted
    /// when absent; `requestUpdate` embeds the hydrated request verbatim.
    fn to_data(&self, emitted_at: DateTime<Utc>) -> serde_json::Value {
        match self {
            RequestEvent::RequestUpdate { action, request } => json!({
                "action": action.as_str(),
                "request": request,
                "timestamp": emitted_at.to_rfc3339(),
            }),
            RequestEvent::StatusChange {
                request_id,
                old_status,
                new_status,
                driver_id,
                vehicle_id,
                scheduled_time,
            } => {
                let mut data = json!({
                    "requestId": request_id.as_i64(),
                    "oldStatus": old_status.as_str(),
                    "newStatus": new_status.as_str(),
                    "timestamp": emitted_at.to_rfc3339(),
                });
                let obj = data.as_object_mut().expect("json! object");
                if let Some(driver_id) = driver_id {
                    obj.insert("driverId".into(), json!(driver_id.as_i64()));
                }
                if let Some(vehicle_id) = vehicle_id {
                    obj.insert("vehicleId".into(), json!(vehicle_id.as_i64()));
                }
                if let Some(time) = scheduled_time {
                    obj.insert("scheduledTime".into(), json!(time.to_rfc3339()));
                }
                data
            }
        }
    }
}

/// A published event as subscribers receive it: kind, payload, timestamp.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    /// Unique event identifier, surfaced as the SSE `id:` field so
    /// reconnecting clients can tell frames apart.
    pub event_id: Uuid,
    /// The SSE event name (`requestUpdate` or `statusChange`).
    pub kind: &'static str,
    /// The serialized `data:` payload.
    pub data: serde_json::Value,
    /// When the event was published.
    pub emitted_at: DateTime<Utc>,
}

/// Broadcast bus distributing [`EventEnvelope`]s to all live subscribers.
///
/// Cheap to clone; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with the given buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a bus with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Publish an event to every current subscriber.
    ///
    /// Fire-and-forget: with no subscribers the event is dropped silently,
    /// and a send failure is never surfaced to the publisher.
    pub fn publish(&self, event: RequestEvent) {
        let emitted_at = Utc::now();
        let envelope = EventEnvelope {
            event_id: Uuid::new_v4(),
            kind: event.kind(),
            data: event.to_data(emitted_at),
            emitted_at,
        };
        tracing::debug!(
            kind = envelope.kind,
            subscribers = self.tx.receiver_count(),
            "broadcasting request event"
        );
        let _ = self.tx.send(envelope);
    }

    /// Register a new subscriber. Events published after this call reach
    /// the returned receiver in publish order; earlier events do not.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Number of currently-registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_change(id: i64) -> RequestEvent {
        RequestEvent::StatusChange {
            request_id: RequestId::new(id),
            old_status: RequestStatus::Pending,
            new_status: RequestStatus::Approved,
            driver_id: None,
            vehicle_id: None,
            scheduled_time: None,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::with_capacity(32);
        let mut rx = bus.subscribe();

        bus.publish(status_change(7));

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.kind, "statusChange");
        assert_eq!(envelope.data["requestId"], 7);
        assert_eq!(envelope.data["oldStatus"], "pending");
        assert_eq!(envelope.data["newStatus"], "approved");
        assert!(envelope.data.get("driverId").is_none());
    }

    #[tokio::test]
    async fn all_subscribers_see_every_event_in_order() {
        let bus = EventBus::with_capacity(32);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(status_change(1));
        bus.publish(status_change(2));

        for rx in [&mut rx1, &mut rx2] {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            assert_eq!(first.data["requestId"], 1);
            assert_eq!(second.data["requestId"], 2);
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::with_capacity(32);
        bus.publish(status_change(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_leaves_the_registry() {
        let bus = EventBus::with_capacity(32);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);

        // Publishing after the drop must not fail.
        bus.publish(status_change(1));
    }

    #[tokio::test]
    async fn schedule_extras_appear_when_present() {
        let bus = EventBus::with_capacity(32);
        let mut rx = bus.subscribe();

        bus.publish(RequestEvent::StatusChange {
            request_id: RequestId::new(3),
            old_status: RequestStatus::Approved,
            new_status: RequestStatus::Scheduled,
            driver_id: Some(DriverId::new(1)),
            vehicle_id: Some(VehicleId::new(2)),
            scheduled_time: Some(Utc::now()),
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.data["driverId"], 1);
        assert_eq!(envelope.data["vehicleId"], 2);
        assert!(envelope.data.get("scheduledTime").is_some());
    }

    #[tokio::test]
    async fn request_update_embeds_the_request() {
        let bus = EventBus::with_capacity(32);
        let mut rx = bus.subscribe();

        bus.publish(RequestEvent::RequestUpdate {
            action: UpdateAction::Created,
            request: serde_json::json!({"id": 9, "status": "pending"}),
        });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.kind, "requestUpdate");
        assert_eq!(envelope.data["action"], "created");
        assert_eq!(envelope.data["request"]["id"], 9);
    }
}
