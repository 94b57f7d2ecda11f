use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain events emitted by the booking lifecycle. Statuses travel as their
/// snake_case names so consumers need not depend on the booking crate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    Created {
        booking_id: Uuid,
        requester_id: Uuid,
        owner_id: Uuid,
        grand_total: f64,
        bill_code: String,
        at: DateTime<Utc>,
    },
    Paid {
        booking_id: Uuid,
        requester_id: Uuid,
        owner_id: Uuid,
        bill_code: String,
        at: DateTime<Utc>,
    },
    StatusChanged {
        booking_id: Uuid,
        requester_id: Uuid,
        owner_id: Uuid,
        from: String,
        to: String,
        at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEventKind {
    Created,
    Paid,
    StatusChanged,
}

impl BookingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEventKind::Created => "booking_created",
            BookingEventKind::Paid => "booking_paid",
            BookingEventKind::StatusChanged => "booking_status_changed",
        }
    }
}

impl BookingEvent {
    pub fn kind(&self) -> BookingEventKind {
        match self {
            BookingEvent::Created { .. } => BookingEventKind::Created,
            BookingEvent::Paid { .. } => BookingEventKind::Paid,
            BookingEvent::StatusChanged { .. } => BookingEventKind::StatusChanged,
        }
    }

    pub fn booking_id(&self) -> Uuid {
        match self {
            BookingEvent::Created { booking_id, .. }
            | BookingEvent::Paid { booking_id, .. }
            | BookingEvent::StatusChanged { booking_id, .. } => *booking_id,
        }
    }

    /// Users allowed to observe this event: the requester and the item owner.
    pub fn requester_id(&self) -> Uuid {
        match self {
            BookingEvent::Created { requester_id, .. }
            | BookingEvent::Paid { requester_id, .. }
            | BookingEvent::StatusChanged { requester_id, .. } => *requester_id,
        }
    }

    pub fn audience(&self) -> [Uuid; 2] {
        match self {
            BookingEvent::Created { requester_id, owner_id, .. }
            | BookingEvent::Paid { requester_id, owner_id, .. }
            | BookingEvent::StatusChanged { requester_id, owner_id, .. } => {
                [*requester_id, *owner_id]
            }
        }
    }

    pub fn concerns(&self, user_id: Uuid) -> bool {
        self.audience().contains(&user_id)
    }
}
