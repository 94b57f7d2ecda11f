use chrono::{DateTime, NaiveDate, Utc};
use eventeq_core::payment::BillStatus;
use eventeq_shared::models::BookingEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::dates;

/// Booking status in the lifecycle. Persisted as the legacy signed codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Unpaid,
    Upcoming,
    Active,
    Retrieved,
    Returned,
    Cancelled,
    NotPickedUp,
    Overdue,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 8] = [
        BookingStatus::Unpaid,
        BookingStatus::Upcoming,
        BookingStatus::Active,
        BookingStatus::Retrieved,
        BookingStatus::Returned,
        BookingStatus::Cancelled,
        BookingStatus::NotPickedUp,
        BookingStatus::Overdue,
    ];

    pub fn code(&self) -> i16 {
        match self {
            BookingStatus::Unpaid => -1,
            BookingStatus::Upcoming => 0,
            BookingStatus::Active => 1,
            BookingStatus::Retrieved => 2,
            BookingStatus::Returned => 3,
            BookingStatus::Cancelled => 4,
            BookingStatus::NotPickedUp => 5,
            BookingStatus::Overdue => 6,
        }
    }

    /// Code 7 was an alternate "unpaid, expired" marker in older rows.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            -1 => Some(BookingStatus::Unpaid),
            0 => Some(BookingStatus::Upcoming),
            1 => Some(BookingStatus::Active),
            2 => Some(BookingStatus::Retrieved),
            3 => Some(BookingStatus::Returned),
            4 => Some(BookingStatus::Cancelled),
            5 => Some(BookingStatus::NotPickedUp),
            6 | 7 => Some(BookingStatus::Overdue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Unpaid => "unpaid",
            BookingStatus::Upcoming => "upcoming",
            BookingStatus::Active => "active",
            BookingStatus::Retrieved => "retrieved",
            BookingStatus::Returned => "returned",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NotPickedUp => "not_picked_up",
            BookingStatus::Overdue => "overdue",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Returned | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a catalog item taken when the booking was made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    #[serde(rename = "id")]
    pub item_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    /// Filled from the catalog on single-booking reads; never persisted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub rating: u8,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn is_empty(&self) -> bool {
        self.rating == 0 && self.review.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub items: Vec<LineItem>,
    #[serde(with = "dates::dmy")]
    pub start_date: NaiveDate,
    #[serde(with = "dates::dmy")]
    pub end_date: NaiveDate,
    pub sub_total: f64,
    pub service_fee: f64,
    pub grand_total: f64,
    pub status: BookingStatus,
    pub bill_code: String,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn duration_days(&self) -> i64 {
        dates::duration_days(self.start_date, self.end_date)
    }

    pub fn start_instant(&self) -> DateTime<Utc> {
        dates::start_instant(self.start_date)
    }

    pub fn contains_item(&self, item_id: Uuid) -> bool {
        self.items.iter().any(|line| line.item_id == item_id)
    }

    pub fn has_bill(&self) -> bool {
        !self.bill_code.is_empty()
    }
}

/// A status change that was actually written.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub booking_id: Uuid,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    pub fn of(booking: &Booking, to: BookingStatus, at: DateTime<Utc>) -> Self {
        Self {
            booking_id: booking.id,
            requester_id: booking.requester_id,
            owner_id: booking.owner_id,
            from: booking.status,
            to,
            at,
        }
    }

    pub fn to_event(&self) -> BookingEvent {
        BookingEvent::StatusChanged {
            booking_id: self.booking_id,
            requester_id: self.requester_id,
            owner_id: self.owner_id,
            from: self.from.as_str().to_string(),
            to: self.to.as_str().to_string(),
            at: self.at,
        }
    }
}

/// Gateway-side record of a booking's bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub booking_id: Uuid,
    pub bill_code: String,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn pending(booking_id: Uuid, bill_code: String, now: DateTime<Utc>) -> Self {
        Self {
            booking_id,
            bill_code,
            status: BillStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_stable() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(BookingStatus::from_code(7), Some(BookingStatus::Overdue));
        assert_eq!(BookingStatus::from_code(8), None);
        assert_eq!(BookingStatus::Unpaid.code(), -1);
    }

    #[test]
    fn booking_serializes_legacy_field_names() {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            items: vec![],
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            sub_total: 100.0,
            service_fee: 5.0,
            grand_total: 105.0,
            status: BookingStatus::NotPickedUp,
            bill_code: String::new(),
            feedback: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["user_id"], booking.requester_id.to_string());
        assert_eq!(json["start_date"], "01/06/2025");
        assert_eq!(json["status"], "not_picked_up");
        assert_eq!(booking.duration_days(), 3);
    }
}
