//! Status-derived views. Each view is a filter plus a sort over whatever
//! bookings the caller fetched; none of them ever fails on an empty input.

use chrono::{DateTime, NaiveDate, Utc};
use eventeq_core::identity::UserProfile;
use serde::Serialize;
use std::cmp::Reverse;
use uuid::Uuid;

use crate::dates;
use crate::models::{Booking, BookingStatus, LineItem};

pub const UPCOMING_STATUSES: [BookingStatus; 2] = [BookingStatus::Unpaid, BookingStatus::Upcoming];
pub const ACTIVE_STATUSES: [BookingStatus; 2] = [BookingStatus::Active, BookingStatus::Retrieved];
pub const ENDED_STATUSES: [BookingStatus; 4] = [
    BookingStatus::Returned,
    BookingStatus::Cancelled,
    BookingStatus::NotPickedUp,
    BookingStatus::Overdue,
];

fn keep_statuses(bookings: Vec<Booking>, statuses: &[BookingStatus]) -> Vec<Booking> {
    bookings
        .into_iter()
        .filter(|b| statuses.contains(&b.status))
        .collect()
}

/// Unpaid or Upcoming bookings starting strictly after `now`, soonest first.
pub fn upcoming(bookings: Vec<Booking>, now: DateTime<Utc>) -> Vec<Booking> {
    let mut view: Vec<Booking> = keep_statuses(bookings, &UPCOMING_STATUSES)
        .into_iter()
        .filter(|b| b.start_instant() > now)
        .collect();
    view.sort_by_key(|b| (b.start_date, b.created_at));
    view
}

/// Active or Retrieved bookings, soonest start first.
pub fn active(bookings: Vec<Booking>) -> Vec<Booking> {
    let mut view = keep_statuses(bookings, &ACTIVE_STATUSES);
    view.sort_by_key(|b| (b.start_date, b.created_at));
    view
}

/// Finished bookings, most recently changed first.
pub fn ended(bookings: Vec<Booking>) -> Vec<Booking> {
    let mut view = keep_statuses(bookings, &ENDED_STATUSES);
    view.sort_by_key(|b| Reverse(b.updated_at));
    view
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookedBy {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub no_phone: String,
}

impl From<&UserProfile> for BookedBy {
    fn from(user: &UserProfile) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.expose().clone(),
            no_phone: user
                .phone
                .as_ref()
                .map(|p| p.expose().clone())
                .unwrap_or_default(),
        }
    }
}

/// A booking as seen by the owner of its items.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerBookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub booked_by: Option<BookedBy>,
}

/// Owner's bookings, newest first. Requesters are resolved through `lookup`;
/// an unresolved requester leaves `booked_by` empty.
pub fn for_owner<F>(bookings: Vec<Booking>, mut lookup: F) -> Vec<OwnerBookingView>
where
    F: FnMut(Uuid) -> Option<BookedBy>,
{
    let mut sorted = bookings;
    sorted.sort_by_key(|b| Reverse(b.created_at));
    sorted
        .into_iter()
        .map(|booking| {
            let booked_by = lookup(booking.requester_id);
            OwnerBookingView { booking, booked_by }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemBookingView {
    pub id: Uuid,
    pub items: Vec<LineItem>,
    #[serde(with = "dates::dmy")]
    pub start_date: NaiveDate,
    #[serde(with = "dates::dmy")]
    pub end_date: NaiveDate,
    pub duration: i64,
    pub created_at: DateTime<Utc>,
}

/// Returned bookings that contained `item_id`, reduced to the matching line
/// items, latest start first.
pub fn by_item(bookings: Vec<Booking>, item_id: Uuid) -> Vec<ItemBookingView> {
    let mut view: Vec<ItemBookingView> = bookings
        .into_iter()
        .filter(|b| b.status == BookingStatus::Returned)
        .filter_map(|b| {
            let duration = b.duration_days();
            let items: Vec<LineItem> = b.items.into_iter().filter(|l| l.item_id == item_id).collect();
            if items.is_empty() {
                return None;
            }
            Some(ItemBookingView {
                id: b.id,
                items,
                start_date: b.start_date,
                end_date: b.end_date,
                duration,
                created_at: b.created_at,
            })
        })
        .collect();
    view.sort_by_key(|v| Reverse(v.start_date));
    view
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemFeedbackView {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

/// Non-empty feedback left on Returned bookings of `item_id`, newest first.
pub fn feedbacks_for_item(bookings: Vec<Booking>, item_id: Uuid) -> Vec<ItemFeedbackView> {
    let mut view: Vec<ItemFeedbackView> = bookings
        .into_iter()
        .filter(|b| b.status == BookingStatus::Returned && b.contains_item(item_id))
        .filter_map(|b| {
            let feedback = b.feedback.filter(|f| !f.is_empty())?;
            Some(ItemFeedbackView {
                booking_id: b.id,
                user_id: b.requester_id,
                rating: feedback.rating,
                review: feedback.review,
                created_at: feedback.created_at,
            })
        })
        .collect();
    view.sort_by_key(|v| Reverse(v.created_at));
    view
}
