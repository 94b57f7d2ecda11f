//! The lazy refresh pass: advances time-driven statuses before any
//! status-dependent read, and from the optional background worker.

use chrono::{DateTime, Utc};
use eventeq_core::BoxError;

use crate::lifecycle;
use crate::models::{BookingStatus, StatusChange};
use crate::repository::{BookingFilter, BookingRepository};

/// Scan order matters: Active first, then Upcoming, then Unpaid.
pub const REFRESH_PHASES: [BookingStatus; 3] = [
    BookingStatus::Active,
    BookingStatus::Upcoming,
    BookingStatus::Unpaid,
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    pub changes: Vec<StatusChange>,
    /// Bookings whose status moved under us between the scan and the write.
    pub lost_races: usize,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

pub async fn run_refresh_pass(
    repo: &dyn BookingRepository,
    now: DateTime<Utc>,
) -> Result<RefreshReport, BoxError> {
    let mut report = RefreshReport::default();

    for phase in REFRESH_PHASES {
        let candidates = repo.find(&BookingFilter::with_statuses(&[phase])).await?;

        for booking in candidates {
            let target = lifecycle::settle(booking.status, booking.start_date, booking.end_date, now);
            if target == booking.status {
                continue;
            }

            if repo.transition(booking.id, &[booking.status], target, now).await? {
                tracing::info!(
                    booking_id = %booking.id,
                    from = %booking.status,
                    to = %target,
                    "Booking status advanced by refresh"
                );
                report.changes.push(StatusChange::of(&booking, target, now));
            } else {
                tracing::debug!(booking_id = %booking.id, "Refresh lost race, status already changed");
                report.lost_races += 1;
            }
        }
    }

    Ok(report)
}
