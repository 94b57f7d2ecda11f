use chrono::{DateTime, NaiveDate, Utc};

use crate::dates;
use crate::error::BookingError;
use crate::models::BookingStatus;

/// Every legal status change. Terminal states (Returned, Cancelled) are never a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Unpaid → Upcoming, on a successful gateway callback.
    ConfirmPayment,
    /// Upcoming → Active, once the start date begins.
    Activate,
    /// Active → NotPickedUp, once the end date has passed without a handover.
    MarkNotPickedUp,
    /// Unpaid → Overdue, once the grace window after the start boundary elapsed.
    MarkOverdue,
    /// Active → Retrieved, owner confirms handover.
    Retrieve,
    /// Retrieved → Returned, owner confirms the item came back.
    Return,
    Cancel,
}

impl Transition {
    pub fn target(&self) -> BookingStatus {
        match self {
            Transition::ConfirmPayment => BookingStatus::Upcoming,
            Transition::Activate => BookingStatus::Active,
            Transition::MarkNotPickedUp => BookingStatus::NotPickedUp,
            Transition::MarkOverdue => BookingStatus::Overdue,
            Transition::Retrieve => BookingStatus::Retrieved,
            Transition::Return => BookingStatus::Returned,
            Transition::Cancel => BookingStatus::Cancelled,
        }
    }

    pub fn sources(&self) -> &'static [BookingStatus] {
        match self {
            Transition::ConfirmPayment | Transition::MarkOverdue => &[BookingStatus::Unpaid],
            Transition::Activate => &[BookingStatus::Upcoming],
            Transition::MarkNotPickedUp | Transition::Retrieve => &[BookingStatus::Active],
            Transition::Return => &[BookingStatus::Retrieved],
            Transition::Cancel => &[
                BookingStatus::Unpaid,
                BookingStatus::Upcoming,
                BookingStatus::Active,
                BookingStatus::Retrieved,
            ],
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            Transition::Activate | Transition::MarkNotPickedUp | Transition::MarkOverdue
        )
    }

    pub fn allows(&self, from: BookingStatus) -> bool {
        self.sources().contains(&from)
    }

    /// Validate `from` and return the resulting status.
    pub fn apply(&self, from: BookingStatus) -> Result<BookingStatus, BookingError> {
        if !self.allows(from) {
            return Err(BookingError::InvalidTransition {
                from,
                to: self.target(),
            });
        }
        Ok(self.target())
    }
}

/// The time-driven transition due for a booking at `now`, if any.
pub fn timed_transition(
    status: BookingStatus,
    start: NaiveDate,
    end: NaiveDate,
    now: DateTime<Utc>,
) -> Option<Transition> {
    match status {
        BookingStatus::Active if dates::local_today(now) > end => Some(Transition::MarkNotPickedUp),
        BookingStatus::Upcoming if now >= dates::start_instant(start) => Some(Transition::Activate),
        BookingStatus::Unpaid if now >= dates::unpaid_deadline(start) => Some(Transition::MarkOverdue),
        _ => None,
    }
}

/// Apply timed transitions until none is due. An Upcoming booking whose end
/// date already passed settles directly at NotPickedUp.
pub fn settle(
    status: BookingStatus,
    start: NaiveDate,
    end: NaiveDate,
    now: DateTime<Utc>,
) -> BookingStatus {
    let mut current = status;
    for _ in 0..BookingStatus::ALL.len() {
        match timed_transition(current, start, end, now) {
            Some(transition) => current = transition.target(),
            None => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// `hours` past region midnight of the given day, as a UTC instant.
    fn local(d: u32, m: u32, y: i32, hours: i64) -> DateTime<Utc> {
        dates::start_instant(date(d, m, y)) + Duration::hours(hours)
    }

    #[test]
    fn test_booking_lifecycle() {
        let mut status = BookingStatus::Unpaid;

        status = Transition::ConfirmPayment.apply(status).unwrap();
        assert_eq!(status, BookingStatus::Upcoming);

        status = Transition::Activate.apply(status).unwrap();
        assert_eq!(status, BookingStatus::Active);

        status = Transition::Retrieve.apply(status).unwrap();
        assert_eq!(status, BookingStatus::Retrieved);

        status = Transition::Return.apply(status).unwrap();
        assert_eq!(status, BookingStatus::Returned);
    }

    #[test]
    fn test_invalid_transition() {
        let err = Transition::Return.apply(BookingStatus::Active).unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: BookingStatus::Active,
                to: BookingStatus::Returned
            }
        ));
        assert!(Transition::ConfirmPayment.apply(BookingStatus::Overdue).is_err());
        assert!(Transition::Retrieve.apply(BookingStatus::Upcoming).is_err());
    }

    #[test]
    fn cancel_only_from_open_states() {
        for status in BookingStatus::ALL {
            let result = Transition::Cancel.apply(status);
            let open = matches!(
                status,
                BookingStatus::Unpaid
                    | BookingStatus::Upcoming
                    | BookingStatus::Active
                    | BookingStatus::Retrieved
            );
            assert_eq!(result.is_ok(), open, "cancel from {}", status);
        }
    }

    #[test]
    fn terminal_states_have_no_exit() {
        let all = [
            Transition::ConfirmPayment,
            Transition::Activate,
            Transition::MarkNotPickedUp,
            Transition::MarkOverdue,
            Transition::Retrieve,
            Transition::Return,
            Transition::Cancel,
        ];
        for transition in all {
            assert!(!transition.allows(BookingStatus::Returned));
            assert!(!transition.allows(BookingStatus::Cancelled));
        }
    }

    #[test]
    fn upcoming_activates_at_region_midnight() {
        let start = date(1, 6, 2025);
        let end = date(3, 6, 2025);
        let just_before = local(1, 6, 2025, 0) - Duration::seconds(1);

        assert_eq!(timed_transition(BookingStatus::Upcoming, start, end, just_before), None);
        assert_eq!(
            timed_transition(BookingStatus::Upcoming, start, end, local(1, 6, 2025, 0)),
            Some(Transition::Activate)
        );
    }

    #[test]
    fn active_not_picked_up_only_after_end_day() {
        let start = date(1, 6, 2025);
        let end = date(3, 6, 2025);

        assert_eq!(timed_transition(BookingStatus::Active, start, end, local(3, 6, 2025, 23)), None);
        assert_eq!(
            timed_transition(BookingStatus::Active, start, end, local(4, 6, 2025, 0)),
            Some(Transition::MarkNotPickedUp)
        );
    }

    #[test]
    fn unpaid_goes_overdue_not_active() {
        let start = date(1, 6, 2025);
        let end = date(3, 6, 2025);

        assert_eq!(settle(BookingStatus::Unpaid, start, end, local(1, 6, 2025, 5)), BookingStatus::Unpaid);
        assert_eq!(settle(BookingStatus::Unpaid, start, end, local(1, 6, 2025, 7)), BookingStatus::Overdue);
    }

    #[test]
    fn settle_reaches_fixed_point() {
        let start = date(1, 6, 2025);
        let end = date(3, 6, 2025);
        let now = local(10, 6, 2025, 12);

        let settled = settle(BookingStatus::Upcoming, start, end, now);
        assert_eq!(settled, BookingStatus::NotPickedUp);
        assert_eq!(settle(settled, start, end, now), settled);
        assert_eq!(settle(BookingStatus::Retrieved, start, end, now), BookingStatus::Retrieved);
    }

    #[test]
    fn single_day_booking() {
        let day = date(1, 6, 2025);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 4, 0, 0).unwrap();
        assert_eq!(settle(BookingStatus::Upcoming, day, day, now), BookingStatus::Active);
        assert_eq!(dates::duration_days(day, day), 1);
    }
}
