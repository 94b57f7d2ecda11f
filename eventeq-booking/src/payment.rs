use eventeq_core::identity::UserProfile;
use eventeq_core::payment::{BillRequest, BillStatus};
use eventeq_shared::models::BookingEvent;

use crate::error::BookingError;
use crate::models::{Booking, BookingStatus, PaymentRecord, StatusChange};
use crate::service::BookingService;

/// What a gateway notification did to the booking it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Unpaid → Upcoming happened now.
    Confirmed,
    /// Duplicate success for a booking already paid.
    AlreadyConfirmed,
    /// Success arrived after the booking left Unpaid for another reason.
    Late(BookingStatus),
    /// Pending or failed payment; the booking stays Unpaid.
    NotPaid(BillStatus),
    /// No booking carries this bill code. Nothing was written.
    UnknownBill,
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Confirmed => "confirmed",
            PaymentOutcome::AlreadyConfirmed => "duplicate",
            PaymentOutcome::Late(_) => "late",
            PaymentOutcome::NotPaid(BillStatus::Pending) => "pending",
            PaymentOutcome::NotPaid(_) => "failed",
            PaymentOutcome::UnknownBill => "unknown_bill",
        }
    }
}

/// Grand total in minor currency units.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn bill_request(booking: &Booking, requester: &UserProfile) -> BillRequest {
    BillRequest {
        booking_id: booking.id,
        amount_minor: to_minor_units(booking.grand_total),
        description: format!("Booking ID: {} for {}", booking.id, requester.full_name()),
        payer_name: requester.full_name(),
        payer_email: requester.email.expose().clone(),
        payer_phone: requester
            .phone
            .as_ref()
            .map(|p| p.expose().clone())
            .unwrap_or_default(),
    }
}

/// Statuses a booking can only reach after its payment succeeded.
fn is_paid(status: BookingStatus) -> bool {
    matches!(
        status,
        BookingStatus::Upcoming
            | BookingStatus::Active
            | BookingStatus::Retrieved
            | BookingStatus::Returned
            | BookingStatus::NotPickedUp
    )
}

impl BookingService {
    /// Open the bill for a freshly inserted booking and persist its code.
    pub(crate) async fn issue_bill(
        &self,
        booking: &Booking,
        requester: &UserProfile,
    ) -> Result<String, BookingError> {
        let request = bill_request(booking, requester);
        let bill_code = match tokio::time::timeout(self.config.gateway_timeout, self.gateway.create_bill(&request)).await
        {
            Ok(Ok(code)) => code,
            Ok(Err(e)) => {
                tracing::error!(booking_id = %booking.id, "Bill creation failed: {}", e);
                return Err(BookingError::gateway(e));
            }
            Err(_) => return Err(BookingError::Timeout("bill creation")),
        };

        let now = self.clock.now();
        let stored = self
            .bounded("store bill code", self.repo.set_bill_code(booking.id, &bill_code, now))
            .await?;
        if !stored {
            tracing::warn!(booking_id = %booking.id, "Booking already carries a bill code, keeping it");
        }
        self.bounded(
            "store payment record",
            self.repo.save_payment(&PaymentRecord::pending(booking.id, bill_code.clone(), now)),
        )
        .await?;

        tracing::info!(booking_id = %booking.id, bill_code = %bill_code, "Bill issued");
        Ok(bill_code)
    }

    /// Apply a gateway callback. Safe to deliver any number of times: the
    /// booking only moves through a compare-and-set on Unpaid.
    pub async fn handle_payment_callback(
        &self,
        bill_code: &str,
        raw_status: &str,
    ) -> Result<PaymentOutcome, BookingError> {
        let repo = &self.repo;
        let found = self
            .read("find booking by bill", move || repo.find_by_bill_code(bill_code))
            .await?;
        let Some(booking) = found else {
            tracing::warn!(bill_code = %bill_code, "Payment callback for unknown bill ignored");
            return Ok(PaymentOutcome::UnknownBill);
        };

        match BillStatus::from_code(raw_status) {
            Some(BillStatus::Success) => self.confirm_payment(booking).await,
            other => self.reject_payment(booking, other.unwrap_or(BillStatus::Failed)).await,
        }
    }

    /// Ask the gateway for a bill's latest status and apply it like a callback.
    pub async fn reconcile_payment(&self, bill_code: &str) -> Result<PaymentOutcome, BookingError> {
        let repo = &self.repo;
        let booking = self
            .read("find booking by bill", move || repo.find_by_bill_code(bill_code))
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("bill {}", bill_code)))?;

        let status = match tokio::time::timeout(self.config.gateway_timeout, self.gateway.bill_status(bill_code)).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(BookingError::gateway(e)),
            Err(_) => return Err(BookingError::Timeout("bill status lookup")),
        };

        match status {
            Some(BillStatus::Success) => self.confirm_payment(booking).await,
            Some(other) => self.reject_payment(booking, other).await,
            None => Ok(PaymentOutcome::NotPaid(BillStatus::Pending)),
        }
    }

    /// Record a pending or failed bill. A booking that already moved past
    /// Unpaid keeps its Success record; the late report is dropped.
    async fn reject_payment(&self, booking: Booking, status: BillStatus) -> Result<PaymentOutcome, BookingError> {
        if is_paid(booking.status) {
            tracing::warn!(
                booking_id = %booking.id,
                bill_status = ?status,
                "Stale payment status for a paid booking ignored"
            );
            return Ok(PaymentOutcome::AlreadyConfirmed);
        }
        self.record_payment(&booking.bill_code, status).await?;
        tracing::info!(
            booking_id = %booking.id,
            bill_status = ?status,
            "Payment not completed, booking stays {}",
            booking.status
        );
        Ok(PaymentOutcome::NotPaid(status))
    }

    async fn record_payment(&self, bill_code: &str, status: BillStatus) -> Result<(), BookingError> {
        let now = self.clock.now();
        let updated = self
            .bounded("update payment record", self.repo.update_payment(bill_code, status, now))
            .await?;
        if !updated {
            tracing::warn!(bill_code = %bill_code, "No payment record to update");
        }
        Ok(())
    }

    async fn confirm_payment(&self, booking: Booking) -> Result<PaymentOutcome, BookingError> {
        let now = self.clock.now();
        let mut status = booking.status;

        if status == BookingStatus::Unpaid {
            let moved = self
                .bounded(
                    "confirm payment",
                    self.repo
                        .transition(booking.id, &[BookingStatus::Unpaid], BookingStatus::Upcoming, now),
                )
                .await?;
            if moved {
                self.record_payment(&booking.bill_code, BillStatus::Success).await?;
                tracing::info!(booking_id = %booking.id, "Payment confirmed, booking upcoming");
                self.publish(StatusChange::of(&booking, BookingStatus::Upcoming, now).to_event())
                    .await;
                self.publish(BookingEvent::Paid {
                    booking_id: booking.id,
                    requester_id: booking.requester_id,
                    owner_id: booking.owner_id,
                    bill_code: booking.bill_code.clone(),
                    at: now,
                })
                .await;
                return Ok(PaymentOutcome::Confirmed);
            }
            // Lost the race; see where the booking went.
            status = self.load(booking.id).await?.status;
        }

        self.record_payment(&booking.bill_code, BillStatus::Success).await?;
        if is_paid(status) {
            tracing::info!(booking_id = %booking.id, "Duplicate payment confirmation ignored");
            Ok(PaymentOutcome::AlreadyConfirmed)
        } else {
            tracing::warn!(
                booking_id = %booking.id,
                status = %status,
                "Payment succeeded after booking left unpaid, needs manual follow-up"
            );
            Ok(PaymentOutcome::Late(status))
        }
    }
}
