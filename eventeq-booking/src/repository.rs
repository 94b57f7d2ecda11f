use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventeq_core::payment::BillStatus;
use eventeq_core::BoxError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Feedback, PaymentRecord};

/// Conjunctive filter; `None` / empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    pub requester_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub statuses: Vec<BookingStatus>,
}

impl BookingFilter {
    pub fn with_statuses(statuses: &[BookingStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    pub fn requester(mut self, id: Uuid) -> Self {
        self.requester_id = Some(id);
        self
    }

    pub fn owner(mut self, id: Uuid) -> Self {
        self.owner_id = Some(id);
        self
    }

    pub fn item(mut self, id: Uuid) -> Self {
        self.item_id = Some(id);
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.requester_id.map_or(true, |id| booking.requester_id == id)
            && self.owner_id.map_or(true, |id| booking.owner_id == id)
            && self.item_id.map_or(true, |id| booking.contains_item(id))
            && (self.statuses.is_empty() || self.statuses.contains(&booking.status))
    }
}

/// Booking persistence. Status writes are compare-and-set on the expected
/// prior statuses and report whether a row changed.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<(), BoxError>;

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxError>;

    async fn find_by_bill_code(&self, bill_code: &str) -> Result<Option<Booking>, BoxError>;

    async fn find(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BoxError>;

    async fn transition(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BoxError>;

    /// Sets the bill code only while it is still empty.
    async fn set_bill_code(&self, id: Uuid, bill_code: &str, at: DateTime<Utc>) -> Result<bool, BoxError>;

    /// Attaches feedback only to a Returned booking.
    async fn set_feedback(&self, id: Uuid, feedback: &Feedback, at: DateTime<Utc>) -> Result<bool, BoxError>;

    async fn save_payment(&self, record: &PaymentRecord) -> Result<(), BoxError>;

    async fn get_payment(&self, bill_code: &str) -> Result<Option<PaymentRecord>, BoxError>;

    async fn update_payment(&self, bill_code: &str, status: BillStatus, at: DateTime<Utc>) -> Result<bool, BoxError>;
}

/// Process-local repository for tests and store-less runs.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    payments: RwLock<HashMap<String, PaymentRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), BoxError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err("booking store unavailable".into());
        }
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), BoxError> {
        self.check()?;
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(format!("duplicate booking id {}", booking.id).into());
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, BoxError> {
        self.check()?;
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn find_by_bill_code(&self, bill_code: &str) -> Result<Option<Booking>, BoxError> {
        self.check()?;
        if bill_code.is_empty() {
            return Ok(None);
        }
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .find(|b| b.bill_code == bill_code)
            .cloned())
    }

    async fn find(&self, filter: &BookingFilter) -> Result<Vec<Booking>, BoxError> {
        self.check()?;
        Ok(self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: &[BookingStatus],
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BoxError> {
        self.check()?;
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(booking) if expected.contains(&booking.status) => {
                booking.status = to;
                booking.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_bill_code(&self, id: Uuid, bill_code: &str, at: DateTime<Utc>) -> Result<bool, BoxError> {
        self.check()?;
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(booking) if booking.bill_code.is_empty() => {
                booking.bill_code = bill_code.to_string();
                booking.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_feedback(&self, id: Uuid, feedback: &Feedback, at: DateTime<Utc>) -> Result<bool, BoxError> {
        self.check()?;
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id) {
            Some(booking) if booking.status == BookingStatus::Returned => {
                booking.feedback = Some(feedback.clone());
                booking.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn save_payment(&self, record: &PaymentRecord) -> Result<(), BoxError> {
        self.check()?;
        self.payments
            .write()
            .await
            .insert(record.bill_code.clone(), record.clone());
        Ok(())
    }

    async fn get_payment(&self, bill_code: &str) -> Result<Option<PaymentRecord>, BoxError> {
        self.check()?;
        Ok(self.payments.read().await.get(bill_code).cloned())
    }

    async fn update_payment(&self, bill_code: &str, status: BillStatus, at: DateTime<Utc>) -> Result<bool, BoxError> {
        self.check()?;
        let mut payments = self.payments.write().await;
        match payments.get_mut(bill_code) {
            // A settled bill is never downgraded.
            Some(record) if record.status == BillStatus::Success && status != BillStatus::Success => Ok(false),
            Some(record) => {
                record.status = status;
                record.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use chrono::NaiveDate;

    fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            items: vec![LineItem {
                item_id: Uuid::new_v4(),
                name: "Kayak".into(),
                price: 50.0,
                quantity: 1,
                images: vec![],
            }],
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            sub_total: 100.0,
            service_fee: 10.0,
            grand_total: 110.0,
            status,
            bill_code: String::new(),
            feedback: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn transition_is_compare_and_set() {
        let repo = InMemoryBookingRepository::new();
        let b = booking(BookingStatus::Unpaid);
        repo.insert(&b).await.unwrap();

        let later = Utc::now() + chrono::Duration::minutes(5);
        assert!(repo
            .transition(b.id, &[BookingStatus::Unpaid], BookingStatus::Upcoming, later)
            .await
            .unwrap());
        assert!(!repo
            .transition(b.id, &[BookingStatus::Unpaid], BookingStatus::Upcoming, later)
            .await
            .unwrap());

        let stored = repo.get(b.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Upcoming);
        assert_eq!(stored.updated_at, later);
    }

    #[tokio::test]
    async fn bill_code_is_set_once() {
        let repo = InMemoryBookingRepository::new();
        let b = booking(BookingStatus::Unpaid);
        repo.insert(&b).await.unwrap();

        assert!(repo.set_bill_code(b.id, "abc123", Utc::now()).await.unwrap());
        assert!(!repo.set_bill_code(b.id, "zzz999", Utc::now()).await.unwrap());
        assert_eq!(repo.find_by_bill_code("abc123").await.unwrap().unwrap().id, b.id);
        assert!(repo.find_by_bill_code("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filter_by_item_and_status() {
        let repo = InMemoryBookingRepository::new();
        let returned = booking(BookingStatus::Returned);
        let active = booking(BookingStatus::Active);
        repo.insert(&returned).await.unwrap();
        repo.insert(&active).await.unwrap();

        let item = returned.items[0].item_id;
        let found = repo
            .find(&BookingFilter::with_statuses(&[BookingStatus::Returned]).item(item))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, returned.id);

        let none = repo
            .find(&BookingFilter::with_statuses(&[BookingStatus::Returned]).requester(active.requester_id))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn success_payment_is_never_downgraded() {
        let repo = InMemoryBookingRepository::new();
        let b = booking(BookingStatus::Unpaid);
        repo.save_payment(&PaymentRecord::pending(b.id, "bill-9".into(), Utc::now()))
            .await
            .unwrap();

        assert!(repo.update_payment("bill-9", BillStatus::Failed, Utc::now()).await.unwrap());
        assert!(repo.update_payment("bill-9", BillStatus::Success, Utc::now()).await.unwrap());
        assert!(!repo.update_payment("bill-9", BillStatus::Failed, Utc::now()).await.unwrap());
        assert!(!repo.update_payment("unknown", BillStatus::Failed, Utc::now()).await.unwrap());

        let record = repo.get_payment("bill-9").await.unwrap().unwrap();
        assert_eq!(record.status, BillStatus::Success);
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let repo = InMemoryBookingRepository::new();
        repo.set_unavailable(true);
        assert!(repo.find(&BookingFilter::default()).await.is_err());
        repo.set_unavailable(false);
        assert!(repo.find(&BookingFilter::default()).await.unwrap().is_empty());
    }
}
