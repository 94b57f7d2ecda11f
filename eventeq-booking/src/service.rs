use eventeq_core::catalog::ItemCatalog;
use eventeq_core::identity::{UserDirectory, UserProfile};
use eventeq_core::notify::NotificationSink;
use eventeq_core::payment::PaymentGateway;
use eventeq_core::BoxError;
use eventeq_shared::models::BookingEvent;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::BookingError;
use crate::lifecycle::Transition;
use crate::listing::{self, BookedBy, ItemBookingView, ItemFeedbackView, OwnerBookingView};
use crate::models::{Booking, BookingStatus, Feedback, LineItem, StatusChange};
use crate::refresh::{self, RefreshReport};
use crate::repository::{BookingFilter, BookingRepository};
use crate::request::{CreateBookingRequest, FeedbackRequest, ValidationErrors};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound for every single store call.
    pub store_timeout: Duration,
    /// Upper bound for every gateway call.
    pub gateway_timeout: Duration,
    /// Delays between attempts of idempotent reads. Writes are never retried.
    pub read_retry_backoff: Vec<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(10),
            gateway_timeout: Duration::from_secs(10),
            read_retry_backoff: vec![Duration::from_millis(100), Duration::from_millis(200)],
        }
    }
}

/// Owns the booking lifecycle: creation, owner/requester actions, the lazy
/// refresh pass and every status-derived listing.
pub struct BookingService {
    pub(crate) repo: Arc<dyn BookingRepository>,
    pub(crate) gateway: Arc<dyn PaymentGateway>,
    users: Arc<dyn UserDirectory>,
    catalog: Arc<dyn ItemCatalog>,
    notifier: Arc<dyn NotificationSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: ServiceConfig,
}

impl BookingService {
    pub fn new(
        repo: Arc<dyn BookingRepository>,
        gateway: Arc<dyn PaymentGateway>,
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn ItemCatalog>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            repo,
            gateway,
            users,
            catalog,
            notifier,
            clock,
            config,
        }
    }

    // ========================================================================
    // Dependency plumbing
    // ========================================================================

    /// Run one store call under the configured timeout.
    pub(crate) async fn bounded<T, F>(&self, what: &'static str, call: F) -> Result<T, BookingError>
    where
        F: Future<Output = Result<T, BoxError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(BookingError::store(e)),
            Err(_) => Err(BookingError::Timeout(what)),
        }
    }

    /// Bounded idempotent read, retried with backoff.
    pub(crate) async fn read<T, F, Fut>(&self, what: &'static str, mut call: F) -> Result<T, BookingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        let mut attempt = 0;
        loop {
            match self.bounded(what, call()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let Some(delay) = self.config.read_retry_backoff.get(attempt) else {
                        return Err(e);
                    };
                    tracing::warn!(operation = what, attempt = attempt + 1, "Read failed, retrying: {}", e);
                    tokio::time::sleep(*delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub(crate) async fn publish(&self, event: BookingEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(booking_id = %event.booking_id(), "Failed to publish booking event: {}", e);
        }
    }

    async fn publish_changes(&self, changes: &[StatusChange]) {
        for change in changes {
            self.publish(change.to_event()).await;
        }
    }

    pub(crate) async fn load(&self, id: Uuid) -> Result<Booking, BookingError> {
        let repo = &self.repo;
        self.read("load booking", move || repo.get(id))
            .await?
            .ok_or_else(|| BookingError::NotFound(id.to_string()))
    }

    async fn find(&self, filter: BookingFilter) -> Result<Vec<Booking>, BoxError> {
        self.repo.find(&filter).await
    }

    async fn find_with_retry(&self, filter: BookingFilter) -> Result<Vec<Booking>, BookingError> {
        self.read("find bookings", || self.find(filter.clone())).await
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Advance every booking whose time-based transition is due.
    pub async fn refresh(&self) -> Result<RefreshReport, BookingError> {
        let now = self.clock.now();
        let report = self
            .bounded("refresh pass", refresh::run_refresh_pass(self.repo.as_ref(), now))
            .await?;
        self.publish_changes(&report.changes).await;
        Ok(report)
    }

    /// Refresh ahead of a read. A failed pass is logged and the read serves
    /// whatever is stored.
    async fn refresh_before_read(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("Status refresh failed, serving possibly stale bookings: {}", e);
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create an Unpaid booking and open its bill. Never retried: a gateway
    /// failure fails the request and leaves the booking without a bill code.
    pub async fn create_booking(&self, request: CreateBookingRequest) -> Result<Booking, BookingError> {
        let mut errors = ValidationErrors::default();

        let requester = self
            .bounded("load requester", self.users.find_user(request.requester_id))
            .await?;
        if requester.is_none() {
            errors.push("user_id", "unknown user");
        }

        let mut items = Vec::with_capacity(request.items.len());
        for (index, wanted) in request.items.iter().enumerate() {
            let field = format!("items[{}].id", index);
            let found = self
                .bounded("load catalog item", self.catalog.find_item(wanted.item_id))
                .await?;
            let Some(item) = found else {
                errors.push(&field, "unknown item");
                continue;
            };
            if item.owner_id != request.owner_id {
                errors.push(&field, "item does not belong to owner_id");
                continue;
            }
            if !item.status.is_bookable() {
                return Err(BookingError::Unavailable(item.name));
            }
            items.push(LineItem {
                item_id: item.id,
                name: item.name,
                price: item.price,
                quantity: wanted.quantity,
                images: Vec::new(),
            });
        }

        let requester = match requester {
            Some(user) if errors.is_empty() => user,
            _ => return Err(BookingError::Validation(errors)),
        };

        let now = self.clock.now();
        let mut booking = Booking {
            id: Uuid::new_v4(),
            requester_id: request.requester_id,
            owner_id: request.owner_id,
            items,
            start_date: request.start_date,
            end_date: request.end_date,
            sub_total: request.sub_total,
            service_fee: request.service_fee,
            grand_total: request.grand_total,
            status: BookingStatus::Unpaid,
            bill_code: String::new(),
            feedback: None,
            created_at: now,
            updated_at: now,
        };

        self.bounded("insert booking", self.repo.insert(&booking)).await?;
        tracing::info!(
            booking_id = %booking.id,
            requester_id = %booking.requester_id,
            owner_id = %booking.owner_id,
            "Booking created"
        );

        let bill_code = self.issue_bill(&booking, &requester).await?;
        booking.bill_code = bill_code.clone();

        self.publish(BookingEvent::Created {
            booking_id: booking.id,
            requester_id: booking.requester_id,
            owner_id: booking.owner_id,
            grand_total: booking.grand_total,
            bill_code,
            at: now,
        })
        .await;

        Ok(booking)
    }

    // ========================================================================
    // Owner and requester actions
    // ========================================================================

    async fn apply(&self, id: Uuid, transition: Transition) -> Result<Booking, BookingError> {
        let mut booking = self.load(id).await?;
        let target = transition.apply(booking.status)?;
        let now = self.clock.now();

        let written = self
            .bounded("update booking status", self.repo.transition(id, transition.sources(), target, now))
            .await?;
        if !written {
            // Another writer moved the booking between our read and write.
            let current = self.load(id).await?;
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        let change = StatusChange::of(&booking, target, now);
        tracing::info!(booking_id = %id, from = %change.from, to = %target, "Booking status updated");
        booking.status = target;
        booking.updated_at = now;
        self.publish(change.to_event()).await;
        Ok(booking)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.apply(id, Transition::Cancel).await
    }

    pub async fn retrieve(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.apply(id, Transition::Retrieve).await
    }

    pub async fn mark_returned(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.apply(id, Transition::Return).await
    }

    /// Attach (or replace) feedback on a Returned booking.
    pub async fn give_feedback(&self, request: FeedbackRequest) -> Result<Booking, BookingError> {
        let mut booking = self.load(request.booking_id).await?;
        if booking.status != BookingStatus::Returned {
            return Err(BookingError::FeedbackNotAllowed(booking.status));
        }

        let now = self.clock.now();
        let feedback = Feedback {
            rating: request.rating,
            review: request.review,
            created_at: now,
        };
        let written = self
            .bounded("store feedback", self.repo.set_feedback(booking.id, &feedback, now))
            .await?;
        if !written {
            let current = self.load(booking.id).await?;
            return Err(BookingError::FeedbackNotAllowed(current.status));
        }

        booking.feedback = Some(feedback);
        booking.updated_at = now;
        Ok(booking)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Single booking with line items enriched with catalog images.
    pub async fn get_booking(&self, id: Uuid) -> Result<Booking, BookingError> {
        let mut booking = self.load(id).await?;
        for line in &mut booking.items {
            match self.bounded("load catalog item", self.catalog.find_item(line.item_id)).await {
                Ok(Some(item)) => line.images = item.images,
                Ok(None) => {}
                Err(e) => tracing::warn!(item_id = %line.item_id, "Image lookup failed: {}", e),
            }
        }
        Ok(booking)
    }

    pub async fn list_upcoming(&self, requester_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        self.refresh_before_read().await;
        let filter = BookingFilter::with_statuses(&listing::UPCOMING_STATUSES).requester(requester_id);
        let bookings = self.find_with_retry(filter).await?;
        Ok(listing::upcoming(bookings, self.clock.now()))
    }

    pub async fn list_active(&self, requester_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        self.refresh_before_read().await;
        let filter = BookingFilter::with_statuses(&listing::ACTIVE_STATUSES).requester(requester_id);
        Ok(listing::active(self.find_with_retry(filter).await?))
    }

    pub async fn list_ended(&self, requester_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        self.refresh_before_read().await;
        let filter = BookingFilter::with_statuses(&listing::ENDED_STATUSES).requester(requester_id);
        Ok(listing::ended(self.find_with_retry(filter).await?))
    }

    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<OwnerBookingView>, BookingError> {
        self.refresh_before_read().await;
        let bookings = self.find_with_retry(BookingFilter::default().owner(owner_id)).await?;

        let mut requesters: HashMap<Uuid, Option<UserProfile>> = HashMap::new();
        for booking in &bookings {
            if requesters.contains_key(&booking.requester_id) {
                continue;
            }
            let profile = match self
                .bounded("load requester", self.users.find_user(booking.requester_id))
                .await
            {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::warn!(user_id = %booking.requester_id, "Requester lookup failed: {}", e);
                    None
                }
            };
            requesters.insert(booking.requester_id, profile);
        }

        Ok(listing::for_owner(bookings, |id| {
            requesters.get(&id).and_then(|p| p.as_ref()).map(BookedBy::from)
        }))
    }

    pub async fn list_by_item(&self, item_id: Uuid) -> Result<Vec<ItemBookingView>, BookingError> {
        let filter = BookingFilter::with_statuses(&[BookingStatus::Returned]).item(item_id);
        Ok(listing::by_item(self.find_with_retry(filter).await?, item_id))
    }

    pub async fn feedbacks_for_item(&self, item_id: Uuid) -> Result<Vec<ItemFeedbackView>, BookingError> {
        let filter = BookingFilter::with_statuses(&[BookingStatus::Returned]).item(item_id);
        Ok(listing::feedbacks_for_item(self.find_with_retry(filter).await?, item_id))
    }
}
