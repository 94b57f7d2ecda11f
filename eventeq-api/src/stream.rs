//! Live booking updates over server-sent events.
//!
//! Each open stream is a [`Connection`] in the [`ConnectionRegistry`].
//! Broadcasting holds the read lock for the whole fan-out; registration and
//! removal take the write lock. Connections found closed during a broadcast
//! are flagged and swept afterwards.

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use eventeq_core::notify::NotificationSink;
use eventeq_core::BoxError;
use eventeq_shared::models::BookingEvent;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, RwLock};
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

const CONNECTION_BUFFER: usize = 32;

struct Connection {
    user_id: Uuid,
    sender: mpsc::Sender<BookingEvent>,
    alive: AtomicBool,
}

pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Open a connection for `user_id`. The connection is removed when the
    /// returned subscription is dropped.
    pub async fn register(self: &Arc<Self>, user_id: Uuid) -> Subscription {
        let (sender, receiver) = mpsc::channel(CONNECTION_BUFFER);
        let id = Uuid::new_v4();
        self.connections.write().await.insert(
            id,
            Connection {
                user_id,
                sender,
                alive: AtomicBool::new(true),
            },
        );
        tracing::debug!(connection_id = %id, user_id = %user_id, "Booking stream opened");
        Subscription {
            id,
            registry: Arc::clone(self),
            events: ReceiverStream::new(receiver),
        }
    }

    pub async fn unregister(&self, id: Uuid) {
        if self.connections.write().await.remove(&id).is_some() {
            tracing::debug!(connection_id = %id, "Booking stream closed");
        }
    }

    /// Push `event` to every connection it concerns. Returns how many
    /// connections accepted it.
    pub async fn broadcast(&self, event: &BookingEvent) -> usize {
        let mut delivered = 0;
        let mut dead = 0;
        {
            let connections = self.connections.read().await;
            for (id, conn) in connections.iter() {
                if !event.concerns(conn.user_id) || !conn.alive.load(Ordering::Relaxed) {
                    continue;
                }
                match conn.sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(connection_id = %id, "Booking stream lagging, event dropped");
                    }
                    Err(TrySendError::Closed(_)) => {
                        conn.alive.store(false, Ordering::Relaxed);
                        dead += 1;
                    }
                }
            }
        }

        if dead > 0 {
            self.connections
                .write()
                .await
                .retain(|_, conn| conn.alive.load(Ordering::Relaxed));
        }
        delivered
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSink for ConnectionRegistry {
    fn name(&self) -> &'static str {
        "sse"
    }

    async fn notify(&self, event: &BookingEvent) -> Result<(), BoxError> {
        self.broadcast(event).await;
        Ok(())
    }
}

/// Receiving half of a registered connection.
pub struct Subscription {
    id: Uuid,
    registry: Arc<ConnectionRegistry>,
    events: ReceiverStream<BookingEvent>,
}

impl Stream for Subscription {
    type Item = BookingEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let registry = Arc::clone(&self.registry);
        let id = self.id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { registry.unregister(id).await });
        }
    }
}

/// GET /booking/{userId}/stream
pub async fn booking_stream(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let user_id = crate::bookings::parse_id(&user_id, "userId")?;
    let subscription = state.registry.register(user_id).await;
    let events = subscription.map(|event| Event::default().event(event.kind().as_str()).json_data(&event));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn paid(requester_id: Uuid, owner_id: Uuid) -> BookingEvent {
        BookingEvent::Paid {
            booking_id: Uuid::new_v4(),
            requester_id,
            owner_id,
            bill_code: "bill".into(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_only_concerned_users() {
        let registry = Arc::new(ConnectionRegistry::new());
        let requester = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let mut requester_stream = registry.register(requester).await;
        let mut owner_stream = registry.register(owner).await;
        let mut bystander_stream = registry.register(Uuid::new_v4()).await;

        let event = paid(requester, owner);
        assert_eq!(registry.broadcast(&event).await, 2);

        assert_eq!(requester_stream.next().await, Some(event.clone()));
        assert_eq!(owner_stream.next().await, Some(event));
        let nothing = tokio::time::timeout(std::time::Duration::from_millis(20), bystander_stream.next()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn closed_connections_are_swept() {
        let registry = Arc::new(ConnectionRegistry::new());
        let user = Uuid::new_v4();
        let keep = registry.register(user).await;
        let gone = registry.register(user).await;
        assert_eq!(registry.connection_count().await, 2);

        drop(gone);
        assert_eq!(registry.broadcast(&paid(user, Uuid::new_v4())).await, 1);
        assert_eq!(registry.connection_count().await, 1);
        drop(keep);
    }
}
