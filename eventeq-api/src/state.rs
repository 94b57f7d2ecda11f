use eventeq_booking::BookingService;
use eventeq_store::app_config::RateLimitConfig;
use eventeq_store::{DbClient, RedisClient};
use std::sync::Arc;

use crate::metrics::Metrics;
use crate::stream::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookingService>,
    /// Absent in tests and when no database is configured for health checks.
    pub db: Option<DbClient>,
    /// Rate limiting is skipped without Redis.
    pub redis: Option<Arc<RedisClient>>,
    pub registry: Arc<ConnectionRegistry>,
    pub metrics: Arc<Metrics>,
    pub rate_limit: RateLimitConfig,
}
