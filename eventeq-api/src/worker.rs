use eventeq_booking::BookingService;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

/// Runs the status refresh pass on a fixed interval, independent of request
/// traffic. A failed pass is logged and the next tick tries again.
pub async fn start_refresh_worker(service: Arc<BookingService>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Refresh worker started, running every {:?}", every);

    loop {
        ticker.tick().await;
        match service.refresh().await {
            Ok(report) if report.is_empty() => debug!("Refresh worker: nothing to advance"),
            Ok(report) => info!(
                changed = report.changes.len(),
                lost_races = report.lost_races,
                "Refresh worker advanced bookings"
            ),
            Err(e) => error!("Refresh worker pass failed: {}", e),
        }
    }
}
