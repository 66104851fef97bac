use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::{error, info, warn};

use bazaar_db::{Database, format_timestamp};
use bazaar_types::notification::NotificationEvent;

use crate::queue::NotificationQueue;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Whole days until `expires_at`, rounded up.
pub fn days_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (expires_at - now).num_milliseconds();
    if ms <= 0 { 0 } else { (ms + DAY_MS - 1) / DAY_MS }
}

/// The first `hour:00:00` UTC strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    let start_of_day = now
        - Duration::seconds(i64::from(now.num_seconds_from_midnight()))
        - Duration::nanoseconds(i64::from(now.nanosecond()));
    let today = start_of_day + Duration::hours(i64::from(hour % 24));
    if today > now { today } else { today + Duration::days(1) }
}

/// Daily scan for active listings about to expire.
///
/// No record is kept of what was already sent: running twice in a day
/// notifies twice.
pub struct ExpirySweep {
    db: Arc<Database>,
    queue: NotificationQueue,
    lookahead: Duration,
}

impl ExpirySweep {
    pub fn new(db: Arc<Database>, queue: NotificationQueue, lookahead: Duration) -> Self {
        Self { db, queue, lookahead }
    }

    /// One pass. Returns the number of notifications queued.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        info!("Running expiring listings check");

        let db = self.db.clone();
        let from = format_timestamp(now);
        let until = format_timestamp(now + self.lookahead);
        let rows = tokio::task::spawn_blocking(move || db.get_expiring_listings(&from, &until))
            .await
            .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

        info!("Found {} expiring listings", rows.len());

        let mut queued = 0;
        for row in rows {
            let listing = match row.into_listing() {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("Skipping unreadable listing: {}", e);
                    continue;
                }
            };
            let Some(expires_at) = listing.expires_at else {
                continue;
            };

            let event = NotificationEvent::ListingExpiring {
                listing_id: listing.id,
                listing_title: listing.title,
                days_left: days_left(expires_at, now),
            };
            if self.queue.enqueue(listing.owner_id, event) {
                queued += 1;
            }
        }

        Ok(queued)
    }

    /// Sleep until `hour:00` UTC each day and run a pass. Failures are logged;
    /// the next day's run is the retry.
    pub async fn run_daily(self, hour: u32) {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, hour);
            let wait = (next - now).to_std().unwrap_or_default();
            info!("Next expiring listings check at {}", next);
            tokio::time::sleep(wait).await;

            match self.run_once(Utc::now()).await {
                Ok(count) => info!("Expiring listings notifications queued: {}", count),
                Err(e) => error!("Error sending expiring notifications: {}", e),
            }
        }
    }
}
