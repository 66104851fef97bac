mod support;

use bazaar_notify::NotificationQueue;
use bazaar_notify::sweep::ExpirySweep;
use bazaar_types::notification::NotificationEvent;
use chrono::{Duration, Utc};

use support::{memory_db, seed_listing, seed_user};

#[tokio::test]
async fn queues_one_notification_per_expiring_listing() {
    let db = memory_db();
    let owner = seed_user(&db, "owner");
    let soon = seed_listing(&db, owner, "Lamp", Some(Duration::days(2) + Duration::hours(1)));
    seed_listing(&db, owner, "Chair", Some(Duration::days(45)));
    seed_listing(&db, owner, "Old", Some(Duration::days(-2)));

    let (queue, mut rx) = NotificationQueue::new();
    let sweep = ExpirySweep::new(db, queue, Duration::days(30));

    assert_eq!(sweep.run_once(Utc::now()).await.unwrap(), 1);
    let job = rx.try_recv().unwrap();
    assert_eq!(job.user_id, owner);
    assert_eq!(
        job.event,
        NotificationEvent::ListingExpiring {
            listing_id: soon,
            listing_title: "Lamp".into(),
            days_left: 3,
        }
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn repeated_runs_notify_again() {
    let db = memory_db();
    let owner = seed_user(&db, "owner");
    seed_listing(&db, owner, "Lamp", Some(Duration::days(5)));
    seed_listing(&db, owner, "Rug", Some(Duration::days(6)));

    let (queue, mut rx) = NotificationQueue::new();
    let sweep = ExpirySweep::new(db, queue, Duration::days(30));

    assert_eq!(sweep.run_once(Utc::now()).await.unwrap(), 2);
    assert_eq!(sweep.run_once(Utc::now()).await.unwrap(), 2);

    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    assert_eq!(count, 4);
}
