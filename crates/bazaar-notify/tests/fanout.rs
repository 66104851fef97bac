mod support;

use std::sync::Arc;

use bazaar_notify::FanOut;
use bazaar_types::notification::NotificationEvent;
use uuid::Uuid;

use support::{RecordingGateway, memory_db, seed_endpoint, seed_user};

fn sold_event() -> NotificationEvent {
    NotificationEvent::ListingSold {
        listing_id: Uuid::new_v4(),
        listing_title: "Guitar".into(),
    }
}

#[tokio::test]
async fn no_endpoints_is_silent() {
    let db = memory_db();
    let user = seed_user(&db, "nobody");
    let gateway = Arc::new(RecordingGateway::new(100));
    let fanout = FanOut::new(db, gateway.clone());

    let report = fanout.dispatch(user, &sold_event()).await;
    assert_eq!(report.endpoints, 0);
    assert!(gateway.batches.lock().await.is_empty());
}

#[tokio::test]
async fn renders_template_into_every_message() {
    let db = memory_db();
    let user = seed_user(&db, "seller");
    seed_endpoint(&db, user, "ExponentPushToken[a]");
    seed_endpoint(&db, user, "ExponentPushToken[b]");
    let gateway = Arc::new(RecordingGateway::new(100));
    let fanout = FanOut::new(db, gateway.clone());

    let sender_id = Uuid::new_v4();
    let conversation_id = Uuid::new_v4();
    let event = NotificationEvent::NewMessage {
        sender_id,
        sender_name: "Dana".into(),
        conversation_id,
        message: "ok, deal".into(),
    };
    let report = fanout.dispatch(user, &event).await;
    assert_eq!(report.endpoints, 2);
    assert_eq!(report.delivered, 2);

    let batches = gateway.batches.lock().await;
    assert_eq!(batches.len(), 1);
    for msg in &batches[0] {
        assert_eq!(msg.title, "Dana");
        assert_eq!(msg.body, "ok, deal");
        assert_eq!(msg.channel_id, "messages");
        assert_eq!(msg.priority, "high");
        assert_eq!(msg.badge, 1);
        assert_eq!(msg.data["type"], "new_message");
    }
}

#[tokio::test]
async fn unregistered_endpoint_is_deactivated_others_untouched() {
    let db = memory_db();
    let user = seed_user(&db, "seller");
    for t in ["ExponentPushToken[1]", "ExponentPushToken[2]", "ExponentPushToken[3]"] {
        seed_endpoint(&db, user, t);
    }
    let mut gateway = RecordingGateway::new(2);
    gateway.unregistered.insert("ExponentPushToken[2]".into());
    let gateway = Arc::new(gateway);
    let fanout = FanOut::new(db.clone(), gateway.clone());

    let report = fanout.dispatch(user, &sold_event()).await;
    assert_eq!(report.deactivated, 1);
    assert_eq!(report.delivered, 2);
    assert_eq!(gateway.batches.lock().await.len(), 2);

    let mut active: Vec<String> = db
        .get_active_endpoints(&user.to_string())
        .unwrap()
        .into_iter()
        .map(|r| r.token)
        .collect();
    active.sort();
    assert_eq!(active, vec!["ExponentPushToken[1]", "ExponentPushToken[3]"]);
}

#[tokio::test]
async fn failing_chunk_does_not_abort_other_chunks() {
    let db = memory_db();
    let user = seed_user(&db, "seller");
    for t in ["ExponentPushToken[p]", "ExponentPushToken[q]", "ExponentPushToken[r]"] {
        seed_endpoint(&db, user, t);
    }
    let mut gateway = RecordingGateway::new(1);
    gateway.poison = Some("ExponentPushToken[p]".into());
    let gateway = Arc::new(gateway);
    let fanout = FanOut::new(db.clone(), gateway.clone());

    let report = fanout.dispatch(user, &sold_event()).await;
    assert_eq!(report.failed_chunks, 1);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.deactivated, 0);

    assert_eq!(gateway.sent_tokens().await.len(), 3);
    // a transport failure is not a reason to drop the endpoint
    assert_eq!(db.get_active_endpoints(&user.to_string()).unwrap().len(), 3);
}

#[tokio::test]
async fn messages_without_a_ticket_count_as_failed() {
    let db = memory_db();
    let user = seed_user(&db, "seller");
    for t in ["ExponentPushToken[s]", "ExponentPushToken[t]", "ExponentPushToken[u]"] {
        seed_endpoint(&db, user, t);
    }
    let mut gateway = RecordingGateway::new(100);
    gateway.missing_tickets = 1;
    let fanout = FanOut::new(db.clone(), Arc::new(gateway));

    let report = fanout.dispatch(user, &sold_event()).await;
    assert_eq!(report.endpoints, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_chunks, 0);
    assert_eq!(report.delivered + report.failed, report.endpoints);
}
