use bazaar_db::{Database, format_timestamp};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn now() -> String {
    format_timestamp(Utc::now())
}

fn seed_user(db: &Database, name: &str) -> String {
    let id = Uuid::new_v4().to_string();
    db.create_user(&id, &format!("sub-{}", name), &format!("{}@example.com", name), name, None, &now())
        .unwrap();
    id
}

fn seed_listing(db: &Database, owner: &str, expires_in: Option<Duration>) -> String {
    let id = Uuid::new_v4().to_string();
    let expires = expires_in.map(|d| format_timestamp(Utc::now() + d));
    db.create_listing(&id, owner, "Sofa", "12000", expires.as_deref(), &now())
        .unwrap();
    id
}

#[test]
fn conversation_triple_is_unique() {
    let db = Database::open_in_memory().unwrap();
    let a = seed_user(&db, "a");
    let b = seed_user(&db, "b");
    let listing = seed_listing(&db, &a, None);

    let first_id = Uuid::new_v4().to_string();
    let (first, created) = db
        .find_or_create_conversation(&first_id, &a, &b, &listing, &now())
        .unwrap();
    assert!(created);
    assert_eq!(first.id, first_id);

    let (second, created) = db
        .find_or_create_conversation(&Uuid::new_v4().to_string(), &a, &b, &listing, &now())
        .unwrap();
    assert!(!created);
    assert_eq!(second.id, first_id);
}

#[test]
fn append_message_updates_conversation_summary() {
    let db = Database::open_in_memory().unwrap();
    let a = seed_user(&db, "a");
    let b = seed_user(&db, "b");
    let listing = seed_listing(&db, &a, None);
    let conv = Uuid::new_v4().to_string();
    db.find_or_create_conversation(&conv, &a, &b, &listing, &now()).unwrap();

    let msg = Uuid::new_v4().to_string();
    let at = now();
    db.append_message(&msg, &conv, &a, &b, "hello", &at).unwrap();

    let row = db.get_conversation(&conv).unwrap().unwrap();
    assert_eq!(row.last_message.as_deref(), Some("hello"));
    assert_eq!(row.last_message_at.as_deref(), Some(at.as_str()));

    let stored = db.get_message(&msg).unwrap().unwrap();
    assert_eq!(stored.body, "hello");
    assert_eq!(stored.sender_full_name, "a");
    assert!(!stored.is_read);
}

#[test]
fn append_message_to_missing_conversation_fails_without_side_effects() {
    let db = Database::open_in_memory().unwrap();
    let a = seed_user(&db, "a");
    let b = seed_user(&db, "b");
    let ghost = Uuid::new_v4().to_string();
    let msg = Uuid::new_v4().to_string();

    assert!(db.append_message(&msg, &ghost, &a, &b, "hi", &now()).is_err());
    assert!(db.get_message(&msg).unwrap().is_none());
}

#[test]
fn mark_read_is_idempotent_and_scoped_to_receiver() {
    let db = Database::open_in_memory().unwrap();
    let a = seed_user(&db, "a");
    let b = seed_user(&db, "b");
    let listing = seed_listing(&db, &a, None);
    let conv = Uuid::new_v4().to_string();
    db.find_or_create_conversation(&conv, &a, &b, &listing, &now()).unwrap();

    db.append_message(&Uuid::new_v4().to_string(), &conv, &a, &b, "one", &now()).unwrap();
    db.append_message(&Uuid::new_v4().to_string(), &conv, &a, &b, "two", &now()).unwrap();
    db.append_message(&Uuid::new_v4().to_string(), &conv, &b, &a, "reply", &now()).unwrap();

    assert_eq!(db.count_unread(&conv, &b).unwrap(), 2);
    assert_eq!(db.mark_conversation_read(&conv, &b, &now()).unwrap(), 2);
    assert_eq!(db.mark_conversation_read(&conv, &b, &now()).unwrap(), 0);
    assert_eq!(db.count_unread(&conv, &b).unwrap(), 0);
    // a's unread message is untouched
    assert_eq!(db.count_unread(&conv, &a).unwrap(), 1);
}

#[test]
fn reregistering_token_reassigns_owner() {
    let db = Database::open_in_memory().unwrap();
    let x = seed_user(&db, "x");
    let y = seed_user(&db, "y");
    let token = "ExponentPushToken[abc123]";

    db.upsert_device_endpoint(&Uuid::new_v4().to_string(), &y, token, "ios", &now()).unwrap();
    db.deactivate_endpoint(token, &now()).unwrap();
    db.upsert_device_endpoint(&Uuid::new_v4().to_string(), &x, token, "android", &now()).unwrap();

    let rows = db.get_active_endpoints(&x).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, token);
    assert_eq!(rows[0].device_class, "android");
    assert!(db.get_active_endpoints(&y).unwrap().is_empty());
    let stored: u32 = db
        .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM device_endpoints WHERE token = ?1", [token], |r| r.get(0))?))
        .unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn deregistering_requires_matching_owner() {
    let db = Database::open_in_memory().unwrap();
    let x = seed_user(&db, "x");
    let y = seed_user(&db, "y");
    let token = "ExponentPushToken[zzz]";
    db.upsert_device_endpoint(&Uuid::new_v4().to_string(), &x, token, "web", &now()).unwrap();

    assert_eq!(db.deactivate_user_endpoint(&y, token, &now()).unwrap(), 0);
    assert_eq!(db.get_active_endpoints(&x).unwrap().len(), 1);
    assert_eq!(db.deactivate_user_endpoint(&x, token, &now()).unwrap(), 1);
    assert!(db.get_active_endpoints(&x).unwrap().is_empty());
}

#[test]
fn expiring_listings_respect_window_and_status() {
    let db = Database::open_in_memory().unwrap();
    let owner = seed_user(&db, "owner");
    let soon = seed_listing(&db, &owner, Some(Duration::days(2)));
    let _later = seed_listing(&db, &owner, Some(Duration::days(60)));
    let _past = seed_listing(&db, &owner, Some(Duration::days(-1)));
    let _never = seed_listing(&db, &owner, None);
    let sold = seed_listing(&db, &owner, Some(Duration::days(1)));
    db.set_listing_status(&sold, "sold").unwrap();

    let start = Utc::now();
    let rows = db
        .get_expiring_listings(&format_timestamp(start), &format_timestamp(start + Duration::days(30)))
        .unwrap();
    let ids: Vec<_> = rows.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![soon]);
}

#[test]
fn list_conversations_reports_unread_and_other_user() {
    let db = Database::open_in_memory().unwrap();
    let a = seed_user(&db, "a");
    let b = seed_user(&db, "b");
    let listing = seed_listing(&db, &a, None);
    let conv = Uuid::new_v4().to_string();
    db.find_or_create_conversation(&conv, &a, &b, &listing, &now()).unwrap();
    db.append_message(&Uuid::new_v4().to_string(), &conv, &a, &b, "ping", &now()).unwrap();

    let for_b = db.list_conversations(&b).unwrap();
    assert_eq!(for_b.len(), 1);
    assert_eq!(for_b[0].other_user_id, a);
    assert_eq!(for_b[0].other_full_name, "a");
    assert_eq!(for_b[0].unread_count, 1);

    let for_a = db.list_conversations(&a).unwrap();
    assert_eq!(for_a[0].other_user_id, b);
    assert_eq!(for_a[0].unread_count, 0);
}

#[test]
fn favorite_toggles() {
    let db = Database::open_in_memory().unwrap();
    let a = seed_user(&db, "a");
    let b = seed_user(&db, "b");
    let listing = seed_listing(&db, &a, None);

    assert!(db.toggle_favorite(&Uuid::new_v4().to_string(), &b, &listing, &now()).unwrap());
    assert!(!db.toggle_favorite(&Uuid::new_v4().to_string(), &b, &listing, &now()).unwrap());
}
