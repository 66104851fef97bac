mod support;

use bazaar_gateway::CoreError;
use support::Harness;
use uuid::Uuid;

#[tokio::test]
async fn open_conversation_is_order_independent() {
    let h = Harness::new();
    let alice = h.user("Alice");
    let bob = h.user("Bob");
    let listing = h.listing(bob, "Camera");

    let from_alice = h.ctx.chat.open_conversation(alice, bob, listing).await.unwrap();
    let from_bob = h.ctx.chat.open_conversation(bob, alice, listing).await.unwrap();

    assert_eq!(from_alice.conversation.id, from_bob.conversation.id);
    assert_eq!(from_alice.other_user.id, bob);
    assert_eq!(from_bob.other_user.id, alice);
    assert!(from_alice.conversation.user1_id.to_string() < from_alice.conversation.user2_id.to_string());
}

#[tokio::test]
async fn open_conversation_rejects_bad_input() {
    let h = Harness::new();
    let alice = h.user("Alice");
    let bob = h.user("Bob");
    let listing = h.listing(bob, "Camera");

    assert!(matches!(
        h.ctx.chat.open_conversation(alice, alice, listing).await,
        Err(CoreError::Validation(_))
    ));
    assert!(matches!(
        h.ctx.chat.open_conversation(alice, bob, Uuid::new_v4()).await,
        Err(CoreError::NotFound("listing"))
    ));
    assert!(matches!(
        h.ctx.chat.open_conversation(alice, Uuid::new_v4(), listing).await,
        Err(CoreError::NotFound("user"))
    ));
}

#[tokio::test]
async fn history_is_paged_oldest_first_and_marks_read() {
    let h = Harness::new();
    let alice = h.user("Alice");
    let bob = h.user("Bob");
    let listing = h.listing(bob, "Tent");
    let conversation_id = h.ctx.chat.open_conversation(alice, bob, listing).await.unwrap().conversation.id;

    for body in ["one", "two", "three"] {
        h.ctx.pipeline.send(conversation_id, alice, bob, body).await.unwrap();
    }

    let listed = h.ctx.chat.list_conversations(bob).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].unread_count, 3);
    assert_eq!(listed[0].conversation.last_message.as_deref(), Some("three"));

    let page = h.ctx.chat.get_messages(conversation_id, bob, 1, 2).await.unwrap();
    let bodies: Vec<_> = page.messages.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(bodies, vec!["two", "three"]);
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.pages, 2);

    assert_eq!(h.ctx.chat.list_conversations(bob).await.unwrap()[0].unread_count, 0);
    assert_eq!(h.ctx.chat.mark_conversation_read(conversation_id, bob).await.unwrap(), 0);
}

#[tokio::test]
async fn history_requires_participation() {
    let h = Harness::new();
    let alice = h.user("Alice");
    let bob = h.user("Bob");
    let mallory = h.user("Mallory");
    let listing = h.listing(bob, "Tent");
    let conversation_id = h.ctx.chat.open_conversation(alice, bob, listing).await.unwrap().conversation.id;

    assert!(matches!(
        h.ctx.chat.get_messages(conversation_id, mallory, 1, 20).await,
        Err(CoreError::Forbidden(_))
    ));
    assert!(matches!(
        h.ctx.chat.get_messages(Uuid::new_v4(), alice, 1, 20).await,
        Err(CoreError::NotFound("conversation"))
    ));
}
