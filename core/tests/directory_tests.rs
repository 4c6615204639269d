/// Directory ordering and last-message projection tests
use chrono::{DateTime, TimeZone, Utc};
use takeover_core::directory::{Directory, DirectoryEntry};
use takeover_core::types::{Conversation, LastMessage, ListingRef, Message, Participant};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

fn participant(id: &str, name: &str) -> Participant {
    Participant {
        id: id.to_string(),
        display_name: name.to_string(),
    }
}

fn conversation(id: i64, title: &str) -> Conversation {
    Conversation {
        id,
        listing: ListingRef {
            id: id * 10,
            title: title.to_string(),
            owner_user_id: "owner".to_string(),
        },
        participant_a: participant("alice", "Alice"),
        participant_b: participant("bob", "Bob"),
        created_at: at(8, 0),
    }
}

fn entry(id: i64, title: &str, last: Option<(&str, DateTime<Utc>)>) -> DirectoryEntry {
    DirectoryEntry {
        conversation: conversation(id, title),
        last_message: last.map(|(content, created_at)| LastMessage {
            content: content.to_string(),
            created_at,
        }),
    }
}

fn inbound(conversation_id: i64, content: &str, created_at: DateTime<Utc>) -> Message {
    Message {
        id: Some(1000 + conversation_id),
        conversation_id: Some(conversation_id),
        content: content.to_string(),
        sender: participant("bob", "Bob"),
        created_at,
        correlation_id: None,
        pending: false,
    }
}

#[tokio::test]
async fn test_initial_load_sorted_descending() {
    let directory = Directory::new();
    directory
        .replace_all(vec![
            entry(1, "A", Some(("morning", at(10, 0)))),
            entry(2, "B", Some(("later", at(10, 5)))),
            entry(3, "C", None),
        ])
        .await;

    let ids: Vec<i64> = directory
        .entries()
        .await
        .iter()
        .map(|e| e.conversation.id)
        .collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[tokio::test]
async fn test_inbound_message_bumps_conversation_to_top() {
    let directory = Directory::new();
    directory
        .replace_all(vec![
            entry(1, "A", Some(("morning", at(10, 0)))),
            entry(2, "B", Some(("later", at(10, 5)))),
            entry(3, "C", None),
        ])
        .await;

    let matched = directory.apply_message(&inbound(1, "news", at(10, 10))).await;
    assert!(matched);

    let entries = directory.entries().await;
    let ids: Vec<i64> = entries.iter().map(|e| e.conversation.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(
        entries[0].last_message.as_ref().unwrap().content,
        "news"
    );
}

#[tokio::test]
async fn test_conversations_without_messages_sort_last() {
    let directory = Directory::new();
    directory
        .replace_all(vec![
            entry(1, "A", None),
            entry(2, "B", Some(("hello", at(9, 0)))),
            entry(3, "C", None),
        ])
        .await;

    let ids: Vec<i64> = directory
        .entries()
        .await
        .iter()
        .map(|e| e.conversation.id)
        .collect();
    assert_eq!(ids[0], 2);
    assert!(ids[1..].contains(&1));
    assert!(ids[1..].contains(&3));
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let directory = Directory::new();

    assert!(directory.upsert(conversation(5, "Lease")).await);
    assert!(!directory.upsert(conversation(5, "Lease")).await);

    assert_eq!(directory.len().await, 1);
}

#[tokio::test]
async fn test_message_for_unknown_conversation_is_ignored() {
    let directory = Directory::new();
    directory
        .replace_all(vec![entry(1, "A", Some(("hello", at(9, 0))))])
        .await;

    let matched = directory.apply_message(&inbound(99, "stray", at(9, 5))).await;
    assert!(!matched);

    let entries = directory.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].last_message.as_ref().unwrap().content, "hello");
}

#[tokio::test]
async fn test_outbound_optimistic_send_updates_preview() {
    let directory = Directory::new();
    directory
        .replace_all(vec![
            entry(1, "A", Some(("old", at(10, 0)))),
            entry(2, "B", Some(("newer", at(10, 5)))),
        ])
        .await;

    // Optimistic copy: no server id yet, still pending
    let optimistic = Message {
        id: None,
        conversation_id: Some(1),
        content: "on my way".to_string(),
        sender: participant("alice", "Alice"),
        created_at: at(10, 6),
        correlation_id: Some(uuid::Uuid::new_v4()),
        pending: true,
    };
    assert!(directory.apply_message(&optimistic).await);

    let entries = directory.entries().await;
    assert_eq!(entries[0].conversation.id, 1);
    assert_eq!(
        entries[0].last_message.as_ref().unwrap().content,
        "on my way"
    );
}
