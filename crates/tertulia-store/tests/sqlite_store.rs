use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use uuid::Uuid;

use tertulia_shared::{ConversationId, IndexEntry, LastMessage, Message, PeerInfo, UserId, UserPatch};
use tertulia_store::{DocumentStore, SqliteStore};

fn message(sender: &str, text: &str) -> Message {
    Message {
        id: Uuid::new_v4(),
        text: text.into(),
        sender_id: UserId::new(sender),
        sender_display_name: sender.into(),
        sender_photo_url: String::new(),
        date: Utc::now(),
        img: None,
        audio: None,
        reply_to: None,
        is_deleted: false,
    }
}

fn open_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open_at(&dir.path().join("tertulia.db")).unwrap();
    (dir, store)
}

#[tokio::test]
async fn message_subscription_sees_later_writes() {
    let (_dir, store) = open_store();
    let conv = ConversationId::new("a1b2");
    store.put_message(&conv, &message("a1", "hola")).await.unwrap();

    let mut sub = store.subscribe_messages(&conv).await.unwrap();
    let first = timeout(Duration::from_secs(5), sub.next()).await.unwrap().unwrap();
    assert_eq!(first.len(), 1);

    store.put_message(&conv, &message("b2", "¿qué tal?")).await.unwrap();
    let second = timeout(Duration::from_secs(5), sub.next()).await.unwrap().unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[1].text, "¿qué tal?");

    // writes to other conversations do not wake this subscription
    store
        .put_message(&ConversationId::new("a1c3"), &message("a1", "otro"))
        .await
        .unwrap();
    tokio::task::yield_now().await;
    assert!(sub.try_next().is_none());
}

#[tokio::test]
async fn index_subscription_starts_empty_and_follows_merges() {
    let (_dir, store) = open_store();
    let uid = UserId::new("a1");
    let conv = ConversationId::new("a1b2");

    let mut sub = store.subscribe_index(&uid).await.unwrap();
    let first = timeout(Duration::from_secs(5), sub.next()).await.unwrap().unwrap();
    assert!(first.is_empty());

    assert!(store
        .update_index_entry(&uid, &conv, IndexEntry::default())
        .await
        .unwrap_err()
        .is_not_found());

    store.create_index(&uid).await.unwrap();
    let _ = timeout(Duration::from_secs(5), sub.next()).await.unwrap().unwrap();

    let peer = PeerInfo::user(&UserId::new("b2"), "Beto", "");
    store
        .update_index_entry(&uid, &conv, IndexEntry::with_peer(peer, Utc::now()))
        .await
        .unwrap();
    store
        .merge_index_entry(
            &uid,
            &conv,
            IndexEntry::with_last_message(LastMessage { text: "hola".into() }, Utc::now()),
        )
        .await
        .unwrap();

    let mut latest = None;
    while let Ok(Some(snapshot)) = timeout(Duration::from_millis(200), sub.next()).await {
        latest = Some(snapshot);
    }
    let latest = latest.unwrap();
    let entry = latest.get(&conv).unwrap();
    assert_eq!(entry.user_info.as_ref().unwrap().display_name, "Beto");
    assert_eq!(entry.last_message.as_ref().unwrap().text, "hola");
}

#[tokio::test]
async fn users_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tertulia.db");
    let uid = UserId::new("a1");

    {
        let store = SqliteStore::open_at(&path).unwrap();
        store
            .upsert_user(
                &uid,
                UserPatch {
                    display_name: Some("Ana".into()),
                    ..UserPatch::presence(true, Utc::now())
                },
            )
            .await
            .unwrap();
    }

    let store = SqliteStore::open_at(&path).unwrap();
    let user = store.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(user.display_name_lower, "ana");
    assert!(user.is_online);

    let found = store
        .users_in_name_range("an", &format!("an{}", char::MAX), 1)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}
