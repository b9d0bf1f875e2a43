use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use tertulia_client::{Client, ClientConfig, ClientError, ClientEvent};
use tertulia_shared::{AuthIdentity, PresenceStatus, UserId, UserPatch};
use tertulia_store::{DocumentStore, MemoryBlobStorage, MemoryStore};

fn identity(uid: &str, name: Option<&str>) -> AuthIdentity {
    AuthIdentity {
        uid: UserId::new(uid),
        display_name: name.map(str::to_string),
        photo_url: None,
        email: Some(format!("{uid}@example.com")),
    }
}

fn client(store: &MemoryStore) -> Client {
    Client::new(
        Arc::new(store.clone()),
        Arc::new(MemoryBlobStorage::new()),
        &ClientConfig::default(),
    )
}

#[tokio::test]
async fn login_creates_user_and_index() {
    let store = MemoryStore::new();
    let ana = client(&store);

    let user = ana.login(identity("a1", Some("Ana María"))).await.unwrap();
    assert_eq!(user.display_name_lower, "ana maría");
    assert_eq!(user.email.as_deref(), Some("a1@example.com"));
    assert!(user.is_online);
    assert!(user.last_seen.is_some());
    let created_at = user.created_at.unwrap();
    assert!(store.get_index(&user.uid).await.unwrap().is_some());
    assert!(ana.heartbeat_running());

    // a later login keeps the original creation time
    let again = ana.login(identity("a1", Some("Ana María"))).await.unwrap();
    assert_eq!(again.created_at, Some(created_at));
}

#[tokio::test]
async fn missing_display_name_falls_back_to_email() {
    let store = MemoryStore::new();
    let user = client(&store).login(identity("x9", None)).await.unwrap();
    assert_eq!(user.display_name, "x9");
}

#[tokio::test]
async fn logout_marks_offline_and_ends_session() {
    let store = MemoryStore::new();
    let ana = client(&store);
    ana.login(identity("a1", Some("Ana"))).await.unwrap();

    let outcome = ana.logout().await.unwrap();
    assert!(outcome.is_complete());
    assert!(ana.current_user().is_none());
    assert!(!ana.heartbeat_running());

    let stored = store.get_user(&UserId::new("a1")).await.unwrap().unwrap();
    assert!(!stored.is_online);
    assert!(matches!(ana.logout().await, Err(ClientError::NotSignedIn)));
}

#[tokio::test]
async fn switching_user_signs_the_previous_one_out() {
    let store = MemoryStore::new();
    let client = client(&store);
    client.login(identity("a1", Some("Ana"))).await.unwrap();

    let beto = client.login(identity("b2", Some("Beto"))).await.unwrap();
    assert_eq!(client.current_user().unwrap().uid, beto.uid);
    assert!(client.heartbeat_running());

    let ana = store.get_user(&UserId::new("a1")).await.unwrap().unwrap();
    assert!(!ana.is_online);
    let beto = store.get_user(&UserId::new("b2")).await.unwrap().unwrap();
    assert!(beto.is_online);
}

#[tokio::test]
async fn page_closing_keeps_session() {
    let store = MemoryStore::new();
    let ana = client(&store);
    assert!(ana.page_closing().await.is_none());

    ana.login(identity("a1", Some("Ana"))).await.unwrap();
    let outcome = ana.page_closing().await.unwrap();
    assert!(outcome.is_complete());
    assert!(ana.current_user().is_some());

    let stored = store.get_user(&UserId::new("a1")).await.unwrap().unwrap();
    assert!(!stored.is_online);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_refreshes_presence_every_interval() {
    let store = MemoryStore::new();
    let ana = client(&store);
    ana.login(identity("a1", Some("Ana"))).await.unwrap();
    let uid = UserId::new("a1");

    store
        .update_user(&uid, UserPatch::presence(false, Utc::now()))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!store.get_user(&uid).await.unwrap().unwrap().is_online);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(store.get_user(&uid).await.unwrap().unwrap().is_online);
}

#[tokio::test]
async fn failed_presence_write_is_reported_not_raised() {
    let store = MemoryStore::new();
    let ana = client(&store);
    let mut events = ana.subscribe_events();
    ana.login(identity("a1", Some("Ana"))).await.unwrap();

    let uid = UserId::new("a1");
    store.set_unreachable(&uid, true);

    let outcome = ana.heartbeat().await.unwrap();
    assert!(!outcome.is_complete());
    assert_eq!(outcome.failures()[0].target, "a1");

    let mut reported = false;
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::PresenceWriteFailed { uid: failed, .. } = event {
            assert_eq!(failed, uid);
            reported = true;
        }
    }
    assert!(reported);

    // logout still tears the session down
    let outcome = ana.logout().await.unwrap();
    assert!(!outcome.is_complete());
    assert!(ana.current_user().is_none());
}

#[tokio::test]
async fn derived_status_ignores_stale_online_flag() {
    let store = MemoryStore::new();
    let ana = client(&store);
    ana.login(identity("a1", Some("Ana"))).await.unwrap();
    let uid = UserId::new("b2");

    store
        .upsert_user(&uid, UserPatch::presence(true, Utc::now()))
        .await
        .unwrap();
    assert_eq!(ana.presence_of(&uid).await.unwrap(), PresenceStatus::Online);

    // crashed session: flag still set, heartbeat long gone
    store
        .update_user(
            &uid,
            UserPatch::presence(true, Utc::now() - chrono::Duration::minutes(20)),
        )
        .await
        .unwrap();
    assert_eq!(ana.presence_of(&uid).await.unwrap(), PresenceStatus::MinutesAgo(20));

    assert!(matches!(
        ana.presence_of(&UserId::new("zz")).await,
        Err(ClientError::UserNotFound(_))
    ));
}
