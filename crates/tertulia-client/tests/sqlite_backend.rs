use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use tertulia_client::{Client, ClientConfig, OutgoingContent, Theme, ThemeContext};
use tertulia_shared::{AuthIdentity, UserId};
use tertulia_store::{DocumentStore, FsBlobStorage, SqliteStore};

fn identity(uid: &str, name: &str) -> AuthIdentity {
    AuthIdentity {
        uid: UserId::new(uid),
        display_name: Some(name.into()),
        photo_url: None,
        email: None,
    }
}

#[tokio::test]
async fn conversation_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig::from_lookup(|key| {
        (key == "TERTULIA_DATA_DIR").then(|| dir.path().display().to_string())
    });

    let store = SqliteStore::open_at(&config.database_path()).unwrap();
    let blobs = FsBlobStorage::new(config.blob_dir(), config.max_upload_bytes)
        .await
        .unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let blobs = Arc::new(blobs);

    let ana = Client::new(store.clone(), blobs.clone(), &config);
    let beto = Client::new(store.clone(), blobs, &config);
    ana.login(identity("a1", "Ana")).await.unwrap();
    let beto_user = beto.login(identity("b2", "Beto")).await.unwrap();

    let conversation = ana.start_conversation(&beto_user).await.unwrap();
    assert_eq!(conversation.as_str(), "a1b2");

    let text = ana.send(OutgoingContent::text("hola")).await.unwrap().unwrap();
    let photo = ana
        .send(OutgoingContent::image(b"png".to_vec()))
        .await
        .unwrap()
        .unwrap();
    assert!(photo.message.img.as_deref().unwrap().starts_with("file://"));

    let mut rx = ana.watch_messages().await.unwrap();
    let log = timeout(Duration::from_secs(5), rx.wait_for(|m| m.len() == 2))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert_eq!(log[0].id, text.message.id);
    assert_eq!(log[1].id, photo.message.id);

    let index = store.get_index(&UserId::new("b2")).await.unwrap().unwrap();
    let entry = index.get(&conversation).unwrap();
    assert_eq!(entry.last_message.as_ref().unwrap().text, "📷 Foto");
    assert_eq!(entry.user_info.as_ref().unwrap().display_name, "Ana");
}

#[tokio::test]
async fn theme_persists_in_the_local_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tertulia.db");

    {
        let store = SqliteStore::open_at(&path).unwrap();
        let theme = ThemeContext::load(store.database()).unwrap();
        assert_eq!(theme.current(), Theme::Light);
        assert_eq!(theme.toggle().unwrap(), Theme::Dark);
    }

    let store = SqliteStore::open_at(&path).unwrap();
    let theme = ThemeContext::load(store.database()).unwrap();
    assert_eq!(theme.current(), Theme::Dark);
}
