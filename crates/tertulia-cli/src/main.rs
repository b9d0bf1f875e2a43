//! # tertulia
//!
//! Command-line front end for the Tertulia engine over the local SQLite
//! store.  Every invocation signs in as the given uid, runs one command and
//! signs out again.

mod args;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use tracing::{info, warn};

use tertulia_client::{Client, ClientConfig, GroupBuilder, OutgoingContent, ThemeContext};
use tertulia_shared::constants::APP_NAME;
use tertulia_shared::time::clock_label;
use tertulia_shared::{AuthIdentity, UserId};
use tertulia_store::{DocumentStore, FsBlobStorage, SqliteStore};

use crate::args::{Command, Invocation, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    tertulia_client::init_tracing();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match args::parse(&raw) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{APP_NAME}: {e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = ClientConfig::from_env();
    info!(data_dir = %config.data_dir.display(), "Loaded configuration");

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating {}", config.data_dir.display()))?;
    let store = SqliteStore::open_at(&config.database_path())?;
    let blobs = FsBlobStorage::new(config.blob_dir(), config.max_upload_bytes).await?;

    let theme = ThemeContext::load(store.database())?;

    let store: Arc<dyn DocumentStore> = Arc::new(store);
    let client = Client::new(store, Arc::new(blobs), &config);
    let result = run(&client, &theme, invocation).await;
    finish(&client, result).await
}

/// Sign out whoever is still signed in.  A failed sign-out is logged and
/// never replaces the command's own result.
async fn finish(client: &Client, result: Result<()>) -> Result<()> {
    if client.current_user().is_some() {
        match client.logout().await {
            Ok(outcome) if !outcome.is_complete() => {
                warn!(failures = outcome.failures().len(), "Could not mark the user offline");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Sign-out failed"),
        }
    }
    result
}

async fn run(client: &Client, theme: &ThemeContext, invocation: Invocation) -> Result<()> {
    let uid = UserId::parse(&invocation.uid)?;
    let display_name = match &invocation.command {
        Command::Register { display_name } => Some(display_name.clone()),
        _ => None,
    };
    let me = client
        .login(AuthIdentity {
            uid,
            display_name,
            photo_url: None,
            email: None,
        })
        .await?;

    match invocation.command {
        Command::Register { .. } => {
            println!("Signed in as {} ({})", me.display_name, me.uid);
        }

        Command::Chats => {
            let mut rx = client
                .watch_conversations()
                .await
                .context("conversation feed not running")?;
            // first snapshot from the store
            let _ = tokio::time::timeout(Duration::from_secs(2), rx.changed()).await;
            let rows = rx.borrow().clone();
            if rows.is_empty() {
                println!("No conversations yet.");
            }
            for row in rows {
                println!(
                    "{:>5}  {:<24} {}",
                    row.time_label(&Local),
                    row.peer.display_name,
                    row.last_message.unwrap_or_default()
                );
            }
        }

        Command::Search { prefix } => {
            let user = client.search_user(&prefix).await?;
            let status = client.presence_of(&user.uid).await?;
            println!("{} ({}) {}", user.display_name, user.uid, status);
        }

        Command::Read { prefix } => {
            let peer = client.search_user(&prefix).await?;
            client.start_conversation(&peer).await?;
            let mut rx = client
                .watch_messages()
                .await
                .context("message stream not running")?;
            let _ = tokio::time::timeout(Duration::from_secs(2), rx.changed()).await;
            let messages = rx.borrow().clone();
            if let Some(title) = client.selection().title() {
                println!("{APP_NAME} · {title}");
            }
            for message in messages {
                let body = if message.is_deleted {
                    "(deleted)".to_string()
                } else if let Some(audio) = &message.audio {
                    format!("[voice note] {audio}")
                } else if let Some(img) = &message.img {
                    format!("[photo] {img} {}", message.text)
                } else {
                    message.text.clone()
                };
                println!(
                    "{:>5}  {}: {}",
                    clock_label(&message.date, &Local),
                    message.sender_display_name,
                    body
                );
            }
        }

        Command::Send { prefix, text } => {
            let peer = client.search_user(&prefix).await?;
            let conversation = client.start_conversation(&peer).await?;
            match client.send(OutgoingContent::Text(text)).await? {
                Some(sent) => println!(
                    "Sent to {} in {} at {}",
                    peer.display_name,
                    conversation,
                    clock_label(&sent.message.date, &Local)
                ),
                None => println!("Nothing to send."),
            }
        }

        Command::Group { name, members } => {
            let mut builder = GroupBuilder::new();
            builder.set_name(name);
            for prefix in members {
                let user = client.search_user(&prefix).await?;
                if !builder.add(&me.uid, &user) {
                    println!("Skipping {}", user.display_name);
                }
            }
            let created = client.create_group(&builder).await?;
            println!(
                "Created group {} with {} of {} members",
                created.group_id,
                created.fanout.succeeded(),
                created.fanout.attempted()
            );
        }

        Command::Discover => {
            for suggestion in client.discover_users().await? {
                let status = client.presence_of(&suggestion.user.uid).await?;
                println!(
                    "{:<24} {:>2} shared  {}",
                    suggestion.user.display_name, suggestion.shared_interests, status
                );
            }
        }

        Command::Theme => {
            println!("Theme: {}", theme.toggle()?);
        }
    }

    info!(at = %Utc::now(), "Command finished");
    Ok(())
}
