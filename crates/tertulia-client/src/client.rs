//! The engine facade handed to the presentation layer.
//!
//! [`Client`] wires the components together around one [`Session`] and owns
//! the two long-lived subscriptions: the index feed (signed-in lifetime) and
//! the message stream (active conversation lifetime).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use tertulia_shared::{AuthIdentity, ConversationId, Message, PeerInfo, PresenceStatus, User, UserId};
use tertulia_store::{BlobStorage, DocumentStore};

use crate::best_effort::BestEffort;
use crate::call::{call_room, CallRoom};
use crate::composer::{Composer, OutgoingContent, Sent, Target};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EventBus};
use crate::fanout::{IndexFanout, PerParticipantFanout};
use crate::groups::{GroupBuilder, GroupCreated, GroupManager};
use crate::index::{ConversationSummary, IndexAggregator, IndexFeed};
use crate::presence::PresenceManager;
use crate::profile::{ProfileService, ProfileUpdate, Suggestion};
use crate::selection::{SelectTarget, Selection};
use crate::session::Session;
use crate::stream::MessageStream;

pub struct Client {
    store: Arc<dyn DocumentStore>,
    events: EventBus,
    session: Arc<Session>,
    presence: PresenceManager,
    composer: Composer,
    index: IndexAggregator,
    groups: GroupManager,
    profile: ProfileService,
    stream: Mutex<Option<MessageStream>>,
    index_feed: Mutex<Option<IndexFeed>>,
}

impl Client {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStorage>,
        config: &ClientConfig,
    ) -> Self {
        let fanout: Arc<dyn IndexFanout> = Arc::new(PerParticipantFanout::new(store.clone()));
        Self::with_fanout(store, blobs, fanout, config)
    }

    /// Build with a custom index reconciliation strategy.
    pub fn with_fanout(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStorage>,
        fanout: Arc<dyn IndexFanout>,
        config: &ClientConfig,
    ) -> Self {
        let events = EventBus::new(config.event_capacity);
        let session = Arc::new(Session::new());

        Self {
            presence: PresenceManager::new(
                store.clone(),
                session.clone(),
                events.clone(),
                config.heartbeat_interval,
                config.online_window(),
            ),
            composer: Composer::new(store.clone(), blobs, fanout.clone(), config.max_upload_bytes),
            index: IndexAggregator::new(store.clone(), fanout.clone()),
            groups: GroupManager::new(store.clone(), fanout, config.group_photo_url.clone()),
            profile: ProfileService::new(store.clone()),
            stream: Mutex::new(None),
            index_feed: Mutex::new(None),
            store,
            events,
            session,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    // -- identity & presence --------------------------------------------------

    pub fn current_user(&self) -> Option<User> {
        self.presence.current_user()
    }

    /// Sign in.  A different user still signed in on this client is signed
    /// out first so their presence does not linger.
    pub async fn login(&self, identity: AuthIdentity) -> Result<User> {
        if let Some(previous) = self.presence.current_user() {
            if previous.uid != identity.uid {
                info!(previous = %previous.uid, next = %identity.uid, "Switching user");
                self.logout().await?;
            }
        }
        self.close_stream().await;
        let user = self.presence.login(identity).await?;
        let feed = IndexFeed::open(self.store.as_ref(), user.uid.clone(), self.events.clone()).await?;
        *self.index_feed.lock().await = Some(feed);
        Ok(user)
    }

    pub async fn logout(&self) -> Result<BestEffort> {
        self.close_stream().await;
        self.index_feed.lock().await.take();
        self.presence.logout().await
    }

    pub async fn page_closing(&self) -> Option<BestEffort> {
        self.presence.page_closing().await
    }

    pub async fn heartbeat(&self) -> Option<BestEffort> {
        self.presence.heartbeat().await
    }

    pub fn heartbeat_running(&self) -> bool {
        self.presence.heartbeat_running()
    }

    /// Derived presence of another user, read fresh from the store.
    pub async fn presence_of(&self, uid: &UserId) -> Result<PresenceStatus> {
        let user = self
            .store
            .get_user(uid)
            .await?
            .ok_or_else(|| ClientError::UserNotFound(uid.to_string()))?;
        Ok(self.presence.status_of(&user, Utc::now()))
    }

    // -- selection --------------------------------------------------------------

    pub fn selection(&self) -> Selection {
        self.session.selection()
    }

    /// Id of the active conversation, or the `"null"` sentinel.
    pub fn current_conversation(&self) -> ConversationId {
        self.session.selection().conversation_id()
    }

    /// Switch conversations.  The previous message stream is closed before
    /// the new one opens.  If the new stream cannot be opened the selection
    /// falls back to nothing, so picking the same peer again retries.
    pub async fn select(&self, target: SelectTarget) -> Result<Selection> {
        let mut slot = self.stream.lock().await;
        let (selection, changed) = self.session.select(target);
        if !changed {
            return Ok(selection);
        }

        slot.take();
        if let (Selection::Active { conversation_id, .. }, Some(uid)) =
            (&selection, self.session.current_uid())
        {
            let opened = MessageStream::open(
                self.store.as_ref(),
                conversation_id.clone(),
                uid,
                self.events.clone(),
            )
            .await;
            match opened {
                Ok(stream) => *slot = Some(stream),
                Err(e) => {
                    warn!(conversation = %conversation_id, error = %e, "Failed to open message stream");
                    self.session.select(SelectTarget::Nothing);
                    self.events.emit(ClientEvent::SelectionChanged {
                        conversation_id: ConversationId::none(),
                        feed: false,
                    });
                    return Err(e);
                }
            }
        }

        self.events.emit(ClientEvent::SelectionChanged {
            conversation_id: selection.conversation_id(),
            feed: selection.is_feed(),
        });
        Ok(selection)
    }

    pub async fn select_peer(&self, peer: Option<PeerInfo>) -> Result<Selection> {
        self.select(SelectTarget::from_peer(peer)).await
    }

    pub async fn open_feed(&self) -> Result<Selection> {
        self.select(SelectTarget::Feed).await
    }

    pub async fn close(&self) -> Result<Selection> {
        self.select(SelectTarget::Nothing).await
    }

    // -- messages ---------------------------------------------------------------

    /// Mirror of the active conversation's log.
    pub async fn messages(&self) -> Vec<Message> {
        self.stream
            .lock()
            .await
            .as_ref()
            .map(MessageStream::messages)
            .unwrap_or_default()
    }

    /// Change handle for the active conversation's mirror.
    pub async fn watch_messages(&self) -> Option<tokio::sync::watch::Receiver<Vec<Message>>> {
        self.stream.lock().await.as_ref().map(MessageStream::watch)
    }

    pub fn start_reply(&self, message: &Message) {
        self.session.set_reply(Some(message.reply_ref()));
    }

    pub fn cancel_reply(&self) {
        self.session.set_reply(None);
    }

    pub fn pending_reply(&self) -> Option<tertulia_shared::ReplyRef> {
        self.session.pending_reply()
    }

    /// Send into the active conversation, quoting the pending reply if any.
    pub async fn send(&self, content: OutgoingContent) -> Result<Option<Sent>> {
        let user = self.session.require_user()?;
        let Selection::Active {
            conversation_id,
            peer,
        } = self.session.selection()
        else {
            return Err(ClientError::NoActiveConversation);
        };

        let reply = self.session.pending_reply();
        let target = Target {
            conversation_id: &conversation_id,
            peer: &peer,
        };
        let sent = self.composer.send(&user, target, content, reply.clone()).await?;

        if let (Some(_), Some(reply)) = (&sent, &reply) {
            self.session.consume_reply(reply);
        }
        Ok(sent)
    }

    pub async fn delete_message(&self, message_id: Uuid) -> Result<Message> {
        let user = self.session.require_user()?;
        let selection = self.session.selection();
        let Selection::Active {
            conversation_id, ..
        } = &selection
        else {
            return Err(ClientError::NoActiveConversation);
        };
        self.composer.delete(&user, conversation_id, message_id).await
    }

    // -- conversation list --------------------------------------------------

    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        self.index_feed
            .lock()
            .await
            .as_ref()
            .map(IndexFeed::conversations)
            .unwrap_or_default()
    }

    pub async fn watch_conversations(
        &self,
    ) -> Option<tokio::sync::watch::Receiver<Vec<ConversationSummary>>> {
        self.index_feed.lock().await.as_ref().map(IndexFeed::watch)
    }

    pub async fn search_user(&self, text: &str) -> Result<User> {
        self.session.require_user()?;
        self.index.search_user(text).await
    }

    /// Open the conversation with `peer`, creating it on first contact, and
    /// select it.
    pub async fn start_conversation(&self, peer: &User) -> Result<ConversationId> {
        let me = self.session.require_user()?;
        let conversation_id = self.index.open_conversation(&me, peer).await?;
        self.select(SelectTarget::Peer(peer.peer_info())).await?;
        Ok(conversation_id)
    }

    // -- groups -----------------------------------------------------------------

    pub async fn create_group(&self, builder: &GroupBuilder) -> Result<GroupCreated> {
        let me = self.session.require_user()?;
        let members = builder.member_ids();
        if members.is_empty() {
            return Err(ClientError::InvalidGroup("no members selected".into()));
        }
        let created = self.groups.create_group(builder.name(), &me, &members).await?;
        if !created.fanout.is_complete() {
            warn!(
                group = %created.group_id,
                failed = created.fanout.failures().len(),
                "Group not visible to every member"
            );
        }
        Ok(created)
    }

    // -- profile ----------------------------------------------------------------

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User> {
        let me = self.session.require_user()?;
        let user = self.profile.update_profile(&me.uid, update).await?;
        self.session.refresh_user(user.clone());
        Ok(user)
    }

    pub async fn rename(&self, display_name: &str) -> Result<User> {
        let me = self.session.require_user()?;
        let user = self.profile.rename(&me.uid, display_name).await?;
        self.session.refresh_user(user.clone());
        Ok(user)
    }

    pub async fn discover_users(&self) -> Result<Vec<Suggestion>> {
        let me = self.session.require_user()?;
        self.profile.discover_users(&me).await
    }

    // -- calls --------------------------------------------------------------------

    pub fn call_room(&self) -> Option<CallRoom> {
        let user = self.session.current_user()?;
        call_room(&self.session.selection(), &user.uid, &user.display_name)
    }

    async fn close_stream(&self) {
        if let Some(stream) = self.stream.lock().await.take() {
            info!(conversation = %stream.conversation_id(), "Closing message stream");
        }
    }
}
