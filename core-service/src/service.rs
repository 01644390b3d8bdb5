//! # Feed Service
//!
//! One feed session: the catalog, the like flow and the playback engine task.
//!
//! ## Overview
//!
//! [`FeedService::start`] spawns the [`FeedPlaybackCoordinator`] run loop on
//! the current tokio runtime and keeps the sending half of its command
//! channel. Visibility commands from the host are forwarded untouched with
//! [`FeedService::dispatch`]. The service keeps its own copy of the sequence
//! so captions, like counts and profile totals can be read without a round
//! trip through the engine.
//!
//! Source errors never escape [`FeedService::load`]: the feed collapses to an
//! empty sequence and [`FeedEvent::SourceUnavailable`] is published once per
//! outage.

use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_library::likes::LikeStore;
use core_library::models::{FeedSequence, VideoId, VideoItem};
use core_library::profile::ProfileSummary;
use core_library::source::VideoSource;
use core_playback::{FeedCommand, FeedPlaybackCoordinator, PlaybackConfig};
use core_runtime::config::FeedConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, FeedEvent, Receiver};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::FeedDependencies;

/// Commands buffered between the host and the engine task.
const COMMAND_BUFFER: usize = 64;

// =============================================================================
// Session
// =============================================================================

/// Unique identifier for a feed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Service
// =============================================================================

/// A running feed session.
pub struct FeedService {
    session: SessionId,
    started_at: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    loaded_at: RwLock<Option<DateTime<Utc>>>,
    source: Arc<dyn VideoSource>,
    likes: Arc<dyn LikeStore>,
    events: EventBus,
    sequence: RwLock<FeedSequence>,
    commands: mpsc::Sender<FeedCommand>,
    engine: Mutex<Option<JoinHandle<()>>>,
    // Set while the last load failed; cleared by the next successful one.
    source_unavailable: AtomicBool,
}

impl FeedService {
    /// Start a session on the current tokio runtime.
    ///
    /// The feed starts empty; call [`load`](Self::load) to fetch the catalog.
    pub fn start(config: &FeedConfig, deps: FeedDependencies) -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        let events = EventBus::new(config.event_buffer);
        let mut coordinator =
            FeedPlaybackCoordinator::new(deps.backend, PlaybackConfig::from(config))?
                .with_event_bus(events.clone());

        let session = SessionId::new();
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let engine = runtime.spawn(
            async move { coordinator.run(receiver).await }
                .instrument(info_span!("feed_engine", session = %session)),
        );

        info!(session = %session, "Feed service started");

        Ok(Self {
            session,
            started_at: deps.clock.now(),
            clock: deps.clock,
            loaded_at: RwLock::new(None),
            source: deps.source,
            likes: deps.likes,
            events,
            sequence: RwLock::new(FeedSequence::empty()),
            commands,
            engine: Mutex::new(Some(engine)),
            source_unavailable: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Catalog, like and active-item events only.
    pub fn feed_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
            .filter(|event| matches!(event, CoreEvent::Feed(_)))
    }

    /// Per-slot player transitions only.
    pub fn player_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
            .filter(|event| matches!(event, CoreEvent::Player(_)))
    }

    /// When the current sequence was fetched. `None` until a load succeeds.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        *self.loaded_at.read()
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the catalog and install it as the displayed sequence.
    ///
    /// Returns the number of items installed; zero when every source failed.
    /// Errors only when the engine task has stopped.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn load(&self) -> Result<usize> {
        match self.source.fetch_catalog().await {
            Ok(catalog) => {
                let liked = self.liked_ids().await;
                let items: Vec<VideoItem> = catalog
                    .items
                    .into_iter()
                    .map(|item| {
                        if liked.contains(&item.id) {
                            let count = item.like_count.max(1);
                            item.with_like_count(count)
                        } else {
                            item
                        }
                    })
                    .collect();

                let sequence = FeedSequence::new(items);
                let item_count = sequence.len();
                self.install(sequence).await?;
                self.source_unavailable.store(false, Ordering::SeqCst);
                *self.loaded_at.write() = Some(self.clock.now());

                info!(item_count, from_fallback = catalog.from_fallback, "Feed loaded");
                self.emit(FeedEvent::Loaded {
                    item_count,
                    from_fallback: catalog.from_fallback,
                });
                Ok(item_count)
            }
            Err(e) => {
                error!(error = %e, "No video source available");
                self.install(FeedSequence::empty()).await?;
                *self.loaded_at.write() = None;

                if !self.source_unavailable.swap(true, Ordering::SeqCst) {
                    self.emit(FeedEvent::SourceUnavailable {
                        message: e.to_string(),
                    });
                }
                Ok(0)
            }
        }
    }

    /// Replace the feed with a fresh fetch. Every slot is reset.
    pub async fn reload(&self) -> Result<usize> {
        debug!(session = %self.session, "Reloading feed");
        self.load().await
    }

    async fn install(&self, sequence: FeedSequence) -> Result<()> {
        *self.sequence.write() = sequence.clone();
        self.dispatch(FeedCommand::ReplaceSequence(sequence)).await
    }

    async fn liked_ids(&self) -> BTreeSet<VideoId> {
        match self.likes.liked_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to read liked videos");
                BTreeSet::new()
            }
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Forward a command to the engine task.
    pub async fn dispatch(&self, command: FeedCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::EngineStopped)
    }

    pub async fn center_changed(&self, index: usize) -> Result<()> {
        self.dispatch(FeedCommand::CenterChanged(index)).await
    }

    pub async fn retry(&self, index: usize) -> Result<()> {
        self.dispatch(FeedCommand::RetryRequested(index)).await
    }

    /// Stop the engine task and wait for it to release every surface.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(engine) = self.engine.lock().take() else {
            return Ok(());
        };

        self.commands.send(FeedCommand::Shutdown).await.ok();
        engine.await.map_err(|e| {
            error!(error = %e, "Feed engine task failed");
            CoreError::EngineStopped
        })?;

        info!(session = %self.session, "Feed service stopped");
        Ok(())
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Flip the like on `id` and adjust its count by one.
    ///
    /// Returns the new like state.
    #[instrument(skip(self), fields(session = %self.session))]
    pub async fn toggle_like(&self, id: VideoId) -> Result<bool> {
        if self.sequence.read().position_of(id).is_none() {
            return Err(CoreError::UnknownVideo(id.as_i64()));
        }

        let liked = self.likes.toggle(id).await?;
        let delta = if liked { 1 } else { -1 };
        let like_count = self
            .sequence
            .write()
            .apply_like_delta(id, delta)
            .unwrap_or(0);
        self.dispatch(FeedCommand::ApplyLikeDelta { id, delta }).await?;

        debug!(%id, liked, like_count, "Like toggled");
        self.emit(FeedEvent::LikeToggled {
            item_id: id.as_i64(),
            liked,
            like_count,
        });
        Ok(liked)
    }

    pub async fn is_liked(&self, id: VideoId) -> Result<bool> {
        Ok(self.likes.is_liked(id).await?)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the displayed sequence.
    pub fn sequence(&self) -> FeedSequence {
        self.sequence.read().clone()
    }

    pub fn item_count(&self) -> usize {
        self.sequence.read().len()
    }

    pub fn item(&self, index: usize) -> Option<VideoItem> {
        self.sequence.read().get(index).cloned()
    }

    pub fn caption_at(&self, index: usize) -> Option<String> {
        self.sequence.read().get(index).map(VideoItem::caption)
    }

    /// Profile totals for `author_name` over the current feed.
    pub fn profile(&self, author_name: &str) -> ProfileSummary {
        ProfileSummary::for_author(author_name, self.sequence.read().iter())
    }

    fn emit(&self, event: FeedEvent) {
        self.events.emit(CoreEvent::Feed(event)).ok();
    }
}

impl fmt::Debug for FeedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedService")
            .field("session", &self.session)
            .field("started_at", &self.started_at)
            .field("items", &self.item_count())
            .finish_non_exhaustive()
    }
}
