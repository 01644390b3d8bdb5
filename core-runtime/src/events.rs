//! # Event Bus System
//!
//! Event-driven plumbing for the feed core using `tokio::sync::broadcast`.
//! Playback slots and the feed service publish typed events; the presentation
//! layer subscribes and renders (spinner, error overlay, like counter).
//!
//! ## Overview
//!
//! - **Event Types**: [`FeedEvent`] for catalog-level changes and
//!   [`PlayerEvent`] for per-slot state transitions, wrapped in [`CoreEvent`]
//! - **EventBus**: central broadcast channel
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐  subscribe  ┌──────────────┐
//! │ PlayerController ├────────>│           ├────────────>│ Feed UI      │
//! └──────────────────┘         │ EventBus  │             └──────────────┘
//! ┌──────────────────┐  emit   │           │  subscribe  ┌──────────────┐
//! │ FeedService      ├────────>│           ├────────────>│ Profile view │
//! └──────────────────┘         └───────────┘             └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, FeedEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Feed(FeedEvent::Loaded { item_count: 10, from_fallback: false }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Feed loaded");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving. A UI should re-query slot state from the coordinator.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with zero subscribers returns `Err`; publishers ignore it with `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Catalog and feed-level events
    Feed(FeedEvent),
    /// Per-slot playback state events
    Player(PlayerEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Feed(e) => e.description(),
            CoreEvent::Player(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Feed(FeedEvent::SourceUnavailable { .. }) => EventSeverity::Error,
            CoreEvent::Player(PlayerEvent::StateChanged {
                status: PlaybackStatus::Failed { .. },
                ..
            }) => EventSeverity::Warning,
            CoreEvent::Feed(FeedEvent::Loaded { from_fallback: true, .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Feed(FeedEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Feed Events
// ============================================================================

/// Events about the feed as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FeedEvent {
    /// A catalog fetch completed and the sequence was installed.
    Loaded {
        item_count: usize,
        /// The primary (remote) source failed and the bundled catalog was used.
        from_fallback: bool,
    },
    /// Every source failed; the feed is now empty.
    SourceUnavailable { message: String },
    /// The displayed sequence was replaced and all slots were reset.
    SequenceReplaced { item_count: usize },
    /// The centered item changed.
    ActiveChanged {
        previous: Option<usize>,
        current: Option<usize>,
    },
    /// A like was toggled and the derived count adjusted.
    LikeToggled {
        item_id: i64,
        liked: bool,
        like_count: i64,
    },
}

impl FeedEvent {
    fn description(&self) -> &str {
        match self {
            FeedEvent::Loaded { .. } => "Feed loaded",
            FeedEvent::SourceUnavailable { .. } => "Video source unavailable",
            FeedEvent::SequenceReplaced { .. } => "Feed sequence replaced",
            FeedEvent::ActiveChanged { .. } => "Active item changed",
            FeedEvent::LikeToggled { .. } => "Like toggled",
        }
    }
}

// ============================================================================
// Player Events
// ============================================================================

/// Presentation-facing view of a slot's player state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status")]
pub enum PlaybackStatus {
    Idle,
    /// Buffering; show the spinner.
    Preparing,
    Ready,
    Playing,
    Paused,
    /// Show the error overlay. `retryable` is false when the item has no
    /// playable source at all.
    Failed { reason: String, retryable: bool },
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackStatus::Playing)
    }
}

/// Events emitted by playback slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// A slot's controller transitioned.
    StateChanged {
        slot: usize,
        /// Feed index the slot is bound to, when bound.
        index: Option<usize>,
        item_id: Option<i64>,
        status: PlaybackStatus,
    },
}

impl PlayerEvent {
    fn description(&self) -> &str {
        match self {
            PlayerEvent::StateChanged { status, .. } => match status {
                PlaybackStatus::Idle => "Player released",
                PlaybackStatus::Preparing => "Player preparing",
                PlaybackStatus::Ready => "Player ready",
                PlaybackStatus::Playing => "Playback started",
                PlaybackStatus::Paused => "Playback paused",
                PlaybackStatus::Failed { .. } => "Playback failed",
            },
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let player_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Player(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind, `RecvError::Closed`
    /// once all senders are dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Drains queued events until one matches. `None` when the queue is empty.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
