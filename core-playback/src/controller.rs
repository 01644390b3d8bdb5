//! # Player Controller
//!
//! Lifecycle state machine of a single playback slot.
//!
//! ```text
//!  Idle ──prepare──> Preparing ──ready──> Ready ──play──> Playing
//!                        │                  │               ⇅ pause/play
//!                        └──failed──> Failed <──retry──  Paused
//! ```
//!
//! The controller is driven only from the coordinator's control path.
//! Readiness is observed asynchronously: the callback handed to the surface
//! sends a [`PlayerSignal`] tagged with the generation current at open time,
//! and [`PlaybackControl::apply_signal`] discards any signal whose generation
//! no longer matches.

use bridge_traits::playback::{Readiness, ReadinessCallback};
use core_runtime::events::{CoreEvent, EventBus, PlayerEvent};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

use crate::cache::SharedCache;
use crate::error::{PlaybackError, Result};
use crate::handle::PlayerHandle;
use crate::state::{
    FailureKind, Generation, PlaybackIntent, PlaybackTarget, PlayerSignal, PlayerState, SlotId,
};

/// The narrow capability the coordinator needs from a slot's player.
pub trait PlaybackControl: Send {
    /// Acquire a resource for `target` and start opening it.
    ///
    /// Idempotent for the same target while it is held. A different target
    /// releases the current one first.
    fn prepare(&mut self, target: PlaybackTarget) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Re-enter `Preparing` with the last target. Only legal from `Failed`.
    fn retry(&mut self) -> Result<()>;

    /// Drop the resource and invalidate in-flight readiness.
    fn release(&mut self);

    fn state(&self) -> &PlayerState;

    fn generation(&self) -> Generation;

    fn target(&self) -> Option<&PlaybackTarget>;

    /// Apply a completion signal. Returns `false` when it was dropped.
    fn apply_signal(&mut self, signal: &PlayerSignal) -> bool;
}

/// Everything a slot's controller is wired to, handed to controller factories.
#[derive(Clone)]
pub struct SlotContext {
    pub slot: SlotId,
    pub cache: SharedCache,
    pub signals: UnboundedSender<PlayerSignal>,
    pub events: Option<EventBus>,
}

/// Default [`PlaybackControl`] backed by the shared resource cache.
pub struct PlayerController {
    slot: SlotId,
    cache: SharedCache,
    signals: UnboundedSender<PlayerSignal>,
    events: Option<EventBus>,
    state: PlayerState,
    generation: Generation,
    target: Option<PlaybackTarget>,
    handle: Option<PlayerHandle>,
    pending: Option<PlaybackIntent>,
}

impl PlayerController {
    pub fn new(slot: SlotId, cache: SharedCache, signals: UnboundedSender<PlayerSignal>) -> Self {
        Self {
            slot,
            cache,
            signals,
            events: None,
            state: PlayerState::Idle,
            generation: Generation::default(),
            target: None,
            handle: None,
            pending: None,
        }
    }

    pub fn from_context(context: SlotContext) -> Self {
        let controller = Self::new(context.slot, context.cache, context.signals);
        match context.events {
            Some(events) => controller.with_event_bus(events),
            None => controller,
        }
    }

    /// Publish every transition as a [`PlayerEvent::StateChanged`].
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Intent recorded while preparing, applied on readiness.
    pub fn pending_intent(&self) -> Option<PlaybackIntent> {
        self.pending
    }

    fn begin_prepare(&mut self, target: PlaybackTarget) -> Result<()> {
        let generation = self.generation.bump();
        self.pending = None;
        self.target = Some(target.clone());

        let Some(url) = target.url.clone() else {
            self.fail(FailureKind::MissingSource, "Item has no playable source".to_string());
            return Ok(());
        };

        let acquired = self.cache.lock().acquire(target.id, target.index);
        let handle = match acquired {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(FailureKind::AcquisitionFailed, e.to_string());
                return Err(e);
            }
        };

        handle.set_muted(true);
        self.handle = Some(handle.clone());
        self.transition(PlayerState::Preparing);

        let sender = self.signals.clone();
        let slot = self.slot;
        let notify: ReadinessCallback = Box::new(move |readiness: Readiness| {
            sender
                .send(PlayerSignal {
                    slot,
                    generation,
                    readiness,
                })
                .ok();
        });

        if let Err(e) = handle.open(url.as_str(), notify) {
            self.fail(FailureKind::PlaybackFailed, e.to_string());
        }
        Ok(())
    }

    /// Return the handle to the cache and forget pending intent.
    fn reset_resources(&mut self) {
        self.pending = None;
        if let Some(handle) = self.handle.take() {
            self.cache.lock().release(handle.id());
        }
    }

    fn fail(&mut self, kind: FailureKind, reason: String) {
        let url = self.target.as_ref().and_then(|t| t.url.clone());
        match kind {
            FailureKind::MissingSource => {
                warn!(slot = %self.slot, reason = %reason, "Player has nothing to play")
            }
            _ => error!(slot = %self.slot, ?kind, reason = %reason, "Player failed"),
        }
        self.pending = None;
        self.transition(PlayerState::Failed { kind, reason, url });
    }

    fn transition(&mut self, next: PlayerState) {
        if self.state == next {
            return;
        }

        debug!(
            slot = %self.slot,
            generation = %self.generation,
            from = self.state.name(),
            to = next.name(),
            "Player state changed"
        );
        self.state = next;
        self.emit_state();
    }

    fn emit_state(&self) {
        let Some(events) = &self.events else {
            return;
        };

        let event = PlayerEvent::StateChanged {
            slot: self.slot.0,
            index: self.target.as_ref().map(|t| t.index),
            item_id: self.target.as_ref().map(|t| t.id.as_i64()),
            status: self.state.status(),
        };
        events.emit(CoreEvent::Player(event)).ok();
    }
}

impl PlaybackControl for PlayerController {
    fn prepare(&mut self, target: PlaybackTarget) -> Result<()> {
        let same_source = self
            .target
            .as_ref()
            .is_some_and(|current| current.same_source(&target));

        if same_source && (self.state.holds_target() || self.state.is_failed()) {
            if let Some(current) = self.target.as_mut() {
                current.index = target.index;
            }
            return Ok(());
        }

        if self.state != PlayerState::Idle || self.handle.is_some() {
            self.release();
        }
        self.begin_prepare(target)
    }

    fn play(&mut self) {
        match self.state {
            PlayerState::Ready | PlayerState::Paused => {
                if let Some(handle) = &self.handle {
                    handle.play();
                }
                self.transition(PlayerState::Playing);
            }
            PlayerState::Preparing => {
                debug!(slot = %self.slot, "Recording pending play");
                self.pending = Some(PlaybackIntent::Play);
            }
            PlayerState::Playing => {}
            PlayerState::Idle | PlayerState::Failed { .. } => {
                debug!(slot = %self.slot, state = self.state.name(), "Ignoring play");
            }
        }
    }

    fn pause(&mut self) {
        match self.state {
            PlayerState::Ready | PlayerState::Playing => {
                if let Some(handle) = &self.handle {
                    handle.pause();
                }
                self.transition(PlayerState::Paused);
            }
            PlayerState::Preparing => {
                debug!(slot = %self.slot, "Recording pending pause");
                self.pending = Some(PlaybackIntent::Pause);
            }
            PlayerState::Paused | PlayerState::Idle | PlayerState::Failed { .. } => {}
        }
    }

    fn retry(&mut self) -> Result<()> {
        let PlayerState::Failed { url, .. } = &self.state else {
            return Err(PlaybackError::invalid_transition(&self.state, "retry"));
        };
        if url.is_none() {
            return Err(PlaybackError::NoRetryTarget);
        }
        let Some(target) = self.target.clone() else {
            return Err(PlaybackError::NoRetryTarget);
        };

        debug!(slot = %self.slot, url = ?target.url, "Retrying failed player");
        self.reset_resources();
        self.begin_prepare(target)
    }

    fn release(&mut self) {
        self.generation.bump();
        self.reset_resources();
        self.transition(PlayerState::Idle);
        self.target = None;
    }

    fn state(&self) -> &PlayerState {
        &self.state
    }

    fn generation(&self) -> Generation {
        self.generation
    }

    fn target(&self) -> Option<&PlaybackTarget> {
        self.target.as_ref()
    }

    fn apply_signal(&mut self, signal: &PlayerSignal) -> bool {
        if signal.slot != self.slot || signal.generation != self.generation {
            warn!(
                slot = %signal.slot,
                signal_generation = %signal.generation,
                current_generation = %self.generation,
                "Dropping stale player signal"
            );
            return false;
        }

        if self.state != PlayerState::Preparing {
            debug!(slot = %self.slot, state = self.state.name(), "Ignoring duplicate readiness");
            return false;
        }

        match &signal.readiness {
            Readiness::Ready => {
                self.transition(PlayerState::Ready);
                if let Some(handle) = &self.handle {
                    handle.set_muted(false);
                }
                match self.pending.take() {
                    Some(PlaybackIntent::Play) => self.play(),
                    Some(PlaybackIntent::Pause) => self.pause(),
                    None => {}
                }
            }
            Readiness::Failed(message) => {
                self.fail(FailureKind::PlaybackFailed, message.clone());
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, PlayerResourceCache};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::playback::{VideoBackend, VideoSurface};
    use core_library::models::VideoId;
    use core_runtime::events::PlaybackStatus;
    use mockall::predicate::eq;
    use mockall::{mock, Sequence};
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use url::Url;

    mock! {
        pub Surface {}

        impl VideoSurface for Surface {
            fn open(&mut self, url: &str, notify: ReadinessCallback) -> BridgeResult<()>;
            fn play(&mut self);
            fn pause(&mut self);
            fn set_muted(&mut self, muted: bool);
            fn close(&mut self);
        }
    }

    mock! {
        pub Backend {}

        impl VideoBackend for Backend {
            fn allocate(&self) -> BridgeResult<Box<dyn VideoSurface>>;
        }
    }

    const URL: &str = "https://cdn.example.com/1.mp4";

    fn target(url: Option<&str>) -> PlaybackTarget {
        PlaybackTarget::new(VideoId(1), 0, url.and_then(|u| Url::parse(u).ok()))
    }

    fn lenient_surface() -> MockSurface {
        let mut surface = MockSurface::new();
        surface.expect_set_muted().return_const(());
        surface.expect_open().returning(|_, _| Ok(()));
        surface.expect_play().return_const(());
        surface.expect_pause().return_const(());
        surface.expect_close().return_const(());
        surface
    }

    fn controller_with(surface: MockSurface) -> (PlayerController, UnboundedReceiver<PlayerSignal>) {
        let mut backend = MockBackend::new();
        backend
            .expect_allocate()
            .return_once(move || Ok(Box::new(surface)));
        let cache = PlayerResourceCache::new(Arc::new(backend), CacheConfig::default())
            .unwrap()
            .into_shared();
        let (tx, rx) = mpsc::unbounded_channel();
        (PlayerController::new(SlotId(0), cache, tx), rx)
    }

    fn ready(controller: &PlayerController) -> PlayerSignal {
        PlayerSignal {
            slot: controller.slot(),
            generation: controller.generation(),
            readiness: Readiness::Ready,
        }
    }

    #[test]
    fn test_prepare_mutes_then_ready_unmutes_and_applies_play() {
        let mut seq = Sequence::new();
        let mut surface = MockSurface::new();
        surface
            .expect_set_muted()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_open()
            .withf(|url, _| url == URL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        surface
            .expect_set_muted()
            .with(eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface
            .expect_play()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        surface.expect_close().return_const(());

        let (mut controller, _rx) = controller_with(surface);
        controller.prepare(target(Some(URL))).unwrap();
        assert_eq!(controller.state(), &PlayerState::Preparing);

        controller.play();
        assert_eq!(controller.pending_intent(), Some(PlaybackIntent::Play));

        let signal = ready(&controller);
        assert!(controller.apply_signal(&signal));
        assert_eq!(controller.state(), &PlayerState::Playing);
        assert_eq!(controller.pending_intent(), None);
    }

    #[test]
    fn test_readiness_callback_sends_tagged_signal() {
        let mut surface = MockSurface::new();
        surface.expect_set_muted().return_const(());
        surface.expect_close().return_const(());
        surface.expect_open().returning(|_, notify| {
            notify(Readiness::Ready);
            Ok(())
        });

        let (mut controller, mut rx) = controller_with(surface);
        controller.prepare(target(Some(URL))).unwrap();

        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.slot, SlotId(0));
        assert_eq!(signal.generation, controller.generation());
        assert!(controller.apply_signal(&signal));
        assert_eq!(controller.state(), &PlayerState::Ready);
    }

    #[test]
    fn test_pending_intent_last_one_wins() {
        let (mut controller, _rx) = controller_with(lenient_surface());
        controller.prepare(target(Some(URL))).unwrap();
        controller.play();
        controller.pause();

        let signal = ready(&controller);
        controller.apply_signal(&signal);
        assert_eq!(controller.state(), &PlayerState::Paused);
    }

    #[test]
    fn test_prepare_same_target_twice_opens_once() {
        let mut surface = MockSurface::new();
        surface.expect_set_muted().return_const(());
        surface.expect_open().times(1).returning(|_, _| Ok(()));
        surface.expect_pause().times(1).return_const(());
        surface.expect_close().return_const(());

        let (mut controller, _rx) = controller_with(surface);
        controller.prepare(target(Some(URL))).unwrap();
        let generation = controller.generation();
        controller.prepare(target(Some(URL))).unwrap();
        assert_eq!(controller.generation(), generation);

        let signal = ready(&controller);
        controller.apply_signal(&signal);
        controller.pause();
        controller.pause();
        assert_eq!(controller.state(), &PlayerState::Paused);
    }

    #[test]
    fn test_release_drops_late_signal() {
        let (mut controller, _rx) = controller_with(lenient_surface());
        controller.prepare(target(Some(URL))).unwrap();
        let stale = ready(&controller);

        controller.release();
        assert_eq!(controller.state(), &PlayerState::Idle);
        assert!(controller.target().is_none());

        assert!(!controller.apply_signal(&stale));
        assert_eq!(controller.state(), &PlayerState::Idle);
    }

    #[test]
    fn test_failure_then_retry_reopens_same_url() {
        let (mut controller, _rx) = controller_with(lenient_surface());
        controller.prepare(target(Some(URL))).unwrap();

        let failed = PlayerSignal {
            slot: controller.slot(),
            generation: controller.generation(),
            readiness: Readiness::Failed("404".to_string()),
        };
        controller.apply_signal(&failed);
        assert!(matches!(
            controller.state(),
            PlayerState::Failed { kind: FailureKind::PlaybackFailed, url: Some(u), .. } if u.as_str() == URL
        ));

        // Failure is sticky until an explicit retry.
        controller.play();
        controller.prepare(target(Some(URL))).unwrap();
        assert!(controller.state().is_failed());

        controller.retry().unwrap();
        assert_eq!(controller.state(), &PlayerState::Preparing);
        assert_eq!(
            controller.target().and_then(|t| t.url.as_ref()).map(Url::as_str),
            Some(URL)
        );
    }

    #[test]
    fn test_retry_outside_failed_is_invalid() {
        let (mut controller, _rx) = controller_with(lenient_surface());
        assert!(matches!(
            controller.retry(),
            Err(PlaybackError::InvalidTransition { operation: "retry", .. })
        ));
    }

    #[test]
    fn test_missing_source_cannot_retry() {
        let (mut controller, _rx) = controller_with(lenient_surface());
        controller.prepare(target(None)).unwrap();

        assert!(matches!(
            controller.state(),
            PlayerState::Failed { kind: FailureKind::MissingSource, url: None, .. }
        ));
        assert!(matches!(controller.retry(), Err(PlaybackError::NoRetryTarget)));
        assert!(controller.state().is_failed());
    }

    #[test]
    fn test_acquisition_failure_is_reported() {
        let mut backend = MockBackend::new();
        backend
            .expect_allocate()
            .returning(|| Err(BridgeError::NotAvailable("decoder limit".to_string())));
        let cache = PlayerResourceCache::new(Arc::new(backend), CacheConfig::default())
            .unwrap()
            .into_shared();
        let (tx, _rx) = mpsc::unbounded_channel();
        let events = EventBus::new(16);
        let mut sub = events.subscribe();
        let mut controller = PlayerController::new(SlotId(3), cache, tx).with_event_bus(events);

        let err = controller.prepare(target(Some(URL))).unwrap_err();
        assert!(err.is_slot_failure());
        assert!(matches!(
            controller.state(),
            PlayerState::Failed { kind: FailureKind::AcquisitionFailed, .. }
        ));

        match sub.try_recv().unwrap() {
            CoreEvent::Player(PlayerEvent::StateChanged { slot, index, item_id, status }) => {
                assert_eq!(slot, 3);
                assert_eq!(index, Some(0));
                assert_eq!(item_id, Some(1));
                assert!(matches!(status, PlaybackStatus::Failed { retryable: true, .. }));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
