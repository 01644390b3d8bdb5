//! # Feed Playback Coordinator
//!
//! Owns the item sequence and the single-active-item invariant.
//!
//! ## Overview
//!
//! Visibility events arrive as [`FeedCommand`]s. For a new center the
//! coordinator:
//! 1. pauses the previously active controller,
//! 2. evicts everything outside the window around the new center,
//! 3. binds a slot for the center (preparing it if needed) and plays it,
//! 4. prerolls the in-window neighbours.
//!
//! Completion signals from surfaces travel through an unbounded channel and
//! are applied on the same control path, so no controller is ever touched
//! concurrently.

use bridge_traits::playback::VideoBackend;
use core_library::models::{FeedSequence, VideoId};
use core_runtime::events::{CoreEvent, EventBus, FeedEvent};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{CacheStats, PlayerResourceCache, SharedCache};
use crate::config::PlaybackConfig;
use crate::controller::{PlaybackControl, PlayerController, SlotContext};
use crate::error::{PlaybackError, Result};
use crate::state::{PlaybackTarget, PlayerSignal, PlayerState, SlotId};

/// Builds the controller for a newly created slot.
pub type ControllerFactory<C> = Box<dyn FnMut(SlotContext) -> C + Send>;

/// Inbound commands on the coordinator's control path.
#[derive(Debug)]
pub enum FeedCommand {
    /// The item at screen center changed.
    CenterChanged(usize),
    EnteredPreloadWindow(usize),
    WillLeaveScreen(usize),
    DidLeaveScreen(usize),
    /// The user tapped retry on a failed item.
    RetryRequested(usize),
    ReplaceSequence(FeedSequence),
    ApplyLikeDelta { id: VideoId, delta: i64 },
    Shutdown,
}

struct PlaybackSlot<C> {
    index: Option<usize>,
    controller: C,
}

/// Single-active-player coordinator for one feed session.
pub struct FeedPlaybackCoordinator<C: PlaybackControl = PlayerController> {
    config: PlaybackConfig,
    sequence: FeedSequence,
    active: Option<usize>,
    // Position in this vector is the slot id.
    slots: Vec<PlaybackSlot<C>>,
    factory: ControllerFactory<C>,
    cache: SharedCache,
    signal_tx: UnboundedSender<PlayerSignal>,
    signal_rx: Option<UnboundedReceiver<PlayerSignal>>,
    events: Option<EventBus>,
}

impl FeedPlaybackCoordinator<PlayerController> {
    /// Create a coordinator driving [`PlayerController`]s on `backend`.
    pub fn new(backend: Arc<dyn VideoBackend>, config: PlaybackConfig) -> Result<Self> {
        Self::with_factory(backend, config, Box::new(PlayerController::from_context))
    }
}

impl<C: PlaybackControl> FeedPlaybackCoordinator<C> {
    /// Create a coordinator whose slots are driven by controllers built by
    /// `factory`.
    pub fn with_factory(
        backend: Arc<dyn VideoBackend>,
        config: PlaybackConfig,
        factory: ControllerFactory<C>,
    ) -> Result<Self> {
        config.validate().map_err(PlaybackError::Config)?;
        let cache = PlayerResourceCache::new(backend, config.cache())?.into_shared();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            sequence: FeedSequence::empty(),
            active: None,
            slots: Vec::new(),
            factory,
            cache,
            signal_tx,
            signal_rx: Some(signal_rx),
            events: None,
        })
    }

    /// Publish feed events on `events`. Slots created afterwards publish
    /// their player events there too.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Make `center` the single playing item.
    pub fn on_visibility_changed(&mut self, center: usize) -> Result<()> {
        self.check_index(center)?;
        if self.active == Some(center) {
            return Ok(());
        }

        let previous = self.active;
        if let Some(pos) = previous.and_then(|index| self.slot_position(index)) {
            self.slots[pos].controller.pause();
        }
        self.active = Some(center);
        debug!(?previous, center, "Active item changed");
        self.emit(FeedEvent::ActiveChanged {
            previous,
            current: Some(center),
        });

        self.evict_outside_window(center);

        if let Some(pos) = self.bind(center) {
            self.slots[pos].controller.play();
        }

        if self.config.preroll_neighbors {
            for index in self.config.window(center, self.sequence.len()) {
                if index != center {
                    self.bind(index);
                }
            }
        }

        self.release_displaced();
        Ok(())
    }

    /// Prepare `index` without playing it, if it lies within the window.
    pub fn on_item_entered_preload_window(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;

        let within = self
            .active
            .map_or(true, |active| self.config.in_window(active, index));
        if !within {
            debug!(index, active = ?self.active, "Ignoring preload outside window");
            return Ok(());
        }

        self.bind(index);
        self.release_displaced();
        Ok(())
    }

    /// Pause whatever plays at `index` the moment it starts leaving.
    pub fn on_item_will_leave_screen(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        self.pause_leaving(index);
        Ok(())
    }

    /// Pause, and release the slot when `index` was the active item or lies
    /// outside the window around it.
    pub fn on_item_did_leave_screen(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let was_active = self.active == Some(index);
        self.pause_leaving(index);

        let outside = self
            .active
            .is_some_and(|active| !self.config.in_window(active, index));
        if was_active || outside {
            if let Some(pos) = self.slot_position(index) {
                debug!(index, was_active, active = ?self.active, "Releasing slot that left the screen");
                self.release_slot(pos);
            }
        }
        Ok(())
    }

    /// Explicit retry of a failed item. The active item resumes playing once
    /// ready.
    pub fn on_retry_requested(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let is_active = self.active == Some(index);

        let Some(pos) = self.slot_position(index) else {
            if is_active {
                if let Some(pos) = self.bind(index) {
                    self.slots[pos].controller.play();
                }
                self.release_displaced();
            } else {
                debug!(index, "Retry for unbound index ignored");
            }
            return Ok(());
        };

        self.slots[pos].controller.retry()?;
        if is_active {
            self.slots[pos].controller.play();
        }
        self.release_displaced();
        Ok(())
    }

    /// Install a new sequence, invalidating every controller.
    pub fn on_sequence_replaced(&mut self, sequence: FeedSequence) {
        self.release_all();

        let previous = self.active.take();
        self.sequence = sequence;
        info!(items = self.sequence.len(), "Feed sequence replaced");

        self.emit(FeedEvent::SequenceReplaced {
            item_count: self.sequence.len(),
        });
        if previous.is_some() {
            self.emit(FeedEvent::ActiveChanged {
                previous,
                current: None,
            });
        }
    }

    // =========================================================================
    // Signals & Commands
    // =========================================================================

    /// Apply a completion signal to the addressed slot.
    pub fn handle_signal(&mut self, signal: PlayerSignal) -> bool {
        match self.slots.get_mut(signal.slot.0) {
            Some(slot) => slot.controller.apply_signal(&signal),
            None => {
                warn!(slot = %signal.slot, "Signal for unknown slot dropped");
                false
            }
        }
    }

    /// Apply every signal already queued. Returns how many were applied.
    pub fn drain_signals(&mut self) -> usize {
        let Some(mut signals) = self.signal_rx.take() else {
            return 0;
        };

        let mut applied = 0;
        while let Ok(signal) = signals.try_recv() {
            if self.handle_signal(signal) {
                applied += 1;
            }
        }
        self.signal_rx = Some(signals);
        applied
    }

    pub fn handle_command(&mut self, command: FeedCommand) -> Result<()> {
        match command {
            FeedCommand::CenterChanged(index) => self.on_visibility_changed(index),
            FeedCommand::EnteredPreloadWindow(index) => self.on_item_entered_preload_window(index),
            FeedCommand::WillLeaveScreen(index) => self.on_item_will_leave_screen(index),
            FeedCommand::DidLeaveScreen(index) => self.on_item_did_leave_screen(index),
            FeedCommand::RetryRequested(index) => self.on_retry_requested(index),
            FeedCommand::ReplaceSequence(sequence) => {
                self.on_sequence_replaced(sequence);
                Ok(())
            }
            FeedCommand::ApplyLikeDelta { id, delta } => {
                self.apply_like_delta(id, delta);
                Ok(())
            }
            FeedCommand::Shutdown => Ok(()),
        }
    }

    /// Drive the coordinator until `commands` closes or `Shutdown` arrives.
    ///
    /// Completion signals are applied as they arrive, ahead of pending
    /// commands. Every resource is released on exit.
    #[instrument(skip_all)]
    pub async fn run(&mut self, mut commands: Receiver<FeedCommand>) {
        let Some(mut signals) = self.signal_rx.take() else {
            error!("Coordinator is already running");
            return;
        };
        info!("Feed coordinator started");

        loop {
            tokio::select! {
                biased;

                Some(signal) = signals.recv() => {
                    self.handle_signal(signal);
                }
                command = commands.recv() => match command {
                    Some(FeedCommand::Shutdown) | None => break,
                    Some(command) => {
                        if let Err(e) = self.handle_command(command) {
                            warn!(error = %e, "Feed command rejected");
                        }
                    }
                },
            }
        }

        self.signal_rx = Some(signals);
        self.release_all();
        self.active = None;
        info!("Feed coordinator stopped");
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn sequence(&self) -> &FeedSequence {
        &self.sequence
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// State of the controller bound to `index`; `None` when unbound.
    pub fn state_at(&self, index: usize) -> Option<&PlayerState> {
        self.slot_position(index)
            .map(|pos| self.slots[pos].controller.state())
    }

    pub fn controller_at(&self, index: usize) -> Option<&C> {
        self.slot_position(index).map(|pos| &self.slots[pos].controller)
    }

    pub fn slot_for(&self, index: usize) -> Option<SlotId> {
        self.slot_position(index).map(SlotId)
    }

    /// Indices whose controller reports `Playing`, ascending.
    pub fn playing_indices(&self) -> Vec<usize> {
        let mut playing: Vec<usize> = self
            .slots
            .iter()
            .filter(|slot| slot.controller.state().is_playing())
            .filter_map(|slot| slot.index)
            .collect();
        playing.sort_unstable();
        playing
    }

    pub fn bound_indices(&self) -> Vec<usize> {
        let mut bound: Vec<usize> = self.slots.iter().filter_map(|slot| slot.index).collect();
        bound.sort_unstable();
        bound
    }

    pub fn caption_at(&self, index: usize) -> Option<String> {
        self.sequence.get(index).map(|item| item.caption())
    }

    /// Adjust an item's derived like count; returns the new count.
    pub fn apply_like_delta(&mut self, id: VideoId, delta: i64) -> Option<i64> {
        self.sequence.apply_like_delta(id, delta)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn resident_count(&self) -> usize {
        self.cache.lock().resident_count()
    }

    /// Sender for completion signals, for hosts that deliver readiness
    /// outside the surface callback.
    pub fn signal_sender(&self) -> UnboundedSender<PlayerSignal> {
        self.signal_tx.clone()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_index(&self, index: usize) -> Result<()> {
        if self.sequence.contains_index(index) {
            Ok(())
        } else {
            warn!(index, len = self.sequence.len(), "Index out of range");
            Err(PlaybackError::IndexOutOfRange {
                index,
                len: self.sequence.len(),
            })
        }
    }

    fn slot_position(&self, index: usize) -> Option<usize> {
        self.slots.iter().position(|slot| slot.index == Some(index))
    }

    fn pause_leaving(&mut self, index: usize) {
        if let Some(pos) = self.slot_position(index) {
            self.slots[pos].controller.pause();
        }
        if self.active == Some(index) {
            self.active = None;
            self.emit(FeedEvent::ActiveChanged {
                previous: Some(index),
                current: None,
            });
        }
    }

    /// Bind a slot to `index`, preparing its controller when newly bound.
    fn bind(&mut self, index: usize) -> Option<usize> {
        if let Some(pos) = self.slot_position(index) {
            return Some(pos);
        }

        let item = self.sequence.get(index)?;
        let target = PlaybackTarget::new(item.id, index, item.playable_url.clone());

        let pos = self.free_slot(index);
        let slot = &mut self.slots[pos];
        slot.index = Some(index);
        if let Err(e) = slot.controller.prepare(target) {
            warn!(index, slot = pos, error = %e, "Prepare failed");
        }
        Some(pos)
    }

    fn free_slot(&mut self, index: usize) -> usize {
        if let Some(pos) = self.slots.iter().position(|slot| slot.index.is_none()) {
            return pos;
        }

        if self.slots.len() < self.config.max_residents() {
            let context = SlotContext {
                slot: SlotId(self.slots.len()),
                cache: self.cache.clone(),
                signals: self.signal_tx.clone(),
                events: self.events.clone(),
            };
            let controller = (self.factory)(context);
            self.slots.push(PlaybackSlot {
                index: None,
                controller,
            });
            return self.slots.len() - 1;
        }

        let reference = self.active.unwrap_or(index);
        let victim = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| slot.index.map(|bound| (pos, bound.abs_diff(reference))))
            .max_by_key(|&(_, distance)| distance)
            .map(|(pos, _)| pos)
            .unwrap_or(0);
        debug!(slot = victim, reference, "Recycling farthest slot");
        self.release_slot(victim);
        victim
    }

    fn release_slot(&mut self, pos: usize) {
        let slot = &mut self.slots[pos];
        slot.controller.release();
        slot.index = None;
    }

    fn release_item(&mut self, id: VideoId) {
        let position = self
            .slots
            .iter()
            .position(|slot| slot.index.is_some() && slot.controller.target().map(|t| t.id) == Some(id));
        if let Some(pos) = position {
            self.release_slot(pos);
        }
    }

    fn evict_outside_window(&mut self, center: usize) {
        let evicted = self
            .cache
            .lock()
            .evict_outside_window(center, self.config.window_radius);
        for id in evicted {
            self.release_item(id);
        }

        // Slots without a resident (failed, no source) are swept by index.
        let outside: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.index
                    .is_some_and(|bound| !self.config.in_window(center, bound))
            })
            .map(|(pos, _)| pos)
            .collect();
        for pos in outside {
            self.release_slot(pos);
        }
    }

    fn release_displaced(&mut self) {
        let displaced = self.cache.lock().take_displaced();
        for id in displaced {
            debug!(video_id = %id, "Releasing displaced item");
            self.release_item(id);
        }
    }

    fn release_all(&mut self) {
        for slot in &mut self.slots {
            if slot.index.take().is_some() {
                slot.controller.pause();
            }
            slot.controller.release();
        }
        self.cache.lock().clear();
    }

    fn emit(&self, event: FeedEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Feed(event)).ok();
        }
    }
}

impl<C: PlaybackControl> fmt::Debug for FeedPlaybackCoordinator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedPlaybackCoordinator")
            .field("items", &self.sequence.len())
            .field("active", &self.active)
            .field("bound", &self.bound_indices())
            .field("config", &self.config)
            .finish()
    }
}
