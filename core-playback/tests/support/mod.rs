//! Recording fake of the platform video backend.
//!
//! Surfaces log every call and park their readiness callbacks until a test
//! fires them with [`RecordingBackend::complete`].

#![allow(dead_code)]

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::playback::{Readiness, ReadinessCallback, VideoBackend, VideoSurface};
use core_library::models::{FeedSequence, VideoItem};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Allocate(usize),
    Open(usize, String),
    Play(usize),
    Pause(usize),
    Mute(usize, bool),
    Close(usize),
}

struct Pending {
    url: String,
    notify: ReadinessCallback,
}

#[derive(Default)]
struct Recorder {
    next_surface: usize,
    ops: Vec<Op>,
    pending: Vec<Pending>,
    playing: HashSet<usize>,
    fail_allocations: bool,
    auto_ready: bool,
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Surfaces report `Ready` from inside `open`.
    pub fn auto_ready() -> Arc<Self> {
        let backend = Self::default();
        backend.inner.lock().auto_ready = true;
        Arc::new(backend)
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.inner.lock().fail_allocations = fail;
    }

    /// Fire every parked callback for `url`, oldest first.
    pub fn complete(&self, url: &str, readiness: Readiness) -> usize {
        let callbacks: Vec<ReadinessCallback> = {
            let mut inner = self.inner.lock();
            let (matching, rest): (Vec<Pending>, Vec<Pending>) =
                inner.pending.drain(..).partition(|p| p.url == url);
            inner.pending = rest;
            matching.into_iter().map(|p| p.notify).collect()
        };

        let fired = callbacks.len();
        for notify in callbacks {
            notify(readiness.clone());
        }
        fired
    }

    /// Fire every parked callback.
    pub fn complete_all(&self, readiness: Readiness) -> usize {
        let callbacks: Vec<ReadinessCallback> = {
            let mut inner = self.inner.lock();
            inner.pending.drain(..).map(|p| p.notify).collect()
        };

        let fired = callbacks.len();
        for notify in callbacks {
            notify(readiness.clone());
        }
        fired
    }

    pub fn pending_urls(&self) -> Vec<String> {
        self.inner.lock().pending.iter().map(|p| p.url.clone()).collect()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.inner.lock().ops.clone()
    }

    pub fn open_count(&self, url: &str) -> usize {
        self.inner
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Open(_, u) if u == url))
            .count()
    }

    pub fn allocations(&self) -> usize {
        self.inner.lock().next_surface
    }

    /// Surfaces currently playing at the platform level.
    pub fn playing_count(&self) -> usize {
        self.inner.lock().playing.len()
    }
}

impl VideoBackend for RecordingBackend {
    fn allocate(&self) -> Result<Box<dyn VideoSurface>> {
        let mut inner = self.inner.lock();
        if inner.fail_allocations {
            return Err(BridgeError::SurfaceUnavailable("decoder limit reached".to_string()));
        }
        let id = inner.next_surface;
        inner.next_surface += 1;
        inner.ops.push(Op::Allocate(id));
        Ok(Box::new(RecordingSurface {
            id,
            inner: self.inner.clone(),
        }))
    }
}

struct RecordingSurface {
    id: usize,
    inner: Arc<Mutex<Recorder>>,
}

impl VideoSurface for RecordingSurface {
    fn open(&mut self, url: &str, notify: ReadinessCallback) -> Result<()> {
        let auto_ready = {
            let mut inner = self.inner.lock();
            inner.ops.push(Op::Open(self.id, url.to_string()));
            inner.playing.remove(&self.id);
            inner.auto_ready
        };

        if auto_ready {
            notify(Readiness::Ready);
        } else {
            self.inner.lock().pending.push(Pending {
                url: url.to_string(),
                notify,
            });
        }
        Ok(())
    }

    fn play(&mut self) {
        let mut inner = self.inner.lock();
        inner.ops.push(Op::Play(self.id));
        inner.playing.insert(self.id);
    }

    fn pause(&mut self) {
        let mut inner = self.inner.lock();
        inner.ops.push(Op::Pause(self.id));
        inner.playing.remove(&self.id);
    }

    fn set_muted(&mut self, muted: bool) {
        self.inner.lock().ops.push(Op::Mute(self.id, muted));
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock();
        inner.ops.push(Op::Close(self.id));
        inner.playing.remove(&self.id);
    }
}

pub fn url_for(id: i64) -> String {
    format!("https://cdn.example.com/{}.mp4", id)
}

/// Items `0..n` with playable URLs from [`url_for`].
pub fn feed(n: i64) -> FeedSequence {
    FeedSequence::new(
        (0..n)
            .map(|id| VideoItem::new(id, Url::parse(&url_for(id)).ok()))
            .collect(),
    )
}
