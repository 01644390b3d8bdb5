//! # Feed Playback Demo
//!
//! Scrolls through a small feed against a fake backend whose surfaces become
//! ready after a short delay, printing every published event.
//!
//! Run with: `cargo run --example feed_demo --package core-playback`

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{Readiness, ReadinessCallback, VideoBackend, VideoSurface};
use bridge_traits::time::LogLevel;
use core_library::models::{FeedSequence, VideoItem};
use core_playback::{FeedCommand, FeedPlaybackCoordinator, PlaybackConfig};
use core_runtime::events::EventBus;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use url::Url;

// ============================================================================
// Delayed Backend (for demonstration)
// ============================================================================

struct DelayedSurface {
    id: usize,
}

impl VideoSurface for DelayedSurface {
    fn open(&mut self, url: &str, notify: ReadinessCallback) -> BridgeResult<()> {
        info!(surface = self.id, url, "open");
        let readiness = if url.ends_with("3.mp4") {
            Readiness::Failed("HTTP 404".to_string())
        } else {
            Readiness::Ready
        };
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            notify(readiness);
        });
        Ok(())
    }

    fn play(&mut self) {
        info!(surface = self.id, "play");
    }

    fn pause(&mut self) {
        info!(surface = self.id, "pause");
    }

    fn set_muted(&mut self, muted: bool) {
        info!(surface = self.id, muted, "mute");
    }

    fn close(&mut self) {
        info!(surface = self.id, "close");
    }
}

#[derive(Default)]
struct DelayedBackend {
    allocated: AtomicUsize,
}

impl VideoBackend for DelayedBackend {
    fn allocate(&self) -> BridgeResult<Box<dyn VideoSurface>> {
        let id = self.allocated.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(DelayedSurface { id }))
    }
}

fn demo_feed(len: i64) -> FeedSequence {
    (0..len)
        .map(|id| {
            VideoItem::new(id, Url::parse(&format!("https://cdn.example.com/{id}.mp4")).ok())
                .with_caption_source(format!("https://www.pexels.com/video/ocean-waves-at-dusk-{id}/"))
        })
        .collect::<Vec<_>>()
        .into()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Debug),
    )?;

    let events = EventBus::new(64);
    let mut stream = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = stream.recv().await {
            println!("[{:?}] {} {:?}", event.severity(), event.description(), event);
        }
    });

    let backend = Arc::new(DelayedBackend::default());
    let mut coordinator =
        FeedPlaybackCoordinator::new(backend.clone(), PlaybackConfig::default())?
            .with_event_bus(events);

    let (commands, receiver) = mpsc::channel(16);
    let engine = tokio::spawn(async move {
        coordinator.run(receiver).await;
    });

    commands.send(FeedCommand::ReplaceSequence(demo_feed(6))).await?;
    commands.send(FeedCommand::CenterChanged(0)).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Fling: only the last center ends up playing.
    for index in 1..=3 {
        commands.send(FeedCommand::CenterChanged(index)).await?;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Item 3 failed; tapping retry re-opens the same URL.
    commands.send(FeedCommand::RetryRequested(3)).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    commands.send(FeedCommand::Shutdown).await?;
    engine.await?;

    info!(
        surfaces = backend.allocated.load(Ordering::SeqCst),
        "Demo complete"
    );
    Ok(())
}
