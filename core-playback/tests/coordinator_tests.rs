//! Feed coordinator behaviour against a recording backend.

mod support;

#[cfg(test)]
mod tests {
    use crate::support::{feed, url_for, Op, RecordingBackend};
    use bridge_traits::playback::Readiness;
    use core_library::models::{FeedSequence, VideoId, VideoItem};
    use core_playback::{
        FailureKind, FeedCommand, FeedPlaybackCoordinator, PlaybackConfig, PlaybackError,
        PlayerState,
    };
    use core_runtime::events::{CoreEvent, EventBus, FeedEvent, PlaybackStatus, PlayerEvent};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn setup(items: i64, config: PlaybackConfig) -> (FeedPlaybackCoordinator, Arc<RecordingBackend>) {
        let backend = RecordingBackend::new();
        let mut coordinator = FeedPlaybackCoordinator::new(backend.clone(), config).unwrap();
        coordinator.on_sequence_replaced(feed(items));
        (coordinator, backend)
    }

    fn ready(coordinator: &mut FeedPlaybackCoordinator, backend: &RecordingBackend, id: i64) {
        backend.complete(&url_for(id), Readiness::Ready);
        coordinator.drain_signals();
    }

    fn surface_of_open(backend: &RecordingBackend, id: i64) -> usize {
        backend
            .ops()
            .iter()
            .rev()
            .find_map(|op| match op {
                Op::Open(surface, url) if *url == url_for(id) => Some(*surface),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_first_center_plays_and_prerolls_neighbour() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());

        coordinator.on_visibility_changed(0).unwrap();
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Preparing));
        assert_eq!(coordinator.state_at(1), Some(&PlayerState::Preparing));
        assert_eq!(coordinator.state_at(2), None);

        ready(&mut coordinator, &backend, 0);
        ready(&mut coordinator, &backend, 1);

        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Playing));
        assert_eq!(coordinator.state_at(1), Some(&PlayerState::Ready));
        assert_eq!(coordinator.playing_indices(), vec![0]);
        assert_eq!(backend.playing_count(), 1);
    }

    #[test]
    fn test_rapid_center_change_pauses_before_playing() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        ready(&mut coordinator, &backend, 0);
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Playing));

        coordinator.on_visibility_changed(1).unwrap();
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Paused));
        assert!(coordinator.playing_indices().is_empty());

        ready(&mut coordinator, &backend, 1);
        assert_eq!(coordinator.state_at(1), Some(&PlayerState::Playing));
        assert_eq!(coordinator.playing_indices(), vec![1]);
        assert_eq!(backend.playing_count(), 1);

        let first = surface_of_open(&backend, 0);
        let second = surface_of_open(&backend, 1);
        let ops = backend.ops();
        let paused_at = ops.iter().rposition(|op| *op == Op::Pause(first)).unwrap();
        let played_at = ops.iter().rposition(|op| *op == Op::Play(second)).unwrap();
        assert!(paused_at < played_at);
    }

    #[test]
    fn test_fling_leaves_single_pending_player() {
        let (mut coordinator, backend) = setup(10, PlaybackConfig::default());
        for center in 0..10 {
            coordinator.on_visibility_changed(center).unwrap();
        }

        backend.complete_all(Readiness::Ready);
        coordinator.drain_signals();

        assert_eq!(coordinator.active_index(), Some(9));
        assert_eq!(coordinator.playing_indices(), vec![9]);
        assert_eq!(backend.playing_count(), 1);
        assert!(coordinator.resident_count() <= 3);
    }

    #[test]
    fn test_fling_with_ready_items_never_overlaps_playback() {
        let (mut coordinator, backend) = setup(12, PlaybackConfig::default());
        let centers = [0, 1, 2, 3, 2, 5, 6, 4, 11, 10, 9];

        for &center in &centers {
            coordinator.on_visibility_changed(center).unwrap();
            ready(&mut coordinator, &backend, center as i64);
            backend.complete_all(Readiness::Ready);
            coordinator.drain_signals();
            assert_eq!(coordinator.playing_indices(), vec![center]);
        }

        let mut playing = HashSet::new();
        let mut most_concurrent = 0;
        let mut plays = 0;
        for op in backend.ops() {
            match op {
                Op::Play(surface) => {
                    playing.insert(surface);
                    plays += 1;
                }
                Op::Pause(surface) | Op::Close(surface) => {
                    playing.remove(&surface);
                }
                _ => {}
            }
            most_concurrent = most_concurrent.max(playing.len());
        }

        assert_eq!(most_concurrent, 1);
        assert!(plays >= centers.len());
        assert_eq!(coordinator.active_index(), Some(9));
        assert_eq!(backend.playing_count(), 1);
    }

    #[test]
    fn test_random_visibility_never_plays_two() {
        let config = PlaybackConfig::default();
        let (mut coordinator, backend) = setup(12, config);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let index = rng.gen_range(0..12);
            let result = match rng.gen_range(0..6) {
                0 | 1 => coordinator.on_visibility_changed(index),
                2 => coordinator.on_item_entered_preload_window(index),
                3 => coordinator.on_item_will_leave_screen(index),
                4 => coordinator.on_item_did_leave_screen(index),
                _ => {
                    let outcome = if rng.gen_range(0..4) == 0 {
                        Readiness::Failed("network".to_string())
                    } else {
                        Readiness::Ready
                    };
                    backend.complete(&url_for(index as i64), outcome);
                    coordinator.drain_signals();
                    Ok(())
                }
            };
            assert!(result.is_ok());

            assert!(coordinator.playing_indices().len() <= 1);
            assert!(backend.playing_count() <= 1);
            assert!(coordinator.resident_count() <= config.max_residents());
            if let Some(playing) = coordinator.playing_indices().first() {
                assert_eq!(coordinator.active_index(), Some(*playing));
            }
        }
    }

    #[test]
    fn test_window_bound_holds_across_centers() {
        let (mut coordinator, _backend) = setup(20, PlaybackConfig::default());
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            coordinator.on_visibility_changed(rng.gen_range(0..20)).unwrap();
            assert!(coordinator.resident_count() <= 3);
            assert!(coordinator.bound_indices().len() <= 3);
        }
    }

    #[test]
    fn test_eviction_releases_far_items() {
        let (mut coordinator, backend) = setup(10, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        coordinator.on_visibility_changed(5).unwrap();

        assert_eq!(coordinator.bound_indices(), vec![4, 5, 6]);
        assert_eq!(coordinator.state_at(0), None);

        // Late readiness for the evicted item changes nothing.
        backend.complete(&url_for(0), Readiness::Ready);
        coordinator.drain_signals();
        assert_eq!(coordinator.state_at(0), None);
        assert!(coordinator.playing_indices().is_empty());
        assert!(coordinator.cache_stats().evictions >= 1);
    }

    #[test]
    fn test_preroll_disabled_binds_center_only() {
        let config = PlaybackConfig::default().with_preroll(false);
        let (mut coordinator, _backend) = setup(5, config);
        coordinator.on_visibility_changed(2).unwrap();
        assert_eq!(coordinator.bound_indices(), vec![2]);
    }

    #[test]
    fn test_sequence_replacement_discards_late_callbacks() {
        let events = EventBus::new(64);
        let mut sub = events.subscribe();
        let backend = RecordingBackend::new();
        let mut coordinator = FeedPlaybackCoordinator::new(backend.clone(), PlaybackConfig::default())
            .unwrap()
            .with_event_bus(events);
        coordinator.on_sequence_replaced(feed(3));
        coordinator.on_visibility_changed(0).unwrap();

        coordinator.on_sequence_replaced(feed(2));
        assert_eq!(coordinator.active_index(), None);
        assert_eq!(coordinator.resident_count(), 0);
        assert!(coordinator.bound_indices().is_empty());

        backend.complete_all(Readiness::Ready);
        assert_eq!(coordinator.drain_signals(), 0);
        assert!(coordinator.playing_indices().is_empty());

        let mut replaced = Vec::new();
        while let Ok(event) = sub.try_recv() {
            if let CoreEvent::Feed(FeedEvent::SequenceReplaced { item_count }) = event {
                replaced.push(item_count);
            }
        }
        assert_eq!(replaced, vec![3, 2]);
    }

    #[test]
    fn test_failure_is_sticky_until_retry() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        backend.complete(&url_for(0), Readiness::Failed("404".to_string()));
        coordinator.drain_signals();

        assert!(matches!(
            coordinator.state_at(0),
            Some(PlayerState::Failed { kind: FailureKind::PlaybackFailed, .. })
        ));
        assert_eq!(backend.open_count(&url_for(0)), 1);

        coordinator.on_visibility_changed(1).unwrap();
        coordinator.on_visibility_changed(0).unwrap();
        assert!(coordinator.state_at(0).is_some_and(PlayerState::is_failed));
        assert_eq!(backend.open_count(&url_for(0)), 1);

        coordinator.on_retry_requested(0).unwrap();
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Preparing));
        assert_eq!(backend.open_count(&url_for(0)), 2);

        ready(&mut coordinator, &backend, 0);
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Playing));
    }

    #[test]
    fn test_retry_on_healthy_slot_is_rejected() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        ready(&mut coordinator, &backend, 0);

        assert!(matches!(
            coordinator.on_retry_requested(0),
            Err(PlaybackError::InvalidTransition { .. })
        ));
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Playing));
    }

    #[test]
    fn test_item_without_source_fails_without_retry() {
        let backend = RecordingBackend::new();
        let mut coordinator =
            FeedPlaybackCoordinator::new(backend.clone(), PlaybackConfig::default()).unwrap();
        coordinator.on_sequence_replaced(FeedSequence::new(vec![VideoItem::new(1, None)]));

        coordinator.on_visibility_changed(0).unwrap();
        assert!(matches!(
            coordinator.state_at(0),
            Some(PlayerState::Failed { kind: FailureKind::MissingSource, url: None, .. })
        ));
        assert_eq!(backend.allocations(), 0);
        assert!(matches!(
            coordinator.on_retry_requested(0),
            Err(PlaybackError::NoRetryTarget)
        ));
    }

    #[test]
    fn test_acquisition_failure_surfaces_as_state() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        backend.fail_allocations(true);

        coordinator.on_visibility_changed(0).unwrap();
        assert!(matches!(
            coordinator.state_at(0),
            Some(PlayerState::Failed { kind: FailureKind::AcquisitionFailed, .. })
        ));
        assert_eq!(coordinator.cache_stats().allocation_failures, 2);

        backend.fail_allocations(false);
        coordinator.on_retry_requested(0).unwrap();
        ready(&mut coordinator, &backend, 0);
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Playing));
    }

    #[test]
    fn test_will_leave_pauses_prerolled_item() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        ready(&mut coordinator, &backend, 1);
        assert_eq!(coordinator.state_at(1), Some(&PlayerState::Ready));

        coordinator.on_item_will_leave_screen(1).unwrap();
        assert_eq!(coordinator.state_at(1), Some(&PlayerState::Paused));
        assert_eq!(coordinator.active_index(), Some(0));
    }

    #[test]
    fn test_leaving_active_item_replays_on_return() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        coordinator.on_visibility_changed(1).unwrap();
        ready(&mut coordinator, &backend, 1);

        coordinator.on_item_will_leave_screen(1).unwrap();
        assert_eq!(coordinator.active_index(), None);
        assert_eq!(coordinator.state_at(1), Some(&PlayerState::Paused));
        assert_eq!(backend.playing_count(), 0);

        coordinator.on_visibility_changed(1).unwrap();
        assert_eq!(coordinator.state_at(1), Some(&PlayerState::Playing));
    }

    #[test]
    fn test_pause_while_preparing_lands_paused() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        coordinator.on_item_will_leave_screen(0).unwrap();

        ready(&mut coordinator, &backend, 0);
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Paused));
        assert_eq!(backend.playing_count(), 0);
    }

    #[test]
    fn test_did_leave_releases_outside_window() {
        let (mut coordinator, _backend) = setup(6, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        coordinator.on_item_entered_preload_window(1).unwrap();
        coordinator.on_item_entered_preload_window(4).unwrap();
        assert_eq!(coordinator.bound_indices(), vec![0, 1]);

        coordinator.on_visibility_changed(3).unwrap();
        coordinator.on_item_did_leave_screen(2).unwrap();
        assert_eq!(coordinator.bound_indices(), vec![2, 3, 4]);

        coordinator.on_visibility_changed(4).unwrap();
        coordinator.on_item_did_leave_screen(2).unwrap();
        assert_eq!(coordinator.bound_indices(), vec![3, 4, 5]);
    }

    #[test]
    fn test_did_leave_releases_active_item() {
        let (mut coordinator, backend) = setup(3, PlaybackConfig::default());
        coordinator.on_visibility_changed(0).unwrap();
        ready(&mut coordinator, &backend, 0);
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Playing));

        coordinator.on_item_did_leave_screen(0).unwrap();
        assert_eq!(coordinator.active_index(), None);
        assert_eq!(coordinator.bound_indices(), vec![1]);
        assert_eq!(coordinator.state_at(0), None);
        assert_eq!(backend.playing_count(), 0);

        coordinator.on_visibility_changed(0).unwrap();
        ready(&mut coordinator, &backend, 0);
        assert_eq!(coordinator.state_at(0), Some(&PlayerState::Playing));
        assert_eq!(backend.open_count(&url_for(0)), 2);
    }

    #[test]
    fn test_out_of_range_commands_are_rejected() {
        let (mut coordinator, _backend) = setup(2, PlaybackConfig::default());
        for command in [
            FeedCommand::CenterChanged(5),
            FeedCommand::EnteredPreloadWindow(2),
            FeedCommand::WillLeaveScreen(9),
            FeedCommand::RetryRequested(3),
        ] {
            assert!(matches!(
                coordinator.handle_command(command),
                Err(PlaybackError::IndexOutOfRange { len: 2, .. })
            ));
        }
        assert_eq!(coordinator.active_index(), None);
    }

    #[test]
    fn test_caption_and_like_accessors() {
        let backend = RecordingBackend::new();
        let mut coordinator =
            FeedPlaybackCoordinator::new(backend, PlaybackConfig::default()).unwrap();
        coordinator.on_sequence_replaced(FeedSequence::new(vec![VideoItem::new(7, None)
            .with_caption_source("https://www.pexels.com/video/nature-sunset-beautiful-123/")]));

        assert_eq!(coordinator.caption_at(0).as_deref(), Some("Nature Sunset Beautiful"));
        assert_eq!(coordinator.caption_at(1), None);

        coordinator
            .handle_command(FeedCommand::ApplyLikeDelta { id: VideoId(7), delta: 1 })
            .unwrap();
        assert_eq!(coordinator.sequence().get(0).map(|item| item.like_count), Some(1));
    }

    #[tokio::test]
    async fn test_run_loop_applies_commands_and_signals() {
        let events = EventBus::new(128);
        let mut sub = events.subscribe();
        let backend = RecordingBackend::auto_ready();
        let mut coordinator = FeedPlaybackCoordinator::new(backend.clone(), PlaybackConfig::default())
            .unwrap()
            .with_event_bus(events);

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            coordinator.run(rx).await;
            coordinator
        });

        tx.send(FeedCommand::ReplaceSequence(feed(3))).await.unwrap();
        tx.send(FeedCommand::CenterChanged(0)).await.unwrap();

        let playing = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match sub.recv().await {
                    Ok(CoreEvent::Player(PlayerEvent::StateChanged {
                        index: Some(0),
                        status: PlaybackStatus::Playing,
                        ..
                    })) => break true,
                    Ok(_) => continue,
                    Err(_) => break false,
                }
            }
        })
        .await
        .unwrap();
        assert!(playing);

        tx.send(FeedCommand::Shutdown).await.unwrap();
        let coordinator = task.await.unwrap();
        assert_eq!(coordinator.resident_count(), 0);
        assert_eq!(backend.playing_count(), 0);
    }
}
