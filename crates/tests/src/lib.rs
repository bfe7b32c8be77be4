//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - simulated device -> listeners -> synchronizer -> reader
//! - scripted arrival orders through the manual driver
//! - backpressure policies, initialization failures and teardown

#[cfg(test)]
mod support {
    use std::time::{Duration, Instant};

    use contracts::{EngineConfig, Frame, VideoMode};
    use sync_engine::FrameReader;

    pub const SMALL: VideoMode = VideoMode {
        width: 16,
        height: 12,
        fps: 100,
    };

    /// Engine config for the simulated device at a small resolution
    pub fn mock_config(depth: VideoMode, color: VideoMode) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.device.depth = depth;
        config.device.color = color;
        config
    }

    /// Block until `count` pairs are published or `timeout` elapses
    pub fn wait_for_pairs(reader: &FrameReader, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if reader.published_count() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    pub fn depth(mode: VideoMode, index: u64) -> Frame {
        Frame::depth(
            index,
            mode.width,
            mode.height,
            &vec![1000u16; mode.pixel_count()],
        )
    }

    pub fn color(mode: VideoMode, index: u64) -> Frame {
        Frame::color(
            index,
            mode.width,
            mode.height,
            vec![(index % 256) as u8; mode.pixel_count() * 3],
        )
    }
}

#[cfg(test)]
mod mock_e2e_tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{ConverterConfig, EngineState, StreamKind, VideoMode};
    use device::{scene, MockDriver};
    use observability::PublishStatsAggregator;
    use sync_engine::{Acquisition, DepthToWorld, FovConverter};

    use crate::support::{mock_config, wait_for_pairs, SMALL};

    /// Simulated device -> Acquisition -> reader polled on a tokio interval
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_mock_pipeline() {
        let config = mock_config(SMALL, SMALL);
        let acquisition = Acquisition::open(&config, &MockDriver::default()).unwrap();
        acquisition.start().unwrap();

        let reader = acquisition.reader();
        let mut aggregator = PublishStatsAggregator::new();
        let mut observed = Vec::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(5));

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while observed.len() < 5 {
                ticker.tick().await;
                let guard = reader.lock();
                match guard.published_index() {
                    Some(index) if guard.is_ready() => {
                        assert_eq!(guard.geometry().dimensions(), (SMALL.width, SMALL.height));
                        aggregator.record_read(index, 1.0, 0.0);
                        if observed.last() != Some(&index) {
                            observed.push(index);
                        }
                    }
                    _ => aggregator.record_not_ready(),
                }
            }
        })
        .await;

        acquisition.stop();

        assert!(result.is_ok(), "reader timed out, saw {observed:?}");
        assert!(observed.windows(2).all(|w| w[0] < w[1]), "{observed:?}");
        assert_eq!(aggregator.summary().pairs_observed, observed.len() as u64);
        assert!(matches!(acquisition.state(), EngineState::Stopped(_)));
        assert!(acquisition.ingestion_metrics(StreamKind::Depth).frames_received > 0);
    }

    #[test]
    fn test_mixed_rates_pair_on_shared_indices() {
        let color = VideoMode::new(SMALL.width, SMALL.height, 50);
        let config = mock_config(SMALL, color);
        let acquisition = Acquisition::open(&config, &MockDriver::default()).unwrap();
        acquisition.start().unwrap();

        let reader = acquisition.reader();
        assert!(wait_for_pairs(&reader, 4, Duration::from_secs(5)));
        acquisition.stop();

        let stats = acquisition.stats();
        let index = stats.last_published_index.unwrap();
        assert_eq!(index % 2, 0, "color only carries even indices");
        assert!(stats.depth_dropped > 0, "odd depth frames are discarded");
        assert_eq!(reader.lock().published_index(), Some(index));
    }

    #[test]
    fn test_uneven_rates_keep_publishing() {
        let depth = VideoMode::new(SMALL.width, SMALL.height, 30);
        let color = VideoMode::new(SMALL.width, SMALL.height, 25);
        let acquisition = Acquisition::open(&mock_config(depth, color), &MockDriver::default()).unwrap();
        acquisition.start().unwrap();

        let reader = acquisition.reader();
        let first = reader.published_count();
        assert!(wait_for_pairs(&reader, first + 10, Duration::from_secs(5)));
        acquisition.stop();

        assert!(acquisition.stats().depth_dropped > 0, "depth carries indices color skips");
    }

    #[test]
    fn test_skipped_indices_are_never_published() {
        let mut config = mock_config(SMALL, SMALL);
        config.mock.depth_skip_every = 3;
        config.mock.color_skip_every = 4;
        let acquisition = Acquisition::open(&config, &MockDriver::new(config.mock.clone())).unwrap();
        acquisition.start().unwrap();

        let reader = acquisition.reader();
        let mut seen = BTreeSet::new();
        for _ in 0..200 {
            if let Some(index) = reader.lock().published_index() {
                seen.insert(index);
            }
            if seen.len() >= 4 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        acquisition.stop();

        assert!(!seen.is_empty());
        assert!(seen.iter().all(|i| i % 3 != 0 && i % 4 != 0), "{seen:?}");
    }

    #[test]
    fn test_fetch_failures_are_counted_and_survived() {
        let mut config = mock_config(SMALL, SMALL);
        config.mock.fetch_failure_every = 4;
        let acquisition = Acquisition::open(&config, &MockDriver::new(config.mock.clone())).unwrap();
        acquisition.start().unwrap();

        assert!(wait_for_pairs(&acquisition.reader(), 3, Duration::from_secs(5)));
        acquisition.stop();

        let failures = acquisition.ingestion_metrics(StreamKind::Depth).fetch_failures
            + acquisition.ingestion_metrics(StreamKind::Color).fetch_failures;
        assert!(failures > 0);
    }

    /// Readers running next to the producers only ever see a complete pair:
    /// geometry and color both match the synthetic scene at the published index.
    #[test]
    fn test_concurrent_readers_see_consistent_pairs() {
        let config = mock_config(SMALL, SMALL);
        let acquisition = Acquisition::open(&config, &MockDriver::default()).unwrap();
        acquisition.start().unwrap();

        let converter = Arc::new(FovConverter::new(
            SMALL.width,
            SMALL.height,
            &ConverterConfig::default(),
        ));
        let done = Arc::new(AtomicBool::new(false));
        let (cx, cy) = (SMALL.width / 2, SMALL.height / 2);

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let reader = acquisition.reader();
                let converter = Arc::clone(&converter);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let mut checked = 0u32;
                    while !done.load(Ordering::Relaxed) {
                        {
                            let guard = reader.lock();
                            if let Some(index) = guard.published_index() {
                                let expected_blue = (index % 256) as u8;
                                assert_eq!(guard.color().get_pixel(0, 0).0[2], expected_blue);

                                let raw = scene::depth_sample(&SMALL, cx, cy, index);
                                let expected = converter.depth_to_world(cx, cy, raw);
                                let actual = guard.geometry().get(cx, cy).unwrap();
                                assert_eq!(actual.coords, expected.coords, "pair {index} mixed");
                                checked += 1;
                            }
                        }
                        std::thread::yield_now();
                    }
                    checked
                })
            })
            .collect();

        assert!(wait_for_pairs(&acquisition.reader(), 10, Duration::from_secs(5)));
        done.store(true, Ordering::Relaxed);
        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        acquisition.stop();
    }
}

#[cfg(test)]
mod scripted_tests {
    use std::sync::Arc;

    use contracts::{
        ConverterConfig, DeviceConfig, DeviceDriver, DropPolicy, EngineConfig, EngineState,
        StreamKind,
    };
    use device::ManualDriver;
    use ingestion::{BackpressureConfig, FrameHook, IngestionPipeline};
    use sync_engine::{Acquisition, FovConverter, FrameExchange, SyncEngine};

    use crate::support::{color, depth, SMALL};

    fn open_manual() -> (
        Acquisition,
        device::ManualStreamHandle,
        device::ManualStreamHandle,
    ) {
        let (driver, depth_handle, color_handle) = ManualDriver::new(SMALL, SMALL);
        depth_handle.emit(depth(SMALL, 0));
        let acquisition = Acquisition::open(&EngineConfig::default(), &driver).unwrap();
        acquisition.start().unwrap();
        (acquisition, depth_handle, color_handle)
    }

    #[test]
    fn test_gapped_streams_publish_common_indices() {
        let (acquisition, depth_handle, color_handle) = open_manual();
        let reader = acquisition.reader();

        let mut published = Vec::new();
        let arrivals = [
            (StreamKind::Depth, 1),
            (StreamKind::Color, 2),
            (StreamKind::Depth, 2),
            (StreamKind::Depth, 3),
            (StreamKind::Color, 3),
            (StreamKind::Color, 4),
            (StreamKind::Depth, 5),
            (StreamKind::Color, 5),
        ];
        for (kind, index) in arrivals {
            match kind {
                StreamKind::Depth => depth_handle.emit(depth(SMALL, index)),
                StreamKind::Color => color_handle.emit(color(SMALL, index)),
            }
            if let Some(index) = reader.lock().published_index() {
                if published.last() != Some(&index) {
                    published.push(index);
                }
            }
        }

        assert_eq!(published, vec![2, 3, 5]);
        let stats = acquisition.stats();
        assert_eq!(stats.depth_dropped, 1);
        assert_eq!(stats.color_dropped, 1);
        assert_eq!(reader.lock().color().get_pixel(0, 0).0, [5, 5, 5]);
    }

    #[test]
    fn test_mismatched_pair_is_rejected_and_front_kept() {
        let (acquisition, depth_handle, color_handle) = open_manual();
        depth_handle.emit(depth(SMALL, 1));
        color_handle.emit(color(SMALL, 1));

        let wrong = contracts::VideoMode::new(SMALL.width / 2, SMALL.height, SMALL.fps);
        depth_handle.emit(depth(wrong, 2));
        color_handle.emit(color(SMALL, 2));

        let stats = acquisition.stats();
        assert_eq!(stats.pairs_published, 1);
        assert_eq!(stats.rejected_pairs, 1);
        let reader = acquisition.reader();
        let guard = reader.lock();
        assert_eq!(guard.published_index(), Some(1));
        assert_eq!(guard.color().get_pixel(0, 0).0, [1, 1, 1]);
    }

    #[test]
    fn test_fetch_failure_drops_single_notification() {
        let (acquisition, depth_handle, color_handle) = open_manual();
        depth_handle.fail_next_fetches(1);
        depth_handle.emit(depth(SMALL, 1));
        color_handle.emit(color(SMALL, 1));
        depth_handle.emit(depth(SMALL, 2));
        color_handle.emit(color(SMALL, 2));

        assert_eq!(acquisition.stats().last_published_index, Some(2));
        assert_eq!(acquisition.ingestion_metrics(StreamKind::Depth).fetch_failures, 1);
    }

    #[test]
    fn test_stop_is_idempotent_and_late_frames_ignored() {
        let (acquisition, depth_handle, color_handle) = open_manual();
        depth_handle.emit(depth(SMALL, 1));
        color_handle.emit(color(SMALL, 1));

        acquisition.stop();
        acquisition.stop();
        depth_handle.emit(depth(SMALL, 2));
        color_handle.emit(color(SMALL, 2));

        assert!(matches!(acquisition.state(), EngineState::Stopped(_)));
        assert_eq!(acquisition.stats().pairs_published, 1);
        assert_eq!(acquisition.reader().lock().published_index(), Some(1));
        assert!(acquisition.start().is_err());
    }

    /// Notifications still firing after the engine stopped are drained
    /// without publishing.
    #[test]
    fn test_late_callbacks_after_engine_stop() {
        let (driver, depth_handle, color_handle) = ManualDriver::new(SMALL, SMALL);
        let device = driver.open(&DeviceConfig::default()).unwrap();
        let pipeline = IngestionPipeline::new(device, BackpressureConfig::default());

        let exchange = Arc::new(FrameExchange::new(
            (SMALL.width, SMALL.height),
            (SMALL.width, SMALL.height),
            contracts::BoundingBox::empty(),
        ));
        let converter = Arc::new(FovConverter::new(
            SMALL.width,
            SMALL.height,
            &ConverterConfig::default(),
        ));
        let engine = Arc::new(SyncEngine::new(exchange, converter, 8));
        engine.start().unwrap();

        let hook_engine = Arc::clone(&engine);
        let inputs = pipeline.inputs();
        let hook: FrameHook = Arc::new(move || {
            hook_engine.pump(&inputs);
        });
        pipeline.start_all(Some(hook)).unwrap();

        depth_handle.emit(depth(SMALL, 1));
        color_handle.emit(color(SMALL, 1));
        engine.stop();
        depth_handle.emit(depth(SMALL, 2));
        color_handle.emit(color(SMALL, 2));

        assert_eq!(engine.stats().pairs_published, 1);
        assert_eq!(pipeline.metrics(StreamKind::Color).frames_received, 2);
        assert!(pipeline.inputs().color.is_empty());
        pipeline.stop_all();
    }

    /// Listener channels fill before the synchronizer drains them
    ///
    /// Returns the depth indices that survived the channel and the pairs
    /// published from them.
    fn backpressure_run(policy: DropPolicy) -> (Vec<u64>, u64, Option<u64>) {
        let (driver, depth_handle, color_handle) = ManualDriver::new(SMALL, SMALL);
        let device = driver.open(&DeviceConfig::default()).unwrap();
        let pipeline = IngestionPipeline::new(
            device,
            BackpressureConfig {
                channel_capacity: 2,
                drop_policy: policy,
            },
        );
        pipeline.start_all(None).unwrap();

        for index in 1..=4 {
            depth_handle.emit(depth(SMALL, index));
            color_handle.emit(color(SMALL, index));
        }
        assert_eq!(pipeline.metrics(StreamKind::Depth).frames_dropped, 2);
        assert_eq!(pipeline.metrics(StreamKind::Color).frames_dropped, 2);

        let exchange = Arc::new(FrameExchange::new(
            (SMALL.width, SMALL.height),
            (SMALL.width, SMALL.height),
            contracts::BoundingBox::empty(),
        ));
        let converter = Arc::new(FovConverter::new(
            SMALL.width,
            SMALL.height,
            &ConverterConfig::default(),
        ));
        let engine = SyncEngine::new(exchange, converter, 8);
        engine.start().unwrap();

        let inputs = pipeline.inputs();
        let depth_frames: Vec<_> = std::iter::from_fn(|| inputs.depth.try_recv().ok()).collect();
        let kept = depth_frames.iter().map(|f| f.index).collect();
        let mut published = 0;
        for frame in depth_frames {
            published += engine.push(frame);
        }
        published += engine.pump(&inputs);

        pipeline.stop_all();
        (kept, published as u64, engine.stats().last_published_index)
    }

    #[test]
    fn test_drop_oldest_keeps_latest_frames() {
        let (kept, published, last) = backpressure_run(DropPolicy::DropOldest);
        assert_eq!(kept, vec![3, 4]);
        assert_eq!(published, 2);
        assert_eq!(last, Some(4));
    }

    #[test]
    fn test_drop_newest_keeps_earliest_frames() {
        let (kept, published, last) = backpressure_run(DropPolicy::DropNewest);
        assert_eq!(kept, vec![1, 2]);
        assert_eq!(published, 2);
        assert_eq!(last, Some(2));
    }
}

#[cfg(test)]
mod init_tests {
    use std::time::Duration;

    use contracts::{EngineConfig, RegistrationMode};
    use device::{ManualDriver, MockDriver, MockFailure};
    use sync_engine::Acquisition;

    use crate::support::{mock_config, SMALL};

    #[test]
    fn test_every_driver_stage_failure_is_fatal() {
        for stage in [
            MockFailure::OpenDevice,
            MockFailure::StartDepth,
            MockFailure::StartColor,
            MockFailure::EnableSync,
            MockFailure::SetRegistration,
        ] {
            let config = mock_config(SMALL, SMALL);
            let err = Acquisition::open(&config, &MockDriver::default().failing_at(stage))
                .err()
                .unwrap_or_else(|| panic!("{stage:?} should fail"));
            assert!(err.is_initialization(), "{stage:?}: {err}");
        }
    }

    #[test]
    fn test_optional_stages_skipped_when_disabled() {
        let mut config = mock_config(SMALL, SMALL);
        config.device.registration = RegistrationMode::Off;
        let acquisition = Acquisition::open(
            &config,
            &MockDriver::default().failing_at(MockFailure::SetRegistration),
        )
        .unwrap();
        acquisition.stop();
    }

    #[test]
    fn test_no_first_frame_times_out() {
        let (driver, depth_handle, color_handle) = ManualDriver::new(SMALL, SMALL);
        let mut config = EngineConfig::default();
        config.device.init_timeout_ms = 30;

        let started = std::time::Instant::now();
        let err = Acquisition::open(&config, &driver).err().unwrap();
        assert!(err.is_initialization());
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(depth_handle.is_stopped() && color_handle.is_stopped());
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use device::MockDriver;
    use sync_engine::Acquisition;

    use crate::support::wait_for_pairs;

    const CONFIG: &str = r#"
[device]
uri = "mock://bench"
init_timeout_ms = 1000

[device.depth]
width = 20
height = 10
fps = 60

[device.color]
width = 20
height = 10
fps = 60

[ingestion]
channel_capacity = 4
drop_policy = "drop_newest"

[sync]
queue_capacity = 8
"#;

    #[test]
    fn test_config_file_drives_acquisition() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert!(ConfigLoader::warnings(&config).is_empty());

        let acquisition = Acquisition::open(&config, &MockDriver::new(config.mock.clone())).unwrap();
        acquisition.start().unwrap();
        let reader = acquisition.reader();
        assert!(wait_for_pairs(&reader, 2, Duration::from_secs(5)));
        acquisition.stop();

        assert_eq!(reader.lock().geometry().dimensions(), (20, 10));
        assert_eq!(reader.lock().color().dimensions(), (20, 10));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[device.color]\nwidth = 320\nheight = 240\n").unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("registration"));
    }
}
