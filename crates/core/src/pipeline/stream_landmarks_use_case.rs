use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::annotation::landmark_annotator::{annotate, MarkerStyle};
use crate::detection::domain::landmark_extractor::LandmarkExtractor;
use crate::pipeline::pause_gate::PauseGate;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::publish::realtime_publisher::RealtimePublisher;
use crate::shared::cancellation::CancellationToken;
use crate::shared::frame_buffer::FrameBuffer;
use crate::shared::video_source::VideoSource;
use crate::video::domain::looping_reader::LoopingReader;
use crate::video::domain::video_reader::{VideoError, VideoReader};

/// Counters reported when production stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProductionStats {
    pub frames: usize,
    pub sent: usize,
    pub throttled: usize,
    pub dropped: usize,
    pub extraction_failures: usize,
    pub restarts: usize,
}

/// Per-frame behavior of the production loop.
#[derive(Clone, Debug)]
pub struct ProductionSettings {
    pub mirror: bool,
    pub frame_delay: Duration,
    pub marker: MarkerStyle,
}

impl Default for ProductionSettings {
    fn default() -> Self {
        Self {
            mirror: true,
            frame_delay: crate::shared::constants::DEFAULT_FRAME_DELAY,
            marker: MarkerStyle::default(),
        }
    }
}

/// The capture, extract and publish loop.
///
/// Each iteration reads a frame (restarting the source at end-of-stream),
/// extracts landmarks, publishes them, annotates the frame and hands it to
/// the display buffer. Runs until cancelled or until the source fails.
pub struct StreamLandmarksUseCase {
    reader: LoopingReader,
    extractor: Box<dyn LandmarkExtractor>,
    publisher: RealtimePublisher,
    buffer: Arc<FrameBuffer>,
    logger: Box<dyn PipelineLogger>,
    settings: ProductionSettings,
}

impl StreamLandmarksUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        extractor: Box<dyn LandmarkExtractor>,
        publisher: RealtimePublisher,
        buffer: Arc<FrameBuffer>,
        logger: Box<dyn PipelineLogger>,
        settings: ProductionSettings,
    ) -> Self {
        Self {
            reader: LoopingReader::new(reader),
            extractor,
            publisher,
            buffer,
            logger,
            settings,
        }
    }

    /// Opens `source` and produces frames until `cancel` fires.
    ///
    /// An unopenable or broken source ends production with an error; it is
    /// logged here and never retried.
    pub fn execute(
        mut self,
        source: &VideoSource,
        gate: &PauseGate,
        cancel: &CancellationToken,
    ) -> Result<ProductionStats, VideoError> {
        let metadata = self.reader.open(source).map_err(|e| {
            log::error!("{e}");
            e
        })?;
        self.logger.info(&format!(
            "Streaming from {} ({}x{}, {:.1} fps)",
            metadata.source, metadata.width, metadata.height, metadata.fps
        ));

        let result = self.produce(gate, cancel);
        self.reader.close();
        self.logger.summary();

        match result {
            Ok(mut stats) => {
                stats.restarts = self.reader.restarts();
                Ok(stats)
            }
            Err(e) => {
                log::error!("Production stopped: {e}");
                Err(e)
            }
        }
    }

    fn produce(
        &mut self,
        gate: &PauseGate,
        cancel: &CancellationToken,
    ) -> Result<ProductionStats, VideoError> {
        let mut stats = ProductionStats::default();

        while !cancel.is_cancelled() {
            if !gate.wait_while_paused(cancel) {
                break;
            }

            let t0 = Instant::now();
            let mut frame = self.reader.produce_next_frame()?;
            if self.settings.mirror {
                frame.flip_horizontal();
            }
            let t1 = Instant::now();

            let faces = match self.extractor.extract(&frame) {
                Ok(faces) => faces,
                Err(e) => {
                    log::warn!("Landmark extraction failed on frame {}: {e}", frame.index());
                    stats.extraction_failures += 1;
                    Vec::new()
                }
            };
            let t2 = Instant::now();

            let report = self.publisher.publish(&faces);
            stats.sent += report.sent;
            stats.throttled += report.throttled;
            stats.dropped += report.dropped;
            let t3 = Instant::now();

            annotate(&mut frame, &faces, &self.settings.marker);
            self.buffer.push(frame);
            let t4 = Instant::now();

            stats.frames += 1;
            self.logger.timing("read", ms(t1 - t0));
            self.logger.timing("extract", ms(t2 - t1));
            self.logger.timing("publish", ms(t3 - t2));
            self.logger.timing("annotate", ms(t4 - t3));
            self.logger.metric("faces", faces.len() as f64);
            self.logger.metric("buffer_depth", self.buffer.len() as f64);
            self.logger.progress(stats.frames);

            if !self.settings.frame_delay.is_zero() {
                thread::sleep(self.settings.frame_delay);
            }
        }

        Ok(stats)
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::publish::domain::payload::PayloadLayout;
    use crate::publish::domain::session_registry::tests::RecordingSink;
    use crate::publish::domain::session_registry::SessionRegistry;
    use crate::shared::frame::Frame;
    use crate::shared::landmark::{FaceLandmarks, LandmarkPoint};
    use crate::shared::video_metadata::VideoMetadata;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Finite clip of `length` 4x4 frames; cancels `cancel` after `stop_after` reads.
    struct ClipReader {
        length: usize,
        position: usize,
        reads: Arc<AtomicUsize>,
        stop_after: usize,
        cancel: CancellationToken,
    }

    impl VideoReader for ClipReader {
        fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, VideoError> {
            Ok(VideoMetadata {
                width: 4,
                height: 4,
                fps: 30.0,
                total_frames: self.length,
                codec: "stub".to_string(),
                source: source.clone(),
            })
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
            if self.position >= self.length {
                return Ok(None);
            }
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.stop_after {
                self.cancel.cancel();
            }
            // Left column red, so mirroring is observable.
            let mut frame = Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, self.position);
            for y in 0..4 {
                frame.put_rgb(0, y, [255, 0, 0]);
            }
            self.position += 1;
            Ok(Some(frame))
        }

        fn rewind(&mut self) -> Result<(), VideoError> {
            self.position = 0;
            Ok(())
        }

        fn close(&mut self) {}
    }

    struct BrokenReader;

    impl VideoReader for BrokenReader {
        fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, VideoError> {
            Err(VideoError::unavailable(source, "device busy"))
        }
        fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
            Err(VideoError::NotOpened)
        }
        fn rewind(&mut self) -> Result<(), VideoError> {
            Err(VideoError::NotOpened)
        }
        fn close(&mut self) {}
    }

    /// Returns `n` points for every frame; fails when `fail` is set.
    struct FixedExtractor {
        n: usize,
        fail: bool,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl LandmarkExtractor for FixedExtractor {
        fn extract(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<FaceLandmarks>, Box<dyn std::error::Error>> {
            self.seen.lock().unwrap().push(frame.index());
            if self.fail {
                return Err("model crashed".into());
            }
            let points = (0..self.n)
                .map(|_| LandmarkPoint::new(0.5, 0.5, 0.0))
                .collect::<Vec<_>>();
            Ok(vec![FaceLandmarks::new(points)])
        }
    }

    struct Harness {
        buffer: Arc<FrameBuffer>,
        sink: RecordingSink,
        seen: Arc<Mutex<Vec<usize>>>,
        cancel: CancellationToken,
    }

    fn run(length: usize, stop_after: usize, n: usize, fail: bool) -> (Harness, ProductionStats) {
        let cancel = CancellationToken::new();
        let reader = ClipReader {
            length,
            position: 0,
            reads: Arc::new(AtomicUsize::new(0)),
            stop_after,
            cancel: cancel.clone(),
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let extractor = FixedExtractor {
            n,
            fail,
            seen: seen.clone(),
        };
        let registry = Arc::new(SessionRegistry::new(Duration::ZERO));
        let sink = RecordingSink::default();
        registry.connect("viewer".into(), Box::new(sink.clone()));
        let buffer = Arc::new(FrameBuffer::new(5));

        let use_case = StreamLandmarksUseCase::new(
            Box::new(reader),
            Box::new(extractor),
            RealtimePublisher::new(registry, PayloadLayout::Merged),
            buffer.clone(),
            Box::new(NullPipelineLogger),
            ProductionSettings {
                frame_delay: Duration::ZERO,
                ..Default::default()
            },
        );
        let stats = use_case
            .execute(
                &VideoSource::File(PathBuf::from("clip.mp4")),
                &PauseGate::new(),
                &cancel,
            )
            .unwrap();
        (
            Harness {
                buffer,
                sink,
                seen,
                cancel,
            },
            stats,
        )
    }

    #[test]
    fn test_loops_source_and_publishes_every_frame() {
        let (h, stats) = run(3, 7, 1, false);
        assert!(h.cancel.is_cancelled());
        assert_eq!(stats.frames, 7);
        assert_eq!(stats.restarts, 2);
        assert_eq!(*h.seen.lock().unwrap(), vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(stats.sent, 7);
        assert_eq!(h.sink.sent.lock().unwrap().len(), 7);
    }

    #[test]
    fn test_buffer_keeps_latest_annotated_frames() {
        let (h, _) = run(10, 8, 1, false);
        assert_eq!(h.buffer.len(), 5);
        let first = h.buffer.pop().unwrap();
        assert_eq!(first.index(), 3);
        // Mirrored: red column now on the right; marker at the center.
        assert_eq!(first.rgb_at(3, 0), Some([255, 0, 0]));
        assert_eq!(first.rgb_at(0, 0), Some([0, 0, 0]));
        assert_eq!(first.rgb_at(2, 2), Some([0, 255, 0]));
    }

    #[test]
    fn test_extraction_failure_publishes_empty_list() {
        let (h, stats) = run(2, 2, 1, true);
        assert_eq!(stats.extraction_failures, 2);
        let sent = h.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, payload)| payload == "[]"));
    }

    #[test]
    fn test_cancelled_before_start_produces_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let use_case = StreamLandmarksUseCase::new(
            Box::new(ClipReader {
                length: 1,
                position: 0,
                reads: Arc::new(AtomicUsize::new(0)),
                stop_after: usize::MAX,
                cancel: cancel.clone(),
            }),
            Box::new(FixedExtractor {
                n: 0,
                fail: false,
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            RealtimePublisher::new(
                Arc::new(SessionRegistry::new(Duration::ZERO)),
                PayloadLayout::Merged,
            ),
            Arc::new(FrameBuffer::new(5)),
            Box::new(NullPipelineLogger),
            ProductionSettings::default(),
        );
        let stats = use_case
            .execute(&VideoSource::Device(0), &PauseGate::new(), &cancel)
            .unwrap();
        assert_eq!(stats.frames, 0);
    }

    #[test]
    fn test_unavailable_source_is_fatal() {
        let use_case = StreamLandmarksUseCase::new(
            Box::new(BrokenReader),
            Box::new(FixedExtractor {
                n: 0,
                fail: false,
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
            RealtimePublisher::new(
                Arc::new(SessionRegistry::new(Duration::ZERO)),
                PayloadLayout::Merged,
            ),
            Arc::new(FrameBuffer::new(5)),
            Box::new(NullPipelineLogger),
            ProductionSettings::default(),
        );
        let err = use_case
            .execute(
                &VideoSource::Device(2),
                &PauseGate::new(),
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, VideoError::SourceUnavailable { .. }));
    }
}
