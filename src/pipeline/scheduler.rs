//! Presentation scheduler
//!
//! Pulls decoded frames and decides, against a monotonic clock anchored to
//! the first frame's PTS, whether each one is dropped (stale), waited on
//! (early), or handed to the sink immediately (borderline late). Decode,
//! scheduling and the pacing wait all run on one logical thread; the only
//! suspension point is the timed wait, which a stop signal can interrupt.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::decoder::{FrameSource, NextFrame};
use crate::error::PlaybackError;
use crate::pipeline::clock::PlaybackClock;
use crate::pipeline::sink::PresentationSink;
use crate::pipeline::stats::PlaybackStats;
use crate::pipeline::types::Timestamp;
use crate::utils::sos::SignalOfStop;

/// Configuration for presentation scheduling
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How far behind its intended time a frame may run and still be shown.
    /// Anything later is discarded, which bounds catch-up latency instead of
    /// letting a backlog accumulate unbounded delay.
    pub max_catchup_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_catchup_delay: Duration::from_millis(80), // two frame intervals at 24-30 fps
        }
    }
}

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No anchor yet; the first pulled frame establishes it.
    Uninitialized,
    /// Steady-state playback. `anchor_us` is the clock reading that maps to
    /// PTS zero, set exactly once per playback session.
    Anchored { anchor_us: i64 },
    /// End of stream, error or cancellation reached; no further pulls.
    Terminated,
}

/// How a playback run ended. Errors are reported through `Result` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    EndOfStream,
    Cancelled,
}

enum FrameVerdict {
    Present,
    Drop,
}

/// Drives frames from a [`FrameSource`] into a [`PresentationSink`] at their
/// intended wall-clock moments.
pub struct PresentationScheduler<C> {
    clock: C,
    config: SchedulerConfig,
    state: SchedulerState,
    stop: SignalOfStop,
    stats: Arc<PlaybackStats>,
}

impl<C: PlaybackClock> PresentationScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self::with_config(clock, SchedulerConfig::default())
    }

    pub fn with_config(clock: C, config: SchedulerConfig) -> Self {
        Self {
            clock,
            config,
            state: SchedulerState::Uninitialized,
            stop: SignalOfStop::new(),
            stats: Arc::new(PlaybackStats::new()),
        }
    }

    /// Handle for requesting a stop from another thread. An in-progress
    /// pacing wait is interrupted, so shutdown latency stays well under one
    /// frame interval.
    pub fn stop_handle(&self) -> SignalOfStop {
        self.stop.clone()
    }

    pub fn stats(&self) -> Arc<PlaybackStats> {
        Arc::clone(&self.stats)
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Run the playback loop until end of stream, error or cancellation.
    ///
    /// Frames reach the sink in strictly increasing timestamp order: the
    /// source yields them in stream order and the scheduler only ever skips
    /// ahead by dropping. Calling `run` again after termination performs no
    /// pulls and reports `EndOfStream`.
    pub fn run<S, P>(&mut self, source: &mut S, sink: &mut P) -> Result<PlaybackEnd, PlaybackError>
    where
        S: FrameSource,
        P: PresentationSink,
    {
        if matches!(self.state, SchedulerState::Terminated) {
            return Ok(PlaybackEnd::EndOfStream);
        }

        loop {
            if self.stop.cancelled() {
                return self.finish(PlaybackEnd::Cancelled);
            }

            let frame = match source.next_frame() {
                Ok(NextFrame::Frame(frame)) => frame,
                Ok(NextFrame::EndOfStream) => return self.finish(PlaybackEnd::EndOfStream),
                Err(err) => {
                    self.state = SchedulerState::Terminated;
                    info!(
                        "PresentationScheduler: stopped by decode error ({})",
                        self.stats.summary()
                    );
                    return Err(err.into());
                }
            };

            match self.evaluate(frame.pts) {
                FrameVerdict::Drop => {
                    self.stats.record_drop();
                    debug!("PresentationScheduler: dropped stale frame at {}", frame.pts);
                    continue;
                }
                FrameVerdict::Present => {}
            }

            // The pull and the drop evaluation consumed clock time; pace the
            // handoff against a fresh reading.
            match self.slack_us(frame.pts) {
                Some(slack) if slack > 0 => {
                    if self.stop.wait_timeout(Duration::from_micros(slack as u64)) {
                        return self.finish(PlaybackEnd::Cancelled);
                    }
                }
                Some(slack) if slack < 0 => self.stats.record_late_present(),
                _ => {}
            }

            self.stats.record_present();
            if let Err(err) = sink.present(frame) {
                self.state = SchedulerState::Terminated;
                return Err(PlaybackError::Sink(err));
            }
        }
    }

    /// Drop policy: anchor on the first frame, then discard anything more
    /// than `max_catchup_delay` behind its intended presentation time.
    fn evaluate(&mut self, pts: Timestamp) -> FrameVerdict {
        let now = self.clock.now();

        let anchor_us = match self.state {
            SchedulerState::Uninitialized => {
                let anchor_us = now.micros() - pts.micros();
                self.state = SchedulerState::Anchored { anchor_us };
                info!(
                    "PresentationScheduler: anchored at clock {} (first frame pts {})",
                    now, pts
                );
                anchor_us
            }
            SchedulerState::Anchored { anchor_us } => anchor_us,
            SchedulerState::Terminated => return FrameVerdict::Drop,
        };

        let slack_us = pts.micros() + anchor_us - now.micros();
        if slack_us < -(self.config.max_catchup_delay.as_micros() as i64) {
            FrameVerdict::Drop
        } else {
            FrameVerdict::Present
        }
    }

    /// Remaining slack of an accepted frame against the current clock.
    fn slack_us(&self, pts: Timestamp) -> Option<i64> {
        let SchedulerState::Anchored { anchor_us } = self.state else {
            return None;
        };
        Some(pts.micros() + anchor_us - self.clock.now().micros())
    }

    fn finish(&mut self, end: PlaybackEnd) -> Result<PlaybackEnd, PlaybackError> {
        self.state = SchedulerState::Terminated;
        info!(
            "PresentationScheduler: finished ({:?}, {})",
            end,
            self.stats.summary()
        );
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{DecodedFrame, FramePlane};
    use crate::error::DecodeError;
    use crate::pipeline::clock::{ManualClock, MonotonicClock};
    use anyhow::anyhow;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::thread;
    use std::time::Instant;

    fn test_frame(pts: Duration) -> DecodedFrame {
        let plane = |w: usize, h: usize| FramePlane {
            data: Bytes::from(vec![0u8; w * h]),
            stride: w,
            width: w,
            height: h,
        };
        DecodedFrame::new(
            2,
            2,
            Timestamp::from_duration(pts),
            [plane(2, 2), plane(1, 1), plane(1, 1)],
        )
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    /// Frame source backed by a fixed script of pull outcomes.
    struct ScriptedSource {
        events: VecDeque<Result<NextFrame, DecodeError>>,
        pulls: u64,
    }

    impl ScriptedSource {
        fn new(events: Vec<Result<NextFrame, DecodeError>>) -> Self {
            Self {
                events: events.into(),
                pulls: 0,
            }
        }

        fn frames(pts: &[f64]) -> Self {
            Self::new(
                pts.iter()
                    .map(|&p| Ok(NextFrame::Frame(test_frame(secs(p)))))
                    .collect(),
            )
        }
    }

    impl FrameSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<NextFrame, DecodeError> {
            self.pulls += 1;
            self.events.pop_front().unwrap_or(Ok(NextFrame::EndOfStream))
        }
    }

    /// Sink that records handed-off PTS values and optionally moves a manual
    /// clock after each present, simulating time consumed by display work.
    struct RecordingSink {
        presented: Vec<i64>,
        clock: Option<ManualClock>,
        set_clock_to: Vec<Duration>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                presented: Vec::new(),
                clock: None,
                set_clock_to: Vec::new(),
            }
        }

        /// After the n-th present, set `clock` to `set_clock_to[n]`.
        fn driving(clock: ManualClock, set_clock_to: Vec<Duration>) -> Self {
            Self {
                presented: Vec::new(),
                clock: Some(clock),
                set_clock_to,
            }
        }
    }

    impl PresentationSink for RecordingSink {
        fn present(&mut self, frame: DecodedFrame) -> anyhow::Result<()> {
            let n = self.presented.len();
            self.presented.push(frame.pts.micros());
            if let (Some(clock), Some(at)) = (&self.clock, self.set_clock_to.get(n)) {
                clock.set(*at);
            }
            Ok(())
        }
    }

    struct FailingSink;

    impl PresentationSink for FailingSink {
        fn present(&mut self, _frame: DecodedFrame) -> anyhow::Result<()> {
            Err(anyhow!("display lost"))
        }
    }

    #[test]
    fn test_first_frame_anchors_with_zero_slack() {
        let clock = ManualClock::new();
        clock.set(secs(1.0));

        let mut scheduler = PresentationScheduler::new(clock.clone());
        let mut source = ScriptedSource::frames(&[5.0]);
        let mut sink = RecordingSink::new();

        let start = Instant::now();
        let end = scheduler.run(&mut source, &mut sink).unwrap();

        // Anchor establishment yields slack exactly zero: no wait, no drop.
        assert_eq!(end, PlaybackEnd::EndOfStream);
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(sink.presented, vec![5_000_000]);
        assert_eq!(scheduler.stats().dropped(), 0);
        assert_eq!(scheduler.stats().late_presents(), 0);
        assert_eq!(
            scheduler.state(),
            SchedulerState::Terminated
        );
    }

    #[test]
    fn test_lockstep_clock_presents_every_frame() {
        let clock = ManualClock::new();
        let mut scheduler = PresentationScheduler::new(clock.clone());

        let mut source = ScriptedSource::frames(&[0.0, 0.033, 0.067, 0.100]);
        // Clock advances in lockstep with presentation
        let mut sink = RecordingSink::driving(
            clock,
            vec![secs(0.033), secs(0.067), secs(0.100), secs(0.133)],
        );

        let end = scheduler.run(&mut source, &mut sink).unwrap();

        assert_eq!(end, PlaybackEnd::EndOfStream);
        assert_eq!(sink.presented, vec![0, 33_000, 67_000, 100_000]);
        assert_eq!(scheduler.stats().presented(), 4);
        assert_eq!(scheduler.stats().dropped(), 0);
    }

    #[test]
    fn test_clock_jump_drops_stale_frames() {
        let clock = ManualClock::new();
        let mut scheduler = PresentationScheduler::new(clock.clone());

        let mut source = ScriptedSource::frames(&[0.0, 0.033, 0.067, 0.100]);
        // Clock jumps forward by 0.2s after the first frame is shown
        let mut sink = RecordingSink::driving(clock, vec![secs(0.2)]);

        let end = scheduler.run(&mut source, &mut sink).unwrap();

        // 0.033 has slack -0.167, 0.067 has -0.133, 0.100 has -0.100:
        // all beyond the 0.08 catch-up threshold.
        assert_eq!(end, PlaybackEnd::EndOfStream);
        assert_eq!(sink.presented, vec![0]);
        assert_eq!(scheduler.stats().dropped(), 3);
    }

    #[test]
    fn test_borderline_late_frame_is_shown_immediately() {
        let clock = ManualClock::new();
        let mut scheduler = PresentationScheduler::new(clock.clone());

        let mut source = ScriptedSource::frames(&[0.0, 0.033]);
        // After the first present the clock sits 33ms past the second frame's
        // intended time: late, but within the 80ms tolerance band.
        let mut sink = RecordingSink::driving(clock, vec![secs(0.066)]);

        let start = Instant::now();
        let end = scheduler.run(&mut source, &mut sink).unwrap();

        assert_eq!(end, PlaybackEnd::EndOfStream);
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(sink.presented, vec![0, 33_000]);
        assert_eq!(scheduler.stats().dropped(), 0);
        assert_eq!(scheduler.stats().late_presents(), 1);
    }

    #[test]
    fn test_early_frame_waits_for_its_slack() {
        let mut scheduler = PresentationScheduler::new(MonotonicClock::new());
        let mut source = ScriptedSource::frames(&[0.0, 0.050]);
        let mut sink = RecordingSink::new();

        let start = Instant::now();
        let end = scheduler.run(&mut source, &mut sink).unwrap();

        // The second frame is 50ms early and must be held back for
        // (roughly) that long before handoff.
        assert_eq!(end, PlaybackEnd::EndOfStream);
        assert!(start.elapsed() >= Duration::from_millis(45));
        assert_eq!(sink.presented.len(), 2);
        assert_eq!(scheduler.stats().dropped(), 0);
    }

    #[test]
    fn test_decode_error_terminates_and_later_runs_do_not_pull() {
        let mut scheduler = PresentationScheduler::new(ManualClock::new());
        let mut source = ScriptedSource::new(vec![
            Ok(NextFrame::Frame(test_frame(secs(0.0)))),
            Err(DecodeError::Codec("bad bitstream".into())),
        ]);
        let mut sink = RecordingSink::new();

        let err = scheduler.run(&mut source, &mut sink).unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
        assert_eq!(scheduler.state(), SchedulerState::Terminated);
        assert_eq!(sink.presented, vec![0]);

        let pulls_before = source.pulls;
        let end = scheduler.run(&mut source, &mut sink).unwrap();
        assert_eq!(end, PlaybackEnd::EndOfStream);
        assert_eq!(source.pulls, pulls_before);
    }

    #[test]
    fn test_cancel_interrupts_pacing_wait() {
        let mut scheduler = PresentationScheduler::new(MonotonicClock::new());
        let stop = scheduler.stop_handle();

        // Second frame sits 10s in the future; without cancellation the run
        // would block for the full wait.
        let mut source = ScriptedSource::frames(&[0.0, 10.0]);
        let mut sink = RecordingSink::new();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            stop.cancel();
        });

        let start = Instant::now();
        let end = scheduler.run(&mut source, &mut sink).unwrap();
        canceller.join().unwrap();

        assert_eq!(end, PlaybackEnd::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(scheduler.state(), SchedulerState::Terminated);
    }

    #[test]
    fn test_cancel_before_run_pulls_nothing() {
        let mut scheduler = PresentationScheduler::new(ManualClock::new());
        scheduler.stop_handle().cancel();

        let mut source = ScriptedSource::frames(&[0.0]);
        let mut sink = RecordingSink::new();

        let end = scheduler.run(&mut source, &mut sink).unwrap();
        assert_eq!(end, PlaybackEnd::Cancelled);
        assert_eq!(source.pulls, 0);
        assert!(sink.presented.is_empty());
    }

    #[test]
    fn test_sink_failure_terminates_run() {
        let mut scheduler = PresentationScheduler::new(ManualClock::new());
        let mut source = ScriptedSource::frames(&[0.0, 0.033]);
        let mut sink = FailingSink;

        let err = scheduler.run(&mut source, &mut sink).unwrap_err();
        assert!(matches!(err, PlaybackError::Sink(_)));
        assert_eq!(scheduler.state(), SchedulerState::Terminated);
    }

    #[test]
    fn test_empty_source_completes_without_anchor() {
        let mut scheduler = PresentationScheduler::new(ManualClock::new());
        let mut source = ScriptedSource::new(Vec::new());
        let mut sink = RecordingSink::new();

        let end = scheduler.run(&mut source, &mut sink).unwrap();
        assert_eq!(end, PlaybackEnd::EndOfStream);
        assert_eq!(scheduler.stats().presented(), 0);
    }
}
