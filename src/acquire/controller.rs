use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::acquire::buffer::{SampleBuffer, Snapshot};
use crate::acquire::error::ScopeError;
use crate::acquire::export;
use crate::acquire::source::{DataSource, SampleBlock};

/// Lifecycle of an acquisition session. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
    Stopped,
}

/// Default ring depth in seconds when no explicit history is configured.
pub const DEFAULT_HISTORY_SECONDS: f64 = 30.0;

/// Default bound on how long `stop` waits for the producer to quiesce.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Smoothing factor for the sleep-overshoot correction in the pacing loop.
const PACING_ALPHA: f64 = 0.001;

/// Execution context for a data source: a background thread that pulls one
/// block per step, stamps it with the step sequence, and appends it to the
/// capture buffer until asked to stop.
pub struct SourceRunner {
    stop: Arc<AtomicBool>,
    done_rx: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl SourceRunner {
    /// Spawn the production schedule for `source`, wired to `buffer`.
    pub fn start(
        mut source: Box<dyn DataSource>,
        buffer: Arc<SampleBuffer>,
    ) -> Result<Self, ScopeError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("sigscope-producer".into())
            .spawn(move || {
                produce_loop(source.as_mut(), &buffer, &stop_flag);
                done_tx.send(()).ok();
            })?;
        Ok(Self {
            stop,
            done_rx,
            handle: Some(handle),
        })
    }

    /// Request cessation and wait for the schedule to quiesce.
    ///
    /// The stop flag is observed at block-step granularity: the producer
    /// finishes and delivers its in-flight block first. After `Ok` returns,
    /// no further buffer appends occur. If the schedule does not acknowledge
    /// within `timeout`, `ShutdownTimeout` is returned and the thread is
    /// left to wind down on its own.
    pub fn stop(mut self, timeout: Duration) -> Result<(), ScopeError> {
        self.stop.store(true, Ordering::Relaxed);
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        log::warn!("producer thread panicked during shutdown");
                    }
                }
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => Err(ScopeError::ShutdownTimeout(timeout)),
        }
    }
}

fn produce_loop(source: &mut dyn DataSource, buffer: &SampleBuffer, stop: &AtomicBool) {
    let block_len = source.block_len().max(1);
    let step_budget = block_len as f64 / source.sample_rate_hz();
    let mut seq = 0u64;
    let mut sleep_delta = 0.0f64;
    let mut behind = false;

    while !stop.load(Ordering::Relaxed) {
        let tic = Instant::now();
        let channels = match source.next_block() {
            Ok(channels) => channels,
            Err(err) => {
                log::error!("data source failed, ending schedule: {err}");
                break;
            }
        };
        if let Err(err) = buffer.add_samples(&SampleBlock::new(seq, channels)) {
            log::error!("dropping production schedule: {err}");
            break;
        }
        seq += 1;

        // Pace each step to its real-time budget. The sleep overshoot is
        // EWMA-corrected so long captures do not drift.
        let elapsed = tic.elapsed().as_secs_f64();
        if elapsed >= step_budget {
            if !behind {
                log::warn!(
                    "data source falling behind: step took {elapsed:.6}s of a {step_budget:.6}s budget"
                );
            }
            behind = true;
        } else {
            behind = false;
            let sleep_time = step_budget - elapsed - sleep_delta;
            if sleep_time > 0.0 {
                let tic = Instant::now();
                thread::sleep(Duration::from_secs_f64(sleep_time));
                let overshoot = tic.elapsed().as_secs_f64() - sleep_time;
                sleep_delta = PACING_ALPHA * overshoot + (1.0 - PACING_ALPHA) * sleep_delta;
            }
        }
    }
}

/// Owns a data source and its execution context, and drives the
/// `Idle -> Running -> Stopped` session lifecycle.
///
/// The buffer is allocated at `start` from the source's channel count and
/// the configured history depth, and is mutated only by the runner thread.
pub struct AcquisitionController {
    state: ControllerState,
    history_seconds: f64,
    stop_timeout: Duration,
    source: Option<Box<dyn DataSource>>,
    buffer: Option<Arc<SampleBuffer>>,
    runner: Option<SourceRunner>,
}

impl Default for AcquisitionController {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquisitionController {
    pub fn new() -> Self {
        Self {
            state: ControllerState::Idle,
            history_seconds: DEFAULT_HISTORY_SECONDS,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            source: None,
            buffer: None,
            runner: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Ring depth, in seconds of capture at the source's rate. Takes effect
    /// at `start`.
    pub fn set_history_seconds(&mut self, history_seconds: f64) {
        self.history_seconds = history_seconds;
    }

    pub fn set_stop_timeout(&mut self, stop_timeout: Duration) {
        self.stop_timeout = stop_timeout;
    }

    /// Hand a constructed source to the controller. Valid in `Idle` only;
    /// transitions nothing by itself.
    pub fn set_data_source(&mut self, source: Box<dyn DataSource>) -> Result<(), ScopeError> {
        if self.state != ControllerState::Idle {
            return Err(ScopeError::InvalidState {
                op: "set_data_source",
                state: self.state,
            });
        }
        self.source = Some(source);
        Ok(())
    }

    /// `Idle -> Running`: allocate the buffer from the source's channel
    /// count, then begin the production schedule. A failed precondition
    /// leaves any prior session untouched.
    pub fn start(&mut self) -> Result<(), ScopeError> {
        if self.state != ControllerState::Idle {
            return Err(ScopeError::InvalidState {
                op: "start",
                state: self.state,
            });
        }
        let Some(source) = self.source.take() else {
            return Err(ScopeError::InvalidState {
                op: "start without a data source",
                state: self.state,
            });
        };
        let buffer = Arc::new(SampleBuffer::with_history_seconds(
            source.channel_count(),
            source.sample_rate_hz(),
            self.history_seconds,
            source.channel_labels(),
        )?);
        log::info!(
            "acquisition started: {} channels at {} Hz, ring of {} samples/channel",
            buffer.channel_count(),
            buffer.sample_rate_hz(),
            buffer.capacity()
        );
        let runner = SourceRunner::start(source, Arc::clone(&buffer))?;
        self.buffer = Some(buffer);
        self.runner = Some(runner);
        self.state = ControllerState::Running;
        Ok(())
    }

    /// `Running -> Stopped`. Waits (bounded by the stop timeout) for the
    /// producer to quiesce; after an `Ok` return no more buffer mutations
    /// occur. On timeout, `ShutdownTimeout` is reported but the controller
    /// still transitions to `Stopped` with a possibly-incomplete buffer.
    /// Idempotent once `Stopped`.
    pub fn stop(&mut self) -> Result<(), ScopeError> {
        match self.state {
            ControllerState::Idle => Err(ScopeError::InvalidState {
                op: "stop",
                state: self.state,
            }),
            ControllerState::Stopped => Ok(()),
            ControllerState::Running => {
                self.state = ControllerState::Stopped;
                let result = match self.runner.take() {
                    Some(runner) => runner.stop(self.stop_timeout),
                    None => Ok(()),
                };
                if result.is_ok() {
                    log::info!("acquisition stopped");
                }
                result
            }
        }
    }

    /// Shared buffer handle for the consumer schedule. `None` before start.
    pub fn buffer(&self) -> Option<&Arc<SampleBuffer>> {
        self.buffer.as_ref()
    }

    /// Read-only snapshot of the current session's capture.
    pub fn snapshot(&self) -> Result<Snapshot, ScopeError> {
        match self.buffer.as_ref() {
            Some(buffer) => Ok(buffer.snapshot()),
            None => Err(ScopeError::InvalidState {
                op: "snapshot",
                state: self.state,
            }),
        }
    }

    /// Serialize the current capture. Valid while `Running` (consistent live
    /// snapshot) and once `Stopped` (final stable snapshot).
    pub fn export_csv(&self, path: &Path) -> Result<(), ScopeError> {
        let snapshot = self.snapshot()?;
        export::save_csv(&snapshot, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::source::RampSource;

    /// Source whose steps outlast any reasonable stop timeout.
    struct SlowSource;

    impl DataSource for SlowSource {
        fn channel_count(&self) -> usize {
            1
        }

        fn sample_rate_hz(&self) -> f64 {
            10.0
        }

        fn block_len(&self) -> usize {
            1
        }

        fn next_block(&mut self) -> Result<Vec<Vec<f32>>, ScopeError> {
            thread::sleep(Duration::from_millis(500));
            Ok(vec![vec![0.0]])
        }
    }

    fn ready_controller() -> AcquisitionController {
        let mut controller = AcquisitionController::new();
        controller.set_history_seconds(1.0);
        controller
            .set_data_source(Box::new(RampSource::new(10_000.0, 2, 10)))
            .unwrap();
        controller
    }

    #[test]
    fn session_captures_production_ordered_samples() {
        let mut controller = ready_controller();
        controller.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        controller.stop().unwrap();

        let snapshot = controller.snapshot().unwrap();
        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.channel_count(), 2);
        // The ramp is contiguous: each retained sample continues the
        // production sequence from first_index.
        for (i, value) in snapshot.channels[0].iter().enumerate() {
            assert_eq!(*value, (snapshot.first_index + i as u64) as f32);
        }
    }

    #[test]
    fn start_twice_is_invalid_and_keeps_first_session() {
        let mut controller = ready_controller();
        controller.start().unwrap();
        let err = controller.start().unwrap_err();
        assert!(matches!(
            err,
            ScopeError::InvalidState {
                state: ControllerState::Running,
                ..
            }
        ));
        assert_eq!(controller.state(), ControllerState::Running);
        assert!(controller.buffer().is_some());
        controller.stop().unwrap();
    }

    #[test]
    fn stop_is_idempotent_once_stopped() {
        let mut controller = ready_controller();
        controller.start().unwrap();
        controller.stop().unwrap();
        assert_eq!(controller.state(), ControllerState::Stopped);
        controller.stop().unwrap();
        assert_eq!(controller.state(), ControllerState::Stopped);
    }

    #[test]
    fn stop_from_idle_is_invalid() {
        let mut controller = AcquisitionController::new();
        assert!(matches!(
            controller.stop(),
            Err(ScopeError::InvalidState {
                state: ControllerState::Idle,
                ..
            })
        ));
    }

    #[test]
    fn no_appends_after_stop_returns() {
        let mut controller = ready_controller();
        controller.start().unwrap();
        thread::sleep(Duration::from_millis(20));
        controller.stop().unwrap();

        let len_after_stop = controller.buffer().unwrap().len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(controller.buffer().unwrap().len(), len_after_stop);
    }

    #[test]
    fn set_data_source_rejected_outside_idle() {
        let mut controller = ready_controller();
        controller.start().unwrap();
        let err = controller
            .set_data_source(Box::new(RampSource::new(100.0, 1, 10)))
            .unwrap_err();
        assert!(matches!(err, ScopeError::InvalidState { .. }));
        controller.stop().unwrap();
    }

    #[test]
    fn start_without_source_is_invalid() {
        let mut controller = AcquisitionController::new();
        assert!(matches!(
            controller.start(),
            Err(ScopeError::InvalidState { .. })
        ));
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn slow_source_times_out_but_controller_still_stops() {
        let mut controller = AcquisitionController::new();
        controller.set_history_seconds(1.0);
        controller.set_stop_timeout(Duration::from_millis(50));
        controller.set_data_source(Box::new(SlowSource)).unwrap();
        controller.start().unwrap();

        let err = controller.stop().unwrap_err();
        assert!(matches!(err, ScopeError::ShutdownTimeout(_)));
        assert_eq!(controller.state(), ControllerState::Stopped);
        // Terminal state: a later stop is still a no-op.
        controller.stop().unwrap();
    }

    #[test]
    fn snapshot_in_idle_is_invalid() {
        let controller = AcquisitionController::new();
        assert!(matches!(
            controller.snapshot(),
            Err(ScopeError::InvalidState { .. })
        ));
    }
}
