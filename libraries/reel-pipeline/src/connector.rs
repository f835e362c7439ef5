//! Pipeline connector
//!
//! Binds a producer (or playlist) to a consumer and drives the
//! pull-based frame flow. Each consumer walks the state machine
//! Created → Connected → Running → Stopped:
//!
//! - `connect` is idempotent for the same source and rejected for a
//!   different source while Running (the prior connection is retained)
//! - `start` returns immediately, spawning the pull loop on a dedicated
//!   worker thread
//! - `stop` is idempotent, safe from any thread, and may block briefly
//!   until the worker observes the signal
//!
//! A consumer driven to completion by source exhaustion transitions to
//! Stopped and fires `"consumer-stopped"` exactly like an explicit
//! `stop`; callers never distinguish the two. A source that momentarily
//! yields no frame (e.g. an empty playlist awaiting appends) is retried
//! with a bounded sleep rather than treated as the end of the stream.
//!
//! With `real_time` positive (the default), a read-ahead thread pulls
//! frames into a bounded queue sized by the `buffer` property and the
//! render loop paces output to the profile frame rate; with `real_time`
//! 0 the worker pulls directly, unpaced.

use crate::sinks::{FrameSink, NullSink};
use crossbeam_channel::{bounded, RecvTimeoutError, SendTimeoutError};
use reel_core::{Frame, Profile, ReelError, Result};
use reel_graph::{EventData, Producer, Service, ServiceKind, ServiceNode};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Bounded sleep between retries when the source yields no frame
const EMPTY_SOURCE_RETRY: Duration = Duration::from_millis(5);

/// Poll interval for stop-signal checks in the read-ahead plumbing
const STOP_POLL: Duration = Duration::from_millis(20);

/// Default read-ahead queue depth, in frames
const DEFAULT_BUFFER: i64 = 25;

/// Consumer lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumerState {
    /// Constructed, no source connected
    Created,
    /// Source connected, pull loop not running
    Connected,
    /// Pull loop running on the worker
    Running,
    /// Pull loop exited (explicit stop or source exhaustion)
    Stopped,
}

/// Frame sink pulling from a connected producer
pub struct Consumer {
    service: Service,
    state: Mutex<ConsumerState>,
    source: RwLock<Option<Arc<dyn Producer>>>,
    stop_flag: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    sink: Arc<dyn FrameSink>,
}

impl Consumer {
    /// Create a consumer with the given output stage
    pub fn new(
        name: impl Into<String>,
        profile: Arc<Profile>,
        sink: Arc<dyn FrameSink>,
    ) -> Arc<Self> {
        let service = Service::new(ServiceKind::Consumer, name, profile);
        service.set("real_time", 1);
        service.set("buffer", DEFAULT_BUFFER);
        Arc::new(Self {
            service,
            state: Mutex::new(ConsumerState::Created),
            source: RwLock::new(None),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            sink,
        })
    }

    /// Create a consumer whose name could not be resolved
    pub fn invalid(name: impl Into<String>, profile: Arc<Profile>) -> Arc<Self> {
        let service = Service::invalid(ServiceKind::Consumer, name, profile);
        Arc::new(Self {
            service,
            state: Mutex::new(ConsumerState::Created),
            source: RwLock::new(None),
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            sink: Arc::new(NullSink),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConsumerState {
        *self.state.lock().unwrap()
    }

    /// Non-blocking poll: true in Created and Stopped
    pub fn is_stopped(&self) -> bool {
        matches!(
            self.state(),
            ConsumerState::Created | ConsumerState::Stopped
        )
    }

    /// Connect a producer or playlist as the frame source
    ///
    /// Idempotent when the source is already connected. While Running,
    /// connecting a different source is rejected and the prior
    /// connection is retained. A source may feed at most one consumer;
    /// a second consumer's connect is rejected with `SourceBusy`.
    pub fn connect(&self, source: Arc<dyn Producer>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut slot = self.source.write().unwrap();

        if let Some(current) = slot.as_ref() {
            if Arc::ptr_eq(current, &source) {
                // Already connected to this source
                if *state == ConsumerState::Created || *state == ConsumerState::Stopped {
                    *state = ConsumerState::Connected;
                }
                return Ok(());
            }
            if *state == ConsumerState::Running {
                return Err(ReelError::invalid_state(
                    "cannot reconnect a running consumer",
                ));
            }
        }

        source.producer_core().try_attach()?;
        if let Some(previous) = slot.take() {
            previous.producer_core().detach();
        }
        *slot = Some(source);
        *state = ConsumerState::Connected;
        tracing::debug!(name = self.service.name(), "consumer connected");
        Ok(())
    }

    /// Start the pull loop; returns immediately
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if !self.service.is_valid() {
            return Err(ReelError::invalid_state("consumer is not valid"));
        }
        let mut state = self.state.lock().unwrap();
        match *state {
            ConsumerState::Running => return Ok(()),
            ConsumerState::Connected => {}
            ConsumerState::Created | ConsumerState::Stopped => {
                return Err(ReelError::NotConnected);
            }
        }
        let source = self
            .source
            .read()
            .unwrap()
            .clone()
            .ok_or(ReelError::NotConnected)?;

        self.stop_flag.store(false, Ordering::SeqCst);
        let consumer = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("{}-pull", self.service.name()))
            .spawn(move || run_worker(consumer, source))?;
        *self.worker.lock().unwrap() = Some(handle);
        *state = ConsumerState::Running;
        tracing::debug!(name = self.service.name(), "consumer started");
        Ok(())
    }

    /// Signal the worker to stop and wait for it to exit
    ///
    /// Idempotent and safe to call from any thread, including from a
    /// listener running on the worker itself (in which case the join is
    /// skipped; the worker is already on its way out).
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            let _ = handle.join();
        }
    }
}

impl ServiceNode for Consumer {
    fn service(&self) -> &Service {
        &self.service
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.get_mut().unwrap().take() {
            let _ = handle.join();
        }
        if let Some(source) = self.source.get_mut().unwrap().take() {
            source.producer_core().detach();
        }
    }
}

/// One step of the pull loop
enum PullStep {
    Frame(Frame),
    Retry,
    End,
}

fn pull_step(source: &Arc<dyn Producer>, position: &mut i64, terminate_on_pause: bool) -> PullStep {
    let speed = source.speed();
    if terminate_on_pause && speed == 0.0 {
        return PullStep::End;
    }
    // Bounds are re-read every step so a source that grows mid-run
    // (e.g. a playlist being appended to) extends the pull.
    if source.playable_frames() > 0 && *position > source.out_point() {
        return PullStep::End;
    }
    match source.read_frame(*position) {
        Some(frame) => {
            *position += speed.round() as i64;
            PullStep::Frame(frame)
        }
        None => PullStep::Retry,
    }
}

fn run_worker(consumer: Arc<Consumer>, source: Arc<dyn Producer>) {
    let real_time = consumer.service.get_int("real_time");
    if real_time > 0 {
        run_read_ahead(&consumer, &source);
    } else {
        run_direct(&consumer, &source);
    }

    *consumer.state.lock().unwrap() = ConsumerState::Stopped;
    tracing::debug!(name = consumer.service.name(), "consumer stopped");
    consumer
        .service
        .events()
        .fire("consumer-stopped", &EventData::None);
}

/// Unpaced pull loop: fetch and render on the same thread
fn run_direct(consumer: &Consumer, source: &Arc<dyn Producer>) {
    let terminate_on_pause = consumer.service.get_int("terminate_on_pause") != 0;
    let mut position = source.in_point();

    while !consumer.stop_flag.load(Ordering::SeqCst) {
        match pull_step(source, &mut position, terminate_on_pause) {
            PullStep::Frame(frame) => consumer.sink.render(&consumer.service, &frame),
            PullStep::Retry => thread::sleep(EMPTY_SOURCE_RETRY),
            PullStep::End => break,
        }
    }
}

/// Real-time pull loop: a read-ahead thread fills a bounded queue and
/// the render loop paces output to the profile frame rate
fn run_read_ahead(consumer: &Arc<Consumer>, source: &Arc<dyn Producer>) {
    let pace = consumer.service.profile().frame_duration();
    let depth = match consumer.service.get_int("buffer") {
        n if n > 0 => n as usize,
        _ => DEFAULT_BUFFER as usize,
    };
    let (tx, rx) = bounded::<Frame>(depth);

    let stop = Arc::clone(&consumer.stop_flag);
    let ahead_source = Arc::clone(source);
    let terminate_on_pause = consumer.service.get_int("terminate_on_pause") != 0;
    let ahead = thread::spawn(move || {
        let mut position = ahead_source.in_point();
        while !stop.load(Ordering::SeqCst) {
            match pull_step(&ahead_source, &mut position, terminate_on_pause) {
                PullStep::Frame(frame) => {
                    let mut pending = frame;
                    loop {
                        match tx.send_timeout(pending, STOP_POLL) {
                            Ok(()) => break,
                            Err(SendTimeoutError::Timeout(frame)) => {
                                if stop.load(Ordering::SeqCst) {
                                    return;
                                }
                                pending = frame;
                            }
                            Err(SendTimeoutError::Disconnected(_)) => return,
                        }
                    }
                }
                PullStep::Retry => thread::sleep(EMPTY_SOURCE_RETRY),
                PullStep::End => return,
            }
        }
    });

    while !consumer.stop_flag.load(Ordering::SeqCst) {
        match rx.recv_timeout(STOP_POLL) {
            Ok(frame) => {
                consumer.sink.render(&consumer.service, &frame);
                thread::sleep(pace);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(rx);
    let _ = ahead.join();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::CaptureSink;
    use reel_graph::producers::ColorProducer;

    fn profile() -> Arc<Profile> {
        Arc::new(Profile::custom(2, 2, 25, 1))
    }

    fn short_producer(frames: i64) -> Arc<ColorProducer> {
        let producer = ColorProducer::new(profile(), "red");
        producer.set_length(frames);
        producer
    }

    fn capture_consumer() -> Arc<Consumer> {
        let consumer = Consumer::new("capture", profile(), Arc::new(CaptureSink));
        consumer.service().set("real_time", 0);
        consumer
    }

    #[test]
    fn lifecycle_created_to_stopped() {
        let consumer = capture_consumer();
        assert_eq!(consumer.state(), ConsumerState::Created);
        assert!(consumer.is_stopped());

        consumer.connect(short_producer(10)).unwrap();
        assert_eq!(consumer.state(), ConsumerState::Connected);

        consumer.start().unwrap();
        consumer.stop();
        assert_eq!(consumer.state(), ConsumerState::Stopped);
        assert!(consumer.is_stopped());
    }

    #[test]
    fn start_without_connect_is_rejected() {
        let consumer = capture_consumer();
        assert!(matches!(consumer.start(), Err(ReelError::NotConnected)));
    }

    #[test]
    fn connect_same_source_is_idempotent() {
        let consumer = capture_consumer();
        let source = short_producer(10);
        consumer.connect(Arc::clone(&source) as _).unwrap();
        consumer.connect(source).unwrap();
        assert_eq!(consumer.state(), ConsumerState::Connected);
    }

    #[test]
    fn source_feeds_at_most_one_consumer() {
        let first = capture_consumer();
        let second = capture_consumer();
        let source = short_producer(10);

        first.connect(Arc::clone(&source) as _).unwrap();
        assert!(matches!(
            second.connect(Arc::clone(&source) as _),
            Err(ReelError::SourceBusy)
        ));

        // Reconnecting the first consumer elsewhere frees the claim
        first.connect(short_producer(10)).unwrap();
        second.connect(source).unwrap();
    }

    #[test]
    fn exhaustion_stops_and_counts_all_frames() {
        let consumer = capture_consumer();
        let handle = consumer.service().events().setup_wait_for("consumer-stopped");

        consumer.connect(short_producer(20)).unwrap();
        consumer.start().unwrap();
        handle.wait();

        assert!(consumer.is_stopped());
        assert_eq!(consumer.service().get_int("rendered"), 20);
        assert_eq!(consumer.service().get_int("last_position"), 19);
    }

    #[test]
    fn stop_is_idempotent() {
        let consumer = capture_consumer();
        consumer.connect(short_producer(5)).unwrap();
        consumer.start().unwrap();
        consumer.stop();
        consumer.stop();
        assert!(consumer.is_stopped());
    }

    #[test]
    fn invalid_consumer_will_not_start() {
        let consumer = Consumer::invalid("bogus", profile());
        assert!(!consumer.is_valid());
        consumer.connect(short_producer(5)).unwrap();
        assert!(consumer.start().is_err());
    }

    #[test]
    fn terminate_on_pause_stops_on_zero_speed() {
        let consumer = capture_consumer();
        consumer.service().set("terminate_on_pause", 1);

        let source = short_producer(1000);
        source.set_speed(0.0);
        consumer.connect(source).unwrap();

        let handle = consumer.service().events().setup_wait_for("consumer-stopped");
        consumer.start().unwrap();
        handle.wait();
        assert!(consumer.is_stopped());
        assert_eq!(consumer.service().get_int("rendered"), 0);
    }
}
