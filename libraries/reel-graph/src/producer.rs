//! Producer capability
//!
//! Producers, playlists, filters and transitions all satisfy one
//! capability set (length, read-frame-at-position, get/set in/out)
//! and the pipeline depends only on that, so a playlist connects to a
//! consumer exactly like a single producer. The `in`/`out`/`length`
//! bounds live in the property store under those keys.

use crate::service::{Service, ServiceNode};
use reel_core::{Frame, Profile, ReelError, Result};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Default length of synthetic producers, in frames
pub const DEFAULT_LENGTH: i64 = 15000;

/// State embedded in every producer-like node
pub struct ProducerCore {
    service: Service,
    position: AtomicI64,
    speed_bits: AtomicU64,
    attached: AtomicBool,
}

impl ProducerCore {
    /// Create the core for a valid producer with the given length
    pub fn new(name: impl Into<String>, profile: Arc<Profile>, length: i64) -> Self {
        Self::with_kind(crate::service::ServiceKind::Producer, name, profile, length)
    }

    /// Create a core for another service kind that satisfies the
    /// producer capability (filters and transitions)
    pub fn with_kind(
        kind: crate::service::ServiceKind,
        name: impl Into<String>,
        profile: Arc<Profile>,
        length: i64,
    ) -> Self {
        let service = Service::new(kind, name, profile);
        service.set("length", length);
        service.set("in", 0);
        service.set("out", length - 1);
        Self {
            service,
            position: AtomicI64::new(0),
            speed_bits: AtomicU64::new(1.0f64.to_bits()),
            attached: AtomicBool::new(false),
        }
    }

    /// Create the core for a producer whose resource acquisition failed
    pub fn invalid(name: impl Into<String>, profile: Arc<Profile>) -> Self {
        Self::invalid_with_kind(crate::service::ServiceKind::Producer, name, profile)
    }

    /// Create an invalid core for another service kind
    pub fn invalid_with_kind(
        kind: crate::service::ServiceKind,
        name: impl Into<String>,
        profile: Arc<Profile>,
    ) -> Self {
        let service = Service::invalid(kind, name, profile);
        service.set("length", 0);
        service.set("in", 0);
        service.set("out", -1);
        Self {
            service,
            position: AtomicI64::new(0),
            speed_bits: AtomicU64::new(1.0f64.to_bits()),
            attached: AtomicBool::new(false),
        }
    }

    /// The embedded service
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Claim this producer for a consumer connection
    ///
    /// A producer may feed at most one consumer at a time.
    pub fn try_attach(&self) -> Result<()> {
        if self.attached.swap(true, Ordering::SeqCst) {
            Err(ReelError::SourceBusy)
        } else {
            Ok(())
        }
    }

    /// Release the consumer connection claim
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    fn speed(&self) -> f64 {
        f64::from_bits(self.speed_bits.load(Ordering::SeqCst))
    }

    fn set_speed(&self, speed: f64) {
        self.speed_bits.store(speed.to_bits(), Ordering::SeqCst);
    }
}

/// The producer-like capability set
///
/// `read_frame` is absolute-position random access over `0..length`;
/// the producer's own `in`/`out` describe its default clip range, used
/// when it is connected directly or appended whole to a playlist.
pub trait Producer: ServiceNode + Send + Sync {
    /// The embedded producer state
    fn producer_core(&self) -> &ProducerCore;

    /// Fill in the payload for an already-positioned frame
    fn render(&self, frame: &mut Frame) {
        let _ = frame;
    }

    /// Total frames available from the backing resource
    fn length(&self) -> i64 {
        self.producer_core().service().get_int("length")
    }

    /// Clip in point
    fn in_point(&self) -> i64 {
        self.producer_core().service().get_int("in")
    }

    /// Clip out point (inclusive)
    fn out_point(&self) -> i64 {
        self.producer_core().service().get_int("out")
    }

    /// Number of frames in the clip range (0 when empty)
    fn playable_frames(&self) -> i64 {
        (self.out_point() - self.in_point() + 1).max(0)
    }

    /// Set the clip range
    ///
    /// Rejected without mutation unless `0 <= in <= out < length`.
    fn set_in_out(&self, in_point: i64, out_point: i64) -> Result<()> {
        let length = self.length();
        if in_point < 0 || in_point > out_point || out_point >= length {
            return Err(ReelError::OutOfRange {
                in_point,
                out_point,
                length,
            });
        }
        let service = self.producer_core().service();
        service.set("in", in_point);
        service.set("out", out_point);
        Ok(())
    }

    /// Resize the backing resource, resetting the clip range to cover it
    fn set_length(&self, length: i64) {
        let length = length.max(0);
        let service = self.producer_core().service();
        service.set("length", length);
        service.set("in", 0);
        service.set("out", length - 1);
    }

    /// Current playback position
    fn position(&self) -> i64 {
        self.producer_core().position.load(Ordering::SeqCst)
    }

    /// Move the playback position
    fn seek(&self, position: i64) {
        self.producer_core().position.store(position, Ordering::SeqCst);
    }

    /// Playback speed (1.0 = normal, 0.0 = paused)
    fn speed(&self) -> f64 {
        self.producer_core().speed()
    }

    /// Set the playback speed
    fn set_speed(&self, speed: f64) {
        self.producer_core().set_speed(speed);
    }

    /// Produce the frame at an absolute position
    ///
    /// Returns `None` when the position is outside `0..length` or the
    /// producer is invalid. Never fails otherwise.
    fn read_frame(&self, position: i64) -> Option<Frame> {
        if !self.is_valid() {
            return None;
        }
        if position < 0 || position >= self.length() {
            return None;
        }
        let mut frame = Frame::new(position);
        {
            let profile = self.service().profile();
            let props = frame.properties_mut();
            props.set("aspect_ratio", profile.sample_aspect());
            props.set("progressive", profile.progressive());
        }
        self.render(&mut frame);
        Some(frame)
    }
}
