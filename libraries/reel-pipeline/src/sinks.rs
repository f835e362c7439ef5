//! Frame sinks
//!
//! The output stage of a consumer: whatever happens to a frame once the
//! pull loop has fetched it. Rendering and encoding back ends implement
//! this seam; the stock sinks discard or record.

use reel_core::Frame;
use reel_graph::Service;

/// Output stage invoked by the consumer's pull loop
pub trait FrameSink: Send + Sync {
    /// Handle one pulled frame
    ///
    /// Runs on the pull-loop worker; it must not block indefinitely or
    /// it stalls the pipeline.
    fn render(&self, service: &Service, frame: &Frame);
}

/// Sink that discards every frame
pub struct NullSink;

impl FrameSink for NullSink {
    fn render(&self, _service: &Service, _frame: &Frame) {}
}

/// Sink that records progress into the consumer's property store
///
/// After each frame, `rendered` holds the running frame count and
/// `last_position` the most recent source position, so callers can
/// observe pipeline progress through ordinary property reads.
pub struct CaptureSink;

impl FrameSink for CaptureSink {
    fn render(&self, service: &Service, frame: &Frame) {
        let rendered = service.get_int("rendered") + 1;
        service.set("rendered", rendered);
        service.set("last_position", frame.position());
    }
}
