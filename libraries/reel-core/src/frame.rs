//! Frame
//!
//! The unit of data pulled through a pipeline. A frame is little more
//! than a property store: producers stamp geometry and payload into it,
//! filters and transitions rewrite it, consumers hand it to their output
//! stage.

use crate::properties::Properties;

/// Position key stamped on every frame
const POSITION_KEY: &str = "_position";

/// One frame of media flowing through the graph
#[derive(Debug, Clone, Default)]
pub struct Frame {
    properties: Properties,
}

impl Frame {
    /// Create a frame for the given stream position
    pub fn new(position: i64) -> Self {
        let mut properties = Properties::new();
        properties.set(POSITION_KEY, position);
        Self { properties }
    }

    /// Stream position this frame was produced for
    pub fn position(&self) -> i64 {
        self.properties.get_int(POSITION_KEY)
    }

    /// Re-stamp the stream position (e.g. when a playlist maps an entry
    /// frame to its absolute position)
    pub fn set_position(&mut self, position: i64) {
        self.properties.set(POSITION_KEY, position);
    }

    /// Read access to the frame's properties
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Write access to the frame's properties
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Attach an image payload with its geometry
    pub fn set_image(&mut self, data: Vec<u8>, width: i32, height: i32) {
        self.properties.set("image", data);
        self.properties.set("width", width);
        self.properties.set("height", height);
    }

    /// Image payload, if any
    pub fn image(&self) -> Option<&[u8]> {
        self.properties.get_blob("image")
    }

    /// Image width (0 if no image)
    pub fn width(&self) -> i32 {
        self.properties.get_int("width") as i32
    }

    /// Image height (0 if no image)
    pub fn height(&self) -> i32 {
        self.properties.get_int("height") as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_carries_position() {
        let frame = Frame::new(42);
        assert_eq!(frame.position(), 42);
    }

    #[test]
    fn image_round_trip() {
        let mut frame = Frame::new(0);
        frame.set_image(vec![0u8; 12], 2, 2);
        assert_eq!(frame.image().unwrap().len(), 12);
        assert_eq!((frame.width(), frame.height()), (2, 2));
    }

    #[test]
    fn extra_properties_flow_with_the_frame() {
        let mut frame = Frame::new(7);
        frame.properties_mut().set("count", 7);
        assert_eq!(frame.properties().get_int("count"), 7);
    }
}
