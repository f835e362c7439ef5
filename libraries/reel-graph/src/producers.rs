//! Built-in synthetic producers
//!
//! The engine ships no codec modules, so the stock producers synthesize
//! their frames: `color` fills solid frames sized to the profile,
//! `count` stamps each frame with its ordinal, `noise` fills frames
//! with deterministic pseudo-random bytes. All default to a length of
//! `DEFAULT_LENGTH` frames; callers trim with `set_length`/`set_in_out`.

use crate::producer::{Producer, ProducerCore, DEFAULT_LENGTH};
use crate::service::{Service, ServiceNode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reel_core::{Frame, Profile};
use std::sync::Arc;

/// Parse a color argument: a known name, `#RRGGBB`, `#RRGGBBAA` or
/// `0xRRGGBBAA`. Unrecognized input falls back to opaque black.
fn parse_color(text: &str) -> [u8; 4] {
    match text {
        "black" | "" => return [0, 0, 0, 255],
        "white" => return [255, 255, 255, 255],
        "red" => return [255, 0, 0, 255],
        "green" => return [0, 255, 0, 255],
        "blue" => return [0, 0, 255, 255],
        "yellow" => return [255, 255, 0, 255],
        "cyan" => return [0, 255, 255, 255],
        "magenta" => return [255, 0, 255, 255],
        _ => {}
    }

    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix('#'))
        .unwrap_or(text);
    let parsed = u32::from_str_radix(hex, 16).ok();
    match (parsed, hex.len()) {
        (Some(rgb), 6) => {
            let [_, r, g, b] = rgb.to_be_bytes();
            [r, g, b, 255]
        }
        (Some(rgba), 8) => rgba.to_be_bytes(),
        _ => [0, 0, 0, 255],
    }
}

/// Solid-color frame source
pub struct ColorProducer {
    core: ProducerCore,
    rgba: [u8; 4],
}

impl ColorProducer {
    /// Create a color producer for the given color argument
    pub fn new(profile: Arc<Profile>, color: &str) -> Arc<Self> {
        let core = ProducerCore::new("color", profile, DEFAULT_LENGTH);
        core.service().set("resource", color);
        Arc::new(Self {
            core,
            rgba: parse_color(color),
        })
    }

    /// The color rendered into every frame
    pub fn rgba(&self) -> [u8; 4] {
        self.rgba
    }
}

impl ServiceNode for ColorProducer {
    fn service(&self) -> &Service {
        self.core.service()
    }
}

impl Producer for ColorProducer {
    fn producer_core(&self) -> &ProducerCore {
        &self.core
    }

    fn render(&self, frame: &mut Frame) {
        let profile = self.service().profile();
        let (width, height) = (profile.width(), profile.height());
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&self.rgba);
        }
        frame.set_image(data, width, height);
    }
}

/// Frame source stamping each frame with its ordinal
pub struct CountProducer {
    core: ProducerCore,
}

impl CountProducer {
    /// Create a count producer
    pub fn new(profile: Arc<Profile>) -> Arc<Self> {
        let core = ProducerCore::new("count", profile, DEFAULT_LENGTH);
        core.service().set("resource", "count");
        Arc::new(Self { core })
    }
}

impl ServiceNode for CountProducer {
    fn service(&self) -> &Service {
        self.core.service()
    }
}

impl Producer for CountProducer {
    fn producer_core(&self) -> &ProducerCore {
        &self.core
    }

    fn render(&self, frame: &mut Frame) {
        let position = frame.position();
        let props = frame.properties_mut();
        props.set("count", position);
        props.set("text", position.to_string());
    }
}

/// Deterministic pseudo-random frame source
///
/// Seeded per position so a frame read twice is byte-identical.
pub struct NoiseProducer {
    core: ProducerCore,
}

impl NoiseProducer {
    /// Create a noise producer
    pub fn new(profile: Arc<Profile>) -> Arc<Self> {
        let core = ProducerCore::new("noise", profile, DEFAULT_LENGTH);
        core.service().set("resource", "noise");
        Arc::new(Self { core })
    }
}

impl ServiceNode for NoiseProducer {
    fn service(&self) -> &Service {
        self.core.service()
    }
}

impl Producer for NoiseProducer {
    fn producer_core(&self) -> &ProducerCore {
        &self.core
    }

    fn render(&self, frame: &mut Frame) {
        let profile = self.service().profile();
        let (width, height) = (profile.width(), profile.height());
        let mut rng = StdRng::seed_from_u64(frame.position() as u64);
        let mut data = vec![0u8; (width * height * 4) as usize];
        for pixel in data.chunks_exact_mut(4) {
            let grey: u8 = rng.gen();
            pixel.copy_from_slice(&[grey, grey, grey, 255]);
        }
        frame.set_image(data, width, height);
    }
}

/// Placeholder for a resource the factory could not resolve
///
/// Reads nothing and reports `valid == false`; checking validity before
/// use is the caller's obligation. The unresolved locator is kept in
/// the `resource` property for diagnostics.
pub struct InvalidProducer {
    core: ProducerCore,
}

impl InvalidProducer {
    /// Create an invalid producer for the given locator
    pub fn new(profile: Arc<Profile>, resource: &str) -> Arc<Self> {
        let core = ProducerCore::invalid("invalid", profile);
        core.service().set("resource", resource);
        Arc::new(Self { core })
    }
}

impl ServiceNode for InvalidProducer {
    fn service(&self) -> &Service {
        self.core.service()
    }
}

impl Producer for InvalidProducer {
    fn producer_core(&self) -> &ProducerCore {
        &self.core
    }
}
