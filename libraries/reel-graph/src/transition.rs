//! Transitions
//!
//! A transition combines two frame streams into one. Like filters,
//! transitions satisfy the producer capability; the combined stream is
//! as long as the shorter of the two tracks.

use crate::producer::{Producer, ProducerCore};
use crate::service::{Service, ServiceKind, ServiceNode};
use reel_core::{Frame, Profile};
use std::sync::{Arc, RwLock};

type Combine = Box<dyn Fn(&Service, &mut Frame, &Frame) + Send + Sync>;

/// Two-track combining node
pub struct Transition {
    core: ProducerCore,
    a_track: RwLock<Option<Arc<dyn Producer>>>,
    b_track: RwLock<Option<Arc<dyn Producer>>>,
    combine: Combine,
}

impl Transition {
    /// Create a transition with a custom combine function
    ///
    /// The function receives the A-track frame to rewrite in place and
    /// the matching B-track frame.
    pub fn new(
        name: impl Into<String>,
        profile: Arc<Profile>,
        combine: impl Fn(&Service, &mut Frame, &Frame) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            core: ProducerCore::with_kind(ServiceKind::Transition, name, profile, 0),
            a_track: RwLock::new(None),
            b_track: RwLock::new(None),
            combine: Box::new(combine),
        })
    }

    /// Blend the two tracks' images by the `mix` property (default 0.5)
    pub fn mix(profile: Arc<Profile>) -> Arc<Self> {
        Self::new("mix", profile, mix_combine)
    }

    /// Create a transition whose name could not be resolved
    pub fn invalid(name: impl Into<String>, profile: Arc<Profile>) -> Arc<Self> {
        Arc::new(Self {
            core: ProducerCore::invalid_with_kind(ServiceKind::Transition, name, profile),
            a_track: RwLock::new(None),
            b_track: RwLock::new(None),
            combine: Box::new(|_, _, _| {}),
        })
    }

    /// Connect the A (base) and B (overlay) tracks
    pub fn connect(&self, a_track: Arc<dyn Producer>, b_track: Arc<dyn Producer>) {
        *self.a_track.write().unwrap() = Some(a_track);
        *self.b_track.write().unwrap() = Some(b_track);
    }

    fn tracks(&self) -> Option<(Arc<dyn Producer>, Arc<dyn Producer>)> {
        let a = self.a_track.read().unwrap().clone()?;
        let b = self.b_track.read().unwrap().clone()?;
        Some((a, b))
    }
}

impl ServiceNode for Transition {
    fn service(&self) -> &Service {
        self.core.service()
    }
}

impl Producer for Transition {
    fn producer_core(&self) -> &ProducerCore {
        &self.core
    }

    fn length(&self) -> i64 {
        self.tracks().map_or(0, |(a, b)| a.length().min(b.length()))
    }

    fn out_point(&self) -> i64 {
        self.length() - 1
    }

    fn read_frame(&self, position: i64) -> Option<Frame> {
        let (a_track, b_track) = self.tracks()?;
        let mut frame = a_track.read_frame(position)?;
        if let Some(overlay) = b_track.read_frame(position) {
            (self.combine)(self.core.service(), &mut frame, &overlay);
        }
        frame.set_position(position);
        Some(frame)
    }
}

fn mix_combine(service: &Service, base: &mut Frame, overlay: &Frame) {
    let mix = if service.contains("mix") {
        service.get_double("mix").clamp(0.0, 1.0)
    } else {
        0.5
    };

    let (Some(base_image), Some(overlay_image)) = (base.image(), overlay.image()) else {
        return;
    };
    if base_image.len() != overlay_image.len() {
        return;
    }

    let blended: Vec<u8> = base_image
        .iter()
        .zip(overlay_image.iter())
        .map(|(&a, &b)| (f64::from(a) * (1.0 - mix) + f64::from(b) * mix).round() as u8)
        .collect();
    let (width, height) = (base.width(), base.height());
    base.set_image(blended, width, height);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::ColorProducer;

    fn profile() -> Arc<Profile> {
        Arc::new(Profile::custom(2, 2, 25, 1))
    }

    #[test]
    fn mix_blends_both_tracks() {
        let red = ColorProducer::new(profile(), "red");
        let blue = ColorProducer::new(profile(), "blue");
        let transition = Transition::mix(profile());
        transition.connect(red, blue);

        let frame = transition.read_frame(0).unwrap();
        let image = frame.image().unwrap();
        assert_eq!(&image[..4], &[128, 0, 128, 255]);
    }

    #[test]
    fn mix_level_is_a_property() {
        let red = ColorProducer::new(profile(), "red");
        let blue = ColorProducer::new(profile(), "blue");
        let transition = Transition::mix(profile());
        transition.service().set("mix", 1.0);
        transition.connect(red, blue);

        let frame = transition.read_frame(0).unwrap();
        assert_eq!(&frame.image().unwrap()[..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn length_is_shorter_track() {
        let red = ColorProducer::new(profile(), "red");
        red.set_length(100);
        let blue = ColorProducer::new(profile(), "blue");
        blue.set_length(60);

        let transition = Transition::mix(profile());
        assert_eq!(transition.length(), 0);
        transition.connect(red, blue);
        assert_eq!(transition.length(), 60);
        assert_eq!(transition.out_point(), 59);
        assert_eq!(transition.service().kind(), ServiceKind::Transition);
    }

    #[test]
    fn unconnected_transition_serves_nothing() {
        let transition = Transition::mix(profile());
        assert!(transition.read_frame(0).is_none());
    }
}
