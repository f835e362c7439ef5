//! Filters
//!
//! A filter attaches to exactly one producer and transforms the frames
//! it pulls through. Filters satisfy the producer capability, so a
//! filtered producer connects to a consumer (or appends to a playlist)
//! like any other source; bounds delegate to the upstream producer.

use crate::producer::{Producer, ProducerCore};
use crate::service::{Service, ServiceKind, ServiceNode};
use reel_core::{Frame, Profile, ReelError, Result};
use std::sync::{Arc, RwLock};

type Effect = Box<dyn Fn(&Service, &mut Frame) + Send + Sync>;

/// Frame-transforming node wrapping one upstream producer
pub struct Filter {
    core: ProducerCore,
    upstream: RwLock<Option<Arc<dyn Producer>>>,
    effect: Effect,
}

impl Filter {
    /// Create a filter with a custom frame effect
    pub fn new(
        name: impl Into<String>,
        profile: Arc<Profile>,
        effect: impl Fn(&Service, &mut Frame) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            core: ProducerCore::with_kind(ServiceKind::Filter, name, profile, 0),
            upstream: RwLock::new(None),
            effect: Box::new(effect),
        })
    }

    /// Scale image brightness by the `level` property (default 1.0)
    pub fn brightness(profile: Arc<Profile>) -> Arc<Self> {
        Self::new("brightness", profile, brightness_effect)
    }

    /// Normalize frame geometry to the profile
    ///
    /// Nearest-neighbour image scaling; setting the `rescale` property
    /// to `"none"` disables it.
    pub fn rescale(profile: Arc<Profile>) -> Arc<Self> {
        Self::new("rescale", profile, rescale_effect)
    }

    /// Create a filter whose name could not be resolved
    ///
    /// Callers are expected to check validity before use.
    pub fn invalid(name: impl Into<String>, profile: Arc<Profile>) -> Arc<Self> {
        Arc::new(Self {
            core: ProducerCore::invalid_with_kind(ServiceKind::Filter, name, profile),
            upstream: RwLock::new(None),
            effect: Box::new(|_, _| {}),
        })
    }

    /// Attach the upstream producer, replacing any previous attachment
    pub fn attach(&self, producer: Arc<dyn Producer>) {
        *self.upstream.write().unwrap() = Some(producer);
    }

    /// The attached producer, if any
    pub fn upstream(&self) -> Option<Arc<dyn Producer>> {
        self.upstream.read().unwrap().clone()
    }
}

impl ServiceNode for Filter {
    fn service(&self) -> &Service {
        self.core.service()
    }
}

impl Producer for Filter {
    fn producer_core(&self) -> &ProducerCore {
        &self.core
    }

    fn length(&self) -> i64 {
        self.upstream().map_or(0, |up| up.length())
    }

    fn in_point(&self) -> i64 {
        self.upstream().map_or(0, |up| up.in_point())
    }

    fn out_point(&self) -> i64 {
        self.upstream().map_or(-1, |up| up.out_point())
    }

    fn set_in_out(&self, in_point: i64, out_point: i64) -> Result<()> {
        match self.upstream() {
            Some(up) => up.set_in_out(in_point, out_point),
            None => Err(ReelError::invalid_state("filter has no upstream producer")),
        }
    }

    fn read_frame(&self, position: i64) -> Option<Frame> {
        let upstream = self.upstream()?;
        let mut frame = upstream.read_frame(position)?;
        (self.effect)(self.core.service(), &mut frame);
        Some(frame)
    }
}

fn brightness_effect(service: &Service, frame: &mut Frame) {
    let level = if service.contains("level") {
        service.get_double("level")
    } else {
        1.0
    };
    if level == 1.0 {
        return;
    }
    let Some(image) = frame.image().map(<[u8]>::to_vec) else {
        return;
    };
    let mut scaled = image;
    for pixel in scaled.chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            *channel = (f64::from(*channel) * level).round().clamp(0.0, 255.0) as u8;
        }
    }
    let (width, height) = (frame.width(), frame.height());
    frame.set_image(scaled, width, height);
}

fn rescale_effect(service: &Service, frame: &mut Frame) {
    if service.get_string("rescale") == "none" {
        return;
    }
    let profile = service.profile();
    let (dst_w, dst_h) = (profile.width(), profile.height());
    let (src_w, src_h) = (frame.width(), frame.height());
    if (src_w, src_h) == (dst_w, dst_h) {
        return;
    }

    if src_w > 0 && src_h > 0 {
        if let Some(src) = frame.image().map(<[u8]>::to_vec) {
            if src.len() == (src_w * src_h * 4) as usize {
                let mut dst = vec![0u8; (dst_w * dst_h * 4) as usize];
                for y in 0..dst_h {
                    for x in 0..dst_w {
                        let sx = x * src_w / dst_w;
                        let sy = y * src_h / dst_h;
                        let s = ((sy * src_w + sx) * 4) as usize;
                        let d = ((y * dst_w + x) * 4) as usize;
                        dst[d..d + 4].copy_from_slice(&src[s..s + 4]);
                    }
                }
                frame.set_image(dst, dst_w, dst_h);
                return;
            }
        }
    }

    // No usable image payload; normalize the tagged geometry only
    frame.properties_mut().set("width", dst_w);
    frame.properties_mut().set("height", dst_h);
}
