//! Output profile
//!
//! A profile is the immutable description of the target frame geometry,
//! rate and aspect that every service connected into one graph
//! normalizes to. Decoupling geometry from individual services lets
//! heterogeneous sources and sinks be connected without per-pair
//! negotiation. Profiles are shared read-only (`Arc<Profile>`) and must
//! outlive the services built against them.

use crate::error::{ReelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Immutable frame geometry/timing descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    description: String,
    width: i32,
    height: i32,
    frame_rate_num: i32,
    frame_rate_den: i32,
    sample_aspect_num: i32,
    sample_aspect_den: i32,
    display_aspect_num: i32,
    display_aspect_den: i32,
    progressive: bool,
    colorspace: i32,
}

impl Default for Profile {
    /// The PAL DV fallback; constructing a profile never fails
    fn default() -> Self {
        Self {
            description: "PAL 4:3 DV or DVD".to_string(),
            width: 720,
            height: 576,
            frame_rate_num: 25,
            frame_rate_den: 1,
            sample_aspect_num: 16,
            sample_aspect_den: 15,
            display_aspect_num: 4,
            display_aspect_den: 3,
            progressive: false,
            colorspace: 601,
        }
    }
}

impl Profile {
    /// Look up a named preset
    ///
    /// Returns `None` for unknown names; callers typically fall back to
    /// `Profile::default()`.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "dv_pal" => Some(Self::default()),
            "dv_ntsc" => Some(Self {
                description: "NTSC 4:3 DV or DVD".to_string(),
                width: 720,
                height: 480,
                frame_rate_num: 30000,
                frame_rate_den: 1001,
                sample_aspect_num: 8,
                sample_aspect_den: 9,
                display_aspect_num: 4,
                display_aspect_den: 3,
                progressive: false,
                colorspace: 601,
            }),
            "hdv_720_25p" => Some(Self {
                description: "HDV 1280x720p 25 fps".to_string(),
                width: 1280,
                height: 720,
                frame_rate_num: 25,
                frame_rate_den: 1,
                sample_aspect_num: 1,
                sample_aspect_den: 1,
                display_aspect_num: 16,
                display_aspect_den: 9,
                progressive: true,
                colorspace: 709,
            }),
            "quarter_pal" => Some(Self {
                description: "Quarter-size PAL 4:3".to_string(),
                width: 360,
                height: 288,
                frame_rate_num: 25,
                frame_rate_den: 1,
                sample_aspect_num: 16,
                sample_aspect_den: 15,
                display_aspect_num: 4,
                display_aspect_den: 3,
                progressive: false,
                colorspace: 601,
            }),
            _ => None,
        }
    }

    /// Construct a profile from explicit dimensions and rate
    ///
    /// Square pixels, progressive, Rec. 709.
    pub fn custom(width: i32, height: i32, frame_rate_num: i32, frame_rate_den: i32) -> Self {
        Self {
            description: format!("{width}x{height} {frame_rate_num}/{frame_rate_den} fps"),
            width,
            height,
            frame_rate_num,
            frame_rate_den,
            sample_aspect_num: 1,
            sample_aspect_den: 1,
            display_aspect_num: width,
            display_aspect_den: height,
            progressive: true,
            colorspace: 709,
        }
    }

    /// Load a profile from a `key=value` description file
    ///
    /// Unknown keys are ignored; omitted keys keep the fallback values.
    /// A file that does not define a positive width/height is rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut profile = Self {
            width: 0,
            height: 0,
            ..Self::default()
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "description" => profile.description = value.to_string(),
                "width" => profile.width = value.parse().unwrap_or(0),
                "height" => profile.height = value.parse().unwrap_or(0),
                "frame_rate_num" => profile.frame_rate_num = value.parse().unwrap_or(0),
                "frame_rate_den" => profile.frame_rate_den = value.parse().unwrap_or(0),
                "sample_aspect_num" => profile.sample_aspect_num = value.parse().unwrap_or(0),
                "sample_aspect_den" => profile.sample_aspect_den = value.parse().unwrap_or(0),
                "display_aspect_num" => profile.display_aspect_num = value.parse().unwrap_or(0),
                "display_aspect_den" => profile.display_aspect_den = value.parse().unwrap_or(0),
                "progressive" => profile.progressive = value.parse::<i32>().unwrap_or(0) != 0,
                "colorspace" => profile.colorspace = value.parse().unwrap_or(0),
                _ => {}
            }
        }

        if profile.width <= 0 || profile.height <= 0 {
            return Err(ReelError::invalid_input(
                "profile file does not define frame dimensions",
            ));
        }
        if profile.frame_rate_num <= 0 || profile.frame_rate_den <= 0 {
            return Err(ReelError::invalid_input(
                "profile file does not define a frame rate",
            ));
        }
        Ok(profile)
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Frame width in pixels
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Frame rate numerator
    pub fn frame_rate_num(&self) -> i32 {
        self.frame_rate_num
    }

    /// Frame rate denominator
    pub fn frame_rate_den(&self) -> i32 {
        self.frame_rate_den
    }

    /// Frames per second
    pub fn fps(&self) -> f64 {
        f64::from(self.frame_rate_num) / f64::from(self.frame_rate_den)
    }

    /// Wall-clock duration of one frame
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.frame_rate_den) / f64::from(self.frame_rate_num))
    }

    /// Pixel aspect ratio
    pub fn sample_aspect(&self) -> f64 {
        f64::from(self.sample_aspect_num) / f64::from(self.sample_aspect_den)
    }

    /// Display aspect ratio
    pub fn display_aspect(&self) -> f64 {
        f64::from(self.display_aspect_num) / f64::from(self.display_aspect_den)
    }

    /// Whether frames are progressive (not interlaced)
    pub fn progressive(&self) -> bool {
        self.progressive
    }

    /// Colorspace (601, 709, ...)
    pub fn colorspace(&self) -> i32 {
        self.colorspace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_is_pal_fallback() {
        let profile = Profile::default();
        assert_eq!(profile.width(), 720);
        assert_eq!(profile.height(), 576);
        assert_eq!(profile.fps(), 25.0);
        assert!(!profile.progressive());
        assert_eq!(profile.colorspace(), 601);
    }

    #[test]
    fn known_presets_resolve() {
        let ntsc = Profile::preset("dv_ntsc").unwrap();
        assert_eq!(ntsc.width(), 720);
        assert_eq!(ntsc.height(), 480);
        assert!((ntsc.fps() - 29.97).abs() < 0.001);

        let hdv = Profile::preset("hdv_720_25p").unwrap();
        assert_eq!((hdv.width(), hdv.height()), (1280, 720));
        assert!(hdv.progressive());
        assert_eq!(hdv.colorspace(), 709);

        let quarter = Profile::preset("quarter_pal").unwrap();
        assert_eq!((quarter.width(), quarter.height()), (360, 288));
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(Profile::preset("betamax").is_none());
    }

    #[test]
    fn custom_profile_dimensions() {
        let profile = Profile::custom(1920, 1080, 30, 1);
        assert_eq!(profile.width(), 1920);
        assert_eq!(profile.fps(), 30.0);
        assert_eq!(profile.frame_duration(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn load_from_description_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "description=Test 640x360").unwrap();
        writeln!(file, "width=640").unwrap();
        writeln!(file, "height=360").unwrap();
        writeln!(file, "frame_rate_num=24").unwrap();
        writeln!(file, "frame_rate_den=1").unwrap();
        writeln!(file, "progressive=1").unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file, "unknown_key=ignored").unwrap();

        let profile = Profile::from_file(file.path()).unwrap();
        assert_eq!(profile.description(), "Test 640x360");
        assert_eq!((profile.width(), profile.height()), (640, 360));
        assert_eq!(profile.fps(), 24.0);
        assert!(profile.progressive());
    }

    #[test]
    fn serializes_round_trip() {
        let profile = Profile::preset("hdv_720_25p").unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn file_without_dimensions_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "description=No geometry").unwrap();

        assert!(Profile::from_file(file.path()).is_err());
    }
}
