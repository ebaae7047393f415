use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    encode::VideoFormat,
    foundation::core::{Canvas, Rgb8},
    foundation::error::{DotlinkError, DotlinkResult},
    order::ConnectionMode,
};

pub const MIN_DOTS: usize = 3;
pub const MAX_DOTS: usize = 15;

/// Settings for one generation run. Every task in the run shares them.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub domain: String,
    pub canvas: Canvas,
    pub num_dots: usize,
    pub dot_radius: u32,
    pub line_width: u32,
    pub show_numbers: bool,
    pub connection: ConnectionMode,
    pub dot_color: Rgb8,
    pub line_color: Rgb8,
    pub background_color: Rgb8,
    /// Seeds the run's single generator. `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub video: VideoConfig,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            domain: "dot_to_dot".to_string(),
            canvas: Canvas::default(),
            num_dots: 5,
            dot_radius: 8,
            line_width: 3,
            show_numbers: true,
            connection: ConnectionMode::Sequential,
            dot_color: Rgb8::new(50, 50, 200),
            line_color: Rgb8::new(200, 50, 50),
            background_color: Rgb8::WHITE,
            seed: None,
            video: VideoConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub enabled: bool,
    pub fps: u32,
    pub hold_frames: usize,
    pub frames_per_connection: usize,
    pub format: VideoFormat,
    /// Output directory. Defaults to `<temp>/<domain>_videos`.
    pub dir: Option<PathBuf>,
    /// Keep the rendered frame list on the task record.
    pub keep_frames: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fps: 10,
            hold_frames: 5,
            frames_per_connection: 15,
            format: VideoFormat::Mp4,
            dir: None,
            keep_frames: false,
        }
    }
}

impl TaskConfig {
    /// Distance kept clear between dots and the canvas edge.
    pub fn margin(&self) -> u32 {
        (self.dot_radius * 3).max(40)
    }

    pub fn min_separation(&self) -> f64 {
        f64::from(self.margin()) * 1.5
    }

    pub fn label_size(&self) -> u32 {
        (self.dot_radius * 2).max(16)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.video
            .dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{}_videos", self.domain)))
    }

    pub fn validate(&self) -> DotlinkResult<()> {
        if self.domain.trim().is_empty() {
            return Err(DotlinkError::validation("domain must be non-empty"));
        }
        if !(MIN_DOTS..=MAX_DOTS).contains(&self.num_dots) {
            return Err(DotlinkError::validation(format!(
                "num_dots must be in {MIN_DOTS}..={MAX_DOTS}, got {}",
                self.num_dots
            )));
        }
        if !(5..=20).contains(&self.dot_radius) {
            return Err(DotlinkError::validation(format!(
                "dot_radius must be in 5..=20, got {}",
                self.dot_radius
            )));
        }
        if !(2..=5).contains(&self.line_width) {
            return Err(DotlinkError::validation(format!(
                "line_width must be in 2..=5, got {}",
                self.line_width
            )));
        }
        let min_dim = 2 * self.margin() + 1;
        if self.canvas.width < min_dim || self.canvas.height < min_dim {
            return Err(DotlinkError::validation(format!(
                "canvas {}x{} is too small for margin {} (need at least {min_dim} per side)",
                self.canvas.width,
                self.canvas.height,
                self.margin()
            )));
        }
        if self.canvas.width > u32::from(u16::MAX) || self.canvas.height > u32::from(u16::MAX) {
            return Err(DotlinkError::validation("canvas dimensions must fit in u16"));
        }
        if self.video.enabled
            && (!self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2))
        {
            // Videos are encoded as yuv420p.
            return Err(DotlinkError::validation(format!(
                "canvas {}x{} must have even dimensions when video is enabled",
                self.canvas.width, self.canvas.height
            )));
        }
        if self.video.fps == 0 {
            return Err(DotlinkError::validation("video.fps must be non-zero"));
        }
        if self.video.frames_per_connection == 0 {
            return Err(DotlinkError::validation(
                "video.frames_per_connection must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> DotlinkResult<Self> {
        let cfg: TaskConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_path(path: &Path) -> DotlinkResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = TaskConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.margin(), 40);
        assert_eq!(cfg.min_separation(), 60.0);
        assert_eq!(cfg.label_size(), 16);
    }

    #[test]
    fn margin_grows_with_radius() {
        let cfg = TaskConfig {
            dot_radius: 20,
            ..TaskConfig::default()
        };
        assert_eq!(cfg.margin(), 60);
        assert_eq!(cfg.label_size(), 40);
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let bad = [
            TaskConfig {
                num_dots: 2,
                ..TaskConfig::default()
            },
            TaskConfig {
                num_dots: 16,
                ..TaskConfig::default()
            },
            TaskConfig {
                dot_radius: 4,
                ..TaskConfig::default()
            },
            TaskConfig {
                line_width: 6,
                ..TaskConfig::default()
            },
            TaskConfig {
                canvas: Canvas {
                    width: 80,
                    height: 512,
                },
                ..TaskConfig::default()
            },
            TaskConfig {
                domain: " ".to_string(),
                ..TaskConfig::default()
            },
        ];
        for cfg in bad {
            let err = cfg.validate().unwrap_err();
            assert!(matches!(err, DotlinkError::Validation(_)), "{err}");
        }
    }

    #[test]
    fn odd_canvas_needs_video_disabled() {
        let mut cfg = TaskConfig {
            canvas: Canvas {
                width: 513,
                height: 512,
            },
            ..TaskConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DotlinkError::Validation(_))));
        cfg.canvas.height = 513;
        cfg.canvas.width = 512;
        assert!(cfg.validate().is_err());

        cfg.video.enabled = false;
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_frames_per_connection_is_rejected() {
        let mut cfg = TaskConfig::default();
        cfg.video.frames_per_connection = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = TaskConfig::from_json_str(
            r#"{ "num_dots": 7, "connection": "path", "dot_color": [0, 150, 0], "seed": 42 }"#,
        )
        .unwrap();
        assert_eq!(cfg.num_dots, 7);
        assert_eq!(cfg.connection, ConnectionMode::Path);
        assert_eq!(cfg.dot_color, Rgb8::new(0, 150, 0));
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.line_color, Rgb8::new(200, 50, 50));
        assert_eq!(cfg.video.hold_frames, 5);
    }

    #[test]
    fn bad_color_arity_fails_at_the_boundary() {
        let err = TaskConfig::from_json_str(r#"{ "line_color": [255, 0] }"#).unwrap_err();
        assert!(matches!(err, DotlinkError::Serde(_)));
        let err = TaskConfig::from_json_str(r#"{ "dot_color": [1, 2, 3, 4] }"#).unwrap_err();
        assert!(matches!(err, DotlinkError::Serde(_)));
    }

    #[test]
    fn unknown_connection_mode_fails_loudly() {
        assert!(TaskConfig::from_json_str(r#"{ "connection": "spiral" }"#).is_err());
    }

    #[test]
    fn default_video_dir_uses_domain() {
        let cfg = TaskConfig::default();
        assert!(cfg.video_dir().ends_with("dot_to_dot_videos"));
    }
}
