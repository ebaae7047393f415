//! Dotlink synthesizes dot-to-dot tasks for evaluating image and video generators.
//!
//! A task is a set of sampled dots, an order to connect them in, a rendered initial frame
//! (labeled dots), a rendered final frame (all connections drawn), a prompt describing the
//! task, and optionally a video of the connections being drawn one after another.
//!
//! - Configure a run with [`TaskConfig`]
//! - Create a [`TaskAssembler`]
//! - Call [`TaskAssembler::generate`] or [`TaskAssembler::generate_batch`]
#![forbid(unsafe_code)]

mod foundation;

pub mod config;
pub mod encode;
pub mod order;
pub mod prompt;
pub mod render;
pub mod sample;
pub mod sequence;
pub mod task;

pub use crate::foundation::core::{Canvas, Point, Rgb8};
pub use crate::foundation::error::{DotlinkError, DotlinkResult};

pub use crate::config::{TaskConfig, VideoConfig};
pub use crate::encode::{
    FrameSink, InMemorySink, SinkConfig, VideoFormat, encode_frames,
    ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path},
};
pub use crate::order::{ConnectionMode, VisitOrder, nearest_neighbor_path, order_points};
pub use crate::prompt::{describe_color, prompt_for};
pub use crate::render::{
    FrameRGBA, RenderStyle,
    compositor::{FrameCompositor, PartialConnection},
    font::{BitmapFont, LabelFont, OutlineFont, TextExtent, WELL_KNOWN_FONT_PATHS, default_font},
};
pub use crate::sample::{Placement, PointSet, SampleBounds, sample_points};
pub use crate::sequence::{SequenceTiming, build_sequence, expected_frame_count};
pub use crate::task::{SinkFactory, Task, TaskAssembler};
