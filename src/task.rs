use std::path::{Path, PathBuf};

use rand::{SeedableRng, rngs::StdRng};

use crate::{
    config::TaskConfig,
    encode::{
        FrameSink, SinkConfig, encode_frames,
        ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path},
    },
    foundation::error::DotlinkResult,
    order::{ConnectionMode, VisitOrder, order_points},
    prompt::prompt_for,
    render::{
        FrameRGBA, RenderStyle,
        compositor::FrameCompositor,
        font::{LabelFont, WELL_KNOWN_FONT_PATHS, default_font},
    },
    sample::{PointSet, SampleBounds, sample_points},
    sequence::{SequenceTiming, build_sequence},
};

/// Opens a video sink writing to the given path.
pub type SinkFactory = Box<dyn FnMut(&Path) -> Box<dyn FrameSink>>;

/// One generated dot-to-dot task. Built by [`TaskAssembler`] and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Task {
    id: String,
    domain: String,
    prompt: String,
    connection: ConnectionMode,
    points: PointSet,
    order: VisitOrder,
    initial: FrameRGBA,
    final_frame: FrameRGBA,
    video: Option<PathBuf>,
    frames: Option<Vec<FrameRGBA>>,
}

impl Task {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn connection(&self) -> ConnectionMode {
        self.connection
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn order(&self) -> &VisitOrder {
        &self.order
    }

    pub fn initial_frame(&self) -> &FrameRGBA {
        &self.initial
    }

    pub fn final_frame(&self) -> &FrameRGBA {
        &self.final_frame
    }

    /// Path of the encoded video, when one was produced.
    pub fn video(&self) -> Option<&Path> {
        self.video.as_deref()
    }

    /// The animation frames, when the run was configured to keep them.
    pub fn frames(&self) -> Option<&[FrameRGBA]> {
        self.frames.as_deref()
    }
}

/// Orchestrates sampling, ordering, rendering and video encoding for a run.
///
/// Holds the run's only random generator; a seeded config makes the whole batch reproducible.
pub struct TaskAssembler {
    cfg: TaskConfig,
    rng: StdRng,
    compositor: FrameCompositor,
    sink_factory: Option<SinkFactory>,
    next_index: u64,
}

impl TaskAssembler {
    /// Build an assembler with an explicit label font.
    ///
    /// When video is enabled and `ffmpeg` is on `PATH`, videos are encoded with it. Otherwise
    /// tasks are produced without a video reference.
    pub fn new(cfg: TaskConfig, font: Box<dyn LabelFont>) -> DotlinkResult<Self> {
        cfg.validate()?;

        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let compositor = FrameCompositor::new(RenderStyle::from_config(&cfg), font)?;

        let sink_factory = if !cfg.video.enabled {
            None
        } else if is_ffmpeg_on_path() {
            let format = cfg.video.format;
            let bg = cfg.background_color.to_rgba();
            let factory: SinkFactory = Box::new(move |path: &Path| {
                let mut opts = FfmpegSinkOpts::new(path, format);
                opts.bg_rgba = bg;
                Box::new(FfmpegSink::new(opts)) as Box<dyn FrameSink>
            });
            Some(factory)
        } else {
            tracing::warn!("ffmpeg not found on PATH, tasks will be generated without video");
            None
        };

        Ok(Self {
            cfg,
            rng,
            compositor,
            sink_factory,
            next_index: 0,
        })
    }

    /// Build an assembler using the first well-known system font, or bitmap digits.
    pub fn with_default_font(cfg: TaskConfig) -> DotlinkResult<Self> {
        Self::new(cfg, default_font(WELL_KNOWN_FONT_PATHS))
    }

    /// Replace the video collaborator. Ignored when video is disabled in the config.
    pub fn with_sink_factory(mut self, factory: SinkFactory) -> Self {
        if self.cfg.video.enabled {
            self.sink_factory = Some(factory);
        }
        self
    }

    pub fn config(&self) -> &TaskConfig {
        &self.cfg
    }

    pub fn has_video(&self) -> bool {
        self.sink_factory.is_some()
    }

    #[tracing::instrument(skip_all, fields(domain = %self.cfg.domain, index = self.next_index))]
    pub fn generate(&mut self) -> DotlinkResult<Task> {
        let id = format!("{}_{:04}", self.cfg.domain, self.next_index);
        self.next_index += 1;

        let bounds = SampleBounds {
            width: self.cfg.canvas.width,
            height: self.cfg.canvas.height,
            margin: self.cfg.margin(),
            min_separation: self.cfg.min_separation(),
        };
        let points = sample_points(self.cfg.num_dots, bounds, &mut self.rng);
        let order = order_points(points.points(), self.cfg.connection, &mut self.rng);

        let initial = self.compositor.render_initial(points.points(), &order)?;
        let final_frame = self.compositor.render_final(points.points(), &order)?;
        let (video, frames) = self.animate(&id, &points, &order)?;

        let prompt = prompt_for(
            self.cfg.num_dots,
            self.cfg.connection,
            self.cfg.dot_color,
            self.cfg.line_color,
        );

        tracing::info!(
            id = %id,
            grid_fallbacks = points.grid_fallbacks(),
            video = video.is_some(),
            "generated task"
        );

        Ok(Task {
            id,
            domain: self.cfg.domain.clone(),
            prompt,
            connection: self.cfg.connection,
            points,
            order,
            initial,
            final_frame,
            video,
            frames,
        })
    }

    pub fn generate_batch(&mut self, count: usize) -> DotlinkResult<Vec<Task>> {
        (0..count).map(|_| self.generate()).collect()
    }

    fn animate(
        &mut self,
        id: &str,
        points: &PointSet,
        order: &VisitOrder,
    ) -> DotlinkResult<(Option<PathBuf>, Option<Vec<FrameRGBA>>)> {
        let video_cfg = &self.cfg.video;
        if !video_cfg.enabled || (self.sink_factory.is_none() && !video_cfg.keep_frames) {
            return Ok((None, None));
        }

        let timing = SequenceTiming {
            hold_frames: video_cfg.hold_frames,
            frames_per_connection: video_cfg.frames_per_connection,
        };
        let frames = build_sequence(&mut self.compositor, points.points(), order, timing)?;

        let video = match self.sink_factory.as_mut() {
            Some(factory) => {
                let path = self.cfg.video_dir().join(format!(
                    "{id}_ground_truth.{}",
                    self.cfg.video.format.extension()
                ));
                let mut sink = factory(&path);
                let sink_cfg = SinkConfig {
                    width: self.cfg.canvas.width,
                    height: self.cfg.canvas.height,
                    fps: self.cfg.video.fps,
                };
                encode_frames(sink.as_mut(), sink_cfg, &frames)?;
                Some(path)
            }
            None => None,
        };

        let frames = self.cfg.video.keep_frames.then_some(frames);
        Ok((video, frames))
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{encode::InMemorySink, render::font::BitmapFont, sequence::expected_frame_count};

    fn cfg(seed: u64) -> TaskConfig {
        let mut cfg = TaskConfig {
            seed: Some(seed),
            ..TaskConfig::default()
        };
        cfg.video.enabled = false;
        cfg
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut a = TaskAssembler::new(cfg(1), Box::new(BitmapFont)).unwrap();
        let tasks = a.generate_batch(3).unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["dot_to_dot_0000", "dot_to_dot_0001", "dot_to_dot_0002"]);
    }

    #[test]
    fn disabled_video_records_nothing() {
        let mut a = TaskAssembler::new(cfg(2), Box::new(BitmapFont)).unwrap();
        assert!(!a.has_video());
        let t = a.generate().unwrap();
        assert!(t.video().is_none());
        assert!(t.frames().is_none());
    }

    #[test]
    fn custom_sink_receives_every_frame() {
        let mut c = cfg(3);
        c.video.enabled = true;
        c.video.keep_frames = true;
        c.video.hold_frames = 2;
        c.video.frames_per_connection = 3;
        c.video.dir = Some(PathBuf::from("videos"));

        let opened: Rc<RefCell<Vec<PathBuf>>> = Rc::default();
        let seen = Rc::clone(&opened);
        let mut a = TaskAssembler::new(c, Box::new(BitmapFont))
            .unwrap()
            .with_sink_factory(Box::new(move |p: &Path| {
                seen.borrow_mut().push(p.to_path_buf());
                Box::new(InMemorySink::new()) as Box<dyn FrameSink>
            }));

        let t = a.generate().unwrap();
        assert_eq!(
            t.video(),
            Some(Path::new("videos/dot_to_dot_0000_ground_truth.mp4"))
        );
        assert_eq!(opened.borrow().len(), 1);
        let frames = t.frames().unwrap();
        let timing = SequenceTiming {
            hold_frames: 2,
            frames_per_connection: 3,
        };
        assert_eq!(frames.len(), expected_frame_count(5, timing));
        assert_eq!(&frames[0], t.initial_frame());
        assert_eq!(frames.last(), Some(t.final_frame()));
    }

    #[test]
    fn prompt_matches_config() {
        let mut a = TaskAssembler::new(cfg(4), Box::new(BitmapFont)).unwrap();
        let t = a.generate().unwrap();
        assert_eq!(t.domain(), "dot_to_dot");
        assert_eq!(t.connection(), ConnectionMode::Sequential);
        assert!(t.prompt().contains("shows 5 circular objects"));
    }
}
