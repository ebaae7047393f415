use std::{
    io::{Read as _, Write as _},
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
    thread::JoinHandle,
};

use crate::{
    encode::{
        VideoFormat,
        sink::{FrameSink, SinkConfig},
    },
    foundation::error::{DotlinkError, DotlinkResult},
    render::FrameRGBA,
};

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output video path. Missing parent directories are created in `begin`.
    pub out_path: PathBuf,
    /// Container and codec selection.
    pub format: VideoFormat,
    /// Overwrite an existing file (`-y`) instead of failing (`-n`).
    pub overwrite: bool,
    /// Straight-alpha color that transparent pixels are flattened onto.
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Overwriting options flattening onto opaque white.
    pub fn new(out_path: impl Into<PathBuf>, format: VideoFormat) -> Self {
        Self {
            out_path: out_path.into(),
            format,
            overwrite: true,
            bg_rgba: [255, 255, 255, 255],
        }
    }
}

/// Whether `ffmpeg -version` runs successfully.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Create the parent directory of `path` (and its ancestors) if missing.
pub fn ensure_parent_dir(path: &Path) -> DotlinkResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Validate stream parameters before spawning the encoder.
///
/// Requires non-zero even dimensions and a non-zero frame rate.
pub fn validate_sink_config(cfg: &SinkConfig) -> DotlinkResult<()> {
    if cfg.width == 0 || cfg.height == 0 {
        return Err(DotlinkError::validation(
            "encode width/height must be non-zero",
        ));
    }
    if cfg.fps == 0 {
        return Err(DotlinkError::validation("encode fps must be non-zero"));
    }
    if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
        // Both containers are written as yuv420p.
        return Err(DotlinkError::validation(
            "encode width/height must be even (required for yuv420p output)",
        ));
    }
    Ok(())
}

/// Sink that spawns the system `ffmpeg` and streams raw RGBA frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    cfg: Option<SinkConfig>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    last_idx: Option<u64>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            cfg: None,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            last_idx: None,
        }
    }

    /// Destination passed to ffmpeg.
    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }
}

fn codec_args(format: VideoFormat) -> &'static [&'static str] {
    match format {
        VideoFormat::Mp4 => &[
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ],
        VideoFormat::Webm => &[
            "-c:v",
            "libvpx-vp9",
            "-pix_fmt",
            "yuv420p",
            "-b:v",
            "0",
            "-crf",
            "32",
        ],
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> DotlinkResult<()> {
        validate_sink_config(&cfg)?;
        ensure_parent_dir(&self.opts.out_path)?;

        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(DotlinkError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(DotlinkError::encode(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
        ])
        .args(codec_args(self.opts.format))
        .arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            DotlinkError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DotlinkError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DotlinkError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        // Keep reading stderr while frames are written so a chatty ffmpeg cannot block on it.
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            fps = cfg.fps,
            "spawned ffmpeg"
        );

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        self.cfg = Some(cfg);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRGBA) -> DotlinkResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| DotlinkError::encode("push_frame called before begin"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(DotlinkError::encode(format!(
                "frame indices must increase (got {idx} after {last})"
            )));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(DotlinkError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(DotlinkError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.opts.bg_rgba,
        )?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(DotlinkError::encode("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            DotlinkError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.last_idx = Some(idx);
        Ok(())
    }

    fn end(&mut self) -> DotlinkResult<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Err(DotlinkError::encode("ffmpeg encoder was never started"));
        };
        self.cfg = None;

        let status = child.wait().map_err(|e| {
            DotlinkError::encode(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| DotlinkError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| DotlinkError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(DotlinkError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

// An encode abandoned between `begin` and `end` kills and reaps the child.
impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(%e, "ffmpeg already exited");
            }
            let _ = child.wait();
            tracing::warn!(out = %self.opts.out_path.display(), "ffmpeg encode abandoned");
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
    }
}

fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> DotlinkResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(DotlinkError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg_rgba[0]);
    let bg_g = u16::from(bg_rgba[1]);
    let bg_b = u16::from(bg_rgba[2]);

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        let (r, g, b) = if src_is_premul {
            (
                u16::from(s[0]) + mul_div255(bg_r, inv),
                u16::from(s[1]) + mul_div255(bg_g, inv),
                u16::from(s[2]) + mul_div255(bg_b, inv),
            )
        } else {
            (
                mul_div255(u16::from(s[0]), a) + mul_div255(bg_r, inv),
                mul_div255(u16::from(s[1]), a) + mul_div255(bg_g, inv),
                mul_div255(u16::from(s[2]), a) + mul_div255(bg_b, inv),
            )
        };

        d[0] = r.min(255) as u8;
        d[1] = g.min(255) as u8;
        d[2] = b.min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
