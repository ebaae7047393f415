use crate::{
    foundation::{core::Point, error::DotlinkResult},
    order::VisitOrder,
    render::{
        FrameRGBA,
        compositor::{FrameCompositor, PartialConnection},
    },
};

/// Timing of the connection animation, in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SequenceTiming {
    /// Copies of the initial and of the final frame at each end.
    pub hold_frames: usize,
    /// Frames spent growing each connection. Zero is treated as one.
    pub frames_per_connection: usize,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            hold_frames: 5,
            frames_per_connection: 15,
        }
    }
}

/// `2 * hold + connections * per_connection` for an `n`-point task.
pub fn expected_frame_count(n: usize, timing: SequenceTiming) -> usize {
    2 * timing.hold_frames + n.saturating_sub(1) * timing.frames_per_connection.max(1)
}

/// Progress of frame `i` out of `frames` for one connection: `0.0` first, `1.0` last.
pub fn connection_progress(i: usize, frames: usize) -> f64 {
    if frames <= 1 {
        1.0
    } else {
        i as f64 / (frames - 1) as f64
    }
}

/// Render the full animation eagerly.
///
/// Hold on the initial frame, grow each connection in order while earlier ones stay drawn,
/// then hold on the final frame.
pub fn build_sequence(
    compositor: &mut FrameCompositor,
    points: &[Point],
    order: &VisitOrder,
    timing: SequenceTiming,
) -> DotlinkResult<Vec<FrameRGBA>> {
    let per = timing.frames_per_connection.max(1);
    let mut frames = Vec::with_capacity(expected_frame_count(points.len(), timing));

    let initial = compositor.render_initial(points, order)?;
    frames.extend(std::iter::repeat_n(initial, timing.hold_frames));

    for k in 0..order.connection_count() {
        for i in 0..per {
            let partial = PartialConnection {
                index: k,
                progress: connection_progress(i, per),
            };
            frames.push(compositor.render_frame(points, order, k, Some(partial))?);
        }
    }

    let last = compositor.render_final(points, order)?;
    frames.extend(std::iter::repeat_n(last, timing.hold_frames));

    tracing::debug!(
        frames = frames.len(),
        connections = order.connection_count(),
        "built connection sequence"
    );
    Ok(frames)
}
