use crate::{
    foundation::error::{DotlinkError, DotlinkResult},
    render::FrameRGBA,
};

pub mod ffmpeg;
pub mod sink;

pub use sink::{FrameSink, InMemorySink, SinkConfig};

/// Output container for the connection video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Mp4,
    Webm,
}

impl VideoFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }
}

/// Push a materialized frame list through `sink` in order.
pub fn encode_frames(
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    frames: &[FrameRGBA],
) -> DotlinkResult<()> {
    if frames.is_empty() {
        return Err(DotlinkError::encode("refusing to encode an empty frame list"));
    }
    sink.begin(cfg)?;
    for (i, frame) in frames.iter().enumerate() {
        sink.push_frame(i as u64, frame)?;
    }
    sink.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, v: u8) -> FrameRGBA {
        FrameRGBA {
            width: w,
            height: h,
            data: vec![v; (w * h * 4) as usize],
            premultiplied: true,
        }
    }

    #[test]
    fn frames_arrive_in_order() {
        let frames = vec![solid(2, 2, 1), solid(2, 2, 2), solid(2, 2, 3)];
        let mut sink = InMemorySink::new();
        let cfg = SinkConfig {
            width: 2,
            height: 2,
            fps: 10,
        };
        encode_frames(&mut sink, cfg, &frames).unwrap();
        assert_eq!(sink.config(), Some(cfg));
        let got: Vec<u8> = sink.frames().iter().map(|(_, f)| f.data[0]).collect();
        assert_eq!(got, vec![1, 2, 3]);
        let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| *i).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }

    #[test]
    fn empty_list_is_an_encode_error() {
        let mut sink = InMemorySink::new();
        let cfg = SinkConfig {
            width: 2,
            height: 2,
            fps: 10,
        };
        assert!(matches!(
            encode_frames(&mut sink, cfg, &[]),
            Err(DotlinkError::Encode(_))
        ));
    }

    #[test]
    fn format_extensions() {
        assert_eq!(VideoFormat::Mp4.extension(), "mp4");
        assert_eq!(VideoFormat::Webm.extension(), "webm");
        assert_eq!(
            serde_json::from_str::<VideoFormat>("\"webm\"").unwrap(),
            VideoFormat::Webm
        );
    }
}
