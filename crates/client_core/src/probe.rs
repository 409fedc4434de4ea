use std::{io::Cursor, time::Duration};

use symphonia::core::{
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use thiserror::Error;

use crate::media::MediaFile;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe: {0}")]
    Format(String),
    #[error("no decodable track found")]
    NoTrack,
    #[error("track does not declare its length")]
    UnknownLength,
}

pub trait DurationProbe: Send + Sync {
    fn probe(&self, file: &MediaFile) -> Result<Duration, ProbeError>;
}

/// Reads container headers with symphonia; nothing is decoded.
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn probe(&self, file: &MediaFile) -> Result<Duration, ProbeError> {
        let cursor = Cursor::new(file.data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = file.extension() {
            hint.with_extension(&ext);
        }
        if let Some(mime) = file.mime_type.as_deref() {
            hint.mime_type(mime);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProbeError::Format(e.to_string()))?;

        let track = probed.format.default_track().ok_or(ProbeError::NoTrack)?;
        let params = &track.codec_params;
        let frames = params.n_frames.ok_or(ProbeError::UnknownLength)?;

        if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(frames);
            return Ok(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac));
        }
        match params.sample_rate {
            Some(rate) if rate > 0 => Ok(Duration::from_secs_f64(frames as f64 / rate as f64)),
            _ => Err(ProbeError::UnknownLength),
        }
    }
}

/// Always reports the same duration. Useful where no real media is at hand.
pub struct FixedDurationProbe(pub Duration);

impl DurationProbe for FixedDurationProbe {
    fn probe(&self, _file: &MediaFile) -> Result<Duration, ProbeError> {
        Ok(self.0)
    }
}
