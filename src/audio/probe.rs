use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to probe format of {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("no audio track in {0}")]
    NoTrack(PathBuf),

    #[error("duration of {0} is not recorded in the container")]
    UnknownDuration(PathBuf),
}

/// Reports the total playing time of an audio clip
pub trait DurationProbe {
    /// Duration in seconds
    fn duration(&self, path: &Path) -> Result<f64, AudioError>;
}

/// Reads the duration from container metadata via symphonia
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn duration(&self, path: &Path) -> Result<f64, AudioError> {
        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Probe {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::NoTrack(path.to_path_buf()))?;

        let params = &track.codec_params;
        let n_frames = params
            .n_frames
            .ok_or_else(|| AudioError::UnknownDuration(path.to_path_buf()))?;

        let seconds = if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(n_frames);
            time.seconds as f64 + time.frac
        } else {
            let sample_rate = params
                .sample_rate
                .ok_or_else(|| AudioError::UnknownDuration(path.to_path_buf()))?;
            n_frames as f64 / sample_rate as f64
        };

        debug!("Probed {}: {:.3}s", path.display(), seconds);
        Ok(seconds)
    }
}

/// A duration known up front (CLI override, tests)
#[derive(Debug, Clone, Copy)]
pub struct FixedDuration(pub f64);

impl DurationProbe for FixedDuration {
    fn duration(&self, _path: &Path) -> Result<f64, AudioError> {
        Ok(self.0)
    }
}
