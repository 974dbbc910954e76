//! Error types.
//!
//! Only setup and control paths return errors. The real-time callback never
//! fails: missing data degrades to silence and is counted instead.

use std::path::PathBuf;

/// Result alias carrying the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is outside its allowed range.
    #[error("invalid config: {field} = {value} (expected {expected})")]
    InvalidConfig {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Nodes were added to a signal chain in an order that would hide the
    /// unfiltered signal from the tap.
    #[error("signal chain order: {0}")]
    ChainOrder(&'static str),

    #[error("spectrum transform failed: {0}")]
    Fft(#[from] realfft::FftError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),
}

/// Errors raised by the render side of the block exchange.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge used before configure()")]
    NotConfigured,

    #[error("configure() may only run once per session")]
    AlreadyConfigured,

    #[error("pull request for {frames} frames (expected 1..={max})")]
    InvalidPull { frames: usize, max: usize },

    #[error("render engine failed {failures} times in a row: {last}")]
    EngineFailed { failures: u32, last: RenderError },

    #[error("render engine panicked")]
    EnginePanicked,

    #[error("failed to spawn bridge thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("bridge thread panicked")]
    ThreadPanicked,
}

/// Failure reported by a [`RenderEngine`](crate::RenderEngine).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("engine not initialised")]
    NotInitialised,

    #[error("{0}")]
    Message(String),
}

impl RenderError {
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

#[cfg(feature = "cpal_sink")]
mod cpal_errors {
    use super::Error;

    macro_rules! device_error {
        ($($ty:ty),* $(,)?) => {
            $(
                impl From<$ty> for Error {
                    fn from(err: $ty) -> Self {
                        Error::Device(err.to_string())
                    }
                }
            )*
        };
    }

    device_error!(
        cpal::DevicesError,
        cpal::DeviceNameError,
        cpal::SupportedStreamConfigsError,
        cpal::DefaultStreamConfigError,
        cpal::BuildStreamError,
        cpal::PlayStreamError,
        cpal::PauseStreamError,
    );
}
