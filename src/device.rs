//! Output device discovery and stream construction.
//!
//! ```no_run
//! use muso::OutputDevice;
//!
//! for device in OutputDevice::list_outputs() {
//!     println!("{} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
//! }
//! ```

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use tracing::{debug, error};

use crate::driver::QuantumDriver;
use crate::error::{Error, Result};

/// A discovered audio output device with its default configuration.
pub struct OutputDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    name: String,
}

impl OutputDevice {
    /// The host's default output device.
    pub fn default_output() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoOutputDevice)?;
        Self::from_device(device)
    }

    /// Every output device that reports a usable default configuration.
    pub fn list_outputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.output_devices()
            .map(|devices| devices.filter_map(|d| Self::from_device(d).ok()).collect())
            .unwrap_or_default()
    }

    /// The first output device whose name contains `pattern`.
    pub fn find(pattern: &str) -> Result<Self> {
        Self::list_outputs()
            .into_iter()
            .find(|d| d.name.contains(pattern))
            .ok_or(Error::NoOutputDevice)
    }

    fn from_device(device: cpal::Device) -> Result<Self> {
        let config = device.default_output_config()?;
        let name = device.name().unwrap_or_else(|_| String::from("<unnamed>"));
        Ok(Self {
            device,
            config,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.config.sample_format()
    }

    /// Build a paused output stream whose callback is driven by `driver`.
    pub fn build_stream(&self, driver: QuantumDriver) -> Result<cpal::Stream> {
        let stream_config = self.config.config();
        debug!(
            device = %self.name,
            sample_rate = stream_config.sample_rate.0,
            channels = stream_config.channels,
            format = ?self.sample_format(),
            "building output stream"
        );

        match self.sample_format() {
            SampleFormat::F32 => build::<f32>(&self.device, &stream_config, driver),
            SampleFormat::I16 => build::<i16>(&self.device, &stream_config, driver),
            SampleFormat::U16 => build::<u16>(&self.device, &stream_config, driver),
            other => Err(Error::UnsupportedSampleFormat(format!("{other:?}"))),
        }
    }
}

fn build<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut driver: QuantumDriver,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = stream_config.channels as usize;
    let stream = device.build_output_stream(
        stream_config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            driver.fill_with(data, channels, |s| T::from_sample(s.clamp(-1.0, 1.0)));
        },
        |err| error!(%err, "output stream error"),
        None,
    )?;
    Ok(stream)
}
