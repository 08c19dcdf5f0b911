//! Audio input capture using cpal
//!
//! Microphone capture feeding the sample queue with mono f64 samples at the
//! device's native rate.

use super::buffer::SampleProducer;
use crate::error::{AnalysisError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

/// Audio input device information
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Audio input stream
pub struct AudioInput {
    stream: Stream,
    device_info: AudioDeviceInfo,
}

impl AudioInput {
    /// Create audio input from default device
    ///
    /// # Arguments
    /// * `producer` - Queue producer for captured audio
    pub fn from_default_device(producer: SampleProducer) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AnalysisError::Capture("no audio input device found".into()))?;

        Self::from_device(device, producer)
    }

    /// Create audio input from specific device
    pub fn from_device(device: Device, mut producer: SampleProducer) -> Result<Self> {
        let name = device
            .name()
            .map_err(|e| AnalysisError::Capture(e.to_string()))?;

        let config = device
            .default_input_config()
            .map_err(|e| AnalysisError::Capture(e.to_string()))?;

        let device_info = AudioDeviceInfo {
            name,
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        };

        let channels = usize::from(device_info.channels.max(1));
        let stream_config: StreamConfig = config.into();

        // Reused across callbacks so the audio thread does not allocate
        let mut mono = Vec::new();

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Analysis has finished; the owner releases the stream
                    if !producer.is_open() {
                        return;
                    }
                    downmix_into(data, channels, &mut mono);
                    producer.push(&mono);
                },
                move |err| {
                    log::error!("Audio input error: {}", err);
                },
                None,
            )
            .map_err(|e| AnalysisError::Capture(e.to_string()))?;

        log::info!(
            "Opened input device '{}' at {} Hz, {} channel(s)",
            device_info.name,
            device_info.sample_rate,
            device_info.channels
        );

        Ok(Self {
            stream,
            device_info,
        })
    }

    /// Start capturing audio
    pub fn start(&self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| AnalysisError::Capture(e.to_string()))
    }

    /// Pause audio capture
    pub fn pause(&self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| AnalysisError::Capture(e.to_string()))
    }

    /// Get device information
    pub fn device_info(&self) -> &AudioDeviceInfo {
        &self.device_info
    }
}

/// Average interleaved frames into mono samples
///
/// A trailing partial frame is averaged over the channels it has.
pub(crate) fn downmix_into(data: &[f32], channels: usize, out: &mut Vec<f64>) {
    out.clear();
    let channels = channels.max(1);
    out.extend(data.chunks(channels).map(|frame| {
        frame.iter().map(|&s| f64::from(s)).sum::<f64>() / frame.len() as f64
    }));
}

/// List available audio input devices
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let device_iter = host
        .input_devices()
        .map_err(|e| AnalysisError::Capture(e.to_string()))?;

    for device in device_iter {
        if let Ok(name) = device.name() {
            if let Ok(config) = device.default_input_config() {
                devices.push(AudioDeviceInfo {
                    name,
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                });
            }
        }
    }

    Ok(devices)
}
