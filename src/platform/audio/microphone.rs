// Live microphone capture through cpal
// The cpal stream is not Send on every host, so it lives on its own thread
// until the track is stopped.

use super::PcmAudioTrack;
use crate::models::audio::SpectrumSnapshot;
use crate::models::error::{ProctorError, ProctorResult};
use crate::platform::media::AudioTrack;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

/// An input device as reported by the default host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInputDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Microphone track backed by the system input device
pub struct MicrophoneTrack {
    pcm: Arc<PcmAudioTrack>,
    device_name: String,
    sample_rate: u32,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl MicrophoneTrack {
    /// Enumerate all input devices
    pub fn enumerate_devices() -> ProctorResult<Vec<AudioInputDevice>> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let input_devices = host
            .input_devices()
            .map_err(|e| ProctorError::CaptureFailed(format!("Failed to enumerate input devices: {}", e)))?;

        let mut devices = Vec::new();
        for device in input_devices {
            let name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());
            let Ok(config) = device.default_input_config() else {
                tracing::debug!(device = %name, "Skipping input device without a default config");
                continue;
            };

            devices.push(AudioInputDevice {
                id: name.clone(),
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                sample_rate: config.sample_rate().0,
                channels: config.channels(),
            });
        }

        Ok(devices)
    }

    /// Open a device by id (`"default"` for the system default) and start capturing
    pub fn open(device_id: &str, fft_size: usize) -> ProctorResult<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<ProctorResult<(String, u32, Arc<PcmAudioTrack>)>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let device_id = device_id.to_string();

        std::thread::Builder::new()
            .name("proctor-mic".to_string())
            .spawn(move || {
                let stream = match build_stream(&device_id, fft_size) {
                    Ok((stream, name, rate, pcm)) => {
                        let _ = ready_tx.send(Ok((name, rate, pcm)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Either an explicit stop or the track being dropped ends capture
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        let (device_name, sample_rate, pcm) = ready_rx
            .recv()
            .map_err(|_| ProctorError::CaptureFailed("Microphone thread exited during setup".to_string()))??;

        tracing::info!(device = %device_name, sample_rate, fft_size, "Microphone capture started");

        Ok(Self {
            pcm,
            device_name,
            sample_rate,
            stop_tx: Mutex::new(Some(stop_tx)),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AudioTrack for MicrophoneTrack {
    fn spectrum(&self) -> Option<SpectrumSnapshot> {
        self.pcm.spectrum()
    }

    fn stop(&self) {
        self.pcm.stop();
        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            if let Some(tx) = stop_tx.take() {
                let _ = tx.send(());
                tracing::info!(device = %self.device_name, "Microphone capture stopped");
            }
        }
    }

    fn is_live(&self) -> bool {
        self.pcm.is_live()
    }
}

fn find_device(host: &cpal::Host, device_id: &str) -> ProctorResult<cpal::Device> {
    if device_id == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| ProctorError::CaptureFailed("No default input device".to_string()));
    }

    let mut devices = host
        .input_devices()
        .map_err(|e| ProctorError::CaptureFailed(format!("Failed to enumerate devices: {}", e)))?;

    devices
        .find(|d| d.name().map(|n| n == device_id).unwrap_or(false))
        .ok_or_else(|| ProctorError::CaptureFailed(format!("Device not found: {}", device_id)))
}

fn build_stream(
    device_id: &str,
    fft_size: usize,
) -> ProctorResult<(cpal::Stream, String, u32, Arc<PcmAudioTrack>)> {
    let host = cpal::default_host();
    let device = find_device(&host, device_id)?;
    let name = device.name().unwrap_or_else(|_| device_id.to_string());

    let supported = device
        .default_input_config()
        .map_err(|e| ProctorError::CaptureFailed(format!("Failed to get config: {}", e)))?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    let pcm = Arc::new(PcmAudioTrack::new(fft_size, sample_rate));

    let stream = match sample_format {
        cpal::SampleFormat::F32 => input_stream::<f32>(&device, &config, channels, Arc::clone(&pcm)),
        cpal::SampleFormat::I16 => input_stream::<i16>(&device, &config, channels, Arc::clone(&pcm)),
        cpal::SampleFormat::U16 => input_stream::<u16>(&device, &config, channels, Arc::clone(&pcm)),
        other => Err(ProctorError::CaptureFailed(format!(
            "Unsupported sample format: {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| ProctorError::CaptureFailed(format!("Failed to start stream: {}", e)))?;

    Ok((stream, name, sample_rate, pcm))
}

fn input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    pcm: Arc<PcmAudioTrack>,
) -> ProctorResult<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
                pcm.push_interleaved(&samples, channels);
            },
            |e| tracing::warn!(error = %e, "Microphone stream error"),
            None,
        )
        .map_err(|e| ProctorError::CaptureFailed(format!("Failed to build input stream: {}", e)))
}
