//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::resample::{downmix, resample};
use crate::audio::source::{CaptureSource, FrameSink};
use crate::defaults;
use crate::error::{Result, VoxError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA error messages that occur during audio backend probing.
/// These are harmless but confusing to users.
///
/// # Safety
/// This modifies environment variables which is safe when called before spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        std::env::set_var("JACK_NO_START_SERVER", "1");
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        std::env::set_var("ALSA_DEBUG", "0");
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if a device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input devices with filtering and recommendations.
///
/// # Returns
/// A vector of device names, with preferred devices marked with "\[recommended\]".
/// Filters out obviously unusable devices (surround channels, HDMI, etc.).
///
/// # Errors
/// Returns `VoxError::Capture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| VoxError::Capture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
///
/// Tries in order:
/// 1. PipeWire
/// 2. PulseAudio/Pulse
/// 3. System default
///
/// This ensures we respect GNOME's audio device selection.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| VoxError::DeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is owned by `CpalCapture`, which is accessed behind
/// `&mut self` from one thread at a time; stream methods never cross thread
/// boundaries.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real audio capture implementation using CPAL.
///
/// Captures mono f32 samples at the configured rate. Tries the preferred
/// format first (f32/target rate/mono), then falls back to the device's
/// default config with software conversion (channel downmix + resampling).
/// Each driver callback is copied into an owned frame before it is queued;
/// the driver reuses its buffer.
pub struct CpalCapture {
    device: cpal::Device,
    stream: Option<SendableStream>,
    callback_count: Arc<AtomicU64>,
    sample_rate: u32,
}

impl CpalCapture {
    /// Create a new CPAL capture source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the default input device.
    ///
    /// # Errors
    /// Returns `VoxError::DeviceNotFound` if the named device does not exist,
    /// or `VoxError::Capture` if enumeration fails. Stream setup failures
    /// surface later, from `open`.
    pub fn new(device_name: Option<&str>, sample_rate: u32) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host.input_devices().map_err(|e| VoxError::Capture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;

                let mut found_device = None;
                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        found_device = Some(dev);
                        break;
                    }
                }

                found_device.ok_or_else(|| VoxError::DeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                get_best_default_device()
            }
        })?;

        Ok(Self {
            device,
            stream: None,
            callback_count: Arc::new(AtomicU64::new(0)),
            sample_rate,
        })
    }

    /// Create a capture source at the default speech rate.
    pub fn with_default_rate(device_name: Option<&str>) -> Result<Self> {
        Self::new(device_name, defaults::SAMPLE_RATE)
    }

    /// Build the audio stream with the configured format.
    ///
    /// Tries in order:
    /// 1. f32/target rate/mono — preferred, zero-conversion path
    /// 2. Device default config — native rate/channels with software conversion
    ///
    /// Step 2 handles PipeWire setups where the ALSA compatibility layer
    /// accepts non-native configs but never fires the data callback.
    fn build_stream(&self, sink: &FrameSink) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            eprintln!("voxbridge: audio stream error: {}", err);
        };

        // f32/target/mono — PipeWire/PulseAudio convert transparently
        let frame_sink = sink.clone();
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                frame_sink.push(data.to_vec());
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        self.build_stream_native(sink)
    }

    /// Build a stream using the device's default/native config, with software
    /// channel downmix and resampling to the target rate.
    fn build_stream_native(&self, sink: &FrameSink) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| VoxError::Capture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;

        let stream_config: cpal::StreamConfig = default_config.clone().into();

        eprintln!(
            "voxbridge: using native audio format ({}ch/{}Hz/{:?}), converting in software",
            native_channels,
            native_rate,
            default_config.sample_format(),
        );

        let err_callback = |err| {
            eprintln!("voxbridge: audio stream error: {}", err);
        };

        let frame_sink = sink.clone();
        let counter = Arc::clone(&self.callback_count);

        match default_config.sample_format() {
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let mono = downmix(data, native_channels);
                        frame_sink.push(resample(&mono, native_rate, target_rate));
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| VoxError::Capture {
                    message: format!("Failed to build native f32 stream: {}", e),
                }),
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                        let mono = downmix(&float_data, native_channels);
                        frame_sink.push(resample(&mono, native_rate, target_rate));
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| VoxError::Capture {
                    message: format!("Failed to build native i16 stream: {}", e),
                }),
            fmt => Err(VoxError::Capture {
                message: format!(
                    "Unsupported native sample format: {:?}. \
                     Try specifying a device with --device.",
                    fmt
                ),
            }),
        }
    }
}

impl CaptureSource for CpalCapture {
    fn open(&mut self, sink: FrameSink) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already open
        }

        self.callback_count.store(0, Ordering::Relaxed);
        let stream = self.build_stream(&sink)?;
        stream.play().map_err(|e| VoxError::Capture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        // Wait briefly to check if the CPAL callback actually fires.
        // Some PipeWire-ALSA setups accept non-native configs but never deliver data.
        std::thread::sleep(std::time::Duration::from_millis(200));

        let final_stream = if self.callback_count.load(Ordering::Relaxed) == 0 {
            drop(stream);

            let native_stream = self.build_stream_native(&sink)?;
            native_stream.play().map_err(|e| VoxError::Capture {
                message: format!("Failed to start native audio stream: {}", e),
            })?;
            native_stream
        } else {
            stream
        };

        self.stream = Some(SendableStream(final_stream));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(sendable_stream) = self.stream.take() {
            sendable_stream.0.pause().map_err(|e| VoxError::Capture {
                message: format!("Failed to stop audio stream: {}", e),
            })?;
        }
        Ok(())
    }
}
