//! Device capture via `cpal`: native frames in, mono 16-bit PCM out.
//!
//! [`AudioCaptureBridge`] wraps the cpal host/device/stream lifecycle for one
//! [`AudioDeviceDescriptor`].  Its callback converts every native buffer with
//! [`convert_frames`](super::convert::convert_frames) and pushes the result
//! into a bounded channel with `try_send`; a full channel drops the chunk and
//! bumps a counter instead of stalling the audio thread.
//!
//! `cpal::Stream` is not `Send`, so the bridge itself must stay on one
//! thread.  [`spawn_capture`] runs it on a dedicated capture thread and
//! returns a [`CaptureHandle`] that is safe to hold inside async tasks.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use thiserror::Error;
use tokio::sync::mpsc;

use super::catalog::{AudioDeviceDescriptor, DeviceDirection};
use super::convert::{convert_frames, FrameFormat, SampleEncoding};

/// Capacity of the bounded PCM chunk channel.
pub const PCM_CHANNEL_CAPACITY: usize = 64;

/// How often the capture thread checks its stop flag and stream health.
const CAPTURE_POLL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// PcmChunk
// ---------------------------------------------------------------------------

/// One converted block of mono 16-bit little-endian PCM.
///
/// Ownership transfers to the recognition transport on push.
#[derive(Debug, Clone)]
pub struct PcmChunk {
    /// Little-endian sample bytes, two per sample.
    pub bytes: Vec<u8>,
    /// Source sample rate in Hz (the device's native rate).
    pub sample_rate: u32,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while resolving a device or running the capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no default input device on the audio host")]
    NoDefaultDevice,

    #[error("audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate audio devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    #[error("failed to query device config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to spawn capture thread: {0}")]
    SpawnThread(#[from] std::io::Error),

    #[error("capture thread ended before the stream started")]
    ThreadExited,
}

// ---------------------------------------------------------------------------
// AudioCaptureBridge
// ---------------------------------------------------------------------------

/// Single-device capture bridge.
///
/// For [`DeviceDirection::RenderLoopback`] descriptors the bridge binds an
/// *input* stream to an *output* device, which on WASAPI yields loopback
/// capture of whatever that endpoint is playing.  The stream runs at the
/// device's native rate and format; conversion to mono 16-bit PCM happens in
/// the callback.
pub struct AudioCaptureBridge {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: SampleFormat,
    format: FrameFormat,
    stream: Option<cpal::Stream>,
    dropped: Arc<AtomicUsize>,
    failure: Arc<Mutex<Option<String>>>,
}

impl AudioCaptureBridge {
    /// Resolve `descriptor` to a concrete device and its native format.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDefaultDevice`] when the default entry is selected
    /// but the host has no default input; [`CaptureError::DeviceNotFound`]
    /// when a named device is gone (stale descriptor);
    /// [`CaptureError::UnsupportedFormat`] when the device's sample format is
    /// none of f32 / i16 / i32.
    pub fn open(descriptor: &AudioDeviceDescriptor) -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = match descriptor.device_name() {
            None => host
                .default_input_device()
                .ok_or(CaptureError::NoDefaultDevice)?,
            Some(name) => {
                let mut devices = match descriptor.direction {
                    DeviceDirection::Capture => host.input_devices()?,
                    DeviceDirection::RenderLoopback => host.output_devices()?,
                };
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?
            }
        };

        let supported = match descriptor.direction {
            DeviceDirection::Capture => device.default_input_config()?,
            DeviceDirection::RenderLoopback => device.default_output_config()?,
        };

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let format = frame_format(&config, sample_format)?;

        log::info!(
            "capture source '{}': {} Hz, {} ch, {:?}",
            descriptor.label,
            format.sample_rate,
            format.channels,
            sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            format,
            stream: None,
            dropped: Arc::new(AtomicUsize::new(0)),
            failure: Arc::new(Mutex::new(None)),
        })
    }

    /// Begin delivering converted PCM chunks to `tx`.
    ///
    /// A previous stream, if any, is stopped first.  The callback never
    /// blocks: when `tx` is full the chunk is dropped and counted.
    ///
    /// # Errors
    ///
    /// [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`] if the
    /// platform rejects the stream configuration.
    pub fn start(&mut self, tx: mpsc::Sender<PcmChunk>) -> Result<(), CaptureError> {
        self.stop();

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream(tx, |data: &[f32]| {
                let mut bytes = Vec::with_capacity(data.len() * 4);
                for s in data {
                    bytes.extend_from_slice(&s.to_le_bytes());
                }
                bytes
            })?,
            SampleFormat::I16 => self.build_stream(tx, |data: &[i16]| {
                let mut bytes = Vec::with_capacity(data.len() * 2);
                for s in data {
                    bytes.extend_from_slice(&s.to_le_bytes());
                }
                bytes
            })?,
            SampleFormat::I32 => self.build_stream(tx, |data: &[i32]| {
                let mut bytes = Vec::with_capacity(data.len() * 4);
                for s in data {
                    bytes.extend_from_slice(&s.to_le_bytes());
                }
                bytes
            })?,
            other => return Err(CaptureError::UnsupportedFormat(other)),
        };

        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop the capture stream.  Safe to call before `start` and idempotent.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("capture stream stopped");
        }
    }

    /// Native format the device delivers.
    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Native sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    /// Chunks dropped because the transport could not keep up.
    pub fn dropped_chunks(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// First stream error observed by the error callback, if any.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().unwrap().clone()
    }

    fn build_stream<T, F>(
        &self,
        tx: mpsc::Sender<PcmChunk>,
        to_bytes: F,
    ) -> Result<cpal::Stream, CaptureError>
    where
        T: cpal::SizedSample + Send + 'static,
        F: Fn(&[T]) -> Vec<u8> + Send + 'static,
    {
        let format = self.format;
        let dropped = Arc::clone(&self.dropped);
        let failure = Arc::clone(&self.failure);

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let native = to_bytes(data);
                let pcm = convert_frames(&native, &format);
                if pcm.is_empty() {
                    return;
                }
                let chunk = PcmChunk {
                    bytes: pcm,
                    sample_rate: format.sample_rate,
                };
                match tx.try_send(chunk) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    // Receiver gone; the run is shutting down.
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            },
            move |err: cpal::StreamError| {
                log::error!("capture stream error: {err}");
                let mut slot = failure.lock().unwrap();
                if slot.is_none() {
                    *slot = Some(err.to_string());
                }
            },
            None, // no timeout
        )?;

        Ok(stream)
    }
}

/// Map a cpal stream config to the converter's [`FrameFormat`].
fn frame_format(
    config: &cpal::StreamConfig,
    sample_format: SampleFormat,
) -> Result<FrameFormat, CaptureError> {
    let (encoding, bits_per_sample) = match sample_format {
        SampleFormat::F32 => (SampleEncoding::IeeeFloat, 32),
        SampleFormat::I16 => (SampleEncoding::Pcm, 16),
        SampleFormat::I32 => (SampleEncoding::Pcm, 32),
        other => return Err(CaptureError::UnsupportedFormat(other)),
    };

    Ok(FrameFormat {
        sample_rate: config.sample_rate.0,
        bits_per_sample,
        channels: config.channels,
        encoding,
    })
}

// ---------------------------------------------------------------------------
// CaptureHandle / spawn_capture
// ---------------------------------------------------------------------------

/// Handle to a capture running on its own thread.
///
/// Unlike the bridge it is `Send`, so async tasks can own it.  Dropping the
/// handle stops the capture.
pub struct CaptureHandle {
    stop: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<String>>>,
    dropped: Arc<AtomicUsize>,
    sample_rate: u32,
    join: Option<std::thread::JoinHandle<()>>,
}

impl CaptureHandle {
    /// Native sample rate of the running capture in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// First stream error observed since the capture started, if any.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().unwrap().clone()
    }

    /// Chunks dropped because the transport could not keep up.
    pub fn dropped_chunks(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the capture thread and wait for the device to release.
    ///
    /// Idempotent; also runs on drop.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
impl CaptureHandle {
    /// Handle whose thread only waits on the stop flag, standing in for a
    /// device in wiring tests.
    pub(crate) fn without_device(sample_rate: u32) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let join = std::thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(5));
            }
        });
        Self {
            stop,
            failure: Arc::new(Mutex::new(None)),
            dropped: Arc::new(AtomicUsize::new(0)),
            sample_rate,
            join: Some(join),
        }
    }

    /// Record a stream error the way the capture error callback would.
    pub(crate) fn inject_failure(&self, details: &str) {
        let mut slot = self.failure.lock().unwrap();
        if slot.is_none() {
            *slot = Some(details.to_string());
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open `descriptor` and start capturing on a dedicated thread.
///
/// Blocks until the device is open and the stream is playing, then returns
/// the handle plus the receiving end of the PCM stream.  The thread keeps the
/// stream alive, watches for stream errors, and releases the device when the
/// handle is stopped or dropped.
///
/// # Errors
///
/// Any [`CaptureError`] from `open`/`start`, reported synchronously.
pub fn spawn_capture(
    descriptor: &AudioDeviceDescriptor,
) -> Result<(CaptureHandle, mpsc::Receiver<PcmChunk>), CaptureError> {
    let (pcm_tx, pcm_rx) = mpsc::channel(PCM_CHANNEL_CAPACITY);
    let (setup_tx, setup_rx) = std::sync::mpsc::channel();

    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let thread_descriptor = descriptor.clone();

    let join = std::thread::Builder::new()
        .name("audio-capture".into())
        .spawn(move || {
            let mut bridge = match AudioCaptureBridge::open(&thread_descriptor) {
                Ok(bridge) => bridge,
                Err(e) => {
                    let _ = setup_tx.send(Err(e));
                    return;
                }
            };
            if let Err(e) = bridge.start(pcm_tx) {
                let _ = setup_tx.send(Err(e));
                return;
            }

            let info = CaptureInfo {
                sample_rate: bridge.sample_rate(),
                failure: Arc::clone(&bridge.failure),
                dropped: Arc::clone(&bridge.dropped),
            };
            let _ = setup_tx.send(Ok(info));

            while !thread_stop.load(Ordering::Relaxed) {
                if bridge.failure().is_some() {
                    break;
                }
                std::thread::sleep(CAPTURE_POLL);
            }

            bridge.stop();
            let dropped = bridge.dropped_chunks();
            if dropped > 0 {
                log::warn!("capture dropped {dropped} chunk(s); transport fell behind");
            }
        })?;

    match setup_rx.recv() {
        Ok(Ok(info)) => Ok((
            CaptureHandle {
                stop,
                failure: info.failure,
                dropped: info.dropped,
                sample_rate: info.sample_rate,
                join: Some(join),
            },
            pcm_rx,
        )),
        Ok(Err(e)) => {
            let _ = join.join();
            Err(e)
        }
        Err(_) => {
            let _ = join.join();
            Err(CaptureError::ThreadExited)
        }
    }
}

/// Setup data the capture thread reports back once the stream is playing.
struct CaptureInfo {
    sample_rate: u32,
    failure: Arc<Mutex<Option<String>>>,
    dropped: Arc<AtomicUsize>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
