//! Audio layer: source enumeration and capture into mono 16-bit PCM.
//!
//! # Pipeline
//!
//! ```text
//! Device (native format) → cpal callback → convert_frames (mono 16-bit LE)
//!                        → PcmChunk (bounded mpsc) → recognition transport
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use live_captions::audio::{spawn_capture, AudioDeviceCatalog};
//!
//! let devices = AudioDeviceCatalog::enumerate();
//! let descriptor = devices.first().cloned().unwrap();
//!
//! let (mut handle, mut rx) = spawn_capture(&descriptor).unwrap();
//! while let Some(chunk) = rx.blocking_recv() {
//!     println!("received {} bytes @ {}Hz", chunk.bytes.len(), chunk.sample_rate);
//! }
//! handle.stop();
//! ```

pub mod bridge;
pub mod catalog;
pub mod convert;

pub use bridge::{
    spawn_capture, AudioCaptureBridge, CaptureError, CaptureHandle, PcmChunk,
    PCM_CHANNEL_CAPACITY,
};
pub use catalog::{AudioDeviceCatalog, AudioDeviceDescriptor, DeviceDirection};
pub use convert::{convert_frames, read_sample, FrameFormat, SampleEncoding};
