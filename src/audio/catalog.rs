//! Audio input source enumeration.
//!
//! [`AudioDeviceCatalog::enumerate`] builds the selectable source list: a
//! synthetic system-default entry first, then real capture devices, then
//! render devices offered as loopback sources.  A device class that fails to
//! enumerate is skipped with a warning instead of failing the whole call, so
//! the list degrades to "default only" in the worst case.
//!
//! Each call produces a fresh snapshot; descriptors from an older snapshot
//! stay valid as values but their positions must not be reused against a new
//! list.

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DeviceDirection
// ---------------------------------------------------------------------------

/// Which side of the audio stack a descriptor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceDirection {
    /// A capture endpoint (microphone, line-in).
    Capture,
    /// A render endpoint opened for loopback capture of whatever it plays.
    RenderLoopback,
}

// ---------------------------------------------------------------------------
// AudioDeviceDescriptor
// ---------------------------------------------------------------------------

/// One selectable audio source.
///
/// `id` is `None` for the synthetic system-default entry; otherwise it is
/// `capture:{name}` or `loopback:{name}` where `{name}` is the cpal device
/// name the bridge later resolves.  The label is the operator-facing text
/// shown in a source picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDeviceDescriptor {
    /// Opaque source id, `None` = system default input.
    pub id: Option<String>,
    /// Human-readable label.
    pub label: String,
    /// Capture or render-loopback.
    pub direction: DeviceDirection,
}

impl AudioDeviceDescriptor {
    /// The synthetic "system default input" entry that heads every catalog.
    pub fn default_input() -> Self {
        Self {
            id: None,
            label: "Entrada padrão (microfone)".into(),
            direction: DeviceDirection::Capture,
        }
    }

    /// Descriptor for a named capture device.
    pub fn capture(name: &str) -> Self {
        Self {
            id: Some(format!("capture:{name}")),
            label: format!("Entrada: {name}"),
            direction: DeviceDirection::Capture,
        }
    }

    /// Descriptor for a named render device exposed as a loopback source.
    pub fn loopback(name: &str) -> Self {
        Self {
            id: Some(format!("loopback:{name}")),
            label: format!("Saída (captura): {name}"),
            direction: DeviceDirection::RenderLoopback,
        }
    }

    /// `true` for the synthetic system-default entry.
    pub fn is_default(&self) -> bool {
        self.id.is_none()
    }

    /// The cpal device name embedded in the id, if any.
    pub fn device_name(&self) -> Option<&str> {
        let id = self.id.as_deref()?;
        id.strip_prefix("capture:")
            .or_else(|| id.strip_prefix("loopback:"))
    }

    /// Short source description used in status lines.
    pub fn source_label(&self) -> &str {
        if self.is_default() {
            "entrada padrão"
        } else {
            &self.label
        }
    }
}

// ---------------------------------------------------------------------------
// AudioDeviceCatalog
// ---------------------------------------------------------------------------

/// Enumerates selectable audio sources on the default host.
pub struct AudioDeviceCatalog;

impl AudioDeviceCatalog {
    /// Build the ordered source list.
    ///
    /// Order: default entry, capture devices sorted case-insensitively by
    /// name, render devices (as loopback options) sorted the same way.
    /// Devices that cannot report a name are skipped; a class whose
    /// enumeration fails contributes nothing.
    pub fn enumerate() -> Vec<AudioDeviceDescriptor> {
        let host = cpal::default_host();
        let mut options = vec![AudioDeviceDescriptor::default_input()];

        match host.input_devices() {
            Ok(devices) => {
                for name in sorted_names(devices.filter_map(|d| d.name().ok())) {
                    options.push(AudioDeviceDescriptor::capture(&name));
                }
            }
            Err(e) => log::warn!("capture device enumeration failed: {e}"),
        }

        match host.output_devices() {
            Ok(devices) => {
                for name in sorted_names(devices.filter_map(|d| d.name().ok())) {
                    options.push(AudioDeviceDescriptor::loopback(&name));
                }
            }
            Err(e) => log::warn!("render device enumeration failed: {e}"),
        }

        log::info!("audio catalog: {} source option(s)", options.len());
        options
    }
}

/// Sort device names case-insensitively, preserving arrival order for ties.
fn sorted_names(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.collect();
    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
    names
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
