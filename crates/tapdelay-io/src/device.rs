//! Output device enumeration and lookup.

use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

/// Sample rate reported when a device has no default configuration.
const FALLBACK_SAMPLE_RATE: u32 = 48000;

/// Extract device name via `description()` (cpal 0.17+).
pub(crate) fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// An output device as shown by `tapdelay devices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDevice {
    /// Position in the host's output device list; accepted as a device id.
    pub index: usize,
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
    /// Whether this is the host's default output.
    pub is_default: bool,
}

/// List the default host's output devices.
pub fn list_output_devices() -> Result<Vec<OutputDevice>> {
    let host = cpal::default_host();
    let default_name = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());

    let devices = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;

    Ok(devices
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device_name(&device).ok()?;
            let default_sample_rate = device
                .default_output_config()
                .map(|c| c.sample_rate())
                .unwrap_or(FALLBACK_SAMPLE_RATE);
            Some(OutputDevice {
                index,
                is_default: default_name.as_deref() == Some(name.as_str()),
                name,
                default_sample_rate,
            })
        })
        .collect())
}

/// Resolve a device id: `default`, a list index, an exact name, or a
/// case-insensitive partial name.
pub fn find_output_device(id: &str) -> Result<Device> {
    let host = cpal::default_host();
    if id.eq_ignore_ascii_case("default") {
        return host.default_output_device().ok_or(Error::NoDevice);
    }

    let devices: Vec<Device> = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();
    let names: Vec<Option<String>> = devices.iter().map(|d| device_name(d).ok()).collect();

    let index = match_device(&names, id)?;
    Ok(devices[index].clone())
}

/// Pick an entry from `names` by index, exact name, then partial match.
fn match_device(names: &[Option<String>], id: &str) -> Result<usize> {
    if let Ok(index) = id.parse::<usize>() {
        return if index < names.len() {
            Ok(index)
        } else {
            Err(Error::DeviceNotFound(format!(
                "output device index {} (only {} devices available)",
                index,
                names.len()
            )))
        };
    }

    if let Some(index) = names.iter().position(|n| n.as_deref() == Some(id)) {
        return Ok(index);
    }

    let needle = id.to_lowercase();
    let matches: Vec<(usize, &str)> = names
        .iter()
        .enumerate()
        .filter_map(|(i, n)| {
            n.as_deref()
                .filter(|name| name.to_lowercase().contains(&needle))
                .map(|name| (i, name))
        })
        .collect();

    match matches.as_slice() {
        [] => Err(Error::DeviceNotFound(format!(
            "no output device matching '{id}'"
        ))),
        [(index, _)] => Ok(*index),
        [(index, first), ..] => {
            let candidates: Vec<&str> = matches.iter().map(|(_, n)| *n).collect();
            tracing::warn!(
                query = id,
                ?candidates,
                chosen = first,
                "device id matches several output devices, using the first"
            );
            Ok(*index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<Option<String>> {
        list.iter().map(|n| Some((*n).to_string())).collect()
    }

    #[test]
    fn matches_by_index() {
        let list = names(&["hw:0", "USB Audio"]);
        assert_eq!(match_device(&list, "1").unwrap(), 1);
        assert!(matches!(
            match_device(&list, "2"),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn exact_name_beats_partial() {
        let list = names(&["USB Audio Pro", "USB Audio"]);
        assert_eq!(match_device(&list, "USB Audio").unwrap(), 1);
    }

    #[test]
    fn partial_match_is_case_insensitive() {
        let list = names(&["HDA Intel PCH", "USB Audio"]);
        assert_eq!(match_device(&list, "usb").unwrap(), 1);
    }

    #[test]
    fn ambiguous_partial_takes_first() {
        let list = names(&["USB Audio A", "USB Audio B"]);
        assert_eq!(match_device(&list, "audio").unwrap(), 0);
    }

    #[test]
    fn unnamed_devices_are_skipped() {
        let list = vec![None, Some("Speakers".to_string())];
        assert_eq!(match_device(&list, "speak").unwrap(), 1);
        assert!(match_device(&list, "mic").is_err());
    }

    #[test]
    fn listing_does_not_panic() {
        // Device availability depends on the system.
        let _ = list_output_devices();
    }
}
