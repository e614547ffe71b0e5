use anyhow::{anyhow, Result};
use candle::Device;
use tracing::warn;

use crate::error::SentigateError;

/// Where the models should run, as requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    Auto,
    Cpu,
    Cuda(usize),
}

impl DevicePreference {
    pub fn parse(value: &str) -> Result<Self, SentigateError> {
        let trimmed = value.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.is_empty() || lower == "auto" {
            return Ok(Self::Auto);
        }
        if lower == "cpu" {
            return Ok(Self::Cpu);
        }
        let (kind, ordinal) = match lower.split_once(':') {
            Some((kind, ordinal)) => (kind, Some(ordinal)),
            None => (lower.as_str(), None),
        };
        if kind == "cuda" || kind == "gpu" {
            let ordinal = match ordinal {
                Some(part) => part.parse::<usize>().map_err(|_| SentigateError::InvalidConfig {
                    field: "device",
                    reason: format!("bad CUDA ordinal in '{trimmed}'"),
                })?,
                None => 0,
            };
            return Ok(Self::Cuda(ordinal));
        }
        Err(SentigateError::InvalidConfig {
            field: "device",
            reason: format!("expected auto, cpu or cuda[:N], got '{trimmed}'"),
        })
    }
}

pub fn build_device(pref: DevicePreference) -> Result<Device> {
    match pref {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda(ordinal) => Device::new_cuda(ordinal).map_err(|err| {
            anyhow!(
                "requested CUDA device {} but initialization failed ({err}). Build with the \
                 `cuda` feature and ensure CUDA libraries are available.",
                ordinal
            )
        }),
        DevicePreference::Auto => match Device::new_cuda(0) {
            Ok(device) => Ok(device),
            Err(err) => {
                warn!(error = %err, "CUDA unavailable, falling back to CPU");
                Ok(Device::Cpu)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_preferences() {
        assert_eq!(DevicePreference::parse("auto").unwrap(), DevicePreference::Auto);
        assert_eq!(DevicePreference::parse("").unwrap(), DevicePreference::Auto);
        assert_eq!(DevicePreference::parse("CPU").unwrap(), DevicePreference::Cpu);
        assert_eq!(DevicePreference::parse("cuda").unwrap(), DevicePreference::Cuda(0));
        assert_eq!(DevicePreference::parse("cuda:1").unwrap(), DevicePreference::Cuda(1));
        assert_eq!(DevicePreference::parse("gpu:2").unwrap(), DevicePreference::Cuda(2));
    }

    #[test]
    fn rejects_unknown_devices() {
        assert!(DevicePreference::parse("tpu").is_err());
        assert!(DevicePreference::parse("cuda:x").is_err());
        assert!(DevicePreference::parse("cuda:").is_err());
        assert!(DevicePreference::parse("cudafoo").is_err());
        assert!(DevicePreference::parse("gpuxyz").is_err());
        assert!(DevicePreference::parse("cpu:0").is_err());
    }

    #[test]
    fn cpu_always_builds() {
        assert!(build_device(DevicePreference::Cpu).unwrap().is_cpu());
    }
}
