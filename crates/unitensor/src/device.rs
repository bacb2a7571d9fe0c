//! Execution device tags.

use std::fmt;

/// Where a tensor's blocks live.
///
/// Only the CPU backend is compiled in; CUDA devices exist as tags so that
/// device arguments round-trip, but moving data to one fails at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl Device {
    /// Whether a backend for this device is available in this build.
    pub fn is_registered(&self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(i) => write!(f, "cuda:{i}"),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}
