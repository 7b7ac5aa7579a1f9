//! Host interface discovery and the set of interfaces under watch.

use std::net::{IpAddr, Ipv4Addr};

use parking_lot::RwLock;
use pcap::Device;
use serde::Serialize;

use crate::error::{CaptureError, ConfigError};

/// A network interface present on the host, with its bound addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterface {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

impl HostInterface {
    pub fn new(name: impl Into<String>, addresses: Vec<IpAddr>) -> Self {
        Self {
            name: name.into(),
            addresses,
        }
    }

    /// First IPv4 address bound to the interface.
    pub fn local_ipv4(&self) -> Option<Ipv4Addr> {
        self.addresses.iter().find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
    }
}

impl From<Device> for HostInterface {
    fn from(device: Device) -> Self {
        let addresses = device.addresses.iter().map(|a| a.addr).collect();
        HostInterface::new(device.name, addresses)
    }
}

/// Lists every capture-capable device on the host.
pub fn host_interfaces() -> Result<Vec<HostInterface>, CaptureError> {
    let devices = Device::list().map_err(CaptureError::Listing)?;
    Ok(devices.into_iter().map(HostInterface::from).collect())
}

/// Keeps the host interfaces whose name exactly matches a requested name.
/// Fails when nothing matches.
pub fn resolve(
    requested: &[String],
    available: Vec<HostInterface>,
) -> Result<Vec<HostInterface>, ConfigError> {
    if requested.is_empty() {
        return Err(ConfigError::NoInterfacesRequested);
    }

    let selected: Vec<_> = available
        .into_iter()
        .filter(|iface| requested.iter().any(|name| *name == iface.name))
        .collect();

    if selected.is_empty() {
        return Err(ConfigError::NoMatchingInterfaces {
            requested: requested.to_vec(),
        });
    }
    Ok(selected)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchedInterface {
    pub name: String,
    pub address: Ipv4Addr,
}

/// Interfaces with a running Watcher, in the order they started.
#[derive(Debug, Default)]
pub struct InterfaceSet {
    entries: RwLock<Vec<WatchedInterface>>,
}

impl InterfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, name: impl Into<String>, address: Ipv4Addr) {
        self.entries.write().push(WatchedInterface {
            name: name.into(),
            address,
        });
    }

    pub fn snapshot(&self) -> Vec<WatchedInterface> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
