use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Six byte hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// ARP payload as handed over by the capture layer, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawArp {
    pub operation: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

/// One decoded link-layer frame. `arp` is set only for Ethernet/IPv4 ARP payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub source: MacAddr,
    pub destination: MacAddr,
    pub ether_type: u16,
    pub arp: Option<RawArp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpOperation {
    Request,
    Reply,
}

impl ArpOperation {
    pub const REQUEST_CODE: u16 = 1;
    pub const REPLY_CODE: u16 = 2;
}

/// Which table an observation belongs to. Derived by the classifier, never stored on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficClass {
    Request,
    Reply,
    GratuitousRequest,
}

impl TrafficClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficClass::Request => "request",
            TrafficClass::Reply => "reply",
            TrafficClass::GratuitousRequest => "gratuitous_request",
        }
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional key: (A, B) and (B, A) are different entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub sender_ip: Ipv4Addr,
    pub target_ip: Ipv4Addr,
}

impl StoreKey {
    pub fn new(sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            sender_ip,
            target_ip,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sender_ip, self.target_ip)
    }
}

/// A classified ARP observation. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArpFrame {
    interface: String,
    operation: ArpOperation,
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_mac: MacAddr,
    target_ip: Ipv4Addr,
    observed_at: DateTime<Utc>,
}

impl ArpFrame {
    pub fn new(
        interface: impl Into<String>,
        operation: ArpOperation,
        raw: &RawArp,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            interface: interface.into(),
            operation,
            sender_mac: raw.sender_mac,
            sender_ip: raw.sender_ip,
            target_mac: raw.target_mac,
            target_ip: raw.target_ip,
            observed_at,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn operation(&self) -> ArpOperation {
        self.operation
    }

    pub fn sender_mac(&self) -> MacAddr {
        self.sender_mac
    }

    pub fn sender_ip(&self) -> Ipv4Addr {
        self.sender_ip
    }

    pub fn target_mac(&self) -> MacAddr {
        self.target_mac
    }

    pub fn target_ip(&self) -> Ipv4Addr {
        self.target_ip
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn key(&self) -> StoreKey {
        StoreKey::new(self.sender_ip, self.target_ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_display_is_lowercase_colon_separated() {
        let mac = MacAddr::new([0xaa, 0x0b, 0xcc, 0x0d, 0xee, 0x01]);
        assert_eq!(mac.to_string(), "aa:0b:cc:0d:ee:01");
        assert_eq!(MacAddr::BROADCAST.to_string(), "ff:ff:ff:ff:ff:ff");
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(!mac.is_broadcast());
    }

    #[test]
    fn store_key_is_directional() {
        let a = Ipv4Addr::new(10, 0, 0, 1);
        let b = Ipv4Addr::new(10, 0, 0, 2);
        assert_ne!(StoreKey::new(a, b), StoreKey::new(b, a));
        assert_eq!(StoreKey::new(a, b).to_string(), "10.0.0.1:10.0.0.2");
    }

    #[test]
    fn frame_serializes_addresses_as_strings() {
        let raw = RawArp {
            operation: 2,
            sender_mac: MacAddr::new([0x11; 6]),
            sender_ip: Ipv4Addr::new(10, 0, 0, 1),
            target_mac: MacAddr::new([0x22; 6]),
            target_ip: Ipv4Addr::new(10, 0, 0, 5),
        };
        let frame = ArpFrame::new("eth0", ArpOperation::Reply, &raw, Utc::now());
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["interface"], "eth0");
        assert_eq!(json["operation"], "reply");
        assert_eq!(json["sender_mac"], "11:11:11:11:11:11");
        assert_eq!(json["target_ip"], "10.0.0.5");
    }
}
