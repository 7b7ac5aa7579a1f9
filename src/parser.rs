//! Ethernet II / ARP decoding of captured bytes.

use std::net::Ipv4Addr;

use etherparse::{ArpPacketSlice, EtherType, Ethernet2Header};

use crate::models::{LinkFrame, MacAddr, RawArp};

const ETHERNET_ADDR_LEN: u8 = 6;
const IPV4_ADDR_LEN: u8 = 4;

/// Decodes one Ethernet II frame. Returns `None` when the bytes are not a
/// complete Ethernet header. ARP payloads that are not Ethernet/IPv4 leave
/// `arp` empty.
pub fn parse_frame(data: &[u8]) -> Option<LinkFrame> {
    let (eth, payload) = Ethernet2Header::from_slice(data).ok()?;

    let arp = if eth.ether_type == EtherType::ARP {
        parse_arp(payload)
    } else {
        None
    };

    Some(LinkFrame {
        source: MacAddr::new(eth.source),
        destination: MacAddr::new(eth.destination),
        ether_type: eth.ether_type.0,
        arp,
    })
}

fn parse_arp(payload: &[u8]) -> Option<RawArp> {
    let arp = ArpPacketSlice::from_slice(payload).ok()?;

    if arp.hw_addr_size() != ETHERNET_ADDR_LEN
        || arp.proto_addr_size() != IPV4_ADDR_LEN
        || arp.proto_addr_type() != EtherType::IPV4
    {
        return None;
    }

    Some(RawArp {
        operation: arp.operation().0,
        sender_mac: MacAddr::new(arp.sender_hw_addr().try_into().ok()?),
        sender_ip: ipv4(arp.sender_protocol_addr())?,
        target_mac: MacAddr::new(arp.target_hw_addr().try_into().ok()?),
        target_ip: ipv4(arp.target_protocol_addr())?,
    })
}

fn ipv4(bytes: &[u8]) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = bytes.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}
