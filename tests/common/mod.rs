#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use arpwatch::interfaces::{HostInterface, InterfaceSet};
use arpwatch::sniff::{ChannelSource, FrameResult};
use arpwatch::{ArpTables, LinkFrame, MacAddr, RawArp, Shutdown, Watcher};

pub const BROADCAST: [u8; 6] = [0xff; 6];

pub fn arp(operation: u16, sender: ([u8; 6], [u8; 4]), target: ([u8; 6], [u8; 4])) -> FrameResult {
    Ok(LinkFrame {
        source: MacAddr::new(sender.0),
        destination: MacAddr::new(target.0),
        ether_type: 0x0806,
        arp: Some(RawArp {
            operation,
            sender_mac: MacAddr::new(sender.0),
            sender_ip: Ipv4Addr::from(sender.1),
            target_mac: MacAddr::new(target.0),
            target_ip: Ipv4Addr::from(target.1),
        }),
    })
}

pub fn ipv4_frame() -> FrameResult {
    Ok(LinkFrame {
        source: MacAddr::new([0x01; 6]),
        destination: MacAddr::new([0x02; 6]),
        ether_type: 0x0800,
        arp: None,
    })
}

pub fn host(name: &str, addresses: &[[u8; 4]]) -> HostInterface {
    HostInterface::new(
        name,
        addresses
            .iter()
            .map(|a| IpAddr::V4(Ipv4Addr::from(*a)))
            .collect(),
    )
}

/// Polls `cond` until it holds or five seconds pass.
pub fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

pub struct Harness {
    pub source: Arc<ChannelSource>,
    pub tables: Arc<ArpTables>,
    pub watched: Arc<InterfaceSet>,
    pub shutdown: Shutdown,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            source: Arc::new(ChannelSource::new()),
            tables: Arc::new(ArpTables::new()),
            watched: Arc::new(InterfaceSet::new()),
            shutdown: Shutdown::new(),
        }
    }

    pub fn watcher(&self, interface: HostInterface) -> Watcher {
        Watcher::new(
            interface,
            self.source.clone(),
            Arc::clone(&self.tables),
            Arc::clone(&self.watched),
            self.shutdown.signal(),
        )
    }
}
