use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use crossbeam_channel::select;
use tracing::{debug, info, warn};

use crate::detection::classify;
use crate::error::{CaptureError, ClassifyError};
use crate::interfaces::{HostInterface, InterfaceSet};
use crate::models::{ArpFrame, LinkFrame, RawArp, TrafficClass};
use crate::shutdown::ShutdownSignal;
use crate::sniff::{CaptureSession, CaptureSource};
use crate::store::ArpTables;

/// Why an interface was left alone. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoIpv4Address,
    Loopback(Ipv4Addr),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoIpv4Address => f.write_str("no IPv4 address bound"),
            SkipReason::Loopback(addr) => write!(f, "loopback address {addr}"),
        }
    }
}

/// Per-Watcher frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub requests: u64,
    pub replies: u64,
    pub gratuitous: u64,
    pub anomalies: u64,
    pub collisions: u64,
    /// Frames without an ARP layer.
    pub ignored: u64,
}

impl WatchStats {
    fn record(&mut self, class: TrafficClass) {
        match class {
            TrafficClass::Request => self.requests += 1,
            TrafficClass::Reply => self.replies += 1,
            TrafficClass::GratuitousRequest => self.gratuitous += 1,
        }
    }

    pub fn classified(&self) -> u64 {
        self.requests + self.replies + self.gratuitous
    }
}

/// Terminal states of a Watcher that are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Stopped(WatchStats),
    Skipped(SkipReason),
}

/// Capture loop for a single interface: resolve its address, open a session,
/// then classify and store frames until shutdown or a capture failure.
pub struct Watcher {
    interface: HostInterface,
    source: Arc<dyn CaptureSource>,
    tables: Arc<ArpTables>,
    watched: Arc<InterfaceSet>,
    shutdown: ShutdownSignal,
    promiscuous: bool,
}

impl Watcher {
    pub fn new(
        interface: HostInterface,
        source: Arc<dyn CaptureSource>,
        tables: Arc<ArpTables>,
        watched: Arc<InterfaceSet>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            interface,
            source,
            tables,
            watched,
            shutdown,
            promiscuous: true,
        }
    }

    pub fn promiscuous(mut self, enable: bool) -> Self {
        self.promiscuous = enable;
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface.name
    }

    /// Runs to a terminal state. `Err` is the Failed outcome.
    pub fn run(self) -> Result<WatchOutcome, CaptureError> {
        let name = self.interface.name.as_str();

        let address = match self.resolve() {
            Ok(address) => address,
            Err(reason) => {
                info!(interface = name, %reason, "skipping interface");
                return Ok(WatchOutcome::Skipped(reason));
            }
        };

        let session = self.source.open(name, self.promiscuous)?;
        self.watched.append(name, address);
        info!(interface = name, %address, "watching interface");

        let result = self.process(session.as_ref());
        session.close();

        let stats = result?;
        info!(
            interface = name,
            %address,
            classified = stats.classified(),
            anomalies = stats.anomalies,
            "stopped watching interface"
        );
        Ok(WatchOutcome::Stopped(stats))
    }

    fn resolve(&self) -> Result<Ipv4Addr, SkipReason> {
        let address = self
            .interface
            .local_ipv4()
            .ok_or(SkipReason::NoIpv4Address)?;
        if address.is_loopback() {
            return Err(SkipReason::Loopback(address));
        }
        Ok(address)
    }

    fn process(&self, session: &dyn CaptureSession) -> Result<WatchStats, CaptureError> {
        let mut stats = WatchStats::default();

        loop {
            if self.shutdown.is_triggered() {
                return Ok(stats);
            }

            select! {
                recv(self.shutdown.receiver()) -> _ => return Ok(stats),
                recv(session.frames()) -> msg => match msg {
                    // select! picks randomly when both are ready.
                    Ok(Ok(_)) if self.shutdown.is_triggered() => return Ok(stats),
                    Ok(Ok(frame)) => self.handle_frame(&frame, &mut stats),
                    Ok(Err(err)) => return Err(err),
                    Err(_) => {
                        return Err(CaptureError::Closed {
                            interface: self.interface.name.clone(),
                        })
                    }
                },
            }
        }
    }

    fn handle_frame(&self, frame: &LinkFrame, stats: &mut WatchStats) {
        let Some(raw) = frame.arp else {
            stats.ignored += 1;
            return;
        };
        let name = self.interface.name.as_str();

        match classify(&raw, name, Utc::now().trunc_subsecs(0)) {
            Ok((class, arp)) => {
                log_frame(class, &arp);
                stats.record(class);
                if let Some(existing) = self.tables.store(class).put(arp) {
                    stats.collisions += 1;
                    debug!(
                        interface = name,
                        class = %class,
                        key = %existing.key(),
                        first_seen_on = existing.interface(),
                        first_seen_at = %existing.observed_at(),
                        "keeping existing entry"
                    );
                }
            }
            Err(ClassifyError::UnknownOperation(operation)) => {
                stats.anomalies += 1;
                log_anomaly(name, operation, &raw);
            }
        }
    }
}

fn log_frame(class: TrafficClass, arp: &ArpFrame) {
    match class {
        TrafficClass::GratuitousRequest => info!(
            interface = arp.interface(),
            requestor_mac = %arp.sender_mac(),
            requestor_ip = %arp.sender_ip(),
            broadcast_mac = %arp.target_mac(),
            destination_ip = %arp.target_ip(),
            "received gratuitous ARP request"
        ),
        // Target MAC of a plain request is whatever the requestor left in it.
        TrafficClass::Request => info!(
            interface = arp.interface(),
            requestor_mac = %arp.sender_mac(),
            requestor_ip = %arp.sender_ip(),
            ignored_mac = %arp.target_mac(),
            destination_ip = %arp.target_ip(),
            "received ARP request"
        ),
        TrafficClass::Reply => info!(
            interface = arp.interface(),
            replier_mac = %arp.sender_mac(),
            replier_ip = %arp.sender_ip(),
            requestor_mac = %arp.target_mac(),
            requestor_ip = %arp.target_ip(),
            "received ARP reply"
        ),
    }
}

fn log_anomaly(interface: &str, operation: u16, raw: &RawArp) {
    warn!(
        interface,
        operation,
        sender_mac = %raw.sender_mac,
        sender_ip = %raw.sender_ip,
        target_mac = %raw.target_mac,
        target_ip = %raw.target_ip,
        "unknown ARP operation"
    );
}
