//! Capture capability: live pcap sessions and a channel-fed source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use pcap::{Active, Capture, Device};
use tracing::{debug, trace};

use crate::error::CaptureError;
use crate::models::LinkFrame;
use crate::parser::parse_frame;

pub type FrameResult = Result<LinkFrame, CaptureError>;

/// Opens capture sessions on named interfaces.
pub trait CaptureSource: Send + Sync {
    fn open(
        &self,
        interface: &str,
        promiscuous: bool,
    ) -> Result<Box<dyn CaptureSession>, CaptureError>;
}

/// A live session. Frames arrive in order on `frames()`; an `Err` item means
/// the session failed. A disconnected channel means the capture ended.
pub trait CaptureSession: Send {
    fn frames(&self) -> &Receiver<FrameResult>;

    fn close(self: Box<Self>);
}

const DEFAULT_SNAPLEN: i32 = 65536;
const DEFAULT_TIMEOUT_MS: i32 = 500;
const FRAME_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub snaplen: i32,
    /// Read timeout of the reader thread; bounds how long `close` waits.
    pub timeout_ms: i32,
    pub immediate_mode: bool,
    pub filter: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            immediate_mode: true,
            filter: Some("arp".to_string()),
        }
    }
}

/// Live capture through libpcap.
#[derive(Debug, Clone, Default)]
pub struct PcapSource {
    config: CaptureConfig,
}

impl PcapSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    fn create_capture(
        &self,
        interface: &str,
        promiscuous: bool,
    ) -> Result<Capture<Active>, pcap::Error> {
        let mut cap = Capture::from_device(Device::from(interface))?
            .promisc(promiscuous)
            .snaplen(self.config.snaplen)
            .timeout(self.config.timeout_ms)
            .immediate_mode(self.config.immediate_mode)
            .open()?;

        if let Some(filter) = &self.config.filter {
            cap.filter(filter, true)?;
        }
        Ok(cap)
    }
}

impl CaptureSource for PcapSource {
    fn open(
        &self,
        interface: &str,
        promiscuous: bool,
    ) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let cap = self
            .create_capture(interface, promiscuous)
            .map_err(|source| CaptureError::Open {
                interface: interface.to_string(),
                source,
            })?;

        let (tx, rx) = crossbeam_channel::bounded(FRAME_BUFFER);
        let closed = Arc::new(AtomicBool::new(false));
        let reader = {
            let closed = Arc::clone(&closed);
            let name = interface.to_string();
            thread::Builder::new()
                .name(format!("pcap-{interface}"))
                .spawn(move || read_packets(cap, &name, &tx, &closed))
                .map_err(|source| CaptureError::Reader {
                    interface: interface.to_string(),
                    source,
                })?
        };

        debug!(interface, promiscuous, "capture opened");
        Ok(Box::new(PcapSession {
            frames: rx,
            closed,
            reader,
        }))
    }
}

struct PcapSession {
    frames: Receiver<FrameResult>,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl CaptureSession for PcapSession {
    fn frames(&self) -> &Receiver<FrameResult> {
        &self.frames
    }

    fn close(self: Box<Self>) {
        let PcapSession {
            frames,
            closed,
            reader,
        } = *self;
        closed.store(true, Ordering::SeqCst);
        // Unblocks a reader stuck on a full channel.
        drop(frames);
        let _ = reader.join();
    }
}

fn read_packets(
    mut cap: Capture<Active>,
    interface: &str,
    tx: &Sender<FrameResult>,
    closed: &AtomicBool,
) {
    while !closed.load(Ordering::SeqCst) {
        match cap.next_packet() {
            Ok(packet) => {
                let Some(frame) = parse_frame(packet.data) else {
                    trace!(interface, len = packet.data.len(), "undecodable frame");
                    continue;
                };
                if tx.send(Ok(frame)).is_err() {
                    break;
                }
            }
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(source) => {
                if !closed.load(Ordering::SeqCst) {
                    let _ = tx.send(Err(CaptureError::Io {
                        interface: interface.to_string(),
                        source,
                    }));
                }
                break;
            }
        }
    }
    trace!(interface, "capture reader exited");
}

/// Frames pushed in by the caller, one channel per interface. Opening an
/// interface that was never fed fails with `UnknownInterface`.
#[derive(Debug, Default)]
pub struct ChannelSource {
    pending: Mutex<HashMap<String, Receiver<FrameResult>>>,
    opened: Mutex<Vec<String>>,
}

impl ChannelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `interface` and returns the sending half of its frame channel.
    /// Dropping the sender ends the capture.
    pub fn feed(&self, interface: &str) -> Sender<FrameResult> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.pending.lock().insert(interface.to_string(), rx);
        tx
    }

    /// Interfaces opened so far, in open order.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl CaptureSource for ChannelSource {
    fn open(
        &self,
        interface: &str,
        _promiscuous: bool,
    ) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let frames = self
            .pending
            .lock()
            .remove(interface)
            .ok_or_else(|| CaptureError::UnknownInterface {
                interface: interface.to_string(),
            })?;
        self.opened.lock().push(interface.to_string());
        Ok(Box::new(ChannelSession { frames }))
    }
}

struct ChannelSession {
    frames: Receiver<FrameResult>,
}

impl CaptureSession for ChannelSession {
    fn frames(&self) -> &Receiver<FrameResult> {
        &self.frames
    }

    fn close(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MacAddr;

    fn frame() -> LinkFrame {
        LinkFrame {
            source: MacAddr::new([1; 6]),
            destination: MacAddr::BROADCAST,
            ether_type: 0x0800,
            arp: None,
        }
    }

    #[test]
    fn channel_source_delivers_fed_frames_in_order() {
        let source = ChannelSource::new();
        let tx = source.feed("eth0");
        tx.send(Ok(frame())).unwrap();
        tx.send(Err(CaptureError::Closed {
            interface: "eth0".into(),
        }))
        .unwrap();

        let session = source.open("eth0", true).unwrap();
        assert_eq!(session.frames().recv().unwrap().unwrap(), frame());
        assert!(session.frames().recv().unwrap().is_err());
        assert_eq!(source.opened(), vec!["eth0".to_string()]);
        session.close();

        assert!(tx.send(Ok(frame())).is_err());
    }

    #[test]
    fn channel_source_rejects_unknown_interface() {
        let source = ChannelSource::new();
        match source.open("eth9", true) {
            Err(CaptureError::UnknownInterface { interface }) => assert_eq!(interface, "eth9"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opened an unknown interface"),
        }
        assert!(source.opened().is_empty());
    }

    #[test]
    fn default_capture_config_filters_arp() {
        let config = CaptureConfig::default();
        assert_eq!(config.snaplen, 65536);
        assert_eq!(config.filter.as_deref(), Some("arp"));
        assert!(config.immediate_mode);
    }
}
