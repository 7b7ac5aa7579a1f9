//! Passive ARP monitor.
//!
//! One [`watcher::Watcher`] per interface pulls decoded frames from a
//! [`sniff::CaptureSource`], classifies ARP payloads with
//! [`detection::classify`] and records them in the per-class
//! [`store::ArpTables`]. The [`supervisor::Supervisor`] owns those tables,
//! runs the Watchers and waits for all of them after a
//! [`shutdown::Shutdown`].

pub mod config;
pub mod detection;
pub mod error;
pub mod interfaces;
pub mod models;
pub mod parser;
pub mod report;
pub mod shutdown;
pub mod sniff;
pub mod store;
pub mod supervisor;
pub mod watcher;

pub use error::{CaptureError, ClassifyError, ConfigError, ReportError, WatchError};
pub use models::{ArpFrame, ArpOperation, LinkFrame, MacAddr, RawArp, StoreKey, TrafficClass};
pub use shutdown::{Shutdown, ShutdownSignal};
pub use store::{ArpStore, ArpTables};
pub use supervisor::{RunReport, Supervisor};
pub use watcher::{SkipReason, WatchOutcome, WatchStats, Watcher};
