use std::any::Any;
use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use crate::error::{ConfigError, WatchError};
use crate::interfaces::{self, HostInterface, InterfaceSet};
use crate::shutdown::ShutdownSignal;
use crate::sniff::CaptureSource;
use crate::store::ArpTables;
use crate::watcher::{WatchOutcome, Watcher};

#[derive(Debug)]
pub struct WatcherReport {
    pub interface: String,
    pub result: Result<WatchOutcome, WatchError>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub watchers: Vec<WatcherReport>,
}

impl RunReport {
    pub fn stopped(&self) -> usize {
        self.count(|r| matches!(r, Ok(WatchOutcome::Stopped(_))))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, Ok(WatchOutcome::Skipped(_))))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| r.is_err())
    }

    pub fn get(&self, interface: &str) -> Option<&WatcherReport> {
        self.watchers.iter().find(|w| w.interface == interface)
    }

    fn count(&self, pred: impl Fn(&Result<WatchOutcome, WatchError>) -> bool) -> usize {
        self.watchers.iter().filter(|w| pred(&w.result)).count()
    }
}

/// Owns the shared tables and runs one Watcher thread per interface.
pub struct Supervisor {
    source: Arc<dyn CaptureSource>,
    tables: Arc<ArpTables>,
    watched: Arc<InterfaceSet>,
    shutdown: ShutdownSignal,
    promiscuous: bool,
}

impl Supervisor {
    pub fn new(source: Arc<dyn CaptureSource>, shutdown: ShutdownSignal) -> Self {
        Self {
            source,
            tables: Arc::new(ArpTables::new()),
            watched: Arc::new(InterfaceSet::new()),
            shutdown,
            promiscuous: true,
        }
    }

    pub fn promiscuous(mut self, enable: bool) -> Self {
        self.promiscuous = enable;
        self
    }

    pub fn tables(&self) -> Arc<ArpTables> {
        Arc::clone(&self.tables)
    }

    pub fn interfaces(&self) -> Arc<InterfaceSet> {
        Arc::clone(&self.watched)
    }

    /// Resolves `requested` against the host list and watches every match.
    /// Returns a config error, without starting anything, when nothing matches.
    pub fn watch(
        &self,
        requested: &[String],
        available: Vec<HostInterface>,
    ) -> Result<RunReport, ConfigError> {
        let selected = interfaces::resolve(requested, available)?;
        Ok(self.run(selected))
    }

    /// Starts a Watcher per interface and blocks until all of them are done.
    /// A failed Watcher never stops its siblings.
    pub fn run(&self, interfaces: Vec<HostInterface>) -> RunReport {
        let handles: Vec<_> = interfaces
            .into_iter()
            .map(|iface| {
                let name = iface.name.clone();
                let watcher = Watcher::new(
                    iface,
                    Arc::clone(&self.source),
                    Arc::clone(&self.tables),
                    Arc::clone(&self.watched),
                    self.shutdown.clone(),
                )
                .promiscuous(self.promiscuous);
                let handle = thread::Builder::new()
                    .name(format!("watch-{name}"))
                    .spawn(move || watcher.run());
                (name, handle)
            })
            .collect();

        info!(count = handles.len(), "started interface watchers");

        let watchers = handles
            .into_iter()
            .map(|(interface, handle)| {
                let result = match handle {
                    Ok(handle) => match handle.join() {
                        Ok(result) => result.map_err(WatchError::from),
                        Err(panic) => Err(WatchError::Panicked(panic_message(panic))),
                    },
                    Err(source) => Err(WatchError::Spawn(source)),
                };
                if let Err(err) = &result {
                    error!(interface = %interface, error = %err, "error watching interface");
                }
                WatcherReport { interface, result }
            })
            .collect();

        RunReport { watchers }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
