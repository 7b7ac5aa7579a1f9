use thiserror::Error;

/// Startup problems. Any of these stops the process before a Watcher runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("at least one interface to watch must be provided")]
    NoInterfacesRequested,

    #[error("none of the requested interfaces exist on this host: {}", requested.join(", "))]
    NoMatchingInterfaces { requested: Vec<String> },

    #[error("snaplen must be positive, got {0}")]
    InvalidSnaplen(i32),

    #[error("read timeout must be at least 1 ms, got {0}")]
    InvalidReadTimeout(i32),

    #[error("unable to list host interfaces")]
    InterfaceListing(#[source] CaptureError),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture on {interface}")]
    Open {
        interface: String,
        #[source]
        source: pcap::Error,
    },

    #[error("no capture device named {interface}")]
    UnknownInterface { interface: String },

    #[error("capture on {interface} failed")]
    Io {
        interface: String,
        #[source]
        source: pcap::Error,
    },

    #[error("capture on {interface} ended unexpectedly")]
    Closed { interface: String },

    #[error("failed to spawn capture reader for {interface}")]
    Reader {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list capture devices")]
    Listing(#[source] pcap::Error),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("unknown ARP operation {0}")]
    UnknownOperation(u16),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to bind reporting endpoint")]
    Bind(#[source] std::io::Error),

    #[error("failed to start reporting thread")]
    Spawn(#[source] std::io::Error),

    #[error("reporting endpoint exited during startup")]
    Startup,
}

/// Failed outcome of a Watcher as seen by the Supervisor.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("watcher thread panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn watcher thread")]
    Spawn(#[source] std::io::Error),
}
