//! Asynchronous outcomes delivered by radio adapters.

use core::{fmt, time::Duration};

use super::types::{ConnectionHandle, ConnectionRole, DeviceName, Peer, SyncHandle};
use super::{OperationToken, RadioError};

/// Advertising has been confirmed by the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AdvertisingStarted {
    pub duration: Duration,
    /// Interval of the periodic train, when periodic advertising was requested.
    pub periodic_interval: Option<Duration>,
}

/// Scanning has been confirmed by the stack.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScanStarted {
    pub duration: Duration,
    pub periodic: bool,
}

/// Periodic advertising train advertised alongside an extended report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PeriodicAdvertisingInfo {
    pub sid: u8,
    pub interval: Duration,
}

/// Advertisement received while scanning.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdvertisingReport {
    pub peer: Peer,
    pub local_name: Option<DeviceName>,
    pub periodic: Option<PeriodicAdvertisingInfo>,
}

impl AdvertisingReport {
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        self.periodic.is_some()
    }

    /// Advertised name, or a placeholder when the peer sent none.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.local_name {
            Some(name) if !name.is_empty() => name.as_str(),
            _ => "(unknown name)",
        }
    }
}

/// Established link.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Connection {
    pub peer: Peer,
    pub role: ConnectionRole,
    pub handle: ConnectionHandle,
}

/// Established periodic sync.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PeriodicSync {
    pub peer: Peer,
    pub sid: u8,
    pub handle: SyncHandle,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RadioEventKind {
    AdvertisingStarted(AdvertisingStarted),
    AdvertisingTimeout,
    ScanStarted(ScanStarted),
    ScanTimeout,
    AdvertisingReport(AdvertisingReport),
    Connected(Result<Connection, RadioError>),
    Disconnected { reason: u8 },
    PeriodicSync(Result<PeriodicSync, RadioError>),
    SyncLost,
}

impl RadioEventKind {
    /// Payload-free discriminant, suitable for telemetry.
    #[must_use]
    pub const fn tag(&self) -> RadioEventTag {
        match self {
            RadioEventKind::AdvertisingStarted(_) => RadioEventTag::AdvertisingStarted,
            RadioEventKind::AdvertisingTimeout => RadioEventTag::AdvertisingTimeout,
            RadioEventKind::ScanStarted(_) => RadioEventTag::ScanStarted,
            RadioEventKind::ScanTimeout => RadioEventTag::ScanTimeout,
            RadioEventKind::AdvertisingReport(_) => RadioEventTag::AdvertisingReport,
            RadioEventKind::Connected(_) => RadioEventTag::Connected,
            RadioEventKind::Disconnected { .. } => RadioEventTag::Disconnected,
            RadioEventKind::PeriodicSync(_) => RadioEventTag::PeriodicSync,
            RadioEventKind::SyncLost => RadioEventTag::SyncLost,
        }
    }

    /// Failure status carried by a completion event.
    #[must_use]
    pub const fn failure(&self) -> Option<RadioError> {
        match self {
            RadioEventKind::Connected(Err(error)) | RadioEventKind::PeriodicSync(Err(error)) => {
                Some(*error)
            }
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RadioEventTag {
    AdvertisingStarted,
    AdvertisingTimeout,
    ScanStarted,
    ScanTimeout,
    AdvertisingReport,
    Connected,
    Disconnected,
    PeriodicSync,
    SyncLost,
}

impl fmt::Display for RadioEventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RadioEventTag::AdvertisingStarted => "advertising-started",
            RadioEventTag::AdvertisingTimeout => "advertising-timeout",
            RadioEventTag::ScanStarted => "scan-started",
            RadioEventTag::ScanTimeout => "scan-timeout",
            RadioEventTag::AdvertisingReport => "advertising-report",
            RadioEventTag::Connected => "connected",
            RadioEventTag::Disconnected => "disconnected",
            RadioEventTag::PeriodicSync => "periodic-sync",
            RadioEventTag::SyncLost => "sync-lost",
        };
        f.write_str(label)
    }
}

/// Outcome tagged with the token of the request it belongs to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RadioEvent {
    pub token: OperationToken,
    pub kind: RadioEventKind,
}

impl RadioEvent {
    #[must_use]
    pub const fn new(token: OperationToken, kind: RadioEventKind) -> Self {
        Self { token, kind }
    }
}
