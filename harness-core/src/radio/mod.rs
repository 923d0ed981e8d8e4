//! Uniform contract between the coordinator and a vendor radio stack.
//!
//! Requests are synchronous and only report whether the stack accepted them.
//! Outcomes arrive later as [`RadioEvent`]s that the adapter hands to an
//! [`EventSink`]; the coordinator never sees a completion as a direct call from
//! the adapter. Every session-starting request returns an [`OperationToken`],
//! and all events raised for that session carry it.

mod event;
mod types;

use core::{fmt, time::Duration};

use crate::scheduler::{Clock, EventQueue};

pub use event::{
    AdvertisingReport, AdvertisingStarted, Connection, PeriodicAdvertisingInfo, PeriodicSync,
    RadioEvent, RadioEventKind, RadioEventTag, ScanStarted,
};
pub use types::{
    AddressType, AdvertisingMode, ConnectionHandle, ConnectionRole, DeviceName,
    MAX_DEVICE_NAME_LEN, OperationKind, Peer, PeerAddress, PeriodicIntervalBounds, RadioMode,
    SyncHandle, device_name,
};

/// Opaque identifier of an outstanding radio session.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OperationToken(u32);

impl OperationToken {
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints tokens that do not repeat within a run.
#[derive(Clone, Debug)]
pub struct TokenSource {
    next: u32,
}

impl TokenSource {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    pub fn issue(&mut self) -> OperationToken {
        let token = OperationToken(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        token
    }
}

impl Default for TokenSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Failures reported synchronously by requests or asynchronously in events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RadioError {
    /// The stack refused the request with a vendor status code.
    Rejected(i32),
    /// An asynchronous operation completed with a vendor status code.
    Failed(i32),
    /// The controller lacks the requested feature.
    Unsupported,
    /// Another operation owns the resource.
    Busy,
    /// The handle does not name a live connection or sync.
    InvalidHandle,
    /// Event delivery failed because the scheduler is full.
    QueueFull,
}

impl RadioError {
    const UNSUPPORTED_CODE: i32 = -134;
    const BUSY_CODE: i32 = -16;
    const INVALID_HANDLE_CODE: i32 = -22;
    const QUEUE_FULL_CODE: i32 = -12;

    /// Numeric code shown to the operator.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            RadioError::Rejected(code) | RadioError::Failed(code) => code,
            RadioError::Unsupported => Self::UNSUPPORTED_CODE,
            RadioError::Busy => Self::BUSY_CODE,
            RadioError::InvalidHandle => Self::INVALID_HANDLE_CODE,
            RadioError::QueueFull => Self::QUEUE_FULL_CODE,
        }
    }
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::Rejected(_) => f.write_str("request rejected by radio stack"),
            RadioError::Failed(_) => f.write_str("operation failed"),
            RadioError::Unsupported => f.write_str("not supported by controller"),
            RadioError::Busy => f.write_str("radio busy"),
            RadioError::InvalidHandle => f.write_str("invalid handle"),
            RadioError::QueueFull => f.write_str("event queue full"),
        }
    }
}

/// Radio requests, named for telemetry and error reports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RadioRequest {
    StartAdvertising,
    StartPeriodicAdvertising,
    ConfigurePeriodicAdvertising,
    EnablePeriodicAdvertising,
    StopAdvertising,
    StartScan,
    StartPeriodicScan,
    StopScan,
    EstablishConnection,
    SyncToPeriodicAdvertising,
    Disconnect,
    StopSync,
}

impl fmt::Display for RadioRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RadioRequest::StartAdvertising => "Failed to start advertising",
            RadioRequest::StartPeriodicAdvertising => "Failed to start periodic advertising",
            RadioRequest::ConfigurePeriodicAdvertising => {
                "Failed to set periodic advertising parameters"
            }
            RadioRequest::EnablePeriodicAdvertising => "Failed to enable periodic advertising",
            RadioRequest::StopAdvertising => "Failed to stop advertising",
            RadioRequest::StartScan => "Failed to start scan",
            RadioRequest::StartPeriodicScan => "Failed to start scan for periodic advertising",
            RadioRequest::StopScan => "Failed to stop scan",
            RadioRequest::EstablishConnection => "Failed to connect",
            RadioRequest::SyncToPeriodicAdvertising => "Failed to sync to periodic advertising",
            RadioRequest::Disconnect => "Failed to disconnect",
            RadioRequest::StopSync => "Failed to stop sync",
        };
        f.write_str(label)
    }
}

/// Back-reference adapters use to hand outcomes to the scheduler.
pub trait EventSink {
    /// Queues `event` for the next scheduler iteration.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::QueueFull`] when the event cannot be queued.
    fn deliver(&mut self, event: RadioEvent) -> Result<(), RadioError>;

    /// Queues `event` to be handled no earlier than `delay` from now.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::QueueFull`] when the event cannot be queued.
    fn deliver_after(&mut self, delay: Duration, event: RadioEvent) -> Result<(), RadioError>;
}

impl<T, C, const CAPACITY: usize> EventSink for EventQueue<T, C, CAPACITY>
where
    T: From<RadioEvent>,
    C: Clock,
{
    fn deliver(&mut self, event: RadioEvent) -> Result<(), RadioError> {
        self.post(T::from(event)).map_err(|_| RadioError::QueueFull)
    }

    fn deliver_after(&mut self, delay: Duration, event: RadioEvent) -> Result<(), RadioError> {
        self.post_after(delay, T::from(event))
            .map_err(|_| RadioError::QueueFull)
    }
}

/// Operations a vendor radio adapter exposes to the coordinator.
///
/// Session-starting requests return the token their events will carry. A
/// connection accepted while advertising reports the advertising token;
/// `establish_connection` and `sync_to_periodic_advertising` end the scan they
/// were issued from.
pub trait RadioPlatform {
    /// Local device name used for advertising and name matching.
    fn device_name(&self) -> &str;

    /// Local identity address.
    fn local_address(&self) -> PeerAddress;

    /// Returns `true` when the controller supports extended and periodic advertising.
    fn is_periodic_advertising_available(&self) -> bool;

    /// Starts connectable legacy advertising for `duration`.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection when advertising cannot start.
    fn start_advertising(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError>;

    /// Starts the extended advertising set that carries a periodic train.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection when the set cannot be created or started.
    fn start_periodic_advertising(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError>;

    /// Applies periodic interval parameters to a started periodic session.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection of the parameters.
    fn configure_periodic_advertising(
        &mut self,
        token: OperationToken,
        bounds: PeriodicIntervalBounds,
    ) -> Result<(), RadioError>;

    /// Enables the periodic train of a configured session.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection when the train cannot start.
    fn enable_periodic_advertising(&mut self, token: OperationToken) -> Result<(), RadioError>;

    /// Stops advertising; no timeout is delivered afterwards.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection of the request.
    fn stop_advertising(&mut self, token: OperationToken) -> Result<(), RadioError>;

    /// Starts a legacy scan for `duration`.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection when scanning cannot start.
    fn start_scan(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError>;

    /// Starts an extended scan that reports periodic advertisers.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection when scanning cannot start.
    fn start_scan_for_periodic_advertising(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError>;

    /// Stops scanning; no timeout is delivered afterwards.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection of the request.
    fn stop_scan(&mut self, token: OperationToken) -> Result<(), RadioError>;

    /// Initiates a connection to `peer` as central.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection when the connection cannot be initiated.
    fn establish_connection(
        &mut self,
        peer: Peer,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError>;

    /// Creates a periodic sync to the train identified by `sid` from `peer`.
    ///
    /// # Errors
    ///
    /// Returns the stack's rejection when the sync cannot be created.
    fn sync_to_periodic_advertising(
        &mut self,
        sid: u8,
        peer: Peer,
        sync_timeout: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError>;

    /// Requests link termination; completion arrives as a disconnect event.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::InvalidHandle`] or the stack's rejection.
    fn disconnect(
        &mut self,
        handle: ConnectionHandle,
        sink: &mut dyn EventSink,
    ) -> Result<(), RadioError>;

    /// Deletes a periodic sync.
    ///
    /// # Errors
    ///
    /// Returns [`RadioError::InvalidHandle`] or the stack's rejection.
    fn stop_sync(&mut self, handle: SyncHandle) -> Result<(), RadioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_skip_zero_on_wrap() {
        let mut source = TokenSource::new();
        let first = source.issue();
        let second = source.issue();
        assert_ne!(first, second);
        assert_eq!(first.to_raw(), 1);

        let mut wrapping = TokenSource { next: u32::MAX };
        assert_eq!(wrapping.issue().to_raw(), u32::MAX);
        assert_eq!(wrapping.issue().to_raw(), 1);
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(RadioError::Rejected(-5).code(), -5);
        assert_eq!(RadioError::Failed(0x3e).code(), 0x3e);
        assert_eq!(RadioError::Busy.code(), -16);
        assert!(matches!(RadioError::Unsupported.code(), c if c < 0));
    }
}
