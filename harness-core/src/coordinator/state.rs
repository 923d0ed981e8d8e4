//! States, scheduler tasks, and the pending-operation record.

use core::fmt;

use crate::radio::{
    ConnectionHandle, ConnectionRole, OperationKind, OperationToken, RadioEvent, RadioMode,
    SyncHandle,
};

/// Work items the coordinator posts to and receives from the scheduler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HarnessTask {
    /// Show the command menu and block for console input.
    Prompt,
    /// Outcome delivered by the radio adapter.
    Radio(RadioEvent),
    /// Hold window of a central connection or periodic sync has elapsed.
    HoldExpired(OperationToken),
}

impl From<RadioEvent> for HarnessTask {
    fn from(event: RadioEvent) -> Self {
        HarnessTask::Radio(event)
    }
}

/// Externally visible harness state, printed on every change.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CoordinatorState {
    #[default]
    Idle,
    Advertising,
    Scanning,
    ConnectedCentral,
    ConnectedPeripheral,
    Synced,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CoordinatorState::Idle => "IDLE",
            CoordinatorState::Advertising => "ADVERTISING",
            CoordinatorState::Scanning => "SCANNING",
            CoordinatorState::ConnectedCentral => "CONNECTED_CENTRAL",
            CoordinatorState::ConnectedPeripheral => "CONNECTED_PERIPHERAL",
            CoordinatorState::Synced => "SYNCED",
        };
        f.write_str(label)
    }
}

/// Why a scheduler task was dropped without effect.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiscardReason {
    /// The task belongs to a session that is no longer outstanding.
    StaleToken,
    /// The session is outstanding but not in a phase that accepts the event.
    UnexpectedInState,
    /// A scan report whose periodic presence differs from the session's mode.
    ModeMismatch,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::StaleToken => f.write_str("stale-token"),
            DiscardReason::UnexpectedInState => f.write_str("unexpected-in-state"),
            DiscardReason::ModeMismatch => f.write_str("mode-mismatch"),
        }
    }
}

/// Progress of the outstanding session.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperationPhase {
    /// Request accepted; waiting for the stack to confirm the start.
    Requested,
    /// Advertising or scanning is running.
    Active,
    /// Connect or sync issued from a scan; waiting for completion.
    Linking,
    Connected {
        handle: ConnectionHandle,
        role: ConnectionRole,
    },
    Synced(SyncHandle),
    /// Disconnect requested; waiting for the stack to confirm.
    TearingDown,
}

/// The single radio session the coordinator will act on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PendingOperation {
    pub token: OperationToken,
    pub mode: RadioMode,
    pub phase: OperationPhase,
}

impl PendingOperation {
    #[must_use]
    pub const fn new(token: OperationToken, mode: RadioMode) -> Self {
        Self {
            token,
            mode,
            phase: OperationPhase::Requested,
        }
    }

    #[must_use]
    pub const fn is_advertising(&self) -> bool {
        matches!(self.mode.operation, OperationKind::Advertise)
    }

    #[must_use]
    pub const fn is_scanning(&self) -> bool {
        matches!(self.mode.operation, OperationKind::Scan)
    }

    /// Returns `true` from a connect/sync request until the link is gone.
    #[must_use]
    pub const fn is_linking_or_linked(&self) -> bool {
        matches!(
            self.phase,
            OperationPhase::Linking
                | OperationPhase::Connected { .. }
                | OperationPhase::Synced(_)
                | OperationPhase::TearingDown
        )
    }
}
