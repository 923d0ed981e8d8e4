//! Telemetry event catalog and the ring buffer that retains recent records.
//!
//! Records capture state dwell times, every radio request the coordinator
//! issues, and every event it discards, so a power trace can be lined up with
//! what the harness was doing and why. The ring keeps the newest
//! [`TELEMETRY_RING_CAPACITY`] entries and needs no allocator.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::console::MatchKind;
use crate::coordinator::{CoordinatorState, DiscardReason};
use crate::radio::{OperationToken, PeerAddress, RadioError, RadioEventTag, RadioRequest};

/// Identifier assigned to each telemetry record.
pub type EventId = u32;

/// Records kept before the oldest is overwritten.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic instant that can measure how long a state lasted.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    StateChanged {
        from: CoordinatorState,
        to: CoordinatorState,
    },
    RequestIssued(RadioRequest),
    RequestRejected(RadioRequest),
    PeerMatched(MatchKind),
    EventDiscarded(DiscardReason),
    HoldScheduled,
    QueueExhausted,
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::StateChanged { from, to } => write!(f, "state {from} -> {to}"),
            TelemetryEventKind::RequestIssued(request) => write!(f, "request-issued {request:?}"),
            TelemetryEventKind::RequestRejected(request) => {
                write!(f, "request-rejected {request:?}")
            }
            TelemetryEventKind::PeerMatched(kind) => write!(f, "peer-matched {kind}"),
            TelemetryEventKind::EventDiscarded(reason) => write!(f, "event-discarded {reason}"),
            TelemetryEventKind::HoldScheduled => f.write_str("hold-scheduled"),
            TelemetryEventKind::QueueExhausted => f.write_str("queue-exhausted"),
        }
    }
}

/// Event-specific data attached to a record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryPayload {
    /// Nothing beyond the event itself.
    None,
    /// Time spent in the state being left; absent for the first transition.
    Dwell(Option<Duration>),
    /// Token and outcome of a radio request.
    Request(RequestTelemetry),
    /// Address of the peer that matched the target.
    Peer(PeerAddress),
    /// Task that was dropped and the token it carried.
    Discard(DiscardTelemetry),
    /// Hold timer armed for a session.
    Hold(HoldTelemetry),
}

impl TelemetryPayload {
    /// Payload for events that carry nothing extra.
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RequestTelemetry {
    pub token: Option<OperationToken>,
    pub error: Option<RadioError>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DiscardTelemetry {
    pub task: DiscardedTask,
    pub token: OperationToken,
}

/// Scheduler task that was dropped.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DiscardedTask {
    Event(RadioEventTag),
    HoldExpired,
}

impl fmt::Display for DiscardedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardedTask::Event(tag) => tag.fmt(f),
            DiscardedTask::HoldExpired => f.write_str("hold-expired"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HoldTelemetry {
    pub token: OperationToken,
    pub delay: Duration,
}

/// One timestamped harness record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Storage behind [`TelemetryRecorder`].
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Keeps the newest harness records in a fixed-size ring.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    last_transition_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    /// Empty recorder; ids start at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_transition_at: None,
            next_event_id: 0,
        }
    }

    /// Records from oldest to newest.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Newest record, if any.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    /// Number of records held, at most the ring capacity.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` before the first record.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records a state transition along with the dwell time of the previous state.
    pub fn record_state_change(
        &mut self,
        from: CoordinatorState,
        to: CoordinatorState,
        timestamp: TInstant,
    ) -> EventId {
        let dwell = self
            .last_transition_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_transition_at = Some(timestamp);

        self.record(
            TelemetryEventKind::StateChanged { from, to },
            TelemetryPayload::Dwell(dwell),
            timestamp,
        )
    }

    /// Records a request the stack accepted.
    pub fn record_request(
        &mut self,
        request: RadioRequest,
        token: Option<OperationToken>,
        timestamp: TInstant,
    ) -> EventId {
        let payload = TelemetryPayload::Request(RequestTelemetry { token, error: None });
        self.record(TelemetryEventKind::RequestIssued(request), payload, timestamp)
    }

    /// Records a request rejection or asynchronous failure.
    pub fn record_rejection(
        &mut self,
        request: RadioRequest,
        error: RadioError,
        timestamp: TInstant,
    ) -> EventId {
        let payload = TelemetryPayload::Request(RequestTelemetry {
            token: None,
            error: Some(error),
        });
        self.record(
            TelemetryEventKind::RequestRejected(request),
            payload,
            timestamp,
        )
    }

    pub fn record_peer_match(
        &mut self,
        kind: MatchKind,
        address: PeerAddress,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::PeerMatched(kind),
            TelemetryPayload::Peer(address),
            timestamp,
        )
    }

    /// Records a task the coordinator dropped without acting on it.
    pub fn record_discard(
        &mut self,
        reason: DiscardReason,
        task: DiscardedTask,
        token: OperationToken,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::EventDiscarded(reason),
            TelemetryPayload::Discard(DiscardTelemetry { task, token }),
            timestamp,
        )
    }

    pub fn record_hold(
        &mut self,
        token: OperationToken,
        delay: Duration,
        timestamp: TInstant,
    ) -> EventId {
        self.record(
            TelemetryEventKind::HoldScheduled,
            TelemetryPayload::Hold(HoldTelemetry { token, delay }),
            timestamp,
        )
    }

    /// Appends a record and returns its id.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}
