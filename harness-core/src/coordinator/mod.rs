//! Role coordinator: walks the harness through advertising, scanning,
//! connection and periodic-sync roles in response to console commands and
//! radio events.
//!
//! The coordinator owns the radio platform and tracks at most one outstanding
//! session as a [`PendingOperation`]. A radio event is acted on only when it
//! carries that session's token and is valid for the session's phase; anything
//! else is discarded, counted, and recorded in telemetry without touching the
//! console. This is what keeps a late scan timeout or a trailing advertising
//! report from disturbing a connection that is already in flight.

mod state;

use core::fmt::Write as _;
use core::time::Duration;

use heapless::String;

use crate::config::HarnessConfig;
use crate::console::{
    ADDRESS_DIGITS, ADDRESS_TEXT_LEN, Console, ConsoleCommand, PeerTarget, parse_target_address,
};
use crate::radio::{
    AdvertisingMode, AdvertisingReport, AdvertisingStarted, Connection, ConnectionRole,
    EventSink, OperationKind, OperationToken, PeriodicSync, RadioError, RadioEvent,
    RadioEventKind, RadioMode, RadioPlatform, RadioRequest, ScanStarted,
};
use crate::scheduler::{Clock, EventQueue, QueueFull};
use crate::telemetry::{
    DiscardedTask, TelemetryEventKind, TelemetryInstant, TelemetryPayload, TelemetryRecorder,
};

pub use state::{
    CoordinatorState, DiscardReason, HarnessTask, OperationPhase, PendingOperation,
};

// Console output is best effort; a failing sink must not stall the radio flow.
macro_rules! say {
    ($self:ident, $($arg:tt)*) => {{
        let _ = write!($self.console, $($arg)*);
    }};
}

/// Scheduler operations the coordinator relies on.
pub trait HarnessQueue<TInstant>: EventSink {
    fn now(&self) -> TInstant;

    /// Posts `task` to run after `delay`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueFull`] carrying the task when it cannot be queued.
    fn schedule(
        &mut self,
        delay: Duration,
        task: HarnessTask,
    ) -> Result<(), QueueFull<HarnessTask>>;
}

impl<C, const CAPACITY: usize> HarnessQueue<C::Instant> for EventQueue<HarnessTask, C, CAPACITY>
where
    C: Clock,
{
    fn now(&self) -> C::Instant {
        EventQueue::now(self)
    }

    fn schedule(
        &mut self,
        delay: Duration,
        task: HarnessTask,
    ) -> Result<(), QueueFull<HarnessTask>> {
        self.post_after(delay, task)
    }
}

pub struct Coordinator<P, W, TInstant>
where
    TInstant: TelemetryInstant,
{
    platform: P,
    console: W,
    config: HarnessConfig,
    periodic: bool,
    target: PeerTarget,
    state: CoordinatorState,
    pending: Option<PendingOperation>,
    telemetry: TelemetryRecorder<TInstant>,
    discarded: u32,
    input_closed: bool,
}

impl<P, W, TInstant> Coordinator<P, W, TInstant>
where
    P: RadioPlatform,
    W: Console,
    TInstant: TelemetryInstant,
{
    /// Creates an idle coordinator that owns `platform` and `console`.
    #[must_use]
    pub fn new(platform: P, console: W, config: HarnessConfig) -> Self {
        Self {
            platform,
            console,
            config,
            periodic: false,
            target: PeerTarget::Name,
            state: CoordinatorState::Idle,
            pending: None,
            telemetry: TelemetryRecorder::new(),
            discarded: 0,
            input_closed: false,
        }
    }

    /// Presets the peer matching mode.
    #[must_use]
    pub fn with_target(mut self, target: PeerTarget) -> Self {
        self.target = target;
        self
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn target(&self) -> PeerTarget {
        self.target
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Outstanding session, if any.
    pub fn pending(&self) -> Option<PendingOperation> {
        self.pending
    }

    pub fn pending_token(&self) -> Option<OperationToken> {
        self.pending.map(|pending| pending.token)
    }

    /// Returns `true` while a connect/sync attempt or its resulting link is outstanding.
    pub fn is_connecting_or_syncing(&self) -> bool {
        self.pending
            .is_some_and(|pending| pending.is_linking_or_linked())
    }

    /// Returns `true` once console input has closed; no further prompts are shown.
    pub fn input_closed(&self) -> bool {
        self.input_closed
    }

    /// Number of tasks dropped as stale or out of phase.
    pub fn discarded_events(&self) -> u32 {
        self.discarded
    }

    pub fn telemetry(&self) -> &TelemetryRecorder<TInstant> {
        &self.telemetry
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut W {
        &mut self.console
    }

    /// Prints the device banner and queues the first prompt.
    pub fn start<Q>(&mut self, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        let address = self.platform.local_address();
        say!(
            self,
            "#DEV - {} - {}\n",
            self.platform.device_name(),
            address
        );
        self.post_prompt(queue);
    }

    /// Executes one scheduler task.
    pub fn handle<Q>(&mut self, task: HarnessTask, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        match task {
            HarnessTask::Prompt => self.prompt(queue),
            HarnessTask::Radio(event) => self.on_radio_event(event, queue),
            HarnessTask::HoldExpired(token) => self.on_hold_expired(token, queue),
        }
    }

    fn prompt<Q>(&mut self, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        if self.input_closed || self.pending.is_some() {
            return;
        }

        self.set_state(CoordinatorState::Idle, queue);
        say!(
            self,
            "Enter one of the following commands:\n \
             * a - Advertise\n \
             * s - Scan\n \
             * p - Toggle periodic adv/scan flag (currently {})\n \
             * m - Set/unset peer MAC address to connect by MAC instead of name\n",
            on_off(self.periodic)
        );

        loop {
            say!(self, "Enter command: ");
            let Some(byte) = self.console.read_byte() else {
                self.close_input();
                return;
            };
            if byte.is_ascii() {
                let _ = self.console.write_char(char::from(byte));
            }

            match ConsoleCommand::from_byte(byte) {
                Some(command) => {
                    say!(self, "\n");
                    self.run_command(command, queue);
                    return;
                }
                None if byte.is_ascii_graphic() || byte == b' ' => {
                    say!(self, "Invalid choice '{}'. ", char::from(byte));
                }
                None => {}
            }
        }
    }

    fn run_command<Q>(&mut self, command: ConsoleCommand, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        match command {
            ConsoleCommand::Advertise => {
                self.start_session(RadioMode::advertise(self.periodic), queue);
            }
            ConsoleCommand::Scan => self.start_session(RadioMode::scan(self.periodic), queue),
            ConsoleCommand::TogglePeriodic => {
                if self.config.periodic_sync_supported {
                    self.periodic = !self.periodic;
                    say!(self, "Periodic mode toggled {}\n", on_off(self.periodic));
                } else {
                    say!(self, "Program was not built with support for periodic sync\n");
                }
                self.post_prompt(queue);
            }
            ConsoleCommand::SetTarget => {
                self.read_target();
                if !self.input_closed {
                    self.post_prompt(queue);
                }
            }
        }
    }

    fn read_target(&mut self) {
        say!(
            self,
            " * Set target MAC by inputting 6 hex bytes (12 digits) with optional : separators\n \
             * Unset target MAC and use name to match by pressing ENTER with no input\n\
             Target MAC: "
        );

        let mut entry: String<ADDRESS_TEXT_LEN> = String::new();
        let mut typed: String<ADDRESS_DIGITS> = String::new();
        while typed.len() < ADDRESS_DIGITS {
            let Some(byte) = self.console.read_byte() else {
                self.close_input();
                return;
            };
            if byte == b'\n' || byte == b'\r' {
                break;
            }
            if !byte.is_ascii_hexdigit() {
                continue;
            }

            let digit = char::from(byte.to_ascii_lowercase());
            let _ = entry.push(digit);
            let _ = typed.push(digit);
            let _ = self.console.write_char(digit);
            if typed.len() % 2 == 0 && typed.len() < ADDRESS_DIGITS {
                let _ = entry.push(':');
                let _ = self.console.write_char(':');
            }
        }

        match parse_target_address(&entry) {
            Ok(None) => {
                self.target = PeerTarget::Name;
                say!(
                    self,
                    "\nWill look for peer with name \"{}\"\n",
                    self.platform.device_name()
                );
            }
            Ok(Some(address)) => {
                self.target = PeerTarget::Address(address);
                say!(self, "\nWill look for peer with MAC \"{}\"\n", address);
            }
            Err(_) => say!(self, "\nInvalid MAC \"{}\"\n", typed),
        }
    }

    fn start_session<Q>(&mut self, mode: RadioMode, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        if mode.advertising.is_periodic() && !self.platform.is_periodic_advertising_available() {
            say!(self, "Periodic advertising is not available on this controller\n");
            self.post_prompt(queue);
            return;
        }

        let advertise_for = self.config.advertise_duration;
        let scan_for = self.config.scan_duration;
        let (request, result) = match (mode.operation, mode.advertising) {
            (OperationKind::Advertise, AdvertisingMode::Legacy) => (
                RadioRequest::StartAdvertising,
                self.platform.start_advertising(advertise_for, queue),
            ),
            (OperationKind::Advertise, AdvertisingMode::Periodic) => (
                RadioRequest::StartPeriodicAdvertising,
                self.platform.start_periodic_advertising(advertise_for, queue),
            ),
            (OperationKind::Scan, AdvertisingMode::Legacy) => (
                RadioRequest::StartScan,
                self.platform.start_scan(scan_for, queue),
            ),
            (OperationKind::Scan, AdvertisingMode::Periodic) => (
                RadioRequest::StartPeriodicScan,
                self.platform
                    .start_scan_for_periodic_advertising(scan_for, queue),
            ),
        };

        match result {
            Ok(token) => {
                self.telemetry
                    .record_request(request, Some(token), queue.now());
                self.pending = Some(PendingOperation::new(token, mode));
            }
            Err(error) => {
                self.report_failure(request, error, queue);
                self.finish(queue);
            }
        }
    }

    fn on_radio_event<Q>(&mut self, event: RadioEvent, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        let task = DiscardedTask::Event(event.kind.tag());
        let failure = event.kind.failure();
        let pending = match self.pending {
            Some(pending) if pending.token == event.token => pending,
            _ => {
                self.report_ignored_failure(task, event.token, failure);
                return self.discard(DiscardReason::StaleToken, task, event.token, queue);
            }
        };

        let handled = match event.kind {
            RadioEventKind::AdvertisingStarted(started) => {
                self.on_advertising_started(pending, started, queue)
            }
            RadioEventKind::AdvertisingTimeout => self.on_advertising_timeout(pending, queue),
            RadioEventKind::ScanStarted(started) => self.on_scan_started(pending, started, queue),
            RadioEventKind::ScanTimeout => self.on_scan_timeout(pending, queue),
            RadioEventKind::AdvertisingReport(report) => self.on_report(pending, &report, queue),
            RadioEventKind::Connected(result) => self.on_connected(pending, result, queue),
            RadioEventKind::Disconnected { .. } => self.on_disconnected(pending, queue),
            RadioEventKind::PeriodicSync(result) => self.on_periodic_sync(pending, result, queue),
            RadioEventKind::SyncLost => self.on_sync_lost(pending, queue),
        };

        if let Err(reason) = handled {
            self.report_ignored_failure(task, event.token, failure);
            self.discard(reason, task, event.token, queue);
        }
    }

    /// A failed completion is still shown even when it no longer applies.
    fn report_ignored_failure(
        &mut self,
        task: DiscardedTask,
        token: OperationToken,
        failure: Option<RadioError>,
    ) {
        if let (DiscardedTask::Event(tag), Some(error)) = (task, failure) {
            say!(
                self,
                "Ignored {} for {}: error {} ({})\n",
                tag,
                token,
                error.code(),
                error
            );
        }
    }

    fn on_advertising_started<Q>(
        &mut self,
        pending: PendingOperation,
        started: AdvertisingStarted,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !pending.is_advertising() || pending.phase != OperationPhase::Requested {
            return Err(DiscardReason::UnexpectedInState);
        }

        self.set_phase(OperationPhase::Active);
        self.set_state(CoordinatorState::Advertising, queue);
        match started.periodic_interval {
            Some(interval) => say!(
                self,
                "Periodic advertising for {} ms started with interval {} ms\n",
                started.duration.as_millis(),
                interval.as_millis()
            ),
            None => say!(
                self,
                "Advertising started for {} ms\n",
                started.duration.as_millis()
            ),
        }

        if pending.mode.advertising.is_periodic() {
            self.start_periodic_train(pending.token, queue);
        }
        Ok(())
    }

    fn start_periodic_train<Q>(&mut self, token: OperationToken, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        let bounds = self.config.periodic_bounds();
        if let Err(error) = self.platform.configure_periodic_advertising(token, bounds) {
            return self.abort_advertising(
                RadioRequest::ConfigurePeriodicAdvertising,
                error,
                token,
                queue,
            );
        }
        self.telemetry.record_request(
            RadioRequest::ConfigurePeriodicAdvertising,
            Some(token),
            queue.now(),
        );

        if let Err(error) = self.platform.enable_periodic_advertising(token) {
            return self.abort_advertising(
                RadioRequest::EnablePeriodicAdvertising,
                error,
                token,
                queue,
            );
        }
        self.telemetry.record_request(
            RadioRequest::EnablePeriodicAdvertising,
            Some(token),
            queue.now(),
        );
    }

    fn abort_advertising<Q>(
        &mut self,
        request: RadioRequest,
        error: RadioError,
        token: OperationToken,
        queue: &mut Q,
    ) where
        Q: HarnessQueue<TInstant>,
    {
        self.report_failure(request, error, queue);
        if let Err(stop_error) = self.platform.stop_advertising(token) {
            self.report_failure(RadioRequest::StopAdvertising, stop_error, queue);
        }
        self.finish(queue);
    }

    fn on_advertising_timeout<Q>(
        &mut self,
        pending: PendingOperation,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !pending.is_advertising()
            || !matches!(
                pending.phase,
                OperationPhase::Requested | OperationPhase::Active
            )
        {
            return Err(DiscardReason::UnexpectedInState);
        }

        self.finish(queue);
        say!(self, "Advertising timed out\n");
        Ok(())
    }

    fn on_scan_started<Q>(
        &mut self,
        pending: PendingOperation,
        started: ScanStarted,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !pending.is_scanning() || pending.phase != OperationPhase::Requested {
            return Err(DiscardReason::UnexpectedInState);
        }

        self.set_phase(OperationPhase::Active);
        self.set_state(CoordinatorState::Scanning, queue);
        say!(
            self,
            "Scanning started for {} ms\n",
            started.duration.as_millis()
        );
        Ok(())
    }

    fn on_scan_timeout<Q>(
        &mut self,
        pending: PendingOperation,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !pending.is_scanning()
            || !matches!(
                pending.phase,
                OperationPhase::Requested | OperationPhase::Active
            )
        {
            return Err(DiscardReason::UnexpectedInState);
        }

        self.finish(queue);
        say!(self, "Scanning timed out\n");
        Ok(())
    }

    fn on_report<Q>(
        &mut self,
        pending: PendingOperation,
        report: &AdvertisingReport,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !pending.is_scanning() || pending.phase != OperationPhase::Active {
            return Err(DiscardReason::UnexpectedInState);
        }

        if self.config.list_scanned_devices {
            say!(
                self,
                "Discovered \"{}\" ({})\n",
                report.display_name(),
                report.peer.address
            );
        }

        if report.is_periodic() != pending.mode.advertising.is_periodic() {
            return Err(DiscardReason::ModeMismatch);
        }

        let Some(kind) = self.target.matches(report, self.platform.device_name()) else {
            return Ok(());
        };
        say!(self, "Peer matched by {}\n", kind);
        self.telemetry
            .record_peer_match(kind, report.peer.address, queue.now());

        let (request, result) = match report.periodic {
            Some(info) => {
                say!(
                    self,
                    "Syncing with peer \"{}\" ({}) with SID {} and periodic interval {} ms\n",
                    report.display_name(),
                    report.peer.address,
                    info.sid,
                    info.interval.as_millis()
                );
                let timeout = self.config.sync_timeout;
                (
                    RadioRequest::SyncToPeriodicAdvertising,
                    self.platform
                        .sync_to_periodic_advertising(info.sid, report.peer, timeout, queue),
                )
            }
            None => {
                say!(
                    self,
                    "Connecting to peer \"{}\" ({})\n",
                    report.display_name(),
                    report.peer.address
                );
                (
                    RadioRequest::EstablishConnection,
                    self.platform.establish_connection(report.peer, queue),
                )
            }
        };

        match result {
            Ok(token) => {
                self.telemetry
                    .record_request(request, Some(token), queue.now());
                self.pending = Some(PendingOperation {
                    token,
                    mode: pending.mode,
                    phase: OperationPhase::Linking,
                });
            }
            Err(error) => {
                self.report_failure(request, error, queue);
                if let Err(stop_error) = self.platform.stop_scan(pending.token) {
                    self.report_failure(RadioRequest::StopScan, stop_error, queue);
                }
                self.finish(queue);
            }
        }
        Ok(())
    }

    fn on_connected<Q>(
        &mut self,
        pending: PendingOperation,
        result: Result<Connection, RadioError>,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        let expected_role = match (pending.mode.operation, pending.phase) {
            (OperationKind::Scan, OperationPhase::Linking)
                if !pending.mode.advertising.is_periodic() =>
            {
                ConnectionRole::Central
            }
            (OperationKind::Advertise, OperationPhase::Requested | OperationPhase::Active) => {
                ConnectionRole::Peripheral
            }
            _ => return Err(DiscardReason::UnexpectedInState),
        };

        let connection = match result {
            Ok(connection) => connection,
            Err(error) => {
                self.report_error(
                    "Connection failed",
                    RadioRequest::EstablishConnection,
                    error,
                    queue,
                );
                // A failed incoming link leaves the advertiser running.
                let stopped = if pending.is_advertising() {
                    self.platform.stop_advertising(pending.token)
                } else {
                    Ok(())
                };
                if let Err(stop_error) = stopped {
                    self.report_failure(RadioRequest::StopAdvertising, stop_error, queue);
                }
                self.finish(queue);
                return Ok(());
            }
        };

        if connection.role != expected_role {
            say!(
                self,
                "Link came up as {} while expecting {}\n",
                connection.role,
                expected_role
            );
        }

        say!(self, "Connected to peer as {}\n", connection.role);
        self.set_phase(OperationPhase::Connected {
            handle: connection.handle,
            role: connection.role,
        });
        match connection.role {
            ConnectionRole::Central => {
                self.set_state(CoordinatorState::ConnectedCentral, queue);
                self.schedule_hold(pending.token, queue);
            }
            ConnectionRole::Peripheral => {
                self.set_state(CoordinatorState::ConnectedPeripheral, queue);
            }
        }
        Ok(())
    }

    fn on_disconnected<Q>(
        &mut self,
        pending: PendingOperation,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !matches!(
            pending.phase,
            OperationPhase::Connected { .. } | OperationPhase::TearingDown
        ) {
            return Err(DiscardReason::UnexpectedInState);
        }

        say!(self, "Disconnected\n");
        self.finish(queue);
        Ok(())
    }

    fn on_periodic_sync<Q>(
        &mut self,
        pending: PendingOperation,
        result: Result<PeriodicSync, RadioError>,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !pending.is_scanning()
            || !pending.mode.advertising.is_periodic()
            || pending.phase != OperationPhase::Linking
        {
            return Err(DiscardReason::UnexpectedInState);
        }

        match result {
            Ok(sync) => {
                say!(self, "Synced with periodic advertising\n");
                self.set_phase(OperationPhase::Synced(sync.handle));
                self.set_state(CoordinatorState::Synced, queue);
                self.schedule_hold(pending.token, queue);
            }
            Err(error) => {
                self.report_error(
                    "Sync with periodic advertising failed",
                    RadioRequest::SyncToPeriodicAdvertising,
                    error,
                    queue,
                );
                self.finish(queue);
            }
        }
        Ok(())
    }

    fn on_sync_lost<Q>(
        &mut self,
        pending: PendingOperation,
        queue: &mut Q,
    ) -> Result<(), DiscardReason>
    where
        Q: HarnessQueue<TInstant>,
    {
        if !matches!(pending.phase, OperationPhase::Synced(_)) {
            return Err(DiscardReason::UnexpectedInState);
        }

        say!(self, "Periodic sync lost\n");
        self.finish(queue);
        Ok(())
    }

    fn schedule_hold<Q>(&mut self, token: OperationToken, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        let delay = self.config.hold_duration;
        match queue.schedule(delay, HarnessTask::HoldExpired(token)) {
            Ok(()) => {
                self.telemetry.record_hold(token, delay, queue.now());
            }
            Err(QueueFull(_)) => {
                self.report_queue_full(queue);
                self.tear_down(queue);
            }
        }
    }

    fn on_hold_expired<Q>(&mut self, token: OperationToken, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        let holding = self.pending.is_some_and(|pending| {
            pending.token == token
                && matches!(
                    pending.phase,
                    OperationPhase::Connected {
                        role: ConnectionRole::Central,
                        ..
                    } | OperationPhase::Synced(_)
                )
        });

        if holding {
            self.tear_down(queue);
        } else {
            self.discard(
                DiscardReason::StaleToken,
                DiscardedTask::HoldExpired,
                token,
                queue,
            );
        }
    }

    fn tear_down<Q>(&mut self, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        let Some(pending) = self.pending else {
            return;
        };

        match pending.phase {
            OperationPhase::Connected { handle, .. } => {
                say!(self, "Triggering disconnect...\n");
                match self.platform.disconnect(handle, queue) {
                    Ok(()) => {
                        self.telemetry.record_request(
                            RadioRequest::Disconnect,
                            Some(pending.token),
                            queue.now(),
                        );
                        self.set_phase(OperationPhase::TearingDown);
                    }
                    Err(error) => {
                        self.report_failure(RadioRequest::Disconnect, error, queue);
                        self.finish(queue);
                    }
                }
            }
            OperationPhase::Synced(handle) => {
                say!(self, "Stopping sync...\n");
                match self.platform.stop_sync(handle) {
                    Ok(()) => {
                        self.telemetry.record_request(
                            RadioRequest::StopSync,
                            Some(pending.token),
                            queue.now(),
                        );
                    }
                    Err(error) => self.report_failure(RadioRequest::StopSync, error, queue),
                }
                self.finish(queue);
            }
            _ => {}
        }
    }

    fn discard<Q>(
        &mut self,
        reason: DiscardReason,
        task: DiscardedTask,
        token: OperationToken,
        queue: &mut Q,
    ) where
        Q: HarnessQueue<TInstant>,
    {
        self.discarded = self.discarded.saturating_add(1);
        self.telemetry
            .record_discard(reason, task, token, queue.now());
    }

    /// Ends the outstanding session and queues the next prompt.
    fn finish<Q>(&mut self, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        self.pending = None;
        self.set_state(CoordinatorState::Idle, queue);
        self.post_prompt(queue);
    }

    fn post_prompt<Q>(&mut self, queue: &mut Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        if self.input_closed {
            return;
        }
        if queue.schedule(Duration::ZERO, HarnessTask::Prompt).is_err() {
            self.report_queue_full(queue);
        }
    }

    fn set_phase(&mut self, phase: OperationPhase) {
        if let Some(pending) = self.pending.as_mut() {
            pending.phase = phase;
        }
    }

    fn set_state<Q>(&mut self, next: CoordinatorState, queue: &Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        if next == self.state {
            return;
        }

        say!(self, "\n#{}\n", next);
        self.telemetry
            .record_state_change(self.state, next, queue.now());
        self.state = next;
    }

    fn report_failure<Q>(&mut self, request: RadioRequest, error: RadioError, queue: &Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        say!(self, "{}: error {} ({})\n", request, error.code(), error);
        self.telemetry
            .record_rejection(request, error, queue.now());
    }

    fn report_error<Q>(
        &mut self,
        context: &str,
        request: RadioRequest,
        error: RadioError,
        queue: &Q,
    ) where
        Q: HarnessQueue<TInstant>,
    {
        say!(self, "{}: error {} ({})\n", context, error.code(), error);
        self.telemetry
            .record_rejection(request, error, queue.now());
    }

    fn report_queue_full<Q>(&mut self, queue: &Q)
    where
        Q: HarnessQueue<TInstant>,
    {
        say!(self, "Scheduler queue full: error {}\n", RadioError::QueueFull.code());
        self.telemetry.record(
            TelemetryEventKind::QueueExhausted,
            TelemetryPayload::none(),
            queue.now(),
        );
    }

    fn close_input(&mut self) {
        self.input_closed = true;
        say!(self, "\nConsole input closed\n");
    }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "ON" } else { "OFF" }
}
