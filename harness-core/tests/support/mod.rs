#![allow(dead_code)]

use core::fmt;
use core::time::Duration;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use harness_core::config::HarnessConfig;
use harness_core::console::Console;
use harness_core::coordinator::{Coordinator, HarnessTask};
use harness_core::radio::{
    AddressType, AdvertisingReport, AdvertisingStarted, Connection, ConnectionHandle,
    ConnectionRole, EventSink, OperationToken, Peer, PeerAddress, PeriodicAdvertisingInfo,
    PeriodicIntervalBounds, PeriodicSync, RadioError, RadioEvent, RadioEventKind, RadioPlatform,
    RadioRequest, ScanStarted, SyncHandle, TokenSource, device_name,
};
use harness_core::scheduler::{Clock, EventQueue, Millis};

pub const DEVICE_NAME: &str = "Power Consumption Test";
pub const PEER_ADDRESS: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
pub const OTHER_ADDRESS: [u8; 6] = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60];

#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).expect("duration fits");
        self.0.set(self.0.get() + millis);
    }
}

impl Clock for ManualClock {
    type Instant = Millis;

    fn now(&self) -> Millis {
        Millis::from_millis(self.0.get())
    }
}

/// Console fed from a byte script; output is captured.
#[derive(Default)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: String,
}

impl fmt::Write for ScriptedConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}

impl Console for ScriptedConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }
}

/// Request recorded by [`FakeRadio`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    StartAdvertising(Duration),
    StartPeriodicAdvertising(Duration),
    ConfigurePeriodic(OperationToken, PeriodicIntervalBounds),
    EnablePeriodic(OperationToken),
    StopAdvertising(OperationToken),
    StartScan(Duration),
    StartPeriodicScan(Duration),
    StopScan(OperationToken),
    Connect(Peer),
    Sync {
        sid: u8,
        peer: Peer,
        timeout: Duration,
    },
    Disconnect(ConnectionHandle),
    StopSync(SyncHandle),
}

/// Radio that records requests and raises no events on its own.
pub struct FakeRadio {
    pub requests: Vec<Request>,
    pub periodic_available: bool,
    failures: Vec<(RadioRequest, RadioError)>,
    tokens: TokenSource,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            periodic_available: true,
            failures: Vec::new(),
            tokens: TokenSource::new(),
        }
    }

    /// Makes the next `request` of this kind fail with `error`.
    pub fn fail_next(&mut self, request: RadioRequest, error: RadioError) {
        self.failures.push((request, error));
    }

    fn outcome(&mut self, request: RadioRequest) -> Result<(), RadioError> {
        match self.failures.iter().position(|(kind, _)| *kind == request) {
            Some(index) => Err(self.failures.remove(index).1),
            None => Ok(()),
        }
    }

    fn session(
        &mut self,
        request: RadioRequest,
        record: Request,
    ) -> Result<OperationToken, RadioError> {
        self.outcome(request)?;
        self.requests.push(record);
        Ok(self.tokens.issue())
    }

    fn simple(&mut self, request: RadioRequest, record: Request) -> Result<(), RadioError> {
        self.outcome(request)?;
        self.requests.push(record);
        Ok(())
    }
}

impl RadioPlatform for FakeRadio {
    fn device_name(&self) -> &str {
        DEVICE_NAME
    }

    fn local_address(&self) -> PeerAddress {
        PeerAddress::from_be_bytes([0xc0, 0xff, 0xee, 0x00, 0x00, 0x01])
    }

    fn is_periodic_advertising_available(&self) -> bool {
        self.periodic_available
    }

    fn start_advertising(
        &mut self,
        duration: Duration,
        _sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.session(
            RadioRequest::StartAdvertising,
            Request::StartAdvertising(duration),
        )
    }

    fn start_periodic_advertising(
        &mut self,
        duration: Duration,
        _sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.session(
            RadioRequest::StartPeriodicAdvertising,
            Request::StartPeriodicAdvertising(duration),
        )
    }

    fn configure_periodic_advertising(
        &mut self,
        token: OperationToken,
        bounds: PeriodicIntervalBounds,
    ) -> Result<(), RadioError> {
        self.simple(
            RadioRequest::ConfigurePeriodicAdvertising,
            Request::ConfigurePeriodic(token, bounds),
        )
    }

    fn enable_periodic_advertising(&mut self, token: OperationToken) -> Result<(), RadioError> {
        self.simple(
            RadioRequest::EnablePeriodicAdvertising,
            Request::EnablePeriodic(token),
        )
    }

    fn stop_advertising(&mut self, token: OperationToken) -> Result<(), RadioError> {
        self.simple(RadioRequest::StopAdvertising, Request::StopAdvertising(token))
    }

    fn start_scan(
        &mut self,
        duration: Duration,
        _sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.session(RadioRequest::StartScan, Request::StartScan(duration))
    }

    fn start_scan_for_periodic_advertising(
        &mut self,
        duration: Duration,
        _sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.session(
            RadioRequest::StartPeriodicScan,
            Request::StartPeriodicScan(duration),
        )
    }

    fn stop_scan(&mut self, token: OperationToken) -> Result<(), RadioError> {
        self.simple(RadioRequest::StopScan, Request::StopScan(token))
    }

    fn establish_connection(
        &mut self,
        peer: Peer,
        _sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.session(RadioRequest::EstablishConnection, Request::Connect(peer))
    }

    fn sync_to_periodic_advertising(
        &mut self,
        sid: u8,
        peer: Peer,
        sync_timeout: Duration,
        _sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.session(
            RadioRequest::SyncToPeriodicAdvertising,
            Request::Sync {
                sid,
                peer,
                timeout: sync_timeout,
            },
        )
    }

    fn disconnect(
        &mut self,
        handle: ConnectionHandle,
        _sink: &mut dyn EventSink,
    ) -> Result<(), RadioError> {
        self.simple(RadioRequest::Disconnect, Request::Disconnect(handle))
    }

    fn stop_sync(&mut self, handle: SyncHandle) -> Result<(), RadioError> {
        self.simple(RadioRequest::StopSync, Request::StopSync(handle))
    }
}

pub type TestCoordinator = Coordinator<FakeRadio, ScriptedConsole, Millis>;

/// Coordinator wired to a manual clock, a fake radio and a scripted console.
pub struct Harness {
    pub clock: ManualClock,
    pub queue: EventQueue<HarnessTask, ManualClock, 32>,
    pub coordinator: TestCoordinator,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self::with_radio(config, FakeRadio::new())
    }

    pub fn with_radio(config: HarnessConfig, radio: FakeRadio) -> Self {
        let clock = ManualClock::default();
        let queue = EventQueue::new(clock.clone());
        let coordinator = Coordinator::new(radio, ScriptedConsole::default(), config);
        Self {
            clock,
            queue,
            coordinator,
        }
    }

    /// Prints the banner and runs until the first prompt has consumed its input.
    pub fn start(config: HarnessConfig, input: &str) -> Self {
        let mut harness = Self::new(config);
        harness.type_keys(input);
        harness.coordinator.start(&mut harness.queue);
        harness.run();
        harness
    }

    pub fn type_keys(&mut self, keys: &str) {
        self.coordinator
            .console_mut()
            .input
            .extend(keys.bytes());
    }

    /// Runs scheduler iterations until nothing is ready at the current time.
    pub fn run(&mut self) -> usize {
        let Self {
            queue, coordinator, ..
        } = self;
        let mut total = 0;
        loop {
            let executed = queue.run_once(|queue, task| coordinator.handle(task, queue));
            if executed == 0 {
                return total;
            }
            total += executed;
        }
    }

    pub fn advance(&mut self, duration: Duration) -> usize {
        self.clock.advance(duration);
        self.run()
    }

    pub fn deliver(&mut self, token: OperationToken, kind: RadioEventKind) {
        self.queue
            .deliver(RadioEvent::new(token, kind))
            .expect("queue has room");
        self.run();
    }

    pub fn token(&self) -> OperationToken {
        self.coordinator.pending_token().expect("pending session")
    }

    pub fn requests(&self) -> &[Request] {
        &self.coordinator.platform().requests
    }

    pub fn radio_mut(&mut self) -> &mut FakeRadio {
        self.coordinator.platform_mut()
    }

    pub fn output(&self) -> &str {
        &self.coordinator.console().output
    }

    pub fn take_output(&mut self) -> String {
        core::mem::take(&mut self.coordinator.console_mut().output)
    }

    pub fn prompts_shown(&self) -> usize {
        self.output().matches("Enter command: ").count()
    }

    pub fn hold_tasks(&self) -> Vec<(OperationToken, Duration)> {
        self.queue
            .pending()
            .iter()
            .filter_map(|scheduled| match scheduled.task() {
                HarnessTask::HoldExpired(token) => Some((*token, scheduled.delay())),
                _ => None,
            })
            .collect()
    }
}

pub fn peer(address: [u8; 6]) -> Peer {
    Peer::new(AddressType::Random, PeerAddress::from_be_bytes(address))
}

pub fn advertising_started(duration: Duration) -> RadioEventKind {
    RadioEventKind::AdvertisingStarted(AdvertisingStarted {
        duration,
        periodic_interval: None,
    })
}

pub fn scan_started(duration: Duration, periodic: bool) -> RadioEventKind {
    RadioEventKind::ScanStarted(ScanStarted { duration, periodic })
}

pub fn legacy_report(address: [u8; 6], name: Option<&str>) -> RadioEventKind {
    RadioEventKind::AdvertisingReport(AdvertisingReport {
        peer: peer(address),
        local_name: name.map(device_name),
        periodic: None,
    })
}

pub fn periodic_report(address: [u8; 6], name: Option<&str>, sid: u8) -> RadioEventKind {
    RadioEventKind::AdvertisingReport(AdvertisingReport {
        peer: peer(address),
        local_name: name.map(device_name),
        periodic: Some(PeriodicAdvertisingInfo {
            sid,
            interval: Duration::from_millis(1_000),
        }),
    })
}

pub fn connected(address: [u8; 6], role: ConnectionRole, handle: u16) -> RadioEventKind {
    RadioEventKind::Connected(Ok(Connection {
        peer: peer(address),
        role,
        handle: ConnectionHandle(handle),
    }))
}

pub fn synced(address: [u8; 6], sid: u8, handle: u16) -> RadioEventKind {
    RadioEventKind::PeriodicSync(Ok(PeriodicSync {
        peer: peer(address),
        sid,
        handle: SyncHandle(handle),
    }))
}

pub fn disconnected() -> RadioEventKind {
    RadioEventKind::Disconnected { reason: 0x13 }
}
