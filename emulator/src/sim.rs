//! Simulated radio stack backing the emulator.
//!
//! Every request is answered by posting events through the [`EventSink`] with
//! delays that roughly follow a real controller. Nothing is ever cancelled:
//! the timeout of a session that has since been superseded is still delivered,
//! which is exactly the traffic the coordinator has to discard.

use std::time::Duration;

use harness_core::radio::{
    AddressType, AdvertisingReport, AdvertisingStarted, Connection, ConnectionHandle,
    ConnectionRole, EventSink, OperationToken, Peer, PeerAddress, PeriodicAdvertisingInfo,
    PeriodicIntervalBounds, PeriodicSync, RadioError, RadioEvent, RadioEventKind, RadioPlatform,
    ScanStarted, SyncHandle, TokenSource, device_name,
};

pub const DEVICE_NAME: &str = "Power Consumption Test";
pub const LOCAL_ADDRESS: [u8; 6] = [0xc0, 0xde, 0x00, 0x00, 0x00, 0x01];

const START_LATENCY: Duration = Duration::from_millis(5);
const CONNECT_LATENCY: Duration = Duration::from_millis(60);
const CONNECT_FAILURE_AFTER: Duration = Duration::from_millis(2_000);
const DISCONNECT_LATENCY: Duration = Duration::from_millis(20);
const REPORT_REPEAT: Duration = Duration::from_millis(1_000);

/// HCI reason "remote user terminated connection".
const REMOTE_USER_TERMINATED: u8 = 0x13;
/// HCI reason "connection terminated by local host".
const LOCAL_HOST_TERMINATED: u8 = 0x16;
/// HCI status "connection failed to be established".
const CONNECTION_FAILED: i32 = 0x3e;

/// How a simulated peer advertises.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SimAdvertising {
    Legacy,
    Periodic { sid: u8, interval: Duration },
}

/// Scripted advertiser visible to scans.
#[derive(Clone, Debug)]
pub struct SimPeer {
    pub name: Option<&'static str>,
    pub address: PeerAddress,
    pub advertising: SimAdvertising,
    /// Delay from scan start to the first report.
    pub first_seen: Duration,
    pub connectable: bool,
    /// Peer drops the connection or sync on its own after this long.
    pub drops_after: Option<Duration>,
}

impl SimPeer {
    fn peer(&self) -> Peer {
        Peer::new(AddressType::Random, self.address)
    }

    fn report(&self) -> AdvertisingReport {
        AdvertisingReport {
            peer: self.peer(),
            local_name: self.name.map(device_name),
            periodic: match self.advertising {
                SimAdvertising::Legacy => None,
                SimAdvertising::Periodic { sid, interval } => {
                    Some(PeriodicAdvertisingInfo { sid, interval })
                }
            },
        }
    }
}

/// Remote device that connects to us while we advertise.
#[derive(Copy, Clone, Debug)]
pub struct RemoteCentral {
    pub address: PeerAddress,
    pub connects_after: Duration,
    pub disconnects_after: Duration,
}

/// Radio environment the simulated stack operates in.
#[derive(Clone, Debug, Default)]
pub struct SimWorld {
    pub peers: Vec<SimPeer>,
    pub remote_central: Option<RemoteCentral>,
}

impl SimWorld {
    /// One peer of each kind running the same harness, plus a bystander.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            peers: vec![
                bystander("Thermostat", [0x10, 0x20, 0x30, 0x40, 0x50, 0x60], 400),
                SimPeer {
                    name: Some(DEVICE_NAME),
                    address: PeerAddress::from_be_bytes([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]),
                    advertising: SimAdvertising::Legacy,
                    first_seen: Duration::from_millis(1_200),
                    connectable: true,
                    drops_after: None,
                },
                SimPeer {
                    name: Some(DEVICE_NAME),
                    address: PeerAddress::from_be_bytes([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xf0]),
                    advertising: SimAdvertising::Periodic {
                        sid: 3,
                        interval: Duration::from_millis(1_000),
                    },
                    first_seen: Duration::from_millis(1_600),
                    connectable: false,
                    drops_after: None,
                },
            ],
            remote_central: Some(RemoteCentral {
                address: PeerAddress::from_be_bytes([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]),
                connects_after: Duration::from_millis(3_000),
                disconnects_after: Duration::from_millis(5_000),
            }),
        }
    }

    /// Nobody around: every session ends in a timeout.
    #[must_use]
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Busy airwaves where the matching peers show up late and drop early.
    #[must_use]
    pub fn crowd() -> Self {
        let mut peers = vec![
            bystander("Thermostat", [0x10, 0x20, 0x30, 0x40, 0x50, 0x60], 150),
            bystander("Headphones", [0x10, 0x20, 0x30, 0x40, 0x50, 0x61], 300),
            bystander("Tag", [0x10, 0x20, 0x30, 0x40, 0x50, 0x62], 450),
        ];
        peers.push(SimPeer {
            name: None,
            address: PeerAddress::from_be_bytes([0x10, 0x20, 0x30, 0x40, 0x50, 0x63]),
            advertising: SimAdvertising::Periodic {
                sid: 1,
                interval: Duration::from_millis(250),
            },
            first_seen: Duration::from_millis(700),
            connectable: false,
            drops_after: None,
        });
        peers.push(SimPeer {
            name: Some(DEVICE_NAME),
            address: PeerAddress::from_be_bytes([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]),
            advertising: SimAdvertising::Legacy,
            first_seen: Duration::from_millis(6_000),
            connectable: true,
            drops_after: Some(Duration::from_millis(4_000)),
        });
        peers.push(SimPeer {
            name: Some(DEVICE_NAME),
            address: PeerAddress::from_be_bytes([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xf0]),
            advertising: SimAdvertising::Periodic {
                sid: 3,
                interval: Duration::from_millis(1_000),
            },
            first_seen: Duration::from_millis(6_500),
            connectable: false,
            drops_after: Some(Duration::from_millis(3_000)),
        });
        Self {
            peers,
            remote_central: None,
        }
    }

    /// Looks up a world preset by name.
    ///
    /// # Errors
    ///
    /// Returns a message naming the unknown preset.
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("default") {
            Ok(Self::standard())
        } else if tag.eq_ignore_ascii_case("quiet") {
            Ok(Self::quiet())
        } else if tag.eq_ignore_ascii_case("crowd") {
            Ok(Self::crowd())
        } else {
            Err(format!("Unknown world `{tag}`"))
        }
    }

    fn find(&self, address: PeerAddress) -> Option<&SimPeer> {
        self.peers.iter().find(|peer| peer.address == address)
    }
}

fn bystander(name: &'static str, address: [u8; 6], first_seen_ms: u64) -> SimPeer {
    SimPeer {
        name: Some(name),
        address: PeerAddress::from_be_bytes(address),
        advertising: SimAdvertising::Legacy,
        first_seen: Duration::from_millis(first_seen_ms),
        connectable: true,
        drops_after: None,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Activity {
    Advertising { token: OperationToken, periodic: bool },
    Scanning(OperationToken),
}

/// [`RadioPlatform`] backed by a [`SimWorld`].
pub struct SimulatedRadio {
    world: SimWorld,
    periodic_available: bool,
    periodic_interval: Duration,
    tokens: TokenSource,
    activity: Option<Activity>,
    periodic_bounds: Option<PeriodicIntervalBounds>,
    connection: Option<(ConnectionHandle, OperationToken)>,
    sync: Option<SyncHandle>,
    next_handle: u16,
}

impl SimulatedRadio {
    #[must_use]
    pub fn new(world: SimWorld, periodic_interval: Duration) -> Self {
        Self {
            world,
            periodic_available: true,
            periodic_interval,
            tokens: TokenSource::new(),
            activity: None,
            periodic_bounds: None,
            connection: None,
            sync: None,
            next_handle: 0,
        }
    }

    /// Simulates a controller without periodic advertising support.
    #[must_use]
    pub fn without_periodic_advertising(mut self) -> Self {
        self.periodic_available = false;
        self
    }

    fn allocate_handle(&mut self) -> u16 {
        self.next_handle = self.next_handle.wrapping_add(1);
        self.next_handle
    }

    // Sessions are not timed here; a new one replaces whatever the last left behind.
    fn begin_advertising(
        &mut self,
        duration: Duration,
        periodic: bool,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        let token = self.tokens.issue();
        let started = AdvertisingStarted {
            duration,
            periodic_interval: periodic.then_some(self.periodic_interval),
        };
        sink.deliver_after(
            START_LATENCY,
            RadioEvent::new(token, RadioEventKind::AdvertisingStarted(started)),
        )?;

        let central = self
            .world
            .remote_central
            .filter(|central| central.connects_after < duration);
        if let Some(central) = central {
            let handle = ConnectionHandle(self.allocate_handle());
            let connection = Connection {
                peer: Peer::new(AddressType::Random, central.address),
                role: ConnectionRole::Peripheral,
                handle,
            };
            sink.deliver_after(
                central.connects_after,
                RadioEvent::new(token, RadioEventKind::Connected(Ok(connection))),
            )?;
            sink.deliver_after(
                central.connects_after + central.disconnects_after,
                RadioEvent::new(
                    token,
                    RadioEventKind::Disconnected {
                        reason: REMOTE_USER_TERMINATED,
                    },
                ),
            )?;
            self.connection = Some((handle, token));
        }

        sink.deliver_after(
            duration,
            RadioEvent::new(token, RadioEventKind::AdvertisingTimeout),
        )?;
        self.activity = Some(Activity::Advertising { token, periodic });
        Ok(token)
    }

    fn begin_scan(
        &mut self,
        duration: Duration,
        periodic: bool,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        let token = self.tokens.issue();
        sink.deliver_after(
            START_LATENCY,
            RadioEvent::new(token, RadioEventKind::ScanStarted(ScanStarted { duration, periodic })),
        )?;

        // A periodic scan still hears legacy advertisers; a legacy scan only
        // hears legacy ones.
        for peer in &self.world.peers {
            if !periodic && peer.advertising != SimAdvertising::Legacy {
                continue;
            }
            let mut seen_at = peer.first_seen;
            for _ in 0..2 {
                if seen_at >= duration {
                    break;
                }
                sink.deliver_after(
                    seen_at,
                    RadioEvent::new(token, RadioEventKind::AdvertisingReport(peer.report())),
                )?;
                seen_at += REPORT_REPEAT;
            }
        }

        sink.deliver_after(duration, RadioEvent::new(token, RadioEventKind::ScanTimeout))?;
        self.activity = Some(Activity::Scanning(token));
        Ok(token)
    }

    fn end_scan_for_link(&mut self) {
        if matches!(self.activity, Some(Activity::Scanning(_))) {
            self.activity = None;
        }
    }

    fn is_advertising(&self, token: OperationToken) -> bool {
        matches!(
            self.activity,
            Some(Activity::Advertising { token: active, .. }) if active == token
        )
    }
}

impl RadioPlatform for SimulatedRadio {
    fn device_name(&self) -> &str {
        DEVICE_NAME
    }

    fn local_address(&self) -> PeerAddress {
        PeerAddress::from_be_bytes(LOCAL_ADDRESS)
    }

    fn is_periodic_advertising_available(&self) -> bool {
        self.periodic_available
    }

    fn start_advertising(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.begin_advertising(duration, false, sink)
    }

    fn start_periodic_advertising(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        if !self.periodic_available {
            return Err(RadioError::Unsupported);
        }
        self.begin_advertising(duration, true, sink)
    }

    fn configure_periodic_advertising(
        &mut self,
        token: OperationToken,
        bounds: PeriodicIntervalBounds,
    ) -> Result<(), RadioError> {
        if !self.is_advertising(token) {
            return Err(RadioError::InvalidHandle);
        }
        if !bounds.contains(self.periodic_interval) {
            return Err(RadioError::Rejected(-22));
        }
        self.periodic_bounds = Some(bounds);
        Ok(())
    }

    fn enable_periodic_advertising(&mut self, token: OperationToken) -> Result<(), RadioError> {
        match self.activity {
            Some(Activity::Advertising {
                token: active,
                periodic: true,
            }) if active == token && self.periodic_bounds.is_some() => Ok(()),
            Some(Activity::Advertising { token: active, .. }) if active == token => {
                Err(RadioError::Rejected(-22))
            }
            _ => Err(RadioError::InvalidHandle),
        }
    }

    fn stop_advertising(&mut self, token: OperationToken) -> Result<(), RadioError> {
        if !self.is_advertising(token) {
            return Err(RadioError::InvalidHandle);
        }
        self.activity = None;
        self.periodic_bounds = None;
        Ok(())
    }

    fn start_scan(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.begin_scan(duration, false, sink)
    }

    fn start_scan_for_periodic_advertising(
        &mut self,
        duration: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.begin_scan(duration, true, sink)
    }

    fn stop_scan(&mut self, token: OperationToken) -> Result<(), RadioError> {
        match self.activity {
            Some(Activity::Scanning(active)) if active == token => {
                self.activity = None;
                Ok(())
            }
            _ => Err(RadioError::InvalidHandle),
        }
    }

    fn establish_connection(
        &mut self,
        peer: Peer,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.end_scan_for_link();
        let token = self.tokens.issue();

        let target = self
            .world
            .find(peer.address)
            .filter(|candidate| candidate.connectable)
            .map(|candidate| candidate.drops_after);
        let Some(drops_after) = target else {
            sink.deliver_after(
                CONNECT_FAILURE_AFTER,
                RadioEvent::new(
                    token,
                    RadioEventKind::Connected(Err(RadioError::Failed(CONNECTION_FAILED))),
                ),
            )?;
            return Ok(token);
        };

        let handle = ConnectionHandle(self.allocate_handle());
        let connection = Connection {
            peer,
            role: ConnectionRole::Central,
            handle,
        };
        sink.deliver_after(
            CONNECT_LATENCY,
            RadioEvent::new(token, RadioEventKind::Connected(Ok(connection))),
        )?;
        if let Some(after) = drops_after {
            sink.deliver_after(
                CONNECT_LATENCY + after,
                RadioEvent::new(
                    token,
                    RadioEventKind::Disconnected {
                        reason: REMOTE_USER_TERMINATED,
                    },
                ),
            )?;
        }
        self.connection = Some((handle, token));
        Ok(token)
    }

    fn sync_to_periodic_advertising(
        &mut self,
        sid: u8,
        peer: Peer,
        sync_timeout: Duration,
        sink: &mut dyn EventSink,
    ) -> Result<OperationToken, RadioError> {
        self.end_scan_for_link();
        let token = self.tokens.issue();

        let train = self.world.find(peer.address).and_then(|candidate| {
            match candidate.advertising {
                SimAdvertising::Periodic {
                    sid: advertised,
                    interval,
                } if advertised == sid => Some((interval, candidate.drops_after)),
                _ => None,
            }
        });
        let Some((interval, drops_after)) = train else {
            sink.deliver_after(
                sync_timeout,
                RadioEvent::new(
                    token,
                    RadioEventKind::PeriodicSync(Err(RadioError::Failed(CONNECTION_FAILED))),
                ),
            )?;
            return Ok(token);
        };

        let handle = SyncHandle(self.allocate_handle());
        // The stack reports the sync once the first periodic packet arrives.
        sink.deliver_after(
            interval,
            RadioEvent::new(
                token,
                RadioEventKind::PeriodicSync(Ok(PeriodicSync { peer, sid, handle })),
            ),
        )?;
        if let Some(after) = drops_after {
            sink.deliver_after(
                interval + after,
                RadioEvent::new(token, RadioEventKind::SyncLost),
            )?;
        }
        self.sync = Some(handle);
        Ok(token)
    }

    fn disconnect(
        &mut self,
        handle: ConnectionHandle,
        sink: &mut dyn EventSink,
    ) -> Result<(), RadioError> {
        let token = match self.connection {
            Some((active, token)) if active == handle => token,
            _ => return Err(RadioError::InvalidHandle),
        };
        self.connection = None;

        // Completion carries the token of the session that created the link.
        sink.deliver_after(
            DISCONNECT_LATENCY,
            RadioEvent::new(
                token,
                RadioEventKind::Disconnected {
                    reason: LOCAL_HOST_TERMINATED,
                },
            ),
        )
    }

    fn stop_sync(&mut self, handle: SyncHandle) -> Result<(), RadioError> {
        if self.sync != Some(handle) {
            return Err(RadioError::InvalidHandle);
        }
        self.sync = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<(Duration, RadioEvent)>,
    }

    impl EventSink for RecordingSink {
        fn deliver(&mut self, event: RadioEvent) -> Result<(), RadioError> {
            self.deliver_after(Duration::ZERO, event)
        }

        fn deliver_after(&mut self, delay: Duration, event: RadioEvent) -> Result<(), RadioError> {
            self.events.push((delay, event));
            Ok(())
        }
    }

    impl RecordingSink {
        fn kinds(&self) -> Vec<(u128, &RadioEventKind)> {
            self.events
                .iter()
                .map(|(delay, event)| (delay.as_millis(), &event.kind))
                .collect()
        }
    }

    fn radio(world: SimWorld) -> SimulatedRadio {
        SimulatedRadio::new(world, Duration::from_millis(1_000))
    }

    fn address(last: u8) -> PeerAddress {
        PeerAddress::from_be_bytes([0xaa, 0xbb, 0xcc, 0xdd, 0xee, last])
    }

    #[test]
    fn legacy_scan_repeats_reports_and_times_out() {
        let mut radio = radio(SimWorld::standard());
        let mut sink = RecordingSink::default();
        let token = radio
            .start_scan(Duration::from_secs(10), &mut sink)
            .expect("scan");

        assert!(sink.events.iter().all(|(_, event)| event.token == token));
        let reports: Vec<(u128, PeerAddress)> = sink
            .kinds()
            .into_iter()
            .filter_map(|(at, kind)| match kind {
                RadioEventKind::AdvertisingReport(report) => Some((at, report.peer.address)),
                _ => None,
            })
            .collect();
        assert_eq!(
            reports,
            vec![
                (400, PeerAddress::from_be_bytes([0x10, 0x20, 0x30, 0x40, 0x50, 0x60])),
                (1_400, PeerAddress::from_be_bytes([0x10, 0x20, 0x30, 0x40, 0x50, 0x60])),
                (1_200, address(0xff)),
                (2_200, address(0xff)),
            ]
        );
        assert!(matches!(
            sink.kinds().last(),
            Some((10_000, RadioEventKind::ScanTimeout))
        ));
    }

    #[test]
    fn periodic_scan_also_hears_periodic_trains() {
        let mut radio = radio(SimWorld::standard());
        let mut sink = RecordingSink::default();
        radio
            .start_scan_for_periodic_advertising(Duration::from_secs(10), &mut sink)
            .expect("scan");

        let periodic = sink
            .events
            .iter()
            .filter(|(_, event)| match &event.kind {
                RadioEventKind::AdvertisingReport(report) => report.is_periodic(),
                _ => false,
            })
            .count();
        assert_eq!(periodic, 2);
    }

    #[test]
    fn reports_after_the_scan_window_are_not_delivered() {
        let mut radio = radio(SimWorld::standard());
        let mut sink = RecordingSink::default();
        radio
            .start_scan(Duration::from_millis(1_000), &mut sink)
            .expect("scan");

        let reports = sink
            .events
            .iter()
            .filter(|(_, event)| matches!(event.kind, RadioEventKind::AdvertisingReport(_)))
            .count();
        assert_eq!(reports, 1);
    }

    #[test]
    fn remote_central_connects_under_the_advertising_token() {
        let mut radio = radio(SimWorld::standard());
        let mut sink = RecordingSink::default();
        let token = radio
            .start_advertising(Duration::from_secs(10), &mut sink)
            .expect("advertise");

        let connected = sink
            .events
            .iter()
            .find_map(|(delay, event)| match event.kind {
                RadioEventKind::Connected(Ok(connection)) => {
                    Some((*delay, event.token, connection))
                }
                _ => None,
            })
            .expect("connection");
        assert_eq!(connected.0, Duration::from_millis(3_000));
        assert_eq!(connected.1, token);
        assert_eq!(connected.2.role, ConnectionRole::Peripheral);
        assert!(matches!(
            sink.kinds().last(),
            Some((10_000, RadioEventKind::AdvertisingTimeout))
        ));
    }

    #[test]
    fn quiet_world_only_times_out() {
        let mut radio = radio(SimWorld::quiet());
        let mut sink = RecordingSink::default();
        radio
            .start_advertising(Duration::from_secs(2), &mut sink)
            .expect("advertise");

        assert_eq!(sink.events.len(), 2);
    }

    #[test]
    fn connecting_to_an_unknown_peer_fails_late() {
        let mut radio = radio(SimWorld::standard());
        let mut sink = RecordingSink::default();
        let scan = radio
            .start_scan(Duration::from_secs(10), &mut sink)
            .expect("scan");
        sink.events.clear();

        let token = radio
            .establish_connection(Peer::new(AddressType::Public, address(0x42)), &mut sink)
            .expect("connect");

        assert_ne!(token, scan);
        assert!(matches!(
            sink.events.as_slice(),
            [(
                delay,
                RadioEvent {
                    kind: RadioEventKind::Connected(Err(RadioError::Failed(0x3e))),
                    ..
                },
            )] if *delay == CONNECT_FAILURE_AFTER
        ));
        assert_eq!(radio.stop_scan(scan), Err(RadioError::InvalidHandle));
    }

    #[test]
    fn local_disconnect_completes_under_the_link_token() {
        let mut radio = radio(SimWorld::standard());
        let mut sink = RecordingSink::default();
        radio
            .start_scan(Duration::from_secs(10), &mut sink)
            .expect("scan");
        let token = radio
            .establish_connection(Peer::new(AddressType::Random, address(0xff)), &mut sink)
            .expect("connect");
        let handle = match sink.events.last() {
            Some((_, RadioEvent { kind: RadioEventKind::Connected(Ok(connection)), .. })) => {
                connection.handle
            }
            other => panic!("unexpected event: {other:?}"),
        };
        sink.events.clear();

        assert_eq!(
            radio.disconnect(ConnectionHandle(handle.0 + 1), &mut sink),
            Err(RadioError::InvalidHandle)
        );
        radio.disconnect(handle, &mut sink).expect("disconnect");
        assert!(matches!(
            sink.events.as_slice(),
            [(
                _,
                RadioEvent {
                    token: disconnected,
                    kind: RadioEventKind::Disconnected { reason: 0x16 },
                },
            )] if *disconnected == token
        ));
    }

    #[test]
    fn sync_to_unknown_train_fails_after_the_sync_timeout() {
        let mut radio = radio(SimWorld::standard());
        let mut sink = RecordingSink::default();
        radio
            .sync_to_periodic_advertising(
                7,
                Peer::new(AddressType::Random, address(0xf0)),
                Duration::from_secs(5),
                &mut sink,
            )
            .expect("sync");

        assert!(matches!(
            sink.kinds().as_slice(),
            [(5_000, RadioEventKind::PeriodicSync(Err(_)))]
        ));
    }

    #[test]
    fn periodic_enable_requires_configured_bounds() {
        let mut radio = radio(SimWorld::quiet());
        let mut sink = RecordingSink::default();
        let token = radio
            .start_periodic_advertising(Duration::from_secs(10), &mut sink)
            .expect("advertise");

        assert_eq!(
            radio.enable_periodic_advertising(token),
            Err(RadioError::Rejected(-22))
        );
        let narrow =
            PeriodicIntervalBounds::new(Duration::from_millis(100), Duration::from_millis(200));
        assert_eq!(
            radio.configure_periodic_advertising(token, narrow),
            Err(RadioError::Rejected(-22))
        );
        let bounds = PeriodicIntervalBounds::around(Duration::from_millis(1_000));
        radio
            .configure_periodic_advertising(token, bounds)
            .expect("configure");
        radio.enable_periodic_advertising(token).expect("enable");
        assert_eq!(radio.periodic_bounds, Some(bounds));
    }

    #[test]
    fn controller_without_periodic_support_refuses() {
        let mut radio = radio(SimWorld::quiet()).without_periodic_advertising();
        let mut sink = RecordingSink::default();
        assert!(!radio.is_periodic_advertising_available());
        assert_eq!(
            radio.start_periodic_advertising(Duration::from_secs(1), &mut sink),
            Err(RadioError::Unsupported)
        );
    }

    #[test]
    fn world_presets_resolve_by_name() {
        assert!(SimWorld::from_tag("Crowd").is_ok());
        assert!(SimWorld::from_tag("quiet").expect("preset").peers.is_empty());
        assert!(SimWorld::from_tag("busy").is_err());
    }
}
