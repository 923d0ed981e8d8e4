use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant as HostInstant};

use harness_core::config::HarnessConfig;
use harness_core::console::{Console, PeerTarget};
use harness_core::coordinator::{Coordinator, HarnessTask};
use harness_core::scheduler::{Clock, EventQueue, Millis};
use harness_core::telemetry::{EventId, TelemetryPayload, TelemetryRecord};

use crate::sim::{SimWorld, SimulatedRadio};

const DEFAULT_QUEUE_DEPTH: usize = 32;

pub const DEFAULT_TRANSCRIPT: &str = "transcripts/emulator-session.log";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Advertise,
    Scan,
    Periodic,
    Target,
}

impl TranscriptProfile {
    pub const ALL: [TranscriptProfile; 4] = [
        TranscriptProfile::Advertise,
        TranscriptProfile::Scan,
        TranscriptProfile::Periodic,
        TranscriptProfile::Target,
    ];

    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Advertise => "transcripts/emulator-advertise.log",
            TranscriptProfile::Scan => "transcripts/emulator-scan.log",
            TranscriptProfile::Periodic => "transcripts/emulator-periodic.log",
            TranscriptProfile::Target => "transcripts/emulator-target.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Advertise => "Harness Emulator advertising transcript",
            TranscriptProfile::Scan => "Harness Emulator scan and connect transcript",
            TranscriptProfile::Periodic => "Harness Emulator periodic advertising transcript",
            TranscriptProfile::Target => "Harness Emulator MAC targeting transcript",
        }
    }

    /// Keys typed by the scripted operator.
    pub fn script(self) -> &'static str {
        match self {
            TranscriptProfile::Advertise => "xa",
            TranscriptProfile::Scan => "ss",
            TranscriptProfile::Periodic => "pas",
            TranscriptProfile::Target => "maabbccddeeffsm\ns",
        }
    }

    pub fn world(self) -> SimWorld {
        match self {
            TranscriptProfile::Advertise | TranscriptProfile::Periodic => SimWorld::standard(),
            TranscriptProfile::Scan | TranscriptProfile::Target => SimWorld::crowd(),
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| format!("Unknown transcript profile `{tag}`"))
    }

    pub fn tag(self) -> &'static str {
        match self {
            TranscriptProfile::Advertise => "advertise",
            TranscriptProfile::Scan => "scan",
            TranscriptProfile::Periodic => "periodic",
            TranscriptProfile::Target => "target",
        }
    }
}

/// Everything needed to start a session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub config: HarnessConfig,
    pub world: SimWorld,
    pub target: PeerTarget,
    pub transcript: PathBuf,
    pub header: String,
    /// Whether the simulated controller supports periodic advertising.
    pub periodic_advertising: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            config: HarnessConfig::default(),
            world: SimWorld::standard(),
            target: PeerTarget::Name,
            transcript: PathBuf::from(DEFAULT_TRANSCRIPT),
            header: "Harness Emulator interactive transcript".to_string(),
            periodic_advertising: true,
        }
    }
}

impl SessionOptions {
    pub fn for_profile(profile: TranscriptProfile) -> Self {
        Self {
            world: profile.world(),
            transcript: PathBuf::from(profile.log_path()),
            header: profile.header().to_string(),
            ..Self::default()
        }
    }
}

/// Source of operator key presses.
pub trait KeySource {
    /// Blocks for the next key; `Ok(None)` once input has ended.
    fn next_key(&mut self) -> io::Result<Option<u8>>;
}

/// Keys replayed from a fixed script.
pub struct ScriptedKeys(VecDeque<u8>);

impl ScriptedKeys {
    pub fn new(script: &str) -> Self {
        Self(script.bytes().collect())
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> io::Result<Option<u8>> {
        Ok(self.0.pop_front())
    }
}

/// Wall clock for interactive use, or a virtual clock that jumps straight to
/// the next deadline when replaying scripts.
#[derive(Clone)]
pub enum HostClock {
    Wall(HostInstant),
    Virtual(Rc<Cell<u64>>),
}

impl HostClock {
    fn wait_until(&self, deadline: Millis) {
        match self {
            HostClock::Wall(_) => {
                let remaining = deadline.as_millis().saturating_sub(self.now().as_millis());
                thread::sleep(Duration::from_millis(remaining));
            }
            HostClock::Virtual(now) => now.set(now.get().max(deadline.as_millis())),
        }
    }
}

impl Clock for HostClock {
    type Instant = Millis;

    fn now(&self) -> Millis {
        match self {
            HostClock::Wall(started_at) => {
                let elapsed = started_at.elapsed().as_millis();
                Millis::from_millis(u64::try_from(elapsed).unwrap_or(u64::MAX))
            }
            HostClock::Virtual(now) => Millis::from_millis(now.get()),
        }
    }
}

/// Console that writes to the operator's terminal and mirrors both directions
/// into the transcript.
pub struct SessionConsole<K, W> {
    keys: K,
    out: W,
    clock: HostClock,
    transcript: TranscriptLogger,
    line: String,
    raw_newlines: bool,
    failure: Option<io::Error>,
}

impl<K, W> SessionConsole<K, W>
where
    K: KeySource,
    W: Write,
{
    fn new(keys: K, out: W, clock: HostClock, transcript: TranscriptLogger) -> Self {
        Self {
            keys,
            out,
            clock,
            transcript,
            line: String::new(),
            raw_newlines: false,
            failure: None,
        }
    }

    /// Emits CR LF line endings, as a terminal in raw mode needs.
    pub fn set_raw_newlines(&mut self, enabled: bool) {
        self.raw_newlines = enabled;
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.clock.now().as_millis())
    }

    fn log(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        let elapsed = self.elapsed();
        self.transcript.append_line(elapsed, role, line)
    }

    fn remember(&mut self, result: io::Result<()>) -> fmt::Result {
        result.map_err(|err| {
            self.failure.get_or_insert(err);
            fmt::Error
        })
    }

    fn take_failure(&mut self) -> io::Result<()> {
        self.failure.take().map_or(Ok(()), Err)
    }

    fn flush_line(&mut self) -> io::Result<()> {
        if self.line.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.line);
        self.log(TranscriptRole::Emulator, &line)
    }
}

impl<K, W> fmt::Write for SessionConsole<K, W>
where
    K: KeySource,
    W: Write,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for segment in s.split_inclusive('\n') {
            let (text, newline) = match segment.strip_suffix('\n') {
                Some(text) => (text, true),
                None => (segment, false),
            };
            self.line.push_str(text);
            let written = self.out.write_all(text.as_bytes());
            self.remember(written)?;
            if newline {
                let ending: &[u8] = if self.raw_newlines { b"\r\n" } else { b"\n" };
                let written = self.out.write_all(ending);
                self.remember(written)?;
                let logged = self.flush_line();
                self.remember(logged)?;
            }
        }
        Ok(())
    }
}

impl<K, W> Console for SessionConsole<K, W>
where
    K: KeySource,
    W: Write,
{
    fn read_byte(&mut self) -> Option<u8> {
        let flushed = self.out.flush();
        if self.remember(flushed).is_err() {
            return None;
        }

        // The prompt is still open; log it before the key that answers it.
        let logged = self.flush_line();
        self.remember(logged).ok()?;

        match self.keys.next_key() {
            Ok(Some(byte)) => {
                let logged = self.log(TranscriptRole::Host, &describe_key(byte));
                self.remember(logged).ok()?;
                Some(byte)
            }
            Ok(None) => {
                let logged = self.log(TranscriptRole::Host, "<end of input>");
                let _ = self.remember(logged);
                None
            }
            Err(err) => {
                self.failure.get_or_insert(err);
                None
            }
        }
    }
}

fn describe_key(byte: u8) -> String {
    match byte {
        b'\n' | b'\r' => "<enter>".to_string(),
        byte if byte.is_ascii_graphic() || byte == b' ' => format!("'{}'", char::from(byte)),
        byte => format!("<0x{byte:02x}>"),
    }
}

type HostQueue = EventQueue<HarnessTask, HostClock, DEFAULT_QUEUE_DEPTH>;

pub type HostCoordinator<K, W> = Coordinator<SimulatedRadio, SessionConsole<K, W>, Millis>;

/// Coordinator, simulated radio, and scheduler wired together.
pub struct Session<K, W> {
    clock: HostClock,
    queue: HostQueue,
    coordinator: HostCoordinator<K, W>,
    next_telemetry: EventId,
}

impl<K, W> Session<K, W>
where
    K: KeySource,
    W: Write,
{
    pub fn new(options: SessionOptions, clock: HostClock, keys: K, out: W) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(&options.transcript, &options.header)?;
        let console = SessionConsole::new(keys, out, clock.clone(), transcript);
        let mut radio = SimulatedRadio::new(options.world, options.config.periodic_interval);
        if !options.periodic_advertising {
            radio = radio.without_periodic_advertising();
        }
        let coordinator =
            Coordinator::new(radio, console, options.config).with_target(options.target);

        Ok(Self {
            queue: EventQueue::new(clock.clone()),
            clock,
            coordinator,
            next_telemetry: 0,
        })
    }

    pub fn console_mut(&mut self) -> &mut SessionConsole<K, W> {
        self.coordinator.console_mut()
    }

    /// Runs until console input closes.
    pub fn run(&mut self) -> io::Result<()> {
        let Self {
            clock,
            queue,
            coordinator,
            next_telemetry,
        } = self;

        coordinator.start(queue);
        loop {
            let executed = queue.run_once(|queue, task| coordinator.handle(task, queue));
            log_telemetry(coordinator, next_telemetry)?;
            coordinator.console_mut().take_failure()?;

            if coordinator.input_closed() {
                break;
            }
            if executed > 0 {
                continue;
            }
            match queue.next_ready_at() {
                Some(deadline) => clock.wait_until(deadline),
                None => break,
            }
        }

        let summary = format!(
            "session closed; {} discarded task(s)",
            coordinator.discarded_events()
        );
        let console = coordinator.console_mut();
        console.flush_line()?;
        console.out.flush()?;
        console.log(TranscriptRole::Emulator, &summary)
    }
}

impl<W> Session<ScriptedKeys, W>
where
    W: Write,
{
    /// Replays `profile` against a virtual clock that skips idle time.
    pub fn scripted(profile: TranscriptProfile, out: W) -> io::Result<Self> {
        Session::new(
            SessionOptions::for_profile(profile),
            HostClock::Virtual(Rc::new(Cell::new(0))),
            ScriptedKeys::new(profile.script()),
            out,
        )
    }
}

fn log_telemetry<K, W>(
    coordinator: &mut HostCoordinator<K, W>,
    next_telemetry: &mut EventId,
) -> io::Result<()>
where
    K: KeySource,
    W: Write,
{
    let fresh: Vec<TelemetryRecord<Millis>> = coordinator
        .telemetry()
        .oldest_first()
        .filter(|record| record.id >= *next_telemetry)
        .copied()
        .collect();

    for record in fresh {
        *next_telemetry = record.id.wrapping_add(1);
        let line = describe_record(&record);
        coordinator
            .console_mut()
            .log(TranscriptRole::Emulator, &line)?;
    }
    Ok(())
}

fn describe_record(record: &TelemetryRecord<Millis>) -> String {
    let mut line = format!(
        "telemetry {} {} {}",
        record.id, record.timestamp, record.event
    );
    match record.details {
        TelemetryPayload::None => {}
        TelemetryPayload::Dwell(Some(dwell)) => {
            line.push_str(&format!(" dwell={}", format_duration_short(dwell)));
        }
        TelemetryPayload::Dwell(None) => {}
        TelemetryPayload::Request(request) => {
            if let Some(token) = request.token {
                line.push_str(&format!(" token={token}"));
            }
            if let Some(error) = request.error {
                line.push_str(&format!(" error={}", error.code()));
            }
        }
        TelemetryPayload::Peer(address) => line.push_str(&format!(" peer={address}")),
        TelemetryPayload::Discard(discard) => {
            line.push_str(&format!(" task={} token={}", discard.task, discard.token));
        }
        TelemetryPayload::Hold(hold) => line.push_str(&format!(
            " token={} delay={}",
            hold.token,
            format_duration_short(hold.delay)
        )),
    }
    line
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, header: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(header)?;
        Ok(logger)
    }

    fn write_header(&mut self, header: &str) -> io::Result<()> {
        writeln!(self.writer, "# {header}")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "harness-emulator-{}-{name}.log",
            std::process::id()
        ))
    }

    fn scripted(
        script: &str,
        world: SimWorld,
        name: &str,
    ) -> (Session<ScriptedKeys, Vec<u8>>, PathBuf) {
        let path = transcript_path(name);
        let options = SessionOptions {
            world,
            transcript: path.clone(),
            ..SessionOptions::default()
        };
        let session = Session::new(
            options,
            HostClock::Virtual(Rc::new(Cell::new(0))),
            ScriptedKeys::new(script),
            Vec::new(),
        )
        .expect("session");
        (session, path)
    }

    fn terminal_output(session: &mut Session<ScriptedKeys, Vec<u8>>) -> String {
        String::from_utf8(session.console_mut().out.clone()).expect("utf-8 output")
    }

    #[test]
    fn advertising_session_runs_to_completion_on_virtual_time() {
        let (mut session, path) = scripted("a", SimWorld::standard(), "advertise");
        session.run().expect("run");

        let output = terminal_output(&mut session);
        assert!(output.starts_with("#DEV - Power Consumption Test - c0:de:00:00:00:01\n"));
        assert!(output.contains("#ADVERTISING\n"));
        assert!(output.contains("Connected to peer as peripheral\n"));
        assert!(output.contains("Disconnected\n"));
        assert!(output.contains("Console input closed\n"));

        let transcript = fs::read_to_string(&path).expect("transcript");
        assert!(transcript.contains("HOST> 'a'"));
        assert!(transcript.contains("EMU < #CONNECTED_PERIPHERAL"));
        assert!(transcript.contains("telemetry"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn central_hold_disconnects_after_the_hold_window() {
        let (mut session, path) = scripted("s", SimWorld::standard(), "central");
        session.run().expect("run");

        let output = terminal_output(&mut session);
        assert!(output.contains("Peer matched by name\n"));
        assert!(output.contains("#CONNECTED_CENTRAL\n"));
        assert!(output.contains("Triggering disconnect...\n"));
        let disconnect_at = output.find("Triggering disconnect").expect("disconnect");
        let idle_at = output.rfind("#IDLE").expect("idle");
        assert!(disconnect_at < idle_at);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn superseded_scan_timeout_is_discarded() {
        let (mut session, path) = scripted("s", SimWorld::standard(), "stale");
        session.run().expect("run");

        assert!(!terminal_output(&mut session).contains("Scanning timed out"));
        assert!(session.coordinator.discarded_events() >= 1);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn raw_mode_uses_crlf() {
        let (mut session, path) = scripted("", SimWorld::quiet(), "raw");
        session.console_mut().set_raw_newlines(true);
        session.run().expect("run");

        let output = terminal_output(&mut session);
        assert!(output.starts_with("#DEV - Power Consumption Test - c0:de:00:00:00:01\r\n"));
        assert!(!output.replace("\r\n", "").contains('\n'));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn profiles_resolve_by_tag() {
        for profile in TranscriptProfile::ALL {
            assert_eq!(TranscriptProfile::from_tag(profile.tag()), Ok(profile));
        }
        assert!(TranscriptProfile::from_tag("reboot").is_err());
    }

    #[test]
    fn keys_are_described_for_the_transcript() {
        assert_eq!(describe_key(b'a'), "'a'");
        assert_eq!(describe_key(b'\r'), "<enter>");
        assert_eq!(describe_key(0x1b), "<0x1b>");
    }
}
