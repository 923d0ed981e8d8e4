mod session;
mod sim;

use std::env;
use std::io::{self, IsTerminal, Read, StdinLock};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use harness_core::console::{PeerTarget, parse_target_address};

use session::{HostClock, KeySource, Session, SessionOptions, TranscriptProfile};
use sim::SimWorld;

const USAGE: &str = "Usage: harness-emulator [--scan-ms <ms>] [--advertise-ms <ms>] [--hold-ms <ms>] \
[--periodic-interval-ms <ms>] [--sync-timeout-ms <ms>] [--no-periodic] [--list-devices] \
[--no-periodic-adv] [--target <mac>] [--world <default|quiet|crowd>] [--transcript <path>] \
| harness-emulator --replay <advertise|scan|periodic|target>";

/// What the command line asked for.
#[derive(Debug)]
enum Invocation {
    Interactive(SessionOptions),
    Replay(TranscriptProfile),
    Usage,
}

fn main() -> io::Result<()> {
    let options = match parse_options(env::args().skip(1)) {
        Ok(Invocation::Interactive(options)) => options,
        Ok(Invocation::Replay(profile)) => {
            println!("Replaying `{}` into {}", profile.tag(), profile.log_path());
            return Session::scripted(profile, io::stdout())?.run();
        }
        Ok(Invocation::Usage) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    println!(
        "Harness emulator ready. Transcript: {}",
        options.transcript.display()
    );
    let clock = HostClock::Wall(Instant::now());

    if io::stdin().is_terminal() {
        let _raw = RawModeGuard::enable()?;
        let mut session = Session::new(options, clock, TerminalKeys, io::stdout())?;
        session.console_mut().set_raw_newlines(true);
        session.run()
    } else {
        let mut session = Session::new(options, clock, PipedKeys::new(), io::stdout())?;
        session.run()
    }
}

/// Restores cooked mode however the session ends.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Single key presses from a raw-mode terminal. Ctrl-C, Ctrl-D and Esc end input.
struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn next_key(&mut self) -> io::Result<Option<u8>> {
        loop {
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read()?
            else {
                continue;
            };
            if kind == KeyEventKind::Release {
                continue;
            }

            match code {
                KeyCode::Char('c' | 'd') if modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None);
                }
                KeyCode::Esc => return Ok(None),
                KeyCode::Enter => return Ok(Some(b'\n')),
                KeyCode::Char(ch) => {
                    if let Ok(byte) = u8::try_from(ch) {
                        return Ok(Some(byte));
                    }
                }
                _ => {}
            }
        }
    }
}

/// Bytes from redirected stdin, for scripted runs.
struct PipedKeys(io::Bytes<StdinLock<'static>>);

impl PipedKeys {
    fn new() -> Self {
        Self(io::stdin().lock().bytes())
    }
}

impl KeySource for PipedKeys {
    fn next_key(&mut self) -> io::Result<Option<u8>> {
        self.0.next().transpose()
    }
}

/// Maps command-line flags onto session options.
fn parse_options<I>(args: I) -> Result<Invocation, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = SessionOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = |name: &str| {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {name}"))
        };

        let config = options.config;
        match flag.as_str() {
            "-h" | "--help" => return Ok(Invocation::Usage),
            "--replay" => {
                return TranscriptProfile::from_tag(&value(&flag)?).map(Invocation::Replay);
            }
            "--scan-ms" => {
                options.config = config.with_scan_duration(parse_millis(&flag, &value(&flag)?)?);
            }
            "--advertise-ms" => {
                options.config =
                    config.with_advertise_duration(parse_millis(&flag, &value(&flag)?)?);
            }
            "--hold-ms" => {
                options.config = config.with_hold_duration(parse_millis(&flag, &value(&flag)?)?);
            }
            "--periodic-interval-ms" => {
                options.config =
                    config.with_periodic_interval(parse_millis(&flag, &value(&flag)?)?);
            }
            "--sync-timeout-ms" => {
                options.config = config.with_sync_timeout(parse_millis(&flag, &value(&flag)?)?);
            }
            "--no-periodic" => options.config = config.with_periodic_sync_supported(false),
            "--list-devices" => options.config = config.with_scanned_device_listing(true),
            "--no-periodic-adv" => options.periodic_advertising = false,
            "--target" => options.target = parse_target(&value(&flag)?)?,
            "--world" => options.world = SimWorld::from_tag(&value(&flag)?)?,
            "--transcript" => options.transcript = PathBuf::from(value(&flag)?),
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(Invocation::Interactive(options))
}

fn parse_millis(flag: &str, text: &str) -> Result<Duration, String> {
    text.parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("Expected milliseconds for {flag}, got `{text}`"))
}

fn parse_target(text: &str) -> Result<PeerTarget, String> {
    match parse_target_address(text) {
        Ok(Some(address)) => Ok(PeerTarget::Address(address)),
        Ok(None) => Ok(PeerTarget::Name),
        Err(err) => Err(format!("Invalid MAC `{text}`: {err}")),
    }
}
