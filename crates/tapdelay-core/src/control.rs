//! Line-oriented control commands for live parameter changes.
//!
//! Commands are case-insensitive and surrounding whitespace is ignored:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `help`, `--help` | print the command list |
//! | `params` | print current parameters |
//! | `setnd:<n>` | delay time in frames |
//! | `setnf:<n>` | feedback loops (taps beyond the first) |
//! | `setfpa:<0\|1>` | alternate tap polarity |
//! | `setcdi:<0\|1>` | divisor growth (1 = by one, 0 = exponential) |
//! | `stop` | stop playback |
//!
//! [`ControlChannel`] decodes and applies one line at a time and writes its
//! replies to any [`Write`]. [`ControlLoop`] runs a channel on its own thread,
//! polling a line queue so it notices a stop request promptly.

use crate::error::ConfigError;
use crate::param::{DivisorGrowth, EffectParameters, ParameterStore};
use crate::stop::StopSignal;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// How long the control loop waits for input before re-checking the stop flag.
pub const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(10);

const HELP_TEXT: &str = "User command list:\n\n\
\"help\" or \"--help\" : print this list\n\
\"params\" : print current parameters\n\
\"setnd:<number>\" : set delay time (in number of samples)\n\
\"setnf:<number>\" : set number of feedback loops\n\
\"setfpa:<number>\" : alternate feedback polarity (0 = disable | 1 = enable)\n\
\"setcdi:<number>\" : set cycle divider increment (0 = exponential | 1 = by one)\n\
\"stop\" : stop playback and quit application\n";

/// A decoded control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the command list.
    Help,
    /// Print the current parameters.
    Params,
    /// Set the base delay in frames.
    SetDelay(u32),
    /// Set the number of taps beyond the first.
    SetFeedbackLoops(u32),
    /// Toggle alternating tap polarity.
    SetAltPolarity(bool),
    /// Select divisor growth.
    SetDivisorGrowth(DivisorGrowth),
    /// Request graceful termination.
    Stop,
}

/// A line that could not be turned into a [`Command`] or applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Not a known command.
    #[error("invalid command entered")]
    Unknown(String),

    /// Known command with a rejected value.
    #[error(transparent)]
    Value(#[from] ConfigError),
}

impl Command {
    /// Decode one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim().to_ascii_lowercase();
        if line.is_empty() {
            return Ok(None);
        }

        let cmd = match line.as_str() {
            "help" | "--help" => Self::Help,
            "params" => Self::Params,
            "stop" => Self::Stop,
            _ => match line.split_once(':') {
                Some(("setnd", v)) => Self::SetDelay(parse_uint(v)?),
                Some(("setnf", v)) => Self::SetFeedbackLoops(parse_uint(v)?),
                Some(("setfpa", v)) => Self::SetAltPolarity(parse_flag(v)?),
                Some(("setcdi", v)) => Self::SetDivisorGrowth(if parse_flag(v)? {
                    DivisorGrowth::Linear
                } else {
                    DivisorGrowth::Exponential
                }),
                _ => return Err(CommandError::Unknown(line.clone())),
            },
        };
        Ok(Some(cmd))
    }
}

fn parse_uint(text: &str) -> Result<u32, ConfigError> {
    let text = text.trim();
    text.parse::<u32>()
        .map_err(|_| ConfigError::InvalidValue(text.to_string()))
}

fn parse_flag(text: &str) -> Result<bool, ConfigError> {
    match parse_uint(text)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ConfigError::NotBoolean(other)),
    }
}

/// Applies commands to a [`ParameterStore`] and reports back on `out`.
pub struct ControlChannel<W> {
    store: Arc<ParameterStore>,
    stop: StopSignal,
    out: W,
}

impl<W: Write> ControlChannel<W> {
    /// Channel writing replies to `out`.
    pub fn new(store: Arc<ParameterStore>, stop: StopSignal, out: W) -> Self {
        Self { store, stop, out }
    }

    /// The store this channel mutates.
    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    /// Decode and apply one line, printing the outcome.
    pub fn execute(&mut self, line: &str) -> io::Result<()> {
        match Command::parse(line).and_then(|cmd| match cmd {
            Some(cmd) => self.apply(cmd).map(Some),
            None => Ok(None),
        }) {
            Ok(Some(Reply::Help)) => self.print_help(),
            Ok(Some(Reply::Params(p))) => self.print_params(&p),
            Ok(Some(Reply::Stopping) | None) => Ok(()),
            Err(err) => {
                tracing::debug!(line = line.trim(), error = %err, "rejected control command");
                writeln!(self.out, "Error: {err}")?;
                self.out.flush()
            }
        }
    }

    /// Apply a decoded command.
    pub fn apply(&self, cmd: Command) -> Result<Reply, CommandError> {
        let params = match cmd {
            Command::Help => return Ok(Reply::Help),
            Command::Params => self.store.snapshot(),
            Command::Stop => {
                tracing::info!("stop requested from control channel");
                self.stop.request();
                return Ok(Reply::Stopping);
            }
            Command::SetDelay(n) => self.store.set_n_delay(n)?,
            Command::SetFeedbackLoops(n) => self.store.set_feedback_loops(n)?,
            Command::SetAltPolarity(on) => self.store.set_alt_polarity(on),
            Command::SetDivisorGrowth(g) => self.store.set_divisor_growth(g),
        };
        if !matches!(cmd, Command::Params) {
            tracing::info!(%cmd, n_delay = params.n_delay, n_taps = params.n_taps, "parameters updated");
        }
        Ok(Reply::Params(params))
    }

    /// Print the command list.
    pub fn print_help(&mut self) -> io::Result<()> {
        writeln!(self.out, "{HELP_TEXT}")?;
        self.out.flush()
    }

    /// Print the current parameter set.
    pub fn print_params(&mut self, params: &EffectParameters) -> io::Result<()> {
        writeln!(self.out, "Current parameters:\n\n{params}")?;
        self.out.flush()
    }

    fn print_banner(&mut self) -> io::Result<()> {
        self.print_help()?;
        let params = self.store.snapshot();
        self.print_params(&params)
    }
}

/// What a successfully applied command wants shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// The command list.
    Help,
    /// The (possibly updated) parameter set.
    Params(EffectParameters),
    /// Nothing; a stop was requested.
    Stopping,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Help => f.write_str("help"),
            Self::Params => f.write_str("params"),
            Self::SetDelay(n) => write!(f, "setnd:{n}"),
            Self::SetFeedbackLoops(n) => write!(f, "setnf:{n}"),
            Self::SetAltPolarity(on) => write!(f, "setfpa:{}", u8::from(*on)),
            Self::SetDivisorGrowth(g) => {
                write!(f, "setcdi:{}", u8::from(*g == DivisorGrowth::Linear))
            }
            Self::Stop => f.write_str("stop"),
        }
    }
}

/// Spawn a detached thread forwarding lines from `input` over a channel.
///
/// Blocking reads cannot be interrupted portably, so the reader thread is not
/// joined; it exits on end of input or once the receiver is dropped and the
/// next line arrives.
pub fn spawn_line_reader<R>(input: R) -> io::Result<Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("tapdelay-input".into())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// A [`ControlChannel`] running on its own thread until stop is requested.
pub struct ControlLoop {
    handle: JoinHandle<()>,
}

impl ControlLoop {
    /// Print the banner, then apply lines from `lines` until `stop` is set.
    ///
    /// The loop also ends when `lines` disconnects; playback is unaffected.
    pub fn spawn<W>(mut channel: ControlChannel<W>, lines: Receiver<String>) -> io::Result<Self>
    where
        W: Write + Send + 'static,
    {
        let stop = channel.stop.clone();
        let handle = thread::Builder::new()
            .name("tapdelay-control".into())
            .spawn(move || {
                if let Err(e) = channel.print_banner() {
                    tracing::warn!(error = %e, "failed to print control banner");
                }
                while !stop.is_requested() {
                    match lines.recv_timeout(CONTROL_POLL_INTERVAL) {
                        Ok(line) => {
                            if let Err(e) = channel.execute(&line) {
                                tracing::warn!(error = %e, "failed to write control reply");
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => {
                            tracing::debug!("control input closed");
                            break;
                        }
                    }
                }
            })?;
        Ok(Self { handle })
    }

    /// Whether the loop thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::error!("control thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ControlChannel<Vec<u8>> {
        let store = Arc::new(ParameterStore::new(EffectParameters::STARTUP, 65536).unwrap());
        ControlChannel::new(store, StopSignal::new(), Vec::new())
    }

    fn output(ch: &ControlChannel<Vec<u8>>) -> String {
        String::from_utf8(ch.out.clone()).unwrap()
    }

    #[test]
    fn parses_commands_case_insensitively() {
        assert_eq!(Command::parse("  HELP \n"), Ok(Some(Command::Help)));
        assert_eq!(Command::parse("--help"), Ok(Some(Command::Help)));
        assert_eq!(Command::parse("Params"), Ok(Some(Command::Params)));
        assert_eq!(Command::parse("SetND:480"), Ok(Some(Command::SetDelay(480))));
        assert_eq!(
            Command::parse("setnf:3"),
            Ok(Some(Command::SetFeedbackLoops(3)))
        );
        assert_eq!(
            Command::parse("setcdi:0"),
            Ok(Some(Command::SetDivisorGrowth(DivisorGrowth::Exponential)))
        );
        assert_eq!(
            Command::parse("setfpa:1"),
            Ok(Some(Command::SetAltPolarity(true)))
        );
        assert_eq!(Command::parse("stop"), Ok(Some(Command::Stop)));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Command::parse("setnd:-5"),
            Err(CommandError::Value(ConfigError::InvalidValue(_)))
        ));
        assert!(matches!(
            Command::parse("setnd:abc"),
            Err(CommandError::Value(ConfigError::InvalidValue(_)))
        ));
        assert!(matches!(
            Command::parse("setfpa:2"),
            Err(CommandError::Value(ConfigError::NotBoolean(2)))
        ));
        assert!(matches!(
            Command::parse("volume:11"),
            Err(CommandError::Unknown(_))
        ));
    }

    #[test]
    fn successful_update_echoes_parameters() {
        let mut ch = channel();
        ch.execute("setnd:100").unwrap();
        let out = output(&ch);
        assert!(out.starts_with("Current parameters:"));
        assert!(out.contains("Delay time (number of samples): 100"));
    }

    #[test]
    fn oversized_taps_rejected_and_reported() {
        let mut ch = channel();
        ch.execute("setnd:100").unwrap();
        ch.execute("setnf:700").unwrap();
        assert!(output(&ch).ends_with("Error: number of feedback loops is too big\n"));
        assert_eq!(ch.store().snapshot().n_taps, 21);
    }

    #[test]
    fn unknown_command_leaves_state_alone() {
        let mut ch = channel();
        ch.execute("louder").unwrap();
        assert_eq!(output(&ch), "Error: invalid command entered\n");
        assert_eq!(ch.store().snapshot(), EffectParameters::STARTUP);
    }

    #[test]
    fn blank_line_prints_nothing() {
        let mut ch = channel();
        ch.execute("\n").unwrap();
        assert!(output(&ch).is_empty());
    }

    #[test]
    fn stop_sets_signal() {
        let mut ch = channel();
        let stop = ch.stop.clone();
        ch.execute("STOP").unwrap();
        assert!(stop.is_requested());
    }

    #[test]
    fn divisor_toggle() {
        let mut ch = channel();
        ch.execute("setcdi:0").unwrap();
        assert!(output(&ch).contains("Cycle divider increment: exponential"));
        assert_eq!(
            ch.store().snapshot().divisor_growth,
            DivisorGrowth::Exponential
        );
    }

    #[test]
    fn loop_exits_on_stop_command() {
        let store = Arc::new(ParameterStore::new(EffectParameters::STARTUP, 65536).unwrap());
        let stop = StopSignal::new();
        let ch = ControlChannel::new(Arc::clone(&store), stop.clone(), io::sink());
        let (tx, rx) = mpsc::channel();
        let control = ControlLoop::spawn(ch, rx).unwrap();

        tx.send("setnd:10".to_string()).unwrap();
        tx.send("stop".to_string()).unwrap();
        control.join();

        assert!(stop.is_requested());
        assert_eq!(store.snapshot().n_delay, 10);
    }

    #[test]
    fn loop_observes_external_stop() {
        let store = Arc::new(ParameterStore::new(EffectParameters::STARTUP, 65536).unwrap());
        let stop = StopSignal::new();
        let ch = ControlChannel::new(store, stop.clone(), io::sink());
        let (_tx, rx) = mpsc::channel::<String>();
        let control = ControlLoop::spawn(ch, rx).unwrap();

        stop.request();
        control.join();
    }

    #[test]
    fn line_reader_forwards_lines() {
        let rx = spawn_line_reader(io::Cursor::new("params\nstop\n")).unwrap();
        let lines: Vec<String> = rx.iter().collect();
        assert_eq!(lines, vec!["params", "stop"]);
    }
}
