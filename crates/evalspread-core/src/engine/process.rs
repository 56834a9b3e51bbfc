//! UCI engine subprocess.
//!
//! A reader thread forwards engine stdout line by line over a channel, so every
//! wait on engine output can be bounded by the configured query timeout. The
//! process is asked to quit and then killed when the session is closed or
//! dropped.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::{Analysis, Engine, EngineFactory, PvLine, uci};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// How long a session waits for the engine to exit after `quit` before
/// killing it.
const QUIT_GRACE: Duration = Duration::from_millis(500);

/// One running UCI engine process.
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
    /// MultiPV value currently configured in the engine.
    multipv: usize,
    name: Option<String>,
    closed: bool,
}

impl UciEngine {
    /// Spawn the engine, complete the `uci`/`uciok` handshake, apply options
    /// and wait until the engine reports ready.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: config.path.clone(),
                source,
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                abandon(&mut child);
                return Err(EngineError::Protocol("engine pipes unavailable".into()));
            }
        };

        let (tx, rx) = mpsc::channel();
        let reader = match spawn_reader(stdout, tx) {
            Ok(handle) => handle,
            Err(e) => {
                abandon(&mut child);
                return Err(e.into());
            }
        };

        // From here on Drop takes care of the process on any error.
        let mut engine = Self {
            child,
            stdin,
            lines: rx,
            reader: Some(reader),
            timeout: config.query_timeout(),
            multipv: 1,
            name: None,
            closed: false,
        };

        engine.send("uci")?;
        let deadline = engine.deadline();
        loop {
            let line = engine.next_line("uciok", deadline)?;
            if let Some(name) = uci::parse_id_name(&line) {
                engine.name = Some(name.to_string());
            }
            if line.trim() == "uciok" {
                break;
            }
        }

        engine.send(&uci::set_option("Threads", config.threads))?;
        engine.send(&uci::set_option("Hash", config.hash_mb))?;
        for (name, value) in &config.options {
            engine.send(&uci::set_option(name, value))?;
        }
        engine.sync()?;

        info!(
            "engine '{}' ready (threads={}, hash={}MB)",
            engine.name().unwrap_or(&config.path),
            config.threads,
            config.hash_mb
        );
        Ok(engine)
    }

    /// Name reported by the engine in `id name`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Send `isready` and wait for `readyok`.
    pub fn sync(&mut self) -> Result<(), EngineError> {
        self.send("isready")?;
        let deadline = self.deadline();
        loop {
            if self.next_line("readyok", deadline)?.trim() == "readyok" {
                return Ok(());
            }
        }
    }

    /// Quit the engine and release the process.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        debug!("> {command}");
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|t| Instant::now() + t)
    }

    fn next_line(&mut self, waiting_for: &str, deadline: Option<Instant>) -> Result<String, EngineError> {
        let line = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match self.lines.recv_timeout(remaining) {
                    Ok(line) => line,
                    Err(RecvTimeoutError::Timeout) => {
                        let secs = self.timeout.map_or(0, |t| t.as_secs());
                        return Err(EngineError::Timeout(secs, waiting_for.to_string()));
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(EngineError::Crashed(waiting_for.to_string()));
                    }
                }
            }
            None => self
                .lines
                .recv()
                .map_err(|_| EngineError::Crashed(waiting_for.to_string()))?,
        };
        debug!("< {line}");
        Ok(line)
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let _ = writeln!(self.stdin, "quit");
        let _ = self.stdin.flush();

        let deadline = Instant::now() + QUIT_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                _ => {
                    debug!("engine did not quit in time, killing it");
                    abandon(&mut self.child);
                    break;
                }
            }
        }

        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("engine reader thread panicked");
            }
        }
    }
}

impl Engine for UciEngine {
    fn analyse(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: Option<usize>,
    ) -> Result<Analysis, EngineError> {
        let wanted = multipv.unwrap_or(1).max(1);
        if wanted != self.multipv {
            self.send(&uci::set_option("MultiPV", wanted))?;
            self.multipv = wanted;
        }
        self.sync()?;
        self.send(&uci::position_fen(fen))?;
        self.send(&uci::go_depth(depth))?;

        // Later lines for the same rank supersede earlier, shallower ones.
        let mut lines: BTreeMap<usize, PvLine> = BTreeMap::new();
        let deadline = self.deadline();
        loop {
            let line = self.next_line("bestmove", deadline)?;
            if let Some(best_move) = uci::parse_bestmove(&line) {
                return Ok(Analysis {
                    lines: lines.into_values().filter(|l| l.multipv <= wanted).collect(),
                    best_move,
                });
            }
            if let Some(pv) = uci::parse_info(&line)? {
                lines.insert(pv.multipv, pv);
            }
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_reader(stdout: ChildStdout, tx: Sender<String>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("uci-reader".into())
        .spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
}

fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Opens a fresh [`UciEngine`] per session from one configuration.
#[derive(Debug, Clone)]
pub struct UciLauncher {
    config: EngineConfig,
}

impl UciLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl EngineFactory for UciLauncher {
    type Session = UciEngine;

    fn open(&self) -> Result<UciEngine, EngineError> {
        UciEngine::open(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let config = EngineConfig {
            path: "/nonexistent/evalspread-test-engine".into(),
            ..EngineConfig::default()
        };
        match UciEngine::open(&config) {
            Err(EngineError::Spawn { path, .. }) => assert!(path.contains("nonexistent")),
            Err(other) => panic!("expected spawn error, got {other}"),
            Ok(_) => panic!("expected spawn error"),
        }
    }

    #[test]
    fn test_launcher_opens_configured_engine() {
        let config = EngineConfig {
            path: "/nonexistent/evalspread-launcher-engine".into(),
            threads: 2,
            ..EngineConfig::default()
        };
        let launcher = UciLauncher::new(config.clone());
        assert_eq!(launcher.config(), &config);
        match launcher.open() {
            Err(EngineError::Spawn { path, .. }) => assert_eq!(path, launcher.config().path),
            Err(other) => panic!("expected spawn error, got {other}"),
            Ok(_) => panic!("expected spawn error"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_exiting_during_handshake_is_crash() {
        let config = EngineConfig {
            path: "sh".into(),
            args: vec!["-c".into(), "read line; echo 'id name Quitter'".into()],
            ..EngineConfig::default()
        };
        match UciEngine::open(&config) {
            Err(EngineError::Crashed(waiting)) => assert_eq!(waiting, "uciok"),
            Err(other) => panic!("expected crash, got {other}"),
            Ok(_) => panic!("expected crash"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_engine_times_out() {
        let config = EngineConfig {
            path: "sh".into(),
            args: vec!["-c".into(), "exec sleep 30".into()],
            query_timeout_secs: 1,
            ..EngineConfig::default()
        };
        let started = Instant::now();
        match UciEngine::open(&config) {
            Err(EngineError::Timeout(1, waiting)) => assert_eq!(waiting, "uciok"),
            Err(other) => panic!("expected timeout, got {other}"),
            Ok(_) => panic!("expected timeout"),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
