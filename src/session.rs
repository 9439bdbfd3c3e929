//! Interactive session driver.
//!
//! `hdcryptmgr` only reads passphrases from its controlling terminal, which keeps
//! them out of process listings. This module spawns the built command under a
//! pseudo-terminal and plays a [`PromptScript`] against it.
//!
//! # Protocol
//!
//! 1. For each step, wait for `expect` after the previous match, bounded by the
//!    prompt timeout, then type `respond` followed by `\r`.
//!    - A timeout while the child is still running kills it and fails with
//!      [`AuthError::PromptTimeout`], optional step or not.
//!    - A timeout on an optional step after the child exited ends the
//!      scripted part.
//!    - EOF or a terminal pattern ends the scripted part.
//! 2. Once every response was typed, wait without a timeout for the success
//!    pattern, the failure pattern or EOF. The tool's own 3-attempt lockout
//!    bounds this wait.
//! 3. Failure pattern ⇒ the script's failure code. Otherwise the child's exit code.
//!
//! The transcript is rendered through a `vt100` screen to drop escape sequences
//! and has the secret redacted before it leaves this module.

use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, info, warn};

use crate::error::{AuthError, Result};
use crate::process_guard::ChildRegistry;
use crate::prompt::{PromptCatalog, PromptContext, PromptScript, PromptScriptKind};
use crate::secret::Secret;
use crate::tool_traits::command_line;

const PTY_ROWS: u16 = 24;
const PTY_COLS: u16 = 200;
/// Rows of the transcript screen; long enough for a full 3-attempt conversation.
const TRANSCRIPT_ROWS: u16 = 500;

/// Result of one interactive invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    /// Terminal output with escape sequences removed and the secret redacted
    pub transcript: String,
}

impl ExecutionOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Renders prompt scripts and runs them against a child on a pseudo-terminal.
#[derive(Debug, Clone)]
pub struct SessionDriver {
    catalog: PromptCatalog,
    prompt_timeout: Duration,
    failure_exit_code: i32,
}

impl SessionDriver {
    pub fn new(catalog: PromptCatalog, prompt_timeout: Duration, failure_exit_code: i32) -> Self {
        Self {
            catalog,
            prompt_timeout,
            failure_exit_code,
        }
    }

    /// Run `argv` with the script for `kind`, typing `secret` where it asks for one.
    ///
    /// The resource substituted into the script is the last element of `argv`.
    pub fn run(
        &self,
        argv: &[String],
        secret: &Secret,
        kind: PromptScriptKind,
        method_name: Option<&str>,
    ) -> Result<ExecutionOutcome> {
        let resource = argv.last().map(String::as_str).unwrap_or_default();
        let ctx = PromptContext {
            resource,
            secret,
            method_name,
        };
        let script = self.catalog.render(kind, &ctx, self.failure_exit_code)?;
        self.drive(argv, &script, secret)
    }

    /// Play an already rendered `script` against `argv`.
    pub fn drive(&self, argv: &[String], script: &PromptScript, secret: &Secret) -> Result<ExecutionOutcome> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| AuthError::validation("Cannot start a session for an empty command"))?;
        let command = command_line(argv);

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: PTY_ROWS,
                cols: PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| AuthError::terminal(format!("Failed to open pseudo-terminal: {}", e)))?;

        let mut builder = CommandBuilder::new(program);
        builder.args(args);

        info!("Starting interactive session ({}): {}", script.kind, command);
        let mut child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| AuthError::terminal(format!("Failed to spawn {}: {}", program, e)))?;
        // Only the child may hold the slave side, otherwise EOF never arrives
        drop(pair.slave);

        let pid = child.process_id();
        if let Some(pid) = pid {
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.register(pid);
            }
        }

        let result = self.converse(pair.master.as_ref(), child.as_mut(), script, &command, secret);

        if let Some(pid) = pid {
            if let Ok(mut registry) = ChildRegistry::global().lock() {
                registry.unregister(pid);
            }
        }

        result
    }

    fn converse(
        &self,
        master: &dyn MasterPty,
        child: &mut (dyn Child + Send + Sync),
        script: &PromptScript,
        command: &str,
        secret: &Secret,
    ) -> Result<ExecutionOutcome> {
        let reader = master
            .try_clone_reader()
            .map_err(|e| AuthError::terminal(format!("Failed to read pseudo-terminal: {}", e)))?;
        let mut writer = master
            .take_writer()
            .map_err(|e| AuthError::terminal(format!("Failed to write pseudo-terminal: {}", e)))?;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || pump(reader, tx));
        let mut stream = TerminalStream::new(rx);

        let mut terminals: Vec<&str> = Vec::with_capacity(2);
        if let Some(success) = &script.success {
            terminals.push(success.as_str());
        }
        let failure_slot = script.failure.as_ref().map(|failure| {
            terminals.push(failure.pattern.as_str());
            terminals.len() - 1
        });

        // A terminal pattern seen while scripting ends the conversation early
        let mut matched = None;
        let mut closed = false;

        for (i, step) in script.steps.iter().enumerate() {
            let deadline = Instant::now() + self.prompt_timeout;
            let mut patterns = Vec::with_capacity(terminals.len() + 1);
            patterns.push(step.expect.as_str());
            patterns.extend_from_slice(&terminals);

            match stream.wait_for(&patterns, Some(deadline)) {
                Wait::Matched(0) => {
                    debug!("Step {}: matched {:?}", i + 1, step.expect);
                    if let Some(response) = &step.respond {
                        if let Err(e) = type_line(writer.as_mut(), response) {
                            debug!("Step {}: terminal no longer accepts input: {}", i + 1, e);
                            break;
                        }
                    }
                }
                Wait::Matched(slot) => {
                    debug!("Step {}: terminal pattern {:?} ended the script", i + 1, patterns[slot]);
                    matched = Some(slot - 1);
                    break;
                }
                Wait::Eof => {
                    debug!("Step {}: terminal closed before {:?}", i + 1, step.expect);
                    closed = true;
                    break;
                }
                Wait::TimedOut => {
                    let running = matches!(child.try_wait(), Ok(None));
                    if step.optional && !running {
                        debug!("Step {}: optional prompt {:?} did not appear before exit", i + 1, step.expect);
                        break;
                    }
                    warn!("Timed out waiting for {:?} from {}", step.expect, command);
                    let _ = child.kill();
                    let _ = child.wait();
                    stream.drain();
                    return Err(AuthError::PromptTimeout {
                        command: command.to_string(),
                        pattern: step.expect.clone(),
                        timeout_secs: self.prompt_timeout.as_secs(),
                        transcript: stream.transcript(secret),
                    });
                }
            }
        }

        if matched.is_none() && !closed {
            matched = if terminals.is_empty() {
                stream.wait_for_eof();
                None
            } else {
                match stream.wait_for(&terminals, None) {
                    Wait::Matched(slot) => Some(slot),
                    Wait::Eof | Wait::TimedOut => None,
                }
            };
        }

        let exit_code = match (matched, failure_slot, &script.failure) {
            (Some(slot), Some(failure_at), Some(failure)) if slot == failure_at => {
                info!("Session reached failure pattern {:?}", failure.pattern);
                let _ = child.kill();
                let _ = child.wait();
                failure.exit_code
            }
            _ => {
                drop(writer);
                let status = child.wait()?;
                i32::try_from(status.exit_code()).unwrap_or(i32::MAX)
            }
        };

        stream.drain();
        debug!("Session finished with exit code {}", exit_code);

        Ok(ExecutionOutcome {
            exit_code,
            transcript: stream.transcript(secret),
        })
    }
}

fn type_line(writer: &mut (dyn Write + Send), line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\r")?;
    writer.flush()
}

/// Forward terminal output to the channel until EOF (EIO on Linux once the
/// child side is closed).
fn pump(mut reader: Box<dyn Read + Send>, tx: Sender<Vec<u8>>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    /// Index of the pattern that matched
    Matched(usize),
    Eof,
    TimedOut,
}

/// Accumulated terminal output with a match cursor.
struct TerminalStream {
    rx: Receiver<Vec<u8>>,
    raw: Vec<u8>,
    text: String,
    cursor: usize,
    eof: bool,
}

impl TerminalStream {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            raw: Vec::new(),
            text: String::new(),
            cursor: 0,
            eof: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.raw.extend_from_slice(chunk);
        self.text = String::from_utf8_lossy(&self.raw).into_owned();
    }

    /// Earliest match of any pattern after the cursor; advances past it.
    fn find(&mut self, patterns: &[&str]) -> Option<usize> {
        // Lossy decoding of a split multi-byte character can shift later offsets
        self.cursor = self.cursor.min(self.text.len());
        while !self.text.is_char_boundary(self.cursor) {
            self.cursor -= 1;
        }
        let tail = self.text.get(self.cursor..)?;
        let (slot, pos, len) = patterns
            .iter()
            .enumerate()
            .filter_map(|(slot, p)| tail.find(p).map(|pos| (slot, pos, p.len())))
            .min_by_key(|&(_, pos, _)| pos)?;
        self.cursor += pos + len;
        Some(slot)
    }

    /// Block until a pattern shows up, EOF, or `deadline` (never, if `None`).
    fn wait_for(&mut self, patterns: &[&str], deadline: Option<Instant>) -> Wait {
        loop {
            if let Some(slot) = self.find(patterns) {
                return Wait::Matched(slot);
            }
            if self.eof {
                return Wait::Eof;
            }

            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    self.rx.recv_timeout(remaining)
                }
                None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(chunk) => self.push(&chunk),
                Err(RecvTimeoutError::Timeout) => return Wait::TimedOut,
                Err(RecvTimeoutError::Disconnected) => self.eof = true,
            }
        }
    }

    fn wait_for_eof(&mut self) {
        while !self.eof {
            match self.rx.recv() {
                Ok(chunk) => self.push(&chunk),
                Err(_) => self.eof = true,
            }
        }
    }

    /// Collect whatever output is already queued.
    fn drain(&mut self) {
        while let Ok(chunk) = self.rx.try_recv() {
            self.push(&chunk);
        }
    }

    fn transcript(&self, secret: &Secret) -> String {
        let mut parser = vt100::Parser::new(TRANSCRIPT_ROWS, PTY_COLS, 0);
        parser.process(&self.raw);
        let rendered = parser.screen().contents();
        secret.redact(rendered.trim_end())
    }
}
