use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::application::ports::{PromptPort, PromptReply};

/// How often a waiting prompt checks the interrupt flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Operator side channel over a line-oriented reader and writer, normally
/// the terminal's stdin and stdout.
///
/// Lines are read on a helper thread so a pending question can be abandoned
/// when the interrupt flag is raised. An abandoned read stays outstanding and
/// its line answers the next question.
pub struct ConsolePrompt<W> {
    output: W,
    requests: Sender<()>,
    replies: Receiver<PromptReply>,
    pending: bool,
    interrupted: Arc<AtomicBool>,
}

impl ConsolePrompt<io::Stdout> {
    pub fn stdio(interrupted: Arc<AtomicBool>) -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout(), interrupted)
    }
}

impl<W: Write> ConsolePrompt<W> {
    pub fn new<R>(input: R, output: W, interrupted: Arc<AtomicBool>) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (requests, wanted) = mpsc::channel::<()>();
        let (answer, replies) = mpsc::channel();
        thread::spawn(move || read_lines(input, wanted, answer));
        Self { output, requests, replies, pending: false, interrupted }
    }

    fn write_lines(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            writeln!(self.output, "{line}")?;
        }
        Ok(())
    }

    fn cancel(&mut self) -> PromptReply {
        // keep the next output on its own line
        let _ = writeln!(self.output);
        PromptReply::Cancelled
    }
}

/// Serves one line per request until the prompt is dropped.
fn read_lines<R: BufRead>(mut input: R, wanted: Receiver<()>, answer: Sender<PromptReply>) {
    while wanted.recv().is_ok() {
        let mut line = String::new();
        let reply = match input.read_line(&mut line) {
            Ok(0) => PromptReply::Cancelled,
            Ok(_) => PromptReply::Text(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                tracing::warn!("Prompt input failed: {}", e);
                PromptReply::Cancelled
            }
        };
        if answer.send(reply).is_err() {
            break;
        }
    }
    tracing::debug!("Console reader stopped");
}

impl<W: Write> PromptPort for ConsolePrompt<W> {
    fn ask(&mut self, context: &[String], question: &str) -> PromptReply {
        let shown = self
            .write_lines(context)
            .and_then(|_| write!(self.output, "{question}"))
            .and_then(|_| self.output.flush());
        if let Err(e) = shown {
            tracing::warn!("Prompt output failed: {}", e);
        }

        if !self.pending {
            if self.requests.send(()).is_err() {
                return self.cancel();
            }
            self.pending = true;
        }

        loop {
            match self.replies.recv_timeout(POLL_INTERVAL) {
                Ok(PromptReply::Cancelled) => {
                    self.pending = false;
                    return self.cancel();
                }
                Ok(reply) => {
                    self.pending = false;
                    return reply;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.interrupted.load(Ordering::SeqCst) {
                        return self.cancel();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = false;
                    return self.cancel();
                }
            }
        }
    }

    fn notice(&mut self, message: &str) {
        if writeln!(self.output, "{message}").and_then(|_| self.output.flush()).is_err() {
            tracing::info!("{}", message);
        }
    }
}
