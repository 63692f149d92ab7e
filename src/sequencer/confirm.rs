use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Answers yes/no questions for optional steps.
///
/// Implementations must treat anything they cannot read as "no".
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Fixed answer for non-interactive runs (`--yes`, `--no-input`).
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, question: &str) -> bool {
        tracing::info!(question, answer = self.0, "prompt answered without input");
        self.0
    }
}

/// Reads one line per question from any reader.
#[cfg(test)]
pub struct ReaderConfirm<R, W> {
    input: R,
    output: W,
}

#[cfg(test)]
impl<R: BufRead, W: Write> ReaderConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

#[cfg(test)]
impl<R: BufRead, W: Write> Confirm for ReaderConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        let _ = write!(self.output, "{question} [y/N] ");
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => false,
            Ok(_) => is_affirmative(&line),
            Err(err) => {
                tracing::warn!("prompt read failed: {err}");
                false
            }
        }
    }
}

type Lines = mpsc::Receiver<Option<String>>;

/// Interactive prompt; no answer within `timeout` counts as "no".
///
/// Input is read on a helper thread so the wait can be bounded. Lines typed
/// before a question is asked are discarded rather than taken as its answer.
pub struct StdinConfirm {
    timeout: Duration,
    source: Option<Box<dyn BufRead + Send>>,
    output: Box<dyn Write>,
    lines: Option<Lines>,
}

impl StdinConfirm {
    pub fn new(timeout: Duration) -> Self {
        Self::from_parts(
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
            timeout,
        )
    }

    pub fn from_parts(
        source: Box<dyn BufRead + Send>,
        output: Box<dyn Write>,
        timeout: Duration,
    ) -> Self {
        Self {
            timeout,
            source: Some(source),
            output,
            lines: None,
        }
    }

    /// One reader thread for the whole run, started on first use.
    fn lines(&mut self) -> Option<&Lines> {
        if self.lines.is_none() {
            let mut source = self.source.take()?;
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                loop {
                    let mut line = String::new();
                    let msg = match source.read_line(&mut line) {
                        Ok(0) | Err(_) => None,
                        Ok(_) => Some(line),
                    };
                    let eof = msg.is_none();
                    if tx.send(msg).is_err() || eof {
                        break;
                    }
                }
            });
            self.lines = Some(rx);
        }
        self.lines.as_ref()
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        let timeout = self.timeout;
        if self.lines().is_none() {
            return false;
        }
        let _ = write!(self.output, "{question} [y/N] ({}s) ", timeout.as_secs());
        let _ = self.output.flush();

        let Some(lines) = self.lines.as_ref() else {
            return false;
        };
        // Answers typed ahead of this question, or after an earlier one timed
        // out, are not answers to it. EOF stays terminal.
        let closed = lines.try_iter().any(|msg| msg.is_none());
        let answer = if closed {
            Ok(None)
        } else {
            lines.recv_timeout(timeout)
        };

        match answer {
            Ok(Some(line)) => is_affirmative(&line),
            Ok(None) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = writeln!(self.output);
                false
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let _ = writeln!(self.output);
                tracing::info!(question, "prompt timed out; treating as no");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::os::unix::net::UnixStream;

    fn ask(input: &str) -> bool {
        let mut out = Vec::new();
        ReaderConfirm::new(Cursor::new(input.as_bytes().to_vec()), &mut out).confirm("Download?")
    }

    #[test]
    fn affirmative_answers() {
        assert!(ask("y\n"));
        assert!(ask("YES\n"));
        assert!(ask("  yes  \n"));
    }

    #[test]
    fn empty_and_eof_decline() {
        assert!(!ask("\n"));
        assert!(!ask(""));
    }

    #[test]
    fn anything_else_declines() {
        assert!(!ask("n\n"));
        assert!(!ask("sure\n"));
        assert!(!ask("yy\n"));
    }

    #[test]
    fn prompt_text_is_written() {
        let mut out = Vec::new();
        ReaderConfirm::new(Cursor::new(b"n\n".to_vec()), &mut out).confirm("Fetch model?");
        assert_eq!(String::from_utf8(out).expect("utf8"), "Fetch model? [y/N] ");
    }

    fn interactive(timeout_ms: u64) -> (StdinConfirm, UnixStream) {
        let (typed, source) = UnixStream::pair().expect("socket pair");
        let confirm = StdinConfirm::from_parts(
            Box::new(BufReader::new(source)),
            Box::new(io::sink()),
            Duration::from_millis(timeout_ms),
        );
        (confirm, typed)
    }

    #[test]
    fn silence_times_out_as_no() {
        let (mut confirm, _typed) = interactive(50);
        assert!(!confirm.confirm("Download?"));
    }

    #[test]
    fn late_answer_does_not_carry_over_to_next_question() {
        let (mut confirm, mut typed) = interactive(50);
        assert!(!confirm.confirm("Download the first model?"));

        // Typed after the first question gave up.
        typed.write_all(b"y\n").expect("type");
        thread::sleep(Duration::from_millis(100));
        assert!(!confirm.confirm("Download the second model?"));
    }

    #[test]
    fn answer_after_question_is_taken() {
        let (mut confirm, typed) = interactive(2_000);
        let typist = thread::spawn(move || {
            let mut typed = typed;
            thread::sleep(Duration::from_millis(50));
            typed.write_all(b"yes\n").expect("type");
            typed
        });
        assert!(confirm.confirm("Download?"));
        let typed = typist.join().expect("typist");

        drop(typed);
        assert!(!confirm.confirm("Download another?"));
        assert!(!confirm.confirm("And another?"));
    }

    #[test]
    fn fixed_answer() {
        assert!(FixedAnswer(true).confirm("q"));
        assert!(!FixedAnswer(false).confirm("q"));
    }
}
