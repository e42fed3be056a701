//! Interactive consent on the controlling terminal.
//!
//! When the evaluator returns [`Decision::AskUser`](crate::Decision::AskUser)
//! the gate asks a [`Prompter`] and interprets the first character of the
//! answer:
//!
//! - `y` / `Y`: allow this request only
//! - `r` / `R`: allow and pre-approve the same kind of access for the rest of
//!   the session (not offered for directories)
//! - anything else, including an empty line or end of input: deny

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::policy::AskKind;
use crate::session::SessionGrants;

/// A question put to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    /// What access is requested.
    pub kind: AskKind,
    /// The path shown to the user (canonical when it could be resolved).
    pub shown_path: PathBuf,
}

impl Question {
    /// Build a question, showing the canonical form of `path` if it exists.
    pub fn new(kind: AskKind, path: &Path) -> Self {
        let shown_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Self { kind, shown_path }
    }

    /// The prompt line, without a trailing newline.
    pub fn prompt(&self) -> String {
        let choices = if self.kind.escalates() {
            "[N/y/r]"
        } else {
            "[N/y]"
        };
        format!(
            "> pola request: {} access to {}? {} ",
            self.kind,
            self.shown_path.display(),
            choices
        )
    }
}

/// The user's answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    /// Allow this request only
    Once,
    /// Allow and escalate the session
    Always,
    /// Refuse
    Deny,
}

impl Answer {
    /// Interpret a response line by its first character.
    pub fn parse(line: &str) -> Self {
        match line.chars().next() {
            Some('y' | 'Y') => Answer::Once,
            Some('r' | 'R') => Answer::Always,
            _ => Answer::Deny,
        }
    }
}

/// Asks the user a [`Question`] and returns the raw response line.
///
/// Implementations block until an answer is available. End of input is
/// reported as an empty line.
pub trait Prompter: Send + Sync {
    /// Put the question and read one line.
    fn ask(&self, question: &Question) -> io::Result<String>;
}

/// Prompts on standard output and reads the answer from standard input.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, question: &Question) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(question.prompt().as_bytes())?;
        stdout.flush()?;
        drop(stdout);

        read_answer(&mut RawStdin)
    }
}

/// Read one answer line from `reader`, including its newline.
///
/// Reads a byte at a time so nothing past the newline is consumed: whatever
/// follows on standard input belongs to the target program.
pub fn read_answer<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// File descriptor 0 without the buffering of [`io::Stdin`].
struct RawStdin;

impl Read for RawStdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        usize::try_from(n).map_err(|_| io::Error::last_os_error())
    }
}

/// Outcome of the consent protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Consent {
    /// The request may proceed.
    Granted,
    /// The request must be refused.
    Refused,
}

/// Run the consent protocol for one request.
///
/// On an "always" answer the matching session grants are raised before
/// returning. Prompt failures count as a refusal.
pub fn request_consent<P>(
    kind: AskKind,
    path: &Path,
    grants: &SessionGrants,
    prompter: &P,
) -> Consent
where
    P: Prompter + ?Sized,
{
    let question = Question::new(kind, path);
    let answer = match prompter.ask(&question) {
        Ok(line) => Answer::parse(&line),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "consent prompt failed");
            Answer::Deny
        }
    };

    match (answer, kind) {
        (Answer::Once, _) => Consent::Granted,
        (Answer::Always, AskKind::Directory) | (Answer::Deny, _) => Consent::Refused,
        (Answer::Always, AskKind::Read) => {
            grants.grant_reads();
            Consent::Granted
        }
        (Answer::Always, AskKind::Write) => {
            grants.grant_writes();
            Consent::Granted
        }
        (Answer::Always, AskKind::ReadWrite) => {
            grants.grant_reads();
            grants.grant_writes();
            Consent::Granted
        }
    }
}

/// A [`Prompter`] replaying canned answers, recording every question.
///
/// Once the script runs out it answers with an empty line (deny).
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<Question>>,
}

impl ScriptedPrompter {
    /// Create a prompter that replies with `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    pub fn asked(&self) -> Vec<Question> {
        self.asked.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&self, question: &Question) -> io::Result<String> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.clone());
        }
        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front());
        Ok(answer.unwrap_or_default())
    }
}
