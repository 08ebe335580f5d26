//! Prompting line reader with backslash continuation.
//!
//! Input is consumed one byte at a time so nothing past the end of the
//! current fragment is pulled out of the stream. A line whose last character
//! is an unescaped `\` continues on the next physical line:
//!
//! ```text
//! >>> var total = 1 + \
//! ... 2
//! ```
//!
//! A backslash before any other character is kept in the fragment along with
//! that character, and `\\` is kept as a pair, so string escapes reach the
//! engine exactly as they would from a file.

use std::io::{self, Read, Write};

use clap::ValueEnum;
use tracing::trace;

pub const PROMPT: &str = ">>> ";
pub const CONTINUATION_PROMPT: &str = "... ";

/// What an empty line at the primary prompt means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EmptyLinePolicy {
    /// End the interactive loop, as if the stream had ended.
    #[default]
    Stop,
    /// Ignore the line and prompt again.
    Reprompt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Fragment(String),
    EndOfInput,
}

pub struct LineReader<R> {
    input: R,
    policy: EmptyLinePolicy,
}

impl<R: Read> LineReader<R> {
    pub fn new(input: R, policy: EmptyLinePolicy) -> Self {
        Self { input, policy }
    }

    /// Prompts on `prompt` and assembles one logical statement.
    ///
    /// End of stream always yields [`ReadOutcome::EndOfInput`], discarding a
    /// partially typed statement.
    pub fn read<W: Write + ?Sized>(&mut self, prompt: &mut W) -> io::Result<ReadOutcome> {
        let mut buffer = Vec::new();
        let mut escape_pending = false;
        show(prompt, PROMPT)?;

        loop {
            let Some(byte) = self.next_byte()? else {
                prompt.write_all(b"\n")?;
                prompt.flush()?;
                return Ok(ReadOutcome::EndOfInput);
            };

            match (byte, escape_pending) {
                (b'\n', true) => {
                    escape_pending = false;
                    show(prompt, CONTINUATION_PROMPT)?;
                }
                (b'\n', false) if buffer.is_empty() => match self.policy {
                    EmptyLinePolicy::Stop => return Ok(ReadOutcome::EndOfInput),
                    EmptyLinePolicy::Reprompt => show(prompt, PROMPT)?,
                },
                (b'\n', false) => break,
                (b'\r', _) => {}
                (b'\\', true) => {
                    buffer.extend_from_slice(b"\\\\");
                    escape_pending = false;
                }
                (b'\\', false) => escape_pending = true,
                (other, true) => {
                    buffer.push(b'\\');
                    buffer.push(other);
                    escape_pending = false;
                }
                (other, false) => buffer.push(other),
            }
        }

        let fragment = String::from_utf8_lossy(&buffer).into_owned();
        trace!(bytes = buffer.len(), "fragment read");
        Ok(ReadOutcome::Fragment(fragment))
    }

    /// Drains the rest of the stream as a single script.
    pub fn read_to_end(&mut self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.input.read_to_end(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

fn show<W: Write + ?Sized>(sink: &mut W, text: &str) -> io::Result<()> {
    sink.write_all(text.as_bytes())?;
    sink.flush()
}
