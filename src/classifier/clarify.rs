use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// The human side of the fallback: shows notices and answers questions.
pub trait Clarifier {
    fn notify(&mut self, message: &str) -> Result<()>;

    /// Blocks for one line of input; `None` means the input stream is closed.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Line-oriented clarifier over any reader/writer pair.
pub struct TerminalClarifier<R, W> {
    reader: R,
    writer: W,
}

impl TerminalClarifier<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalClarifier<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Reads one raw line, without the trailing newline.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.writer, "{prompt}").context("failed to write prompt")?;
        self.writer.flush().context("failed to flush prompt")?;
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("failed to read from terminal")?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed_len = line.trim_end_matches(&['\r', '\n'][..]).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

impl<R: BufRead, W: Write> Clarifier for TerminalClarifier<R, W> {
    fn notify(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "{message}").context("failed to write to terminal")
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        self.read_line(prompt)
    }
}
