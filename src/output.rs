use std::io::{self, Write};

use colored::{Color, Colorize};

use crate::{memory::Word, runtime::Status};

/// Renders program output for a terminal or a file.
///
/// Numbers get a line each, characters are printed inline. Anything that needs its own line
/// first closes a character line left open by `OTA`.
pub struct Output<W: Write> {
    sink: W,
    /// Suppress banners and input echo, leaving only program output
    minimal: bool,
    /// Last thing written was a character other than a newline
    line_open: bool,
}

impl<W: Write> Output<W> {
    pub fn new(sink: W, minimal: bool) -> Self {
        Output {
            sink,
            minimal,
            line_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    fn start_new_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.sink)?;
            self.line_open = false;
        }
        Ok(())
    }

    pub fn number(&mut self, value: Word) -> io::Result<()> {
        self.start_new_line()?;
        writeln!(self.sink, "{value}")?;
        self.sink.flush()
    }

    pub fn char(&mut self, ch: char) -> io::Result<()> {
        write!(self.sink, "{ch}")?;
        self.line_open = ch != '\n';
        self.sink.flush()
    }

    /// Echo a value the user supplied, so transcripts read in order.
    pub fn echo_input(&mut self, value: &str) -> io::Result<()> {
        if self.minimal {
            return Ok(());
        }
        self.start_new_line()?;
        writeln!(self.sink, "> {value}")
    }

    pub fn banner(&mut self, text: &str, color: Color) -> io::Result<()> {
        if self.minimal {
            return Ok(());
        }
        self.start_new_line()?;
        writeln!(self.sink, "{:>12}", text.color(color))?;
        self.sink.flush()
    }

    /// Banner for a status that hands control back to the host.
    pub fn status(&mut self, status: Status) -> io::Result<()> {
        match status {
            Status::Halted => self.banner("Halted", Color::Cyan),
            Status::AwaitingNumberInput => self.banner("Awaiting input", Color::Cyan),
            Status::AwaitingCharInput => self.banner("Awaiting char input", Color::Cyan),
            Status::EndOfMemory | Status::InvalidInstruction => {
                self.banner(fault_message(status).unwrap_or_default(), Color::Red)
            }
            Status::Running | Status::ProducedNumber | Status::ProducedChar => Ok(()),
        }
    }
}

/// Human-readable text for execution faults.
pub fn fault_message(status: Status) -> Option<&'static str> {
    match status {
        Status::EndOfMemory => Some("Reached end of memory"),
        Status::InvalidInstruction => Some("Reached an invalid instruction"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(minimal: bool, f: impl FnOnce(&mut Output<Vec<u8>>) -> io::Result<()>) -> String {
        let mut out = Output::new(Vec::new(), minimal);
        f(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn chars_inline_numbers_on_own_line() {
        let text = render(true, |out| {
            out.char('h')?;
            out.char('i')?;
            out.number(7)?;
            out.number(-2)?;
            out.char('x')?;
            out.char('\n')?;
            out.number(3)
        });
        assert_eq!(text, "hi\n7\n-2\nx\n3\n");
    }

    #[test]
    fn minimal_hides_banners() {
        let text = render(true, |out| {
            out.status(Status::Halted)?;
            out.echo_input("5")
        });
        assert_eq!(text, "");
    }

    #[test]
    fn banner_closes_char_line() {
        let text = render(false, |out| {
            out.char('a')?;
            out.status(Status::InvalidInstruction)
        });
        assert!(text.starts_with("a\n"));
        assert!(text.contains("Reached an invalid instruction"));
    }
}
