use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

use console::Term;
use miette::{bail, IntoDiagnostic, Result};

use crate::{
    instr::Instruction,
    memory::{MemoryImage, Word},
    output::Output,
    runtime::{RunState, Status},
};

/// How the host drives a program.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionOptions {
    /// Print only what the program outputs
    pub minimal: bool,
    /// Print every executed step to stderr
    pub trace: bool,
    /// Give up after this many steps
    pub step_limit: Option<u64>,
}

/// Where values for `IN`/`INA` come from.
pub enum InputSource {
    /// Values given up front, in order
    Argument(VecDeque<String>),
    /// Interactive terminal. Characters are read unbuffered.
    Terminal,
    /// Piped stdin, one value per line
    Stdin,
}

impl InputSource {
    /// Comma separated values from `argument`, or whatever stdin is.
    pub fn from(argument: Option<String>) -> Self {
        if let Some(argument) = argument {
            return InputSource::Argument(
                argument
                    .split(',')
                    .map(|value| value.trim().to_string())
                    .collect(),
            );
        }
        if io::stdin().is_terminal() {
            return InputSource::Terminal;
        }
        InputSource::Stdin
    }

    /// Next raw value, or `None` once exhausted.
    fn read_line(&mut self) -> Result<Option<String>> {
        match self {
            Self::Argument(values) => Ok(values.pop_front()),
            Self::Terminal | Self::Stdin => {
                let mut line = String::new();
                if io::stdin().lock().read_line(&mut line).into_diagnostic()? == 0 {
                    return Ok(None);
                }
                Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
            }
        }
    }

    fn read_number(&mut self) -> Result<Word> {
        loop {
            let Some(line) = self.read_line()? else {
                bail!("Program is awaiting input, but there is no more input");
            };
            match line.trim().parse::<Word>() {
                Ok(value) => return Ok(value),
                // Let the user try again
                Err(_) if matches!(self, Self::Terminal) => {
                    eprintln!("Invalid number `{}`, try again", line.trim());
                }
                Err(e) => bail!("Invalid number input `{}`: {}", line.trim(), e),
            }
        }
    }

    fn read_char(&mut self) -> Result<char> {
        if let Self::Terminal = self {
            return Term::stdout().read_char().into_diagnostic();
        }
        let Some(line) = self.read_line()? else {
            bail!("Program is awaiting char input, but there is no more input");
        };
        let mut chars = line.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ch),
            (None, _) => bail!("Expected a single character, found no characters"),
            (Some(_), Some(_)) => bail!("Expected a single character, found `{}`", line),
        }
    }
}

/// Host loop around a [`RunState`]: steps until the program ends, feeding input and rendering
/// output along the way.
pub struct Session<W: Write> {
    state: RunState,
    input: InputSource,
    out: Output<W>,
    opts: SessionOptions,
    steps: u64,
}

impl<W: Write> Session<W> {
    pub fn new(image: MemoryImage, input: InputSource, sink: W, opts: SessionOptions) -> Self {
        Session {
            state: RunState::new(image),
            input,
            out: Output::new(sink, opts.minimal),
            opts,
            steps: 0,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn into_sink(self) -> W {
        self.out.into_inner()
    }

    /// Run until a terminal status. Faults are returned as `Ok`; the machine is left as it was
    /// when the fault happened.
    pub fn run(&mut self) -> Result<Status> {
        loop {
            if let Some(limit) = self.opts.step_limit {
                if self.steps >= limit {
                    bail!(
                        "Step limit of {} reached at address {}",
                        limit,
                        self.state.pc()
                    );
                }
            }

            let pc = self.state.pc();
            let word = self.state.memory().get(pc);
            let status = self.state.step();
            self.steps += 1;
            if self.opts.trace {
                self.trace(pc, word, status);
            }

            match status {
                Status::Running => (),
                Status::ProducedNumber => {
                    let value = self.state.output_number().unwrap_or_default();
                    self.out.number(value).into_diagnostic()?;
                }
                Status::ProducedChar => {
                    let ch = self
                        .state
                        .output_char()
                        .and_then(char::from_u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    self.out.char(ch).into_diagnostic()?;
                }
                Status::AwaitingNumberInput => {
                    self.out.status(status).into_diagnostic()?;
                    let value = self.input.read_number()?;
                    self.state.input_number(value).into_diagnostic()?;
                    self.out.echo_input(&value.to_string()).into_diagnostic()?;
                }
                Status::AwaitingCharInput => {
                    self.out.status(status).into_diagnostic()?;
                    let ch = self.input.read_char()?;
                    self.state.input_char(u32::from(ch)).into_diagnostic()?;
                    self.out.echo_input(&ch.to_string()).into_diagnostic()?;
                }
                Status::Halted | Status::EndOfMemory | Status::InvalidInstruction => {
                    self.out.status(status).into_diagnostic()?;
                    return Ok(status);
                }
            }
        }
    }

    fn trace(&self, pc: usize, word: Option<Word>, status: Status) {
        let decoded = word
            .and_then(Instruction::decode)
            .map_or_else(|| "???".to_string(), |instr| instr.to_string());
        let word = word.map_or_else(|| "---".to_string(), |word| format!("{word:03}"));
        eprintln!(
            "[pc={:02} acc={}] {} {} -> status {}",
            pc,
            self.state.acc(),
            word,
            decoded,
            u32::from(status)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn args(values: &[&str]) -> InputSource {
        InputSource::Argument(values.iter().map(|v| v.to_string()).collect())
    }

    fn run(src: &str, input: InputSource, opts: SessionOptions) -> (Result<Status>, String) {
        let mut session = Session::new(assemble(src).unwrap(), input, Vec::new(), opts);
        let res = session.run();
        let text = String::from_utf8(session.into_sink()).unwrap();
        (res, text)
    }

    fn minimal() -> SessionOptions {
        SessionOptions {
            minimal: true,
            ..Default::default()
        }
    }

    #[test]
    fn echo_numbers() {
        let src = "
        loop IN
             BRZ end
             OUT
             BR loop
        end  HLT
        ";
        let (res, text) = run(src, args(&["5", "-3", "0"]), minimal());
        assert_eq!(res.unwrap(), Status::Halted);
        assert_eq!(text, "5\n-3\n");
    }

    #[test]
    fn char_output_inline() {
        let src = "
            LDA h
            OTA
            LDA i
            OTA
            LDA n
            OUT
            HLT
        h   DAT 72
        i   DAT 105
        n   DAT 9
        ";
        let (res, text) = run(src, args(&[]), minimal());
        assert_eq!(res.unwrap(), Status::Halted);
        assert_eq!(text, "Hi\n9\n");
    }

    #[test]
    fn char_input() {
        let (res, text) = run("INA\nOTA\nHLT", args(&["z"]), minimal());
        assert_eq!(res.unwrap(), Status::Halted);
        assert_eq!(text, "z");
    }

    #[test]
    fn rejects_multi_char_input() {
        let (res, _) = run("INA\nHLT", args(&["zz"]), minimal());
        assert!(res.is_err());
    }

    #[test]
    fn rejects_bad_number() {
        let (res, _) = run("IN\nHLT", args(&["five"]), minimal());
        assert!(res.is_err());
    }

    #[test]
    fn input_exhausted() {
        let (res, text) = run("IN\nOUT\nIN\nHLT", args(&["1"]), minimal());
        assert!(res.is_err());
        assert_eq!(text, "1\n");
    }

    #[test]
    fn fault_is_reported_as_status() {
        let (res, _) = run("LDA 0\nDAT 999", args(&[]), minimal());
        assert_eq!(res.unwrap(), Status::InvalidInstruction);
    }

    #[test]
    fn step_limit_stops_infinite_loop() {
        let opts = SessionOptions {
            minimal: true,
            step_limit: Some(50),
            ..Default::default()
        };
        let mut session = Session::new(assemble("x BR x").unwrap(), args(&[]), Vec::new(), opts);
        assert!(session.run().is_err());
        assert_eq!(session.steps(), 50);
    }

    #[test]
    fn banners_when_not_minimal() {
        let (res, text) = run("IN\nHLT", args(&["4"]), SessionOptions::default());
        assert_eq!(res.unwrap(), Status::Halted);
        assert!(text.contains("Awaiting input"));
        assert!(text.contains("> 4"));
        assert!(text.contains("Halted"));
    }
}
