use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};

use lminc::{
    assemble_program, fault_message, listing, used_len, InputSource, MemoryImage, Program,
    Session, SessionOptions, SymbolTable,
};

/// LMinC is an assembler and emulator for a decimal mailbox computer.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.lmc` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run assembly `.lmc` or object `.lmo` file and output to terminal
    Run {
        /// `.lmc` or `.lmo` file to run
        name: PathBuf,
        /// Comma separated input values, used instead of stdin
        #[arg(short, long)]
        input: Option<String>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
        /// Print every executed instruction to stderr
        #[arg(short, long)]
        trace: bool,
        /// Stop after this many steps
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Create object `.lmo` file to run later
    Compile {
        /// `.lmc` file to compile
        name: PathBuf,
        /// Destination to output `.lmo` file
        dest: Option<PathBuf>,
    },
    /// Check `.lmc` files without running or outputting an object
    Check {
        /// Files or glob patterns to check
        #[arg(required = true)]
        patterns: Vec<String>,
    },
    /// Print the assembled memory image with decoded instructions and labels
    Dump {
        /// `.lmc` or `.lmo` file to list
        name: PathBuf,
    },
    /// Place a watch on a `.lmc` file to receive constant assembler updates
    Watch {
        /// `.lmc` file to watch
        name: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    lminc::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, None, RunFlags::default());
        }
        println!("\n~ lminc v{VERSION} ~");
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Run {
            name,
            input,
            minimal,
            trace,
            limit,
        } => run(
            &name,
            input,
            RunFlags {
                minimal,
                trace,
                limit,
            },
        ),
        Command::Compile { name, dest } => {
            file_message(Green, "Assembling", &name);
            let program = load_source(&name)?;

            let out_file_name = match dest {
                Some(dest) => dest,
                None => name.with_extension("lmo"),
            };
            let mut file = File::create(&out_file_name).into_diagnostic()?;
            file.write_all(&program.image.to_bytes()).into_diagnostic()?;

            message(Green, "Finished", "emit object");
            file_message(Green, "Saved", &out_file_name);
            Ok(())
        }
        Command::Check { patterns } => {
            let mut failed = 0;
            for name in expand_patterns(&patterns)? {
                file_message(Green, "Checking", &name);
                match load_source(&name) {
                    Ok(program) => {
                        let used = format!("{} of 100 mailboxes used", program.len);
                        message(Green, "Success", &used);
                    }
                    Err(e) => {
                        eprintln!("{:?}", e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{} file(s) failed to assemble", failed);
            }
            Ok(())
        }
        Command::Dump { name } => {
            let program = load(&name)?;
            print!(
                "{}",
                listing(&program.image, &program.symbols, program.len)
            );
            Ok(())
        }
        Command::Watch { name } => {
            if !name.exists() {
                bail!("File does not exist. Exiting...")
            }
            // Vim breaks if watching a single file
            let folder_path = match name.parent() {
                Some(pth) if pth.is_dir() => pth.to_path_buf(),
                _ => Path::new(".").to_path_buf(),
            };

            // Clear screen and move cursor to top left
            print!("\x1B[2J\x1B[2;1H");
            file_message(Green, "Watching", &name);
            message(Cyan, "Help", "press CTRL+C to exit");

            let mut watcher =
                Hotwatch::new_with_custom_delay(Duration::from_millis(500)).into_diagnostic()?;

            watcher
                .watch(folder_path, move |event: Event| match event.kind {
                    // Watch remove for vim changes
                    EventKind::Modify(_) | EventKind::Remove(_) => {
                        print!("\x1B[2J\x1B[2;1H");
                        file_message(Green, "Watching", &name);
                        message(Green, "Re-checking", "file change detected");
                        message(Cyan, "Help", "press CTRL+C to exit");

                        // Makes reruns more obvious
                        sleep(Duration::from_millis(50));

                        match load_source(&name) {
                            Ok(_) => message(Green, "Success", "no errors found!"),
                            Err(e) => println!("\n{:?}", e),
                        }
                        Flow::Continue
                    }
                    _ => Flow::Continue,
                })
                .into_diagnostic()?;
            watcher.run();
            Ok(())
        }
    }
}

#[derive(Default)]
struct RunFlags {
    minimal: bool,
    trace: bool,
    limit: Option<u64>,
}

fn run(name: &Path, input: Option<String>, flags: RunFlags) -> Result<()> {
    let quiet = flags.minimal;
    if !quiet {
        file_message(MsgColor::Green, "Assembling", name);
    }
    let program = load(name)?;

    let opts = SessionOptions {
        minimal: flags.minimal,
        trace: flags.trace || lminc::env::is_trace_enabled(),
        step_limit: flags.limit.or_else(lminc::env::step_limit),
    };
    let mut session = Session::new(
        program.image,
        InputSource::from(input),
        io::stdout(),
        opts,
    );

    if !quiet {
        message(MsgColor::Green, "Running", "assembled image");
    }
    let status = session.run()?;

    if let Some(fault) = fault_message(status) {
        if !quiet {
            file_message(MsgColor::Red, "Failed", name);
        }
        let state = session.state();
        bail!(
            "{} at address {} (accumulator {})",
            fault,
            state.pc(),
            state.acc()
        );
    }
    if !quiet {
        file_message(MsgColor::Green, "Completed", name);
    }
    Ok(())
}

/// Assemble a source file, or read an object file.
fn load(name: &Path) -> Result<Program> {
    let Some(ext) = name.extension().and_then(|ext| ext.to_str()) else {
        bail!("File has no extension. Exiting...");
    };
    match ext {
        "lmo" => {
            let bytes = fs::read(name).into_diagnostic()?;
            let image = MemoryImage::from_bytes(&bytes).into_diagnostic()?;
            Ok(Program {
                image,
                symbols: SymbolTable::new(),
                len: used_len(&image),
            })
        }
        "lmc" | "txt" | "asm" => load_source(name),
        _ => bail!("File has unknown extension. Exiting..."),
    }
}

/// Return assembled program of source file, or a diagnostic pointing into it
fn load_source(name: &Path) -> Result<Program> {
    let contents = fs::read_to_string(name).into_diagnostic()?;
    assemble_program(&contents)
        .map_err(|e| e.into_report(&name.display().to_string(), &contents))
}

fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let before = paths.len();
        for entry in glob::glob(pattern).into_diagnostic()? {
            paths.push(entry.into_diagnostic()?);
        }
        if paths.len() == before {
            bail!("No files match `{}`", pattern);
        }
    }
    Ok(paths)
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

/// Amount of lines to show as context, each side of focus line (line containing span).
const DIAGNOSTIC_CONTEXT_LINES: usize = 4;

const SHORT_INFO: &str = r"
Welcome to lminc, an assembler and emulator for the LMinC mailbox computer.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
