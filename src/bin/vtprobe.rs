//! vtprobe - report what the attached console can do
//!
//! Small diagnostic tool around termlease: prints redirection state, the
//! visible region, cursor position, and virtual terminal capability, and
//! can run a paint-and-restore round trip to eyeball the restoration
//! contract.

use std::env;
use std::io::Write;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use termlease::{ConsoleColor, TerminalHandle};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

struct Options {
    /// Paint a color strip before releasing
    paint: bool,
    /// Log negotiation details to stderr
    verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            paint: false,
            verbose: false,
        }
    }
}

fn print_version() {
    eprintln!("vtprobe {}", VERSION);
}

fn print_help() {
    eprintln!("vtprobe {} - report what the attached console can do", VERSION);
    eprintln!();
    eprintln!("Usage: vtprobe [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -p, --paint           Paint a color strip, then restore on exit");
    eprintln!("  -V, --verbose         Log negotiation details to stderr");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  vtprobe               Capability report");
    eprintln!("  vtprobe -p -V         Paint and watch the restore happen");
    eprintln!("  vtprobe | cat         Report for a redirected stream");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();

    for arg in &args[1..] {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-p" | "--paint" => {
                options.paint = true;
            }
            "-V" | "--verbose" => {
                options.verbose = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
    }

    Ok(options)
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    if options.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::TRACE)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    let mut term = TerminalHandle::attach()?;
    info!("console attached");

    println!("vtprobe {}", VERSION);
    println!("output redirected:  {}", term.is_output_redirected());

    let region = term.region()?;
    if region.is_unbounded() {
        println!("region:             unbounded (no terminal geometry)");
    } else {
        println!("region:             {}x{} (clipping)", region.width, region.height);
    }

    println!(
        "virtual terminal:   {} (before enable)",
        term.is_virtual_terminal_enabled()
    );
    term.try_enable_virtual_terminal();
    println!(
        "virtual terminal:   {} (after enable)",
        term.is_virtual_terminal_enabled()
    );

    if !term.is_output_redirected() {
        let (column, row) = term.cursor_position()?;
        println!("cursor:             column {}, row {}", column, row);
    }

    if options.paint {
        paint(&mut term)?;
    }

    term.release();
    Ok(())
}

/// Paint a strip of palette colors through the handle. The release that
/// follows puts the snapshot colors back; nothing to undo here.
fn paint(term: &mut TerminalHandle) -> anyhow::Result<()> {
    let strip = [
        ConsoleColor::Red,
        ConsoleColor::Yellow,
        ConsoleColor::Green,
        ConsoleColor::Cyan,
        ConsoleColor::Blue,
        ConsoleColor::Magenta,
    ];

    for color in strip {
        term.set_foreground(color)?;
        write!(term.out(), " {:?}", color)?;
    }
    writeln!(term.out())?;
    term.out().flush()?;

    Ok(())
}
