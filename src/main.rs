use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser as ClapParser;
use env_logger::Builder;
use log::info;

use rox::interpreter::Interpreter;
use rox::{run_source, RunStatus};

#[derive(ClapParser, Debug)]
#[command(name = "rox", version, about = "Tree-walking interpreter for the Lox language", long_about = None)]
struct Cli {
    /// Script to run; starts a REPL when omitted
    script: Option<PathBuf>,

    /// Enable logging to rox.log
    #[arg(long)]
    log: bool,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger(enabled: bool) -> Result<()> {
    if !enabled {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();

        return Ok(());
    }

    let log_file = File::create("rox.log").context("Failed to create rox.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // override with RUST_LOG
        .init();

    info!("Logger initialized, writing to rox.log");
    Ok(())
}

fn run_file(path: &PathBuf) -> Result<()> {
    let buf = read_file(path)?;
    let mut interpreter = Interpreter::new();

    match run_source(&buf, &mut interpreter) {
        RunStatus::Ok => Ok(()),
        RunStatus::StaticError => process::exit(65),
        RunStatus::RuntimeError => process::exit(70),
    }
}

/// One line per run; static error state resets between lines while the
/// interpreter (and its globals) lives on.
fn run_prompt() -> Result<()> {
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    print!("> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;

        run_source(line.as_bytes(), &mut interpreter);

        print!("> ");
        io::stdout().flush()?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print().context("Failed to print help")?;
            return Ok(());
        }

        // Usage error: wrong arguments.
        Err(e) => {
            eprintln!("{}", e);
            process::exit(64);
        }
    };

    init_logger(args.log)?;

    info!("CLI arguments: {:?}", args);

    match &args.script {
        Some(path) => run_file(path),
        None => run_prompt(),
    }
}
