// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for bmw-cardata.
//!
//! This binary provides the `bmw-cardata` command for printing BMW CarData
//! JSON exports as text or exporting selected records as CSV.

use bmw_cardata::loader::{self, LoadError};
use bmw_cardata::records::RecordFilter;
use bmw_cardata::report::{OutputFormat, ReportError, ReportOptions, Reporter};
use lexopt::prelude::*;
use log::LevelFilter;
use snafu::{ensure, prelude::*};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

/// Environment variable holding extra `env_logger` filter directives.
const LOG_ENV: &str = "BMW_CARDATA_LOG";

/// Where to write the report.
enum OutputTarget {
    /// Write to the specified file.
    File(PathBuf),
    /// Write to stdout.
    Stdout,
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    limit: Option<usize>,
    ladehistorie: bool,
    reifendiagnose: bool,
    csv: bool,
    verbose: bool,
    debug: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("CSV output needs a single record type, use either -L or -R"))]
    CsvMixedRecords,

    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to finish output: {source}"))]
    FinishOutput { source: ReportError },
}

/// Failure while processing one input file. The run continues with the next.
#[derive(Debug, Snafu)]
enum FileError {
    #[snafu(display("{source}"))]
    Load { source: LoadError },

    #[snafu(display("failed to report {}: {source}", path.display()))]
    Report {
        path: PathBuf,
        source: ReportError,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Print and export BMW CarData JSON exports

Usage: {name} [OPTIONS] <FILENAME>...

Arguments:
  <FILENAME>...  Input JSON files or directories containing exports

Options:
  -l, --limit <LIMIT>    Limit recursion depth (0: no limit)
  -L, --ladehistorie     Extract charging-history records
  -R, --reifendiagnose   Extract tyre-diagnostics records
  -C, --csv              Write CSV instead of text
  -o, --output <OUTPUT>  Write to file instead of stdout (- for stdout)

Other options:
  -v, --verbose          Verbose messages
  -d, --debug            More debug messages
  -h, --help             Print help
  -V, --version          Print version

Set {log_env} to override log filtering, e.g. {log_env}=debug",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output = OutputTarget::Stdout;
    let mut limit = None;
    let mut ladehistorie = false;
    let mut reifendiagnose = false;
    let mut csv = false;
    let mut verbose = false;
    let mut debug = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::File(val)
                };
            }
            Short('l') | Long("limit") => {
                let val: usize = parser
                    .value()?
                    .parse()
                    .map_err(|_| "limit must be a non-negative number")?;
                limit = (val > 0).then_some(val);
            }
            Short('L') | Long("ladehistorie") => ladehistorie = true,
            Short('R') | Long("reifendiagnose") => reifendiagnose = true,
            Short('C') | Long("csv") => csv = true,
            Short('v') | Long("verbose") => verbose = true,
            Short('d') | Long("debug") => debug = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output,
        limit,
        ladehistorie,
        reifendiagnose,
        csv,
        verbose,
        debug,
    })
}

/// Initializes logging to stderr; `-d` wins over `-v`.
fn init_logging(verbose: bool, debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format(|buf, record| {
        writeln!(
            buf,
            "{}: {}: {}",
            env!("CARGO_PKG_NAME"),
            record.level().as_str().to_lowercase(),
            record.args()
        )
    });
    if let Ok(filters) = std::env::var(LOG_ENV) {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> Result<ExitCode, Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_logging(cli.verbose, cli.debug);

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);
    ensure!(
        !(cli.csv && cli.ladehistorie && cli.reifendiagnose),
        CsvMixedRecordsSnafu
    );

    // Collect all input files first
    let files = collect_input_files(&cli.input);
    log::debug!("{} input files", files.len());

    let writer: Box<dyn Write> = match &cli.output {
        OutputTarget::Stdout => Box::new(std::io::stdout().lock()),
        OutputTarget::File(path) => {
            let file = File::create(path).context(CreateOutputSnafu { path })?;
            Box::new(BufWriter::new(file))
        }
    };

    let mut reporter = Reporter::new(writer, make_report_options(&cli));
    let mut failed = 0_usize;
    for file in &files {
        if let Err(e) = process_file(file, &mut reporter) {
            log::error!("{e}");
            failed += 1;
        }
    }
    reporter.finish().context(FinishOutputSnafu)?;

    if failed > 0 {
        log::warn!("{failed} of {} files failed", files.len());
    }
    Ok(exit_code(failed))
}

/// Exit status for a run: the number of failed files, saturating at 255.
fn exit_code(failed: usize) -> ExitCode {
    ExitCode::from(u8::try_from(failed).unwrap_or(u8::MAX))
}

/// Collects all JSON files from the given inputs (files and directories).
///
/// Directory contents are visited in file-name order so that repeated runs
/// produce the same output.
fn collect_input_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| {
                    entry
                        .inspect_err(|e| log::warn!("skipping unreadable entry: {e}"))
                        .ok()
                })
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Creates report options from CLI arguments.
const fn make_report_options(cli: &Cli) -> ReportOptions {
    let records = match (cli.ladehistorie, cli.reifendiagnose) {
        (true, true) => Some(RecordFilter::All),
        (true, false) => Some(RecordFilter::ChargingHistory),
        (false, true) => Some(RecordFilter::TyreDiagnostics),
        (false, false) => None,
    };

    ReportOptions {
        limit: cli.limit,
        records,
        format: if cli.csv {
            OutputFormat::Csv
        } else {
            OutputFormat::Text
        },
    }
}

/// Loads one file and writes its report.
fn process_file<W: Write>(path: &Path, reporter: &mut Reporter<W>) -> Result<(), FileError> {
    log::info!("processing JSON file {}", path.display());

    let doc = loader::load_document(path).context(LoadSnafu)?;
    let count = reporter.report(&doc).context(ReportSnafu { path })?;

    log::info!("{}: {count} entries written", path.display());
    Ok(())
}
