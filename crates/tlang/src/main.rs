use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use logutil::LogFormat;
use tlang_core::binding::Namespace;
use tlang_core::config::ProgramConfig;
use tlang_core::history::{DEFAULT_HISTORY_PATH, FileHistory, NoHistory};
use tlang_core::program::Program;
use tlang_core::session::{Shell, run_script};
use tlang_core::table::io::{OutputFormat, write_table};
use tlang_error::{Result, ResultExt, TlangError};
use tracing::debug;

#[derive(Parser)]
#[clap(name = "tlang")]
struct Arguments {
    /// File of user defined functions to load before anything runs.
    #[clap(short = 'u', long = "user")]
    user: Option<PathBuf>,
    /// Run this script then exit.
    ///
    /// If omitted, an interactive session is started.
    #[clap(short = 'f', long = "file")]
    file: Option<PathBuf>,
    /// Directory scripts and function files are read from.
    #[clap(short = 's', long = "src")]
    src: Option<PathBuf>,
    /// Directory tables are read from.
    #[clap(short = 'd', long = "data")]
    data: Option<PathBuf>,
    /// Directory tables are written to.
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// Script arguments as a JSON object, e.g. '{"demo": "Black"}'.
    #[clap(short = 'a', long = "args")]
    args: Option<String>,
    /// History file for the interactive session.
    #[clap(short = 'l', long = "log", default_value = DEFAULT_HISTORY_PATH)]
    log: PathBuf,
    /// Log debug output to stderr.
    #[clap(short = 'v', long)]
    verbose: bool,
    /// Don't preview tables after each statement.
    #[clap(long)]
    silent: bool,
    /// Format for log output.
    #[clap(long, default_value_t = LogFormat::HumanReadable)]
    log_format: LogFormat,
}

fn main() {
    let args = Arguments::parse();
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };
    logutil::configure_global_logger(level, args.log_format, io::stderr);

    match inner(args) {
        Ok(true) => (),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            println!("ERROR: {err}");
            std::process::exit(1);
        }
    }
}

/// Script values are bound as T literals, so strings are quoted.
fn parse_script_args(json: &str) -> Result<Namespace> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("Script arguments must be a JSON object")?;
    let serde_json::Value::Object(map) = value else {
        return Err(TlangError::syntax("Script arguments must be a JSON object"));
    };

    let bindings = map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => quote_literal(&s)
                    .ok_or_else(|| {
                        TlangError::syntax(format!(
                            "Script argument '{key}' can't contain both quote characters"
                        ))
                    })?,
                other => other.to_string(),
            };
            Ok((key, value))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Namespace::new(bindings))
}

/// String literals have no escapes, so pick the quote the value doesn't use.
fn quote_literal(s: &str) -> Option<String> {
    if !s.contains('\'') {
        Some(format!("'{s}'"))
    } else if !s.contains('"') {
        Some(format!("\"{s}\""))
    } else {
        None
    }
}

/// Returns false if a script failed.
fn inner(args: Arguments) -> Result<bool> {
    let width = crossterm::terminal::size().ok().map(|(cols, _rows)| cols);
    let config = ProgramConfig {
        src_dir: args.src,
        data_dir: args.data,
        output_dir: args.output,
        repl: args.file.is_none(),
        silent: args.silent,
        width,
        ..Default::default()
    };
    let stdout = BufWriter::new(io::stdout());

    let mut program = match &args.file {
        Some(_) => Program::new(config, Box::new(NoHistory), stdout),
        None => {
            let history = FileHistory::open(&args.log)?;
            Program::new(config, Box::new(history), stdout)
        }
    };

    if let Some(json) = &args.args {
        program.set_script_args(parse_script_args(json)?);
    }
    if let Some(user) = &args.user {
        let path = program.config().resolve_script(user);
        let names = program.registry_mut().load_file(&path)?;
        debug!(?names, "loaded user functions");
    }

    let Some(file) = args.file else {
        let mut shell = Shell::new(program);
        shell.banner()?;
        shell.run(io::stdin().lock())?;
        shell.program_mut().writer_mut().flush()?;
        return Ok(true);
    };

    let path = program.config().resolve_script(&file);
    let outcome = run_script(&mut program, &path)?;

    // A script that doesn't end by displaying something writes its result.
    let display = outcome.last_verb.as_ref().is_some_and(|verb| verb.is_display());
    if !outcome.failed && !display {
        if let Some(top) = program.tables().first().cloned() {
            write_table(&top, OutputFormat::Csv, program.writer_mut())?;
        }
    }
    program
        .writer_mut()
        .flush()
        .context("Failed to flush output")?;

    Ok(!outcome.failed)
}
