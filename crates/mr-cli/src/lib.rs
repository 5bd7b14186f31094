use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Once};
use std::time::Duration;

use clap::Parser;
use mr_api::{Context, ContextOptions};
use mr_core::{EngineLimits, RacerError};
use mr_runtime::HostRuntime;

mod cli_args;
mod error_map;
mod line_repl;

pub(crate) use cli_args::{Cli, ContextArgs, EvalArgs, Mode, ReplArgs};
pub(crate) use error_map::{emit_error, emit_value, map_cli_io, map_cli_source_read};
pub(crate) use line_repl::run_repl_line_mode_with_io;
#[cfg(test)]
pub(crate) use line_repl::{handle_repl_command, ReplCommandAction};

static TRACING_INIT: Once = Once::new();

pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(filter)
            .try_init();
    });
}

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_cli_from_args_with_io(args, &mut reader, &mut writer)
}

pub fn run_cli_from_args_with_io<I, T>(
    args: I,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli, reader, writer) {
        Ok(code) => code,
        Err(error) => emit_error(writer, error),
    }
}

fn run(cli: Cli, reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<i32, RacerError> {
    match cli.command {
        Mode::Eval(args) => run_eval(args, writer),
        Mode::Repl(args) => run_repl(args, reader, writer),
    }
}

fn run_eval(args: EvalArgs, writer: &mut dyn Write) -> Result<i32, RacerError> {
    let source = match (args.expr, args.file) {
        (Some(expr), _) => expr,
        (None, Some(path)) => fs::read_to_string(path).map_err(map_cli_source_read)?,
        (None, None) => {
            return Err(RacerError::invalid_argument(
                "CLI_SOURCE_MISSING",
                "Either --expr or --file is required.",
            ))
        }
    };

    let host = HostRuntime::new();
    let context = create_context(&host, &args.context)?;
    tracing::debug!(
        instance_id = context.instance().id(),
        source_len = source.len(),
        "evaluating source"
    );
    let mut guard = host.enter();
    let value = context.eval(&mut guard, &source)?;
    emit_value(writer, &value)?;
    Ok(0)
}

fn run_repl(
    args: ReplArgs,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, RacerError> {
    let host = HostRuntime::new();
    let context = create_context(&host, &args.context)?;
    tracing::debug!(instance_id = context.instance().id(), "starting repl");
    run_repl_line_mode_with_io(&host, &context, reader, writer)
}

fn create_context(host: &Arc<HostRuntime>, args: &ContextArgs) -> Result<Context, RacerError> {
    let mut limits = EngineLimits::default();
    if let Some(max_string_size) = args.max_string_size {
        limits.max_string_size = max_string_size;
    }
    Context::new(
        host,
        ContextOptions {
            timeout: Some(Duration::from_millis(args.timeout_ms)),
            limits,
        },
    )
}
