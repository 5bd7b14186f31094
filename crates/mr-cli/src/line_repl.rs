use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use mr_api::Context;
use mr_core::RacerError;
use mr_runtime::HostRuntime;

use crate::map_cli_io;

const HELP_LINE: &str = "commands: :help :timeout <ms> :quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplCommandAction {
    Continue,
    Quit,
    NotHandled,
}

pub(crate) fn run_repl_line_mode_with_io(
    host: &Arc<HostRuntime>,
    context: &Context,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, RacerError> {
    writeln!(writer, "mr-cli repl").map_err(map_cli_io)?;
    writeln!(writer, "{}", HELP_LINE).map_err(map_cli_io)?;

    loop {
        let Some(raw) = prompt_input_from("> ", reader, writer)? else {
            return Ok(0);
        };

        let mut lines = Vec::new();
        let action =
            handle_repl_command(raw.trim(), context, &mut |line: String| lines.push(line));
        for line in lines {
            writeln!(writer, "{}", line).map_err(map_cli_io)?;
        }
        match action {
            Ok(ReplCommandAction::Continue) => continue,
            Ok(ReplCommandAction::Quit) => return Ok(0),
            Ok(ReplCommandAction::NotHandled) => {}
            Err(error) => {
                writeln!(writer, "!! {}", error).map_err(map_cli_io)?;
                continue;
            }
        }

        if raw.trim().is_empty() {
            continue;
        }

        let mut guard = host.enter();
        match context.eval(&mut guard, &raw) {
            Ok(value) => {
                let json = serde_json::to_string(&value)
                    .unwrap_or_else(|_| "\"<unprintable>\"".to_string());
                writeln!(writer, "=> {}", json).map_err(map_cli_io)?;
            }
            Err(error) => {
                writeln!(writer, "!! {}", error).map_err(map_cli_io)?;
            }
        }
    }
}

pub(crate) fn handle_repl_command(
    raw: &str,
    context: &Context,
    emit: &mut dyn FnMut(String),
) -> Result<ReplCommandAction, RacerError> {
    match raw.split_once(' ').map_or((raw, ""), |(head, tail)| (head, tail.trim())) {
        (":help", _) => {
            emit(HELP_LINE.to_string());
            Ok(ReplCommandAction::Continue)
        }
        (":timeout", "") => {
            let current = context.timeout().map_or(0, |timeout| timeout.as_millis());
            emit(format!("timeout: {} ms", current));
            Ok(ReplCommandAction::Continue)
        }
        (":timeout", value) => {
            let millis = value.parse::<u64>().map_err(|_| {
                RacerError::invalid_argument(
                    "CLI_TIMEOUT_PARSE",
                    format!("Invalid timeout: {}", value),
                )
            })?;
            context.set_timeout(Some(Duration::from_millis(millis)));
            emit(format!("timeout: {} ms", millis));
            Ok(ReplCommandAction::Continue)
        }
        (":quit", _) => {
            emit("bye".to_string());
            Ok(ReplCommandAction::Quit)
        }
        _ => Ok(ReplCommandAction::NotHandled),
    }
}

pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, RacerError> {
    write!(writer, "{}", prefix).map_err(map_cli_io)?;
    writer.flush().map_err(map_cli_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_cli_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
