use std::fmt::Display;
use std::io::Write;

use mr_core::{HostValue, RacerError};

fn map_error(code: &'static str, error: impl Display) -> RacerError {
    RacerError::resource(code, error.to_string())
}

pub(crate) fn emit_value(writer: &mut dyn Write, value: &HostValue) -> Result<(), RacerError> {
    let json = serde_json::to_string(value).map_err(map_cli_json)?;
    writeln!(writer, "RESULT:OK").map_err(map_cli_io)?;
    writeln!(writer, "VALUE_JSON:{}", json).map_err(map_cli_io)
}

pub(crate) fn emit_error(writer: &mut dyn Write, error: RacerError) -> i32 {
    let message =
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string());
    let _ = writeln!(writer, "RESULT:ERROR");
    let _ = writeln!(writer, "ERROR_CODE:{}", error.code);
    let _ = writeln!(writer, "ERROR_MSG_JSON:{}", message);
    1
}

pub(crate) fn map_cli_io(error: std::io::Error) -> RacerError {
    map_error("CLI_IO", error)
}

pub(crate) fn map_cli_source_read(error: std::io::Error) -> RacerError {
    map_error("CLI_SOURCE_READ", error)
}

pub(crate) fn map_cli_json(error: serde_json::Error) -> RacerError {
    map_error("CLI_JSON", error)
}
