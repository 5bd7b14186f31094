use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mr-cli")]
#[command(about = "Evaluate scripts in an embedded engine context")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Eval(EvalArgs),
    Repl(ReplArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ContextArgs {
    #[arg(long = "timeout-ms", default_value_t = 0, help = "Per-evaluation time limit in milliseconds, 0 disables it")]
    pub(crate) timeout_ms: u64,
    #[arg(long = "max-string-size")]
    pub(crate) max_string_size: Option<usize>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["expr", "file"])))]
pub(crate) struct EvalArgs {
    #[arg(long = "expr")]
    pub(crate) expr: Option<String>,
    #[arg(long = "file")]
    pub(crate) file: Option<String>,
    #[command(flatten)]
    pub(crate) context: ContextArgs,
}

#[derive(Debug, Args)]
pub(crate) struct ReplArgs {
    #[command(flatten)]
    pub(crate) context: ContextArgs,
}
