fn main() {
    mr_cli::init_tracing();
    let exit_code = mr_cli::run_cli_from_args(std::env::args_os());
    std::process::exit(exit_code);
}
