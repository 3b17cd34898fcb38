mod app;
mod cli;

use std::process;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("ffaccel=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = cli::parse();
    init_tracing(cli.verbose);

    if cli.debug_log {
        ffaccel::log::enable();
    }

    if let Err(e) = app::run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
