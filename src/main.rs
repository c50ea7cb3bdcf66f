use std::process::ExitCode;

use coi_webserver::{logger, Config, ServerError};

fn main() -> ExitCode {
    exit_code(run())
}

/// Any startup error, bind failure included, exits non-zero
fn exit_code(result: Result<(), ServerError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    let cfg = Config::load()?;
    logger::init(&cfg).map_err(ServerError::Log)?;

    // Worker threads from config, Tokio's default (CPU cores) otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers.filter(|&w| w > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(coi_webserver::start(cfg))
}
