mod errors;
pub mod pem_decoder;
pub mod server;

use std::process::ExitCode;

use log::LevelFilter;

pub use crate::errors::{AppError, ErrorKind};
pub use crate::pem_decoder::{
    BlockPolicy, DecodeEngine, DiagnosticEntry, DiagnosticLevel, DiagnosticSink, EngineOptions,
    LogSink, NullSink, Report, Structure,
};
pub use crate::server::ServerConfig;

/// Install the global logger. `RUST_LOG` still wins over the defaults set here.
fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let result = env_logger::Builder::new()
        .filter_level(level)
        // hyper and friends are noisy at debug
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("hyper_util", LevelFilter::Warn)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    if result.is_err() {
        log::debug!("logger already installed");
    }
    if debug {
        log::debug!(target: "pemview", "debug logging enabled");
    }
}

pub fn run() -> ExitCode {
    init_logging(ServerConfig::debug_requested());
    let config = ServerConfig::from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!(target: "pemview", "failed to start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::serve(config, server::shutdown_signal())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!(target: "pemview", "failed to start server: {err}");
            ExitCode::FAILURE
        }
    }
}
