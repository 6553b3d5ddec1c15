pub mod decode;
pub mod watch;

use std::fs::File;
use std::path::Path;

use sensorscope_core::{ConfigError, ScopeConfig};

use crate::WatchArgs;

/// Set up `env_logger` (default level `info`, `RUST_LOG` overrides).
///
/// The full-screen view owns the terminal, so there logs only go to
/// `log_file`; without one they are dropped.
pub fn init_logging(fullscreen: bool, log_file: Option<&Path>) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);

    match (fullscreen, log_file) {
        (_, Some(path)) => match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Warning: cannot open log file {}: {e}", path.display());
                return;
            }
        },
        (true, None) => return,
        (false, None) => {
            builder.target(env_logger::Target::Stderr);
        }
    }
    let _ = builder.try_init();
}

/// Merge the optional config file with command-line flags and validate.
pub fn build_config(args: &WatchArgs) -> Result<ScopeConfig, ConfigError> {
    let mut cfg = match &args.config {
        Some(path) => ScopeConfig::from_file(path)?,
        None => ScopeConfig::default(),
    };

    if let Some(host) = &args.host {
        cfg.broker.host = host.clone();
    }
    if let Some(port) = args.port {
        cfg.broker.port = port;
    }
    if let Some(topic) = &args.topic {
        cfg.topic = topic.clone();
    }
    if let Some(buffer) = args.buffer {
        cfg.capacity = Some(buffer);
    }
    if let Some(interval) = args.interval {
        cfg.interval_ms = Some(interval);
    }
    if args.user.is_some() {
        cfg.broker.username = args.user.clone();
    }
    if args.password.is_some() {
        cfg.broker.password = args.password.clone();
    }

    cfg.validate()?;
    Ok(cfg)
}
