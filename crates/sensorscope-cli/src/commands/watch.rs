use std::io;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use log::info;
use sensorscope_core::{MqttTransport, Orchestrator, SensorVariant};

use crate::WatchArgs;
use crate::plain::PlainSurface;
use crate::tui::app::TerminalSurface;

pub fn run(variant: SensorVariant, args: &WatchArgs) {
    let fullscreen = !args.plain;
    super::init_logging(fullscreen, args.log_file.as_deref());

    let config = match super::build_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "sensorscope {} watching {} on {}:{}",
        sensorscope_core::VERSION,
        variant,
        config.broker.host,
        config.broker.port
    );

    let mut scope = match Orchestrator::new(&config, variant, Arc::new(MqttTransport::new())) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Raw mode turns Ctrl+C into a key press; this covers --plain and the
    // moments before the screen is set up.
    let stop = scope.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
        eprintln!("Warning: cannot install Ctrl+C handler: {e}");
    }

    if !fullscreen {
        println!(
            "Watching {} on {}:{} topic {} (Ctrl+C to stop)",
            variant, config.broker.host, config.broker.port, config.topic
        );
    }

    let result = if fullscreen {
        let mut surface = match TerminalSurface::enter(variant, &config.topic, config.interval(variant))
        {
            Ok(s) => s,
            Err(e) => {
                eprintln!("TUI error: {e}");
                std::process::exit(1);
            }
        };
        let result = scope.run(&mut surface);
        if let Err(e) = surface.leave() {
            eprintln!("TUI error: {e}");
        }
        result
    } else {
        scope.run(&mut PlainSurface::new(io::stdout(), variant))
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
