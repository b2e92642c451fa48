//! Logging setup and crash context.
//!
//! - [`init_logging`] installs the `tracing` subscriber used by the CLI.
//! - [`set_phase`] and [`set_current_file`] record what a thread is doing so
//!   the panic hook can say where a crash happened.

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, get_progress, increment_processed, set_current_file, set_phase,
    set_progress, AnalysisContext, AnalysisPhase, ContextGuard,
};
pub use panic_hook::install_panic_hook;

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Default filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Install a stderr subscriber. `RUST_LOG` overrides the verbosity flag.
///
/// Idempotent; only the first call has an effect. `log` records from
/// dependencies are forwarded to the same subscriber.
pub fn init_logging(verbosity: u8) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

        let result = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbosity > 1),
            )
            .with(filter)
            .try_init();
        if let Err(e) = result {
            eprintln!("Note: logging already configured: {}", e);
        }
    });
}
