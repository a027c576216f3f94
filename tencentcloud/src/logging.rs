//! Logging setup and operation timing

use std::time::Instant;
use tfplug::Context;
use tracing::Level;

/// Install the stderr subscriber; the level comes from `TF_LOG`
///
/// Safe to call more than once, later calls keep the first subscriber.
pub fn init() {
    let level = parse_level(std::env::var("TF_LOG").ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_ansi(false)
        .try_init();
}

fn parse_level(value: Option<&str>) -> Level {
    match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
        Some("TRACE") => Level::TRACE,
        Some("DEBUG") => Level::DEBUG,
        Some("WARN") => Level::WARN,
        Some("ERROR") => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Logs how long a lifecycle operation took once it goes out of scope
pub struct LogElapsed {
    operation: String,
    log_id: String,
    start: Instant,
}

impl LogElapsed {
    pub fn new(ctx: &Context, operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            log_id: ctx.log_id().to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for LogElapsed {
    fn drop(&mut self) {
        tracing::info!(
            log_id = %self.log_id,
            "[ELAPSED] {} took {:?}",
            self.operation,
            self.start.elapsed()
        );
    }
}
