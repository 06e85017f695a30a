//! Subscriber setup and the diagnostics layer

use grpcbridge_core::LogLevel;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Warning and error counts collected during a run
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: AtomicUsize,
    errors: AtomicUsize,
    messages: Mutex<Vec<String>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    /// Messages of every warning and error seen so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    fn record(&self, level: LogLevel, message: String) {
        match level {
            LogLevel::Warn => self.warnings.fetch_add(1, Ordering::SeqCst),
            LogLevel::Error => self.errors.fetch_add(1, Ordering::SeqCst),
            _ => return,
        };
        self.messages.lock().push(message);
    }
}

/// Tracing layer feeding [`Diagnostics`]
///
/// Sees WARN and ERROR events regardless of the level chosen for display.
pub struct DiagnosticsLayer {
    diagnostics: Arc<Diagnostics>,
}

impl DiagnosticsLayer {
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        Self { diagnostics }
    }

    /// Convert tracing Level to our LogLevel
    fn convert_level(level: &Level) -> LogLevel {
        match *level {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        }
    }
}

impl<S> Layer<S> for DiagnosticsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = Self::convert_level(event.metadata().level());
        if level < LogLevel::Warn {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.diagnostics
            .record(level, visitor.message.unwrap_or_default());
    }
}

/// Visitor to extract the message field from tracing events
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" || self.message.is_none() {
            self.message = Some(format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" || self.message.is_none() {
            self.message = Some(value.to_string());
        }
    }
}

/// Convert LogLevel to tracing LevelFilter
pub fn convert_level_to_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Off => LevelFilter::OFF,
    }
}

/// Initialize logging to stderr at `level`
///
/// `RUST_LOG`, when set, overrides `level` for the formatted output. Returns
/// the diagnostics collected for the rest of the process. Calling this more
/// than once keeps the first subscriber.
pub fn init_logging(level: LogLevel) -> Arc<Diagnostics> {
    use tracing_subscriber::prelude::*;

    let diagnostics = Arc::new(Diagnostics::new());

    let directive = convert_level_to_filter(level).into();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(directive));
    let output = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let subscriber = tracing_subscriber::registry()
        .with(output)
        .with(DiagnosticsLayer::new(diagnostics.clone()));

    // Ignore error if a subscriber is already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
    diagnostics
}
