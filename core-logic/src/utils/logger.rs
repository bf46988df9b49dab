use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Target used for the one-line summary each loop iteration emits.
pub const CYCLE_RESULT_TARGET: &str = "cycle_result";

/// Installs the console + rolling file subscriber.
///
/// Files land in `logs/<app_name>.<date-hour>`. The returned guard flushes the
/// file writer on drop and must be held until the process exits.
pub fn setup_logger(app_name: &str, verbose: bool) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all("logs") {
        eprintln!("Cannot create logs directory ({}); logging to console only", e);
        init_console_only(verbose);
        return None;
    }

    let file_appender = tracing_appender::rolling::hourly("logs", app_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File ignores --verbose
    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target(CYCLE_RESULT_TARGET, Level::INFO)
        .with_default(Level::INFO);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_targets(verbose));

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    if installed.is_err() {
        return None;
    }

    Some(guard)
}

fn console_targets(verbose: bool) -> tracing_subscriber::filter::Targets {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::filter::Targets::new()
        .with_target(CYCLE_RESULT_TARGET, Level::INFO)
        .with_target("hyper", Level::WARN)
        .with_target("reqwest", Level::WARN)
        .with_default(level)
}

fn init_console_only(verbose: bool) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_targets(verbose));

    let _ = tracing_subscriber::registry().with(console_layer).try_init();
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn message_of(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

/// Paints SUCCESS/FAILED/SKIPPED markers inside a message.
fn highlight(msg: String) -> String {
    let green = Style::new().fg(Color::LightGreen).bold();
    let red = Style::new().fg(Color::LightRed).bold();
    let yellow = Style::new().fg(Color::Yellow).bold();

    if msg.contains("SUCCESS") {
        msg.replace("SUCCESS", &green.paint("SUCCESS").to_string())
    } else if msg.contains("FAILED") {
        msg.replace("FAILED", &red.paint("FAILED").to_string())
    } else if msg.contains("SKIPPED") {
        msg.replace("SKIPPED", &yellow.paint("SKIPPED").to_string())
    } else {
        msg
    }
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let time = Style::new()
            .dimmed()
            .paint(Local::now().format("%H:%M:%S").to_string());

        let level = match *event.metadata().level() {
            Level::ERROR => Some(Color::LightRed.bold().paint("ERROR")),
            Level::WARN => Some(Color::Yellow.bold().paint(" WARN")),
            Level::DEBUG => Some(Color::Blue.paint("DEBUG")),
            Level::TRACE => Some(Color::Purple.paint("TRACE")),
            Level::INFO => None,
        };

        write!(writer, "{} ", time)?;
        if let Some(level) = level {
            write!(writer, "{} ", level)?;
        }
        writeln!(writer, "{}", highlight(message_of(event)))
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let metadata = event.metadata();

        write!(
            writer,
            "{} [{}] {}: ",
            timestamp,
            metadata.level(),
            metadata.target()
        )?;
        writeln!(writer, "{}", message_of(event))
    }
}
