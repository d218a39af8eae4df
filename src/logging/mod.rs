// Logging setup
// One coloured line per event on stderr: ➡ time [LEVEL] » message


use console::{StyledObject, style};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";
const QUIET_DEPENDENCIES: [&str; 3] = ["ureq", "ureq_proto", "rustls"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    #[inline]
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Filter directive for `level` with chatty dependencies clamped to errors
#[inline]
pub fn filter_directive(level: LogLevel) -> String {
    let mut directives = vec![level.as_directive().to_string()];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|krate| format!("{krate}=error")));
    directives.join(",")
}

/// Install the global subscriber; `RUST_LOG` wins over `level` when set
#[inline]
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(ArrowFormatter)
        .init();
}

/// Event formatter producing `➡ <timestamp> [LEVEL] » message`
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowFormatter;

impl<S, N> FormatEvent<S, N> for ArrowFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = String::new();
        ctx.format_fields(Writer::new(&mut message), event)?;

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        writeln!(
            writer,
            "{}",
            render_line(*event.metadata().level(), &timestamp, &message)
        )
    }
}

/// Level name as printed between the brackets
#[inline]
pub fn level_name(level: Level) -> &'static str {
    if level == Level::WARN {
        "WARNING"
    } else {
        level.as_str()
    }
}

#[inline]
pub fn render_line(level: Level, timestamp: &str, message: &str) -> String {
    let bracket = |s: &'static str| style(s).dim().bold().for_stderr();

    format!(
        "{} {} {}{}{} {} {}",
        style("➡").green().bright().for_stderr(),
        style(timestamp).dim().for_stderr(),
        bracket("["),
        styled_level(level),
        bracket("]"),
        style("»").cyan().for_stderr(),
        styled_message(level, message),
    )
}

fn styled_level(level: Level) -> StyledObject<&'static str> {
    let name = style(level_name(level)).for_stderr();
    match level {
        Level::DEBUG => name.yellow(),
        Level::INFO => name.blue().bright(),
        Level::WARN => name.yellow().bright(),
        Level::ERROR => name.red().bright().blink(),
        _ => name.dim(),
    }
}

fn styled_message(level: Level, message: &str) -> StyledObject<&str> {
    let message = style(message).for_stderr();
    match level {
        Level::INFO => message,
        Level::WARN => message.bold().dim(),
        Level::ERROR => message.on_red(),
        _ => message.dim(),
    }
}
