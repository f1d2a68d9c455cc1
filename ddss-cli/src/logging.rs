use crate::args::LogLevel;

/// Installs a `tracing-subscriber` filter sized by the resolved `-l`/`-v`/`-q`
/// level and bridges `ddss-lib`'s `log` records into it, so `-l debug` gives
/// a full frame trace from the decoder as well as the CLI's own spans.
pub fn init(level: LogLevel) {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level.tracing_filter())
        .with_writer(std::io::stderr)
        .try_init();
}
