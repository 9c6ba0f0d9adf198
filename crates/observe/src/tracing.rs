use {
    crate::config::Config,
    std::{panic::PanicHookInfo, sync::Once},
    time::macros::format_description,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::time::UtcTime,
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the tracing setup that is shared between the binaries.
///
/// All events are written to stderr. Binaries of this workspace report their
/// result on stdout, so log lines must never interleave with it.
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    // The tracing subscriber below is a global object so initializing it again
    // in the same process would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        set_tracing_subscriber(&Config::default().with_env_filter(env_filter));
        std::panic::set_hook(Box::new(tracing_panic_hook));
    });
}

fn set_tracing_subscriber(config: &Config) {
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let fmt_layer = if config.use_json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(timer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(timer)
            .with_ansi(config.use_ansi)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(EnvFilter::new(&config.env_filter)))
        .init();
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses tracing:error instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
