//! Log backend setup
//!
//! Code logs through the `log` facade. Native builds print with `env_logger`
//! (`RUST_LOG` overrides the default `info` filter); web builds forward to the
//! browser console through miniquad's logging.

#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    use env_logger::Env;

    let result = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
    if let Err(e) = result {
        eprintln!("logger already initialized: {}", e);
    }
}

#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    static LOGGER: ConsoleLogger = ConsoleLogger;
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}", record.target(), record.args());
        match record.level() {
            log::Level::Error => macroquad::logging::error!("{}", line),
            log::Level::Warn => macroquad::logging::warn!("{}", line),
            log::Level::Info => macroquad::logging::info!("{}", line),
            log::Level::Debug | log::Level::Trace => macroquad::logging::debug!("{}", line),
        }
    }

    fn flush(&self) {}
}
