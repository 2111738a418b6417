// logs.rs
use ecconfig::Config;
use tracing::Level;
use tracing_subscriber::{
    Registry, filter::LevelFilter, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Handle sur le filtre de niveau, modifiable à chaud
#[derive(Clone)]
pub struct LogControl {
    reload_handle: reload::Handle<LevelFilter, Registry>,
}

impl LogControl {
    /// Change le niveau minimal des logs, sans redémarrer
    pub fn set_max_level(&self, level: Level) -> anyhow::Result<()> {
        self.reload_handle.reload(LevelFilter::from_level(level))?;
        Ok(())
    }
}

pub fn string_to_level(level: &str) -> Option<Level> {
    match level.trim().to_uppercase().as_str() {
        "ERROR" => Some(Level::ERROR),
        "WARN" | "WARNING" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" => Some(Level::TRACE),
        _ => None,
    }
}

/// Initialise le logging à partir de `host.logger`
///
/// Le niveau vient de `host.logger.min_level` (INFO si absent ou invalide).
/// La sortie console peut être coupée par `host.logger.enable_console`.
pub fn init_logging(config: &Config) -> LogControl {
    let log_level = match config.get_log_min_level() {
        Ok(l) => match string_to_level(&l) {
            Some(lev) => LevelFilter::from_level(lev),
            None => LevelFilter::INFO,
        },
        Err(_) => LevelFilter::INFO,
    };

    let (filter, reload_handle) = reload::Layer::new(log_level);
    let subscriber = Registry::default().with(filter);

    let enable_console = config.get_log_enable_console().unwrap_or(true);

    if enable_console {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    } else {
        subscriber.init();
    }

    LogControl { reload_handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_level() {
        assert_eq!(string_to_level("info"), Some(Level::INFO));
        assert_eq!(string_to_level(" Warning "), Some(Level::WARN));
        assert_eq!(string_to_level("TRACE"), Some(Level::TRACE));
        assert_eq!(string_to_level("loud"), None);
    }
}
