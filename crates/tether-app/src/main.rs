mod cli;
mod engine;
mod shell;

use std::path::Path;
use std::process::ExitCode;

use tether_common::ConfigError;
use tether_config::TetherConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn load_config(path: Option<&str>) -> Result<TetherConfig, ConfigError> {
    match path {
        Some(path) => tether_config::toml_loader::load_from_path(Path::new(path)),
        None => tether_config::load_config(),
    }
}

/// Formatter filtered by `RUST_LOG` plus `directive`.
fn subscriber<W>(directive: &str, writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| LevelFilter::INFO.into()),
            ),
        )
        .finish()
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let args = cli::parse();

    // Config is read under a bootstrap subscriber so its level can seed the
    // real filter
    let bootstrap = args.log_level.as_deref().unwrap_or("info");
    let loaded = tracing::subscriber::with_default(subscriber(bootstrap, std::io::stderr), || {
        load_config(args.config.as_deref())
    });

    // Initialize logging
    let log_directive = args.log_level.clone().unwrap_or_else(|| {
        loaded
            .as_ref()
            .map(|config| config.logging.level)
            .unwrap_or_default()
            .as_directive()
            .to_string()
    });
    subscriber(&log_directive, std::io::stderr).init();

    tracing::info!("Tether v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {path}");
    }
    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        TetherConfig::default()
    });
    args.apply(&mut config);
    if let Err(e) = tether_config::validation::validate(&config) {
        tracing::error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }
    tracing::info!(
        delivery = ?config.delivery.mode,
        workers = config.engine.worker_threads,
        "Config loaded"
    );

    match shell::run(&args, config) {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Shell failed: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_load_is_logged_before_logging_is_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nworker_threads = 0\n").unwrap();
        let captured = Captured::default();

        let sink = captured.clone();
        let loaded = tracing::subscriber::with_default(
            subscriber("info", move || sink.clone()),
            || load_config(path.to_str()),
        );

        assert_eq!(loaded.unwrap().engine.worker_threads, 0);
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("config validation warning"));
        assert!(output.contains("loaded config from"));
    }
}
