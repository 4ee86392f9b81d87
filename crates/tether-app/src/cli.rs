use clap::Parser;
use tether_config::{DeliveryMode, TetherConfig};

/// Tether: console shell driving a loopback engine over the bridge.
#[derive(Parser, Debug, Default)]
#[command(name = "tether", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Where query responses are delivered (inline, thread).
    #[arg(long, value_parser = parse_delivery)]
    pub delivery: Option<DeliveryMode>,

    /// Directory the save dialog answers with. Without it every save
    /// request is treated as cancelled.
    #[arg(long)]
    pub save_dir: Option<String>,

    /// Locale reported to the engine.
    #[arg(long)]
    pub locale: Option<String>,

    /// Run the engine against the test network.
    #[arg(long)]
    pub testnet: bool,
}

impl Args {
    /// Fold command-line overrides into the loaded config.
    pub fn apply(&self, config: &mut TetherConfig) {
        if let Some(mode) = self.delivery {
            config.delivery.mode = mode;
        }
        if let Some(ref locale) = self.locale {
            config.locale.preferred = Some(locale.clone());
        }
        if self.testnet {
            config.engine.testnet = true;
        }
    }
}

fn parse_delivery(raw: &str) -> Result<DeliveryMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "inline" => Ok(DeliveryMode::Inline),
        "thread" => Ok(DeliveryMode::Thread),
        other => Err(format!("unknown delivery mode '{other}' (expected inline or thread)")),
    }
}

pub fn parse() -> Args {
    Args::parse()
}
