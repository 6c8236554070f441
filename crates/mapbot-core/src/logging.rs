use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize tracing for the bot.
///
/// Default: info for our crates, warn for everything else.
/// Can be overridden with `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let crates = [
            "mapbot",
            "mapbot_core",
            "mapbot_nominatim",
            "mapbot_plot",
            "mapbot_telegram",
        ];
        let mut directives = vec!["warn".to_string()];
        directives.extend(crates.iter().map(|c| format!("{c}=info")));
        directives.push(format!("{}=info", service_name.replace('-', "_")));
        EnvFilter::new(directives.join(","))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install tracing subscriber: {e}")))
}
