use std::sync::Arc;

use tracing::info;

use mapbot_core::{
    commands::{BotSettings, MapBot},
    config::Config,
    store::SqliteCityStore,
};
use mapbot_nominatim::NominatimGeocoder;
use mapbot_plot::PlottersRenderer;

#[tokio::main]
async fn main() -> Result<(), mapbot_core::Error> {
    mapbot_core::logging::init("mapbot")?;

    let cfg = Arc::new(Config::load()?);

    let store = Arc::new(SqliteCityStore::open(&cfg.database_path)?);
    let geocoder = Arc::new(NominatimGeocoder::new(
        cfg.geocoder_url.clone(),
        &cfg.geocoder_user_agent,
    )?);
    let renderer = Arc::new(PlottersRenderer::default());

    let map_bot = Arc::new(MapBot::new(
        store,
        geocoder,
        renderer,
        BotSettings::from_config(&cfg),
    ));

    info!(temp_dir = %cfg.temp_dir.display(), "starting telegram polling");
    mapbot_telegram::router::run_polling(cfg, map_bot)
        .await
        .map_err(|e| mapbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
