use crate::game::constants::DEFAULT_PORT;
use crate::settings::Settings;
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod game;
mod protocol;
mod server;
mod settings;
mod transport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings_path = env::var("SNAKE_SETTINGS").unwrap_or_else(|_| "settings.json".to_string());
    let settings = if Path::new(&settings_path).exists() {
        let settings = Settings::load(Path::new(&settings_path))?;
        tracing::info!(path = %settings_path, "settings loaded");
        settings
    } else {
        tracing::info!(path = %settings_path, "no settings file, using defaults");
        Settings::default()
    };

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let address = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        %address,
        mode = ?settings.game_mode,
        universe = settings.universe_size,
        walls = settings.walls.len(),
        "snake arena listening"
    );

    server::run(listener, settings).await
}
