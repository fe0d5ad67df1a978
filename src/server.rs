use crate::game::world::World;
use crate::settings::Settings;
use crate::transport::tcp_session::handle_socket;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Drives the arena on a bound listener until the process is terminated:
/// one fixed-interval simulation task, one spawned session per accepted
/// connection. The tick task never waits on the network; the interval
/// never fires early and collapses missed ticks instead of bursting.
pub async fn run(listener: TcpListener, settings: Settings) -> anyhow::Result<()> {
    let ms_per_frame = settings.ms_per_frame.max(1);
    let world = Arc::new(World::new(settings));

    let tick_world = Arc::clone(&world);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(ms_per_frame));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            tick_world.tick().await;
        }
    });

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let world = Arc::clone(&world);
                tokio::spawn(async move {
                    handle_socket(stream, addr, world).await;
                });
            }
            Err(error) => {
                tracing::warn!(%error, "accept failed");
            }
        }
    }
}
