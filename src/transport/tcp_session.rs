use crate::game::constants::HANDSHAKE_TIMEOUT_SECS;
use crate::game::world::World;
use crate::protocol;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Runs one client from accept to teardown: name handshake, id/universe/wall
/// preamble, then a writer task draining the frame channel while this task
/// reads direction commands until the socket dies.
pub async fn handle_socket(stream: TcpStream, addr: SocketAddr, world: Arc<World>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut name_line = String::new();
    let timeout = Duration::from_secs(HANDSHAKE_TIMEOUT_SECS);
    match tokio::time::timeout(timeout, reader.read_line(&mut name_line)).await {
        Ok(Ok(bytes)) if bytes > 0 => {}
        Ok(Ok(_)) => {
            tracing::warn!(%addr, "handshake failed: connection closed before name");
            return;
        }
        Ok(Err(error)) => {
            tracing::warn!(%addr, %error, "handshake read failed");
            return;
        }
        Err(_) => {
            tracing::warn!(%addr, "handshake timed out");
            return;
        }
    }
    let name = name_line.trim_end_matches(['\r', '\n']);

    let session = world.connect(name).await;
    let session_id = session.session_id;
    tracing::info!(client_id = session.snake_id, name, %addr, "client connected");

    let mut preamble = format!("{}\n{}\n", session.snake_id, session.universe_size);
    for wall in &session.walls {
        protocol::push_line(&mut preamble, wall);
    }
    if write_half.write_all(preamble.as_bytes()).await.is_err() {
        tracing::warn!(%addr, "handshake write failed");
        world.disconnect(&session_id).await;
        return;
    }

    let mut frames = session.frames;
    let send_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if write_half.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let inbound = session.inbound;
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if let Some(command) = protocol::decode_move_command(line.trim()) {
                    inbound.store(command);
                }
            }
            Err(_) => break,
        }
    }

    tracing::info!(%addr, "client connection closed");
    world.disconnect(&session_id).await;
    send_task.abort();
}
