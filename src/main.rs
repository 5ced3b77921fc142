// Gavel entry point: a headless client for one game.
//
// Startup sequence:
// 1. Initialize tracing (stderr)
// 2. Load config
// 3. Open the session store
// 4. Bootstrap: resume the stored identity or join with the given name
// 5. Open the push channel
// 6. Run the sync loop, logging updates, until Ctrl+C

use gavel::actions::ActionClient;
use gavel::app::{self, SyncEvent};
use gavel::bootstrap::{self, Bootstrap};
use gavel::config;
use gavel::connection::Connection;
use gavel::session::SqliteSessionStore;

use anyhow::{bail, Context};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;

    let mut args = std::env::args().skip(1);
    let Some(game_code) = args.next() else {
        bail!("usage: gavel <GAME_CODE> [PLAYER_NAME]");
    };
    let player_name = args.next();

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(base_url = %config.base_url, "config loaded");

    // 3. Open the session store
    let store = SqliteSessionStore::open(&config.session_db_path)
        .context("failed to open session store")?;
    info!(path = %config.session_db_path.display(), "session store opened");

    // 4. Bootstrap the session
    let api = ActionClient::new(config.api_base());
    let (player_id, initial) = match bootstrap::resolve(&store, &api, &game_code).await? {
        Bootstrap::Ready {
            player_id,
            snapshot,
        } => (player_id, Some(*snapshot)),
        Bootstrap::NeedsJoin { reason } => {
            if let Some(reason) = reason {
                warn!(%reason, "stored session was rejected");
            }
            let Some(name) = player_name else {
                bail!("no session for game {game_code}; run again with a player name to join");
            };
            let player_id = bootstrap::join_and_remember(&store, &api, &game_code, &name).await?;
            (player_id, None)
        }
    };
    info!(%game_code, %player_id, "session ready");

    // 5. Open the push channel
    let (connection, connection_events) = Connection::open(config.ws_url(&game_code, &player_id));

    // 6. Run the sync loop and log what it publishes
    let (update_tx, mut update_rx) = mpsc::channel(256);
    let sync_handle = tokio::spawn(app::run(connection_events, update_tx, initial));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            update = update_rx.recv() => match update {
                Some(SyncEvent::Connectivity(up)) => {
                    info!(connected = up, "push channel");
                }
                Some(SyncEvent::Snapshot(snapshot)) => {
                    info!(
                        status = ?snapshot.status,
                        round = snapshot.current_round,
                        players = snapshot.players.len(),
                        in_play = snapshot.cards_in_play.len(),
                        money = snapshot.your_money,
                        "state updated"
                    );
                }
                Some(SyncEvent::MoneyChanged { delta }) => {
                    info!(delta, "money changed");
                }
                Some(SyncEvent::Notice(notification)) => {
                    info!(?notification, "game event");
                }
                None => {
                    warn!("sync loop ended");
                    break;
                }
            }
        }
    }

    connection.close().await;
    let _ = sync_handle.await;

    info!("gavel shut down cleanly");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gavel=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
