//! Energy of Money headless player.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eom_player::application::{RoomApi, UserApi};
use eom_player::config::PlayerConfig;
use eom_player::infrastructure::http_client::ApiAdapter;
use eom_player::infrastructure::storage::FileStorageProvider;
use eom_player::ports::outbound::{RawApiPort, StorageProvider};
use eom_player::state::{BankCore, BankEvent, RoomEvent, RoomState, StateManager, UserIdentity};

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eom_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PlayerConfig::from_env().context("Failed to load player configuration")?;
    tracing::info!(engine = %config.engine_url, "Starting Energy of Money player");

    let storage: Arc<dyn StorageProvider> = Arc::new(match &config.storage_path {
        Some(path) => FileStorageProvider::with_path(path),
        None => FileStorageProvider::new(),
    });
    let manager = StateManager::new(storage.clone());
    let api: Arc<dyn RawApiPort> = Arc::new(
        ApiAdapter::new(&config.engine_url, config.request_timeout)
            .context("Failed to build HTTP client")?,
    );

    let identity = resolve_identity(&api, &manager, &config.player_name).await?;
    tracing::info!(user_id = %identity.id, username = %identity.username, "Playing as");

    let room_id = match config.room_id {
        Some(id) => id,
        None => {
            let room = RoomApi::new(api.clone())
                .create_room(&config.room_name, &identity.id, &identity.username)
                .await
                .context("Failed to create a room")?;
            tracing::info!(room_id = %room.id, name = %room.name, "Created room");
            room.id
        }
    };

    let room = RoomState::new(
        api.clone(),
        storage,
        identity.clone(),
        room_id,
        config.sync(),
    );
    room.subscribe(|event| match event {
        RoomEvent::Loading => tracing::debug!("Refreshing room"),
        RoomEvent::Change(snapshot) => tracing::info!(
            revision = snapshot.revision,
            players = snapshot.players_count,
            ready = snapshot.ready_count,
            started = snapshot.game_started,
            turn = snapshot.current_turn,
            "Room updated"
        ),
        RoomEvent::Error(e) => tracing::warn!(error = %e, "Room sync failed"),
    })
    .await;

    room.init().await.context("Failed to join the room")?;
    room.start_polling();

    let bank = BankCore::new(api, identity, room_id, config.sync());
    bank.subscribe(|event| match event {
        BankEvent::Change(state) => tracing::info!(
            balance = state.balance,
            credit = state.credit,
            monthly_income = state.monthly_income,
            "Bank updated"
        ),
        BankEvent::Error(e) => tracing::warn!(error = %e, "Bank sync failed"),
    })
    .await;
    if let Err(e) = bank.load_from_server(true).await {
        tracing::warn!(error = %e, "Initial bank load failed; polling will retry");
    }
    bank.start_polling();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    tracing::info!("Shutting down player");
    room.destroy();
    bank.destroy();
    Ok(())
}

/// Reuse the stored identity if the engine still knows it, or register `player_name`.
async fn resolve_identity(
    api: &Arc<dyn RawApiPort>,
    manager: &StateManager,
    player_name: &str,
) -> Result<UserIdentity> {
    let users = UserApi::new(api.clone());
    if let Some(user) = manager.load_user() {
        if user.username.eq_ignore_ascii_case(player_name) {
            // The engine may have been restarted with an empty store.
            match users.get(&user.id).await {
                Ok(_) => return Ok(user),
                Err(e) if e.is_not_found() => {
                    tracing::info!(user_id = %user.id, "Stored user unknown to engine, registering again");
                    manager.clear_user();
                }
                Err(e) => return Err(e).context("Failed to verify stored user"),
            }
        }
    }

    let user = users
        .register(player_name)
        .await
        .context("Failed to register player")?;
    let identity = UserIdentity::from(user);
    manager.save_user(&identity);
    Ok(identity)
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
