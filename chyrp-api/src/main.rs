use chyrp_api::{
    init::{DatabaseEnv, InitError, ServerEnv, connect_database, get_env, install_tracing},
    server::{self, CookieSettings, ServerState},
    storage::MediaStore,
};
use chyrp_common::util::PositiveDuration;
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

async fn wait_for_shutdown(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                error!(%err, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let server_env: ServerEnv = get_env()?;
    let database_env: DatabaseEnv = get_env()?;

    let db_client = connect_database(&database_env).await?;
    match db_client.delete_expired_sessions().await {
        Ok(purged) => info!(purged, "Purged expired sessions"),
        Err(err) => error!(%err, "Could not purge expired sessions"),
    }

    let media_store = MediaStore::new(server_env.upload_dir, server_env.media_url);
    media_store.prepare().await.map_err(InitError::UploadDir)?;

    let state = ServerState {
        db_client: Arc::new(db_client),
        media_store: Arc::new(media_store),
        cookie_settings: CookieSettings {
            secure: server_env.secure_cookies,
            session_lifetime: PositiveDuration::from_seconds(server_env.session_lifetime_seconds),
        },
    };
    let app = server::app(state, server_env.max_upload_bytes);

    let server_address = SocketAddr::new(server_env.server_address, server_env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
