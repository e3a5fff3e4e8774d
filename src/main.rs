use std::net::SocketAddr;

use log::{info, warn};
use tokio::net::TcpListener;

use pagewiki::logger::Logger;
use pagewiki::{build_app, AppState, Config, WikiError};

#[tokio::main]
async fn main() -> Result<(), WikiError> {
    if let Err(e) = Logger::init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let config = Config::from_env();
    if !config.data_dir.is_dir() {
        warn!("Data directory {:?} does not exist, saving pages will fail", config.data_dir);
    }

    let addr = config.socket_addr();
    let state = AppState::from_config(config)?;
    let app = build_app(state);

    info!("Wiki listening on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(WikiError::from)
}
