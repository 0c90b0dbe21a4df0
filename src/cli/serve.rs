use std::sync::Arc;

use crate::{
    cli::open_store,
    config::Settings,
    error, info,
    server::{self, AppState},
};

pub async fn serve(settings: Settings) {
    let address = settings.server_address.clone();
    let store = open_store(&settings);
    info!(
        "store at {}, listening on {}",
        settings.store_dir.display(),
        address
    );

    let state = AppState::new(Arc::new(settings), store);
    if let Err(e) = server::start_api_server(&address, state).await {
        error!("Server stopped. Err: {}", e);
    }
}
