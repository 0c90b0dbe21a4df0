use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{
    cli::open_store,
    config::Settings,
    error,
    management::{DeviceIdentity, IdentityProvider, StoreIdentityProvider, TokenStore},
    server::{self, AppState},
    success,
    types::{PendingLogin, TokenResponse},
    utils, warning,
};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Signs this device in and links it to a Spotify account.
///
/// The device keeps the uid of its anonymous account under the data
/// directory, so running `login` again re-links the same user. The browser is
/// sent to the Spotify authorize page and the local server waits for the
/// redirect to `/callback`.
pub async fn login(settings: Settings) {
    let store = open_store(&settings);
    let tokens = TokenStore::new(Arc::clone(&store));

    let identity = match DeviceIdentity::load().await {
        Ok(identity) => identity,
        Err(_) => {
            let provider = StoreIdentityProvider::new(Arc::clone(&store));
            let uid = match provider.sign_in_anonymously().await {
                Ok(uid) => uid,
                Err(e) => error!("Cannot create device account. Err: {}", e),
            };
            let identity = DeviceIdentity::new(uid);
            if let Err(e) = identity.persist().await {
                error!("Cannot save device identity. Err: {}", e);
            }
            identity
        }
    };

    if let Err(e) = tokens.register_user(&identity.uid).await {
        error!("Cannot register user {}. Err: {}", identity.uid, e);
    }

    let settings = Arc::new(settings);
    let state = AppState::new(Arc::clone(&settings), store);
    let oauth_state = utils::generate_state();
    {
        let mut pending = state.login.lock().await;
        *pending = Some(PendingLogin {
            state: oauth_state.clone(),
            user_id: identity.uid.clone(),
            token: None,
        });
    }

    let auth_url = match state.broker.authorize_url(&oauth_state) {
        Ok(url) => url,
        Err(e) => error!("Invalid authorize URL. Err: {}", e),
    };

    let login = Arc::clone(&state.login);
    let address = settings.server_address.clone();
    tokio::spawn(async move {
        if let Err(e) = server::start_api_server(&address, state).await {
            error!("Callback server failed. Err: {}", e);
        }
    });

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    match wait_for_token(login).await {
        Some(_) => success!("Device {} is logged in.", identity.uid),
        None => error!("Authentication failed or timed out."),
    }
}

async fn wait_for_token(login: Arc<Mutex<Option<PendingLogin>>>) -> Option<TokenResponse> {
    let start = std::time::Instant::now();

    while start.elapsed() < LOGIN_TIMEOUT {
        let lock = login.lock().await;
        if let Some(token) = lock.as_ref().and_then(|pending| pending.token.clone()) {
            return Some(token);
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}
