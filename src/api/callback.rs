use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::Html,
};

use crate::{
    server::AppState,
    types::{TokenRequest, TokenType},
    warning,
};

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Html<&'static str> {
    let Some(code) = params.get("code") else {
        return Html("<h4>Missing authorization code.</h4>");
    };

    let mut login = state.login.lock().await;
    let Some(pending) = login.as_mut() else {
        return Html("<h4>No login in progress.</h4>");
    };

    if params.get("state") != Some(&pending.state) {
        warning!("callback state does not match the pending login");
        return Html("<h4>Login state mismatch.</h4>");
    }

    let response = state
        .broker
        .obtain_token(&TokenRequest {
            token_type: TokenType::Access,
            code: Some(code.clone()),
            refresh_token: None,
            user_id: pending.user_id.clone(),
        })
        .await;

    if response.token.is_empty() {
        return Html("<h4>Login failed.</h4>");
    }

    pending.token = Some(response);
    Html("<h2>Authentication successful.</h2><p>Close browser window.</p>")
}
