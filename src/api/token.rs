use axum::{body::Bytes, extract::State, response::Json};
use serde_json::Value;

use crate::{
    api::{parse_body, parse_value},
    server::AppState,
    types::{SaveTokenRequest, TokenRequest, TokenResponse, TriggerResponse},
    warning,
};

/// Runs the exchange or refresh and answers with the tokens, empty strings
/// when it failed.
pub async fn get_spotify_token(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<TokenResponse> {
    match parse_body::<TokenRequest>(body) {
        Ok(request) => Json(state.broker.obtain_token(&request).await),
        Err(_) => Json(TokenResponse::default()),
    }
}

/// `null`, `false`, `0`, `""` or a missing `token` field.
fn has_empty_token(body: &Value) -> bool {
    let Value::Object(fields) = body else {
        return false;
    };
    match fields.get("token") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(token)) => token.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(_) => false,
    }
}

/// An empty token is answered before the rest of the body is looked at, so
/// it never reaches the store.
pub async fn save_token(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<TriggerResponse> {
    let body: Value = match parse_body(body) {
        Ok(body) => body,
        Err(response) => return Json(response),
    };
    if has_empty_token(&body) {
        return Json(TriggerResponse::with_status("Empty token.", "complete"));
    }

    let request: SaveTokenRequest = match parse_value(body) {
        Ok(request) => request,
        Err(response) => return Json(response),
    };

    let token = request.token.unwrap_or_default();
    let saved = state
        .tokens
        .save(
            &request.user_id,
            &token,
            request.token_type,
            request.refresh_token.as_deref(),
        )
        .await;

    let response = match saved {
        Ok(true) => TriggerResponse::with_status("Access token successfully added.", "complete"),
        Ok(false) => TriggerResponse::with_status("Empty token.", "complete"),
        Err(e) => {
            warning!("failed to save token for user {}: {}", request.user_id, e);
            TriggerResponse::with_status("Token could not be saved.", "failed")
        }
    };
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn falsy_tokens_are_empty() {
        assert!(has_empty_token(&json!({ "userId": "u1" })));
        assert!(has_empty_token(&json!({ "token": null })));
        assert!(has_empty_token(&json!({ "token": false })));
        assert!(has_empty_token(&json!({ "token": 0 })));
        assert!(has_empty_token(&json!({ "token": "" })));

        assert!(!has_empty_token(&json!({ "token": "abc" })));
        assert!(!has_empty_token(&json!([])));
    }
}
