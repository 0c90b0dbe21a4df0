use std::sync::Arc;

use reqwest::{
    Client, Url,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};

use crate::{
    config::Settings,
    management::TokenStore,
    spotify::transport::{self, TransportError},
    success,
    types::{
        Outcome, TokenEndpointResponse, TokenGrant, TokenRequest, TokenResponse, TokenType,
    },
    utils, warning,
};

/// Exchanges authorization codes and refresh tokens for access tokens.
///
/// The broker is the only component that talks to the Spotify accounts
/// service. It is built from an explicit [`Settings`] value, authenticates
/// every request with HTTP Basic auth derived from the client id and secret,
/// and hands successful results to the [`TokenStore`] so the device can pick
/// them up later.
///
/// # Failure Semantics
///
/// Token calls never raise. A failed exchange is logged and returned as
/// [`Outcome::Failed`]; callers that want the historical behaviour of empty
/// strings use [`Outcome::into_value_or_default`]. Authenticated calls made
/// with an empty token then fail through their own transport path.
///
/// # Retries
///
/// Requests go through [`transport::send_with_retry`]. Token requests are
/// POSTs, so only network-level failures are retried; a 4xx or 5xx answer
/// from the accounts service is final.
#[derive(Clone)]
pub struct TokenBroker {
    settings: Arc<Settings>,
    client: Client,
    tokens: TokenStore,
}

impl TokenBroker {
    pub fn new(settings: Arc<Settings>, tokens: TokenStore) -> Self {
        Self::with_client(settings, tokens, Client::new())
    }

    pub fn with_client(settings: Arc<Settings>, tokens: TokenStore, client: Client) -> Self {
        Self {
            settings,
            client,
            tokens,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    /// Builds the URL the device user is sent to in order to grant access.
    ///
    /// # Arguments
    ///
    /// * `state` - Opaque value echoed back to the callback, used to match
    ///   the callback to the login attempt that started it
    pub fn authorize_url(&self, state: &str) -> Result<String, String> {
        let url = Url::parse_with_params(
            &self.settings.auth_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("scope", self.settings.scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(url.to_string())
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenEndpointResponse, TransportError> {
        let request = self
            .client
            .post(&self.settings.token_url)
            .header(
                AUTHORIZATION,
                utils::basic_auth_value(&self.settings.client_id, &self.settings.client_secret),
            )
            .form(params)
            .build()?;

        let response = transport::send_with_retry(&self.client, request).await?;
        Ok(response.json::<TokenEndpointResponse>().await?)
    }

    /// Exchanges an authorization code for an access and a refresh token.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code received on the OAuth callback
    /// * `redirect_uri` - The redirect URI the code was issued for
    ///
    /// # Returns
    ///
    /// [`Outcome::Complete`] with both tokens, or [`Outcome::Failed`] when
    /// the request failed or the answer carried no access token.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Outcome<TokenGrant> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        match self.request_token(&params).await {
            Ok(resp) if !resp.access_token.is_empty() => Outcome::Complete(TokenGrant {
                access: resp.access_token,
                refresh: resp.refresh_token.unwrap_or_default(),
            }),
            Ok(_) => {
                warning!("authorization code exchange returned no access token");
                Outcome::Failed("empty access token".to_string())
            }
            Err(e) => {
                warning!("authorization code exchange failed: {}", e);
                Outcome::Failed(e.to_string())
            }
        }
    }

    /// Exchanges a refresh token for a fresh access token.
    ///
    /// The returned grant never carries a refresh token: a refresh cycle must
    /// not replace the one stored for the user.
    pub async fn refresh(&self, refresh_token: &str) -> Outcome<TokenGrant> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        match self.request_token(&params).await {
            Ok(resp) if !resp.access_token.is_empty() => Outcome::Complete(TokenGrant {
                access: resp.access_token,
                refresh: String::new(),
            }),
            Ok(_) => {
                warning!("token refresh returned no access token");
                Outcome::Failed("empty access token".to_string())
            }
            Err(e) => {
                warning!("token refresh failed: {}", e);
                Outcome::Failed(e.to_string())
            }
        }
    }

    /// Headers for server-triggered batch calls.
    ///
    /// Refreshes the server-side refresh token from [`Settings`] and returns
    /// `Authorization: Bearer <access>` along with JSON accept and content
    /// type headers. Nothing is persisted: the credential does not belong to
    /// a device user.
    pub async fn auth_headers(&self) -> Outcome<HeaderMap> {
        match self.refresh(&self.settings.refresh_token).await {
            Outcome::Complete(grant) | Outcome::Partial { value: grant, .. } => {
                match bearer_headers(&grant.access) {
                    Some(headers) => Outcome::Complete(headers),
                    None => Outcome::Failed("access token is not a valid header value".into()),
                }
            }
            Outcome::Failed(reason) => Outcome::Failed(reason),
        }
    }

    /// Runs the exchange or refresh a device asked for and stores the result.
    ///
    /// `TokenType::Access` exchanges `request.code` against the configured
    /// redirect URI; `TokenType::Refresh` refreshes `request.refresh_token`.
    /// The resulting tokens are merge-written for `request.user_id`, empty
    /// tokens included (the store turns those into a no-op).
    pub async fn obtain_token(&self, request: &TokenRequest) -> TokenResponse {
        let outcome = match request.token_type {
            TokenType::Access => match request.code.as_deref() {
                Some(code) if !code.is_empty() => {
                    self.exchange_authorization_code(code, &self.settings.redirect_uri)
                        .await
                }
                _ => Outcome::Failed("missing authorization code".to_string()),
            },
            TokenType::Refresh => match request.refresh_token.as_deref() {
                Some(token) if !token.is_empty() => self.refresh(token).await,
                _ => Outcome::Failed("missing refresh token".to_string()),
            },
        };

        if let Outcome::Failed(reason) = &outcome {
            warning!("no token for user {}: {}", request.user_id, reason);
        }
        let grant = outcome.into_value_or_default();

        let refresh = match request.token_type {
            TokenType::Access => Some(grant.refresh.as_str()),
            TokenType::Refresh => None,
        };
        match self
            .tokens
            .save(&request.user_id, &grant.access, request.token_type, refresh)
            .await
        {
            Ok(true) => success!("token saved for user {}", request.user_id),
            Ok(false) => {}
            Err(e) => warning!("failed to save token for user {}: {}", request.user_id, e),
        }

        TokenResponse {
            token: grant.access,
            refresh_token: grant.refresh,
        }
    }
}

/// `Authorization`, `Accept` and `Content-Type` headers for the Web API.
pub fn bearer_headers(access_token: &str) -> Option<HeaderMap> {
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", access_token)).ok()?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Some(headers)
}
