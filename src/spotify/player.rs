use reqwest::Client;

use crate::{
    config::Settings,
    spotify::transport::{self, TransportError},
    types::PlayRequest,
};

/// Play and pause commands against `/me/player`.
#[derive(Clone)]
pub struct PlayerClient {
    api_url: String,
    client: Client,
}

impl PlayerClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(&settings.api_url, Client::new())
    }

    pub fn with_client(api_url: &str, client: Client) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Starts playback of `uris`, or resumes the current context when `uris`
    /// is `None`. The device id is only sent along with a uri list.
    pub async fn play(
        &self,
        access_token: &str,
        device_id: Option<&str>,
        uris: Option<Vec<String>>,
    ) -> Result<(), TransportError> {
        let mut builder = self
            .client
            .put(format!("{}/me/player/play", self.api_url))
            .bearer_auth(access_token);

        if let Some(uris) = uris {
            if let Some(device_id) = device_id {
                builder = builder.query(&[("device_id", device_id)]);
            }
            builder = builder.json(&PlayRequest { uris });
        }

        transport::send_with_retry(&self.client, builder.build()?).await?;
        Ok(())
    }

    pub async fn pause(&self, access_token: &str) -> Result<(), TransportError> {
        let request = self
            .client
            .put(format!("{}/me/player/pause", self.api_url))
            .bearer_auth(access_token)
            .build()?;
        transport::send_with_retry(&self.client, request).await?;
        Ok(())
    }
}
