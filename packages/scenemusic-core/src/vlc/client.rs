//! VLC HTTP interface client.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{PlayerError, PlayerResult};
use crate::protocol_constants::{VLC_BROWSE_PATH, VLC_PLAYLIST_PATH, VLC_STATUS_PATH};
use crate::vlc::retry::with_reset_retry;
use crate::vlc::traits::PlayerControl;
use crate::vlc::types::{BrowseElement, BrowseResult, PlayerCommand, PlaylistNode, Status};

/// Talks to VLC's `/requests/*.json` endpoints.
///
/// Authenticates with HTTP Basic auth using an empty user name, which is
/// what VLC expects for its single-password interface.
pub struct VlcHttpClient {
    http: Client,
    base_url: String,
    password: String,
}

impl VlcHttpClient {
    pub fn new(http: Client, host: &str, port: u16, password: impl Into<String>) -> Self {
        Self {
            http,
            base_url: format!("http://{host}:{port}"),
            password: password.into(),
        }
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> PlayerResult<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| PlayerError::InvalidUrl(format!("{}{}: {e}", self.base_url, path)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> PlayerResult<T> {
        let url = self.url(path, query)?;
        let target = &url;
        with_reset_retry(url.as_str(), || async move {
            let response = self
                .http
                .get(target.clone())
                .basic_auth("", Some(&self.password))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(PlayerError::HttpStatus(status.as_u16()));
            }
            Ok(response.json::<T>().await?)
        })
        .await
    }
}

#[async_trait]
impl PlayerControl for VlcHttpClient {
    async fn status(&self) -> PlayerResult<Status> {
        self.get_json(VLC_STATUS_PATH, &[]).await
    }

    async fn command(&self, command: PlayerCommand) -> PlayerResult<Status> {
        log::debug!("[Vlc] {:?}", command);
        self.get_json(VLC_STATUS_PATH, &command.query()).await
    }

    async fn browse(&self, uri: &str) -> PlayerResult<Vec<BrowseElement>> {
        match self
            .get_json::<BrowseResult>(VLC_BROWSE_PATH, &[("uri", uri.to_string())])
            .await
        {
            Ok(result) => Ok(result.element),
            Err(PlayerError::Http(e)) if e.is_decode() => {
                log::error!("[Vlc] Couldn't browse URI {}: {}", uri, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn playlist(&self) -> PlayerResult<PlaylistNode> {
        self.get_json(VLC_PLAYLIST_PATH, &[]).await
    }
}
