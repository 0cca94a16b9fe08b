//! Play and stop sequences against one player instance.
//!
//! Every step runs under the request's cancellation token; once the token is
//! cancelled no further command is sent and the sequence ends with
//! [`PlayerError::Cancelled`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{PlayerError, PlayerResult};
use crate::services::cancel_scope::run_cancellable;
use crate::services::fade::fade_to;
use crate::services::resolver::PlayAction;
use crate::state::VlcConfig;
use crate::vlc::{to_uri, ExtensionFilter, PlaybackState, PlayerCommand, PlayerControl, Status};

/// Player-independent playback settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Browsed when the playlist selector is empty.
    pub folder_uri: Option<String>,
    pub filter: ExtensionFilter,
    /// Player volume that corresponds to a fraction of 1.0.
    pub max_volume: u32,
    /// Duration of a 0 to target ramp.
    pub fade_duration: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &VlcConfig) -> Self {
        Self {
            folder_uri: config.folder_uri.clone(),
            filter: ExtensionFilter::new(config.extensions.as_slice()),
            max_volume: config.max_volume,
            fade_duration: config.fade_duration(),
        }
    }

    /// Player volume for a volume fraction.
    pub fn target_volume(&self, fraction: f64) -> i64 {
        (fraction.clamp(0.0, 1.0) * f64::from(self.max_volume)).round() as i64
    }
}

pub struct PlaybackSession {
    player: Arc<dyn PlayerControl>,
    settings: Arc<SessionSettings>,
    /// Last volume this session successfully set.
    last_volume: Mutex<Option<i64>>,
}

impl PlaybackSession {
    pub fn new(player: Arc<dyn PlayerControl>, settings: Arc<SessionSettings>) -> Self {
        Self {
            player,
            settings,
            last_volume: Mutex::new(None),
        }
    }

    pub fn last_volume(&self) -> Option<i64> {
        *self.last_volume.lock()
    }

    /// Brings the player to `action`'s playlist and volume.
    ///
    /// The playlist is only filled when nothing is enqueued yet. A player
    /// whose status cannot be read is left alone.
    pub async fn play(&self, token: &CancellationToken, action: &PlayAction) -> PlayerResult<()> {
        let Some(status) = self.current_status(token).await? else {
            return Ok(());
        };

        if status.random {
            self.send(token, PlayerCommand::ToggleRandom).await?;
        }
        if !status.looping {
            self.send(token, PlayerCommand::ToggleLoop).await?;
        }

        let mut from = status.volume;
        if status.state.is_idle() {
            self.set_volume(token, 0).await?;
            from = 0;
        }

        let playlist = run_cancellable(token, self.player.playlist()).await?;
        if playlist.is_empty() {
            self.fill_playlist(token, &action.playlist).await?;
        }

        match status.state {
            PlaybackState::Paused => self.send(token, PlayerCommand::Next).await?,
            PlaybackState::Stopped => self.send(token, PlayerCommand::Play).await?,
            PlaybackState::Playing | PlaybackState::Unknown => {}
        }

        let target = self.settings.target_volume(action.volume);
        log::debug!("[Playback] Fading {} -> {}", from, target);
        fade_to(
            token,
            |volume| self.apply_volume(volume),
            from,
            target,
            target,
            self.settings.fade_duration,
        )
        .await
    }

    /// Fades out and stops. Does nothing if the player is already silent.
    pub async fn stop(&self, token: &CancellationToken) -> PlayerResult<()> {
        let Some(status) = self.current_status(token).await? else {
            return Ok(());
        };
        if status.state.is_idle() {
            return Ok(());
        }

        let amplitude = self.last_volume().unwrap_or(0);
        log::debug!("[Playback] Fading {} -> 0", status.volume);
        fade_to(
            token,
            |volume| self.apply_volume(volume),
            status.volume,
            0,
            amplitude,
            self.settings.fade_duration,
        )
        .await?;

        self.send(token, PlayerCommand::Next).await?;
        self.send(token, PlayerCommand::Stop).await
    }

    async fn current_status(&self, token: &CancellationToken) -> PlayerResult<Option<Status>> {
        match run_cancellable(token, self.player.status()).await {
            Ok(status) => Ok(Some(status)),
            Err(PlayerError::Cancelled) => Err(PlayerError::Cancelled),
            Err(e) => {
                log::debug!("[Playback] Player status unavailable: {}", e);
                Ok(None)
            }
        }
    }

    async fn send(&self, token: &CancellationToken, command: PlayerCommand) -> PlayerResult<()> {
        run_cancellable(token, self.player.command(command)).await?;
        Ok(())
    }

    async fn set_volume(&self, token: &CancellationToken, volume: i64) -> PlayerResult<()> {
        run_cancellable(token, self.apply_volume(volume)).await
    }

    async fn apply_volume(&self, volume: i64) -> PlayerResult<()> {
        self.player.command(PlayerCommand::SetVolume(volume)).await?;
        *self.last_volume.lock() = Some(volume);
        Ok(())
    }

    /// Enqueues the selector's files, then shuffles once.
    async fn fill_playlist(&self, token: &CancellationToken, selector: &[String]) -> PlayerResult<()> {
        let uris = self.resolve_selector(token, selector).await?;
        if uris.is_empty() {
            log::warn!("[Playback] Nothing to enqueue");
            return Ok(());
        }

        log::info!("[Playback] Enqueueing {} items", uris.len());
        for uri in uris {
            self.send(token, PlayerCommand::Enqueue(uri)).await?;
        }
        self.send(token, PlayerCommand::SortRandom).await
    }

    async fn resolve_selector(
        &self,
        token: &CancellationToken,
        selector: &[String],
    ) -> PlayerResult<Vec<String>> {
        let filter = &self.settings.filter;

        if selector.is_empty() {
            let Some(folder) = self.settings.folder_uri.as_deref() else {
                log::warn!("[Playback] No music folder configured");
                return Ok(Vec::new());
            };
            let elements = run_cancellable(token, self.player.browse(folder)).await?;
            return Ok(filter.file_uris(&elements));
        }

        let mut uris = Vec::new();
        for item in selector {
            let uri = to_uri(item);
            if filter.matches(&uri) {
                uris.push(uri);
            } else {
                let elements = run_cancellable(token, self.player.browse(&uri)).await?;
                uris.extend(filter.file_uris(&elements));
            }
        }
        Ok(uris)
    }
}
