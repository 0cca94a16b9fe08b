//! Fetches compositor state into the [`RemoteStateCache`].
//!
//! Failures of individual per-item queries are logged and leave that item
//! unknown; a failed list query aborts the refresh and keeps the cache as is.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::error::ObsResult;
use crate::obs::{CompositorQueries, InputInfo, SceneItem};
use crate::services::scene_cache::{AudioInput, ItemEnabled, RemoteStateCache, Scene};

pub struct StateSync {
    client: Arc<dyn CompositorQueries>,
    cache: Arc<RemoteStateCache>,
}

impl StateSync {
    pub fn new(client: Arc<dyn CompositorQueries>, cache: Arc<RemoteStateCache>) -> Self {
        Self { client, cache }
    }

    /// Rebuilds every scene with its items and enabled flags.
    pub async fn refresh_scenes(&self) -> ObsResult<()> {
        let names = self.client.list_scenes().await?;
        let scenes = join_all(names.into_iter().map(|name| self.fetch_scene(name))).await;
        self.cache.replace_scenes(scenes);
        Ok(())
    }

    /// Rebuilds the inputs of the given kinds.
    pub async fn refresh_inputs(&self, kinds: &HashSet<String>) -> ObsResult<()> {
        let mut infos = Vec::new();
        for kind in kinds {
            infos.extend(self.client.list_inputs(Some(kind)).await?);
        }
        let inputs = join_all(infos.iter().map(|info| self.fetch_input(info))).await;
        log::info!("[Sync] Fetched {} music inputs", inputs.len());
        self.cache.replace_inputs(inputs);
        Ok(())
    }

    /// Fetches one input by name.
    ///
    /// Returns false (and forgets the name) when no input of a music kind has
    /// that name.
    pub async fn refresh_input(&self, name: &str, kinds: &HashSet<String>) -> ObsResult<bool> {
        for kind in kinds {
            let inputs = self.client.list_inputs(Some(kind)).await?;
            if let Some(info) = inputs.iter().find(|info| info.input_name == name) {
                let input = self.fetch_input(info).await;
                self.cache.upsert_input(input);
                return Ok(true);
            }
        }
        self.cache.remove_input(name);
        Ok(false)
    }

    /// Reads the program scene into the cache.
    pub async fn refresh_active_scene(&self) -> ObsResult<String> {
        let scene = self.client.get_current_program_scene().await?;
        self.cache.set_active_scene(Some(scene.clone()));
        Ok(scene)
    }

    async fn fetch_scene(&self, name: String) -> Scene {
        let items = match self.client.list_scene_items(&name).await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("[Sync] Failed to list items of scene {}: {}", name, e);
                Vec::new()
            }
        };

        let scene_name = name.as_str();
        let enabled = join_all(
            items
                .iter()
                .map(|item| async move { (item.item_id, self.item_enabled(scene_name, item).await) }),
        )
        .await;

        Scene::new(name, items, enabled)
    }

    async fn item_enabled(&self, scene_name: &str, item: &SceneItem) -> ItemEnabled {
        if let Some(enabled) = item.enabled {
            return enabled.into();
        }
        match self
            .client
            .get_scene_item_enabled(scene_name, item.item_id)
            .await
        {
            Ok(enabled) => enabled.into(),
            Err(e) => {
                log::warn!(
                    "[Sync] Failed to read enabled flag of {} in {}: {}",
                    item.source_name,
                    scene_name,
                    e
                );
                ItemEnabled::Unknown
            }
        }
    }

    async fn fetch_input(&self, info: &InputInfo) -> AudioInput {
        let name = info.input_name.as_str();
        let (volume, muted, settings) = tokio::join!(
            self.client.get_input_volume(name),
            self.client.get_input_mute(name),
            self.client.get_input_settings(name),
        );

        let mut input = AudioInput::new(name, info.input_kind.as_str());
        input.volume = volume
            .map_err(|e| log::warn!("[Sync] Failed to read volume of {}: {}", name, e))
            .ok();
        input.muted = muted
            .map_err(|e| log::warn!("[Sync] Failed to read mute of {}: {}", name, e))
            .ok();
        input.playlist_items = settings
            .map(|settings| settings.playlist_items())
            .unwrap_or_else(|e| {
                log::warn!("[Sync] Failed to read settings of {}: {}", name, e);
                Vec::new()
            });
        input
    }
}
