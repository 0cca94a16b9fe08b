//! Decides whether music should play for the program scene.
//!
//! Two modes:
//! - static: scenes listed in `scenes_with_music` play the configured folder
//!   at full volume;
//! - dynamic: enabled inputs of a music kind reachable from the program scene
//!   (through enabled nested scenes) contribute their playlists, and the
//!   target volume is the average of their volumes.
//!
//! The static list wins when the scene is on it.

use std::collections::HashSet;

use crate::obs::{SceneItem, SourceType};
use crate::services::scene_cache::{ItemEnabled, RemoteStateCache};
use crate::state::MusicSelection;

/// What the player should do for the current scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayAction {
    /// Playlist entries in traversal order. Empty means "the configured folder".
    pub playlist: Vec<String>,
    /// Target volume as a fraction of the player's maximum (0..1).
    pub volume: f64,
}

impl PlayAction {
    pub fn folder() -> Self {
        Self {
            playlist: Vec::new(),
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// `None` means stop.
    pub action: Option<PlayAction>,
    /// Inputs of a music kind visible in the scene, active or not.
    pub candidates: HashSet<String>,
    /// Inputs contributing to `action`, in traversal order.
    pub in_play: Vec<String>,
}

pub fn resolve(cache: &RemoteStateCache, scene_name: &str, selection: &MusicSelection) -> Resolution {
    if selection.scenes_with_music.contains(scene_name) {
        return Resolution {
            action: Some(PlayAction::folder()),
            ..Default::default()
        };
    }
    if selection.source_kinds_with_music.is_empty() {
        return Resolution::default();
    }

    let mut visited = HashSet::new();
    let mut items = Vec::new();
    collect_enabled_items(cache, scene_name, &mut visited, &mut items);

    let mut resolution = Resolution::default();
    let mut playlist = Vec::new();
    let mut volume_sum = 0.0;

    for item in items {
        let is_music_kind = item
            .source_kind
            .as_ref()
            .is_some_and(|kind| selection.source_kinds_with_music.contains(kind));
        if !is_music_kind || !resolution.candidates.insert(item.source_name.clone()) {
            continue;
        }

        let Some(input) = cache.input(&item.source_name) else {
            log::warn!(
                "[Resolver] Input {} in scene {} was never reported",
                item.source_name,
                scene_name
            );
            continue;
        };
        if !input.is_active() {
            continue;
        }

        volume_sum += input.volume.unwrap_or_default();
        playlist.extend(input.playlist_items);
        resolution.in_play.push(input.name);
    }

    if !resolution.in_play.is_empty() {
        let volume = volume_sum / resolution.in_play.len() as f64;
        resolution.action = Some(PlayAction {
            playlist,
            volume: volume.clamp(0.0, 1.0),
        });
    }
    resolution
}

/// Depth-first walk over enabled items; nested scenes expand in place.
fn collect_enabled_items(
    cache: &RemoteStateCache,
    scene_name: &str,
    visited: &mut HashSet<String>,
    out: &mut Vec<SceneItem>,
) {
    if !visited.insert(scene_name.to_string()) {
        return;
    }
    let Some(scene) = cache.scene(scene_name) else {
        log::warn!("[Resolver] Scene {} was never reported", scene_name);
        return;
    };

    for item in &scene.items {
        if scene.item_enabled(item.item_id) != ItemEnabled::Enabled {
            continue;
        }
        match item.source_type {
            SourceType::NestedScene => {
                collect_enabled_items(cache, &item.source_name, visited, out);
            }
            SourceType::Input => out.push(item.clone()),
            SourceType::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scene_cache::Scene;
    use crate::test_fixtures::{input_item, nested_item, playing_input};

    fn dynamic(kind: &str) -> MusicSelection {
        MusicSelection {
            source_kinds_with_music: [kind.to_string()].into(),
            ..Default::default()
        }
    }

    fn enabled_scene(name: &str, items: Vec<SceneItem>) -> Scene {
        let flags: Vec<_> = items
            .iter()
            .map(|item| (item.item_id, ItemEnabled::Enabled))
            .collect();
        Scene::new(name, items, flags)
    }

    fn nested_cache() -> RemoteStateCache {
        let cache = RemoteStateCache::new();
        cache.replace_scenes([
            enabled_scene("Stream", vec![nested_item(1, "Overlay")]),
            enabled_scene("Overlay", vec![input_item(5, "MusicPlayer", "vlc_source")]),
        ]);
        cache.replace_inputs([playing_input("MusicPlayer", 0.8, &["a.mp3", "b.mp3"])]);
        cache
    }

    #[test]
    fn nested_scene_input_drives_playback() {
        let cache = nested_cache();
        let resolution = resolve(&cache, "Stream", &dynamic("vlc_source"));

        assert_eq!(
            resolution.action,
            Some(PlayAction {
                playlist: vec!["a.mp3".into(), "b.mp3".into()],
                volume: 0.8,
            })
        );
        assert_eq!(resolution.in_play, vec!["MusicPlayer"]);
        assert!(resolution.candidates.contains("MusicPlayer"));
    }

    #[test]
    fn disabled_nested_scene_hides_its_inputs() {
        let cache = nested_cache();
        cache.apply_scene_item_enabled("Stream", 1, false);

        let resolution = resolve(&cache, "Stream", &dynamic("vlc_source"));
        assert_eq!(resolution.action, None);
        assert!(resolution.candidates.is_empty());
    }

    #[test]
    fn allowlisted_scene_takes_precedence() {
        let cache = nested_cache();
        let selection = MusicSelection {
            scenes_with_music: ["Stream".to_string()].into(),
            source_kinds_with_music: ["vlc_source".to_string()].into(),
        };

        let resolution = resolve(&cache, "Stream", &selection);
        assert_eq!(resolution.action, Some(PlayAction::folder()));
        assert!(resolution.candidates.is_empty());
    }

    #[test]
    fn scene_outside_allowlist_falls_back_to_dynamic() {
        let cache = nested_cache();
        let selection = MusicSelection {
            scenes_with_music: ["Intro".to_string()].into(),
            source_kinds_with_music: ["vlc_source".to_string()].into(),
        };

        let resolution = resolve(&cache, "Stream", &selection);
        assert_eq!(resolution.action.unwrap().volume, 0.8);
    }

    #[test]
    fn muted_input_is_a_candidate_but_not_in_play() {
        let cache = nested_cache();
        cache.apply_input_mute("MusicPlayer", true);

        let resolution = resolve(&cache, "Stream", &dynamic("vlc_source"));
        assert_eq!(resolution.action, None);
        assert!(resolution.candidates.contains("MusicPlayer"));
        assert!(resolution.in_play.is_empty());
    }

    #[test]
    fn volumes_average_and_playlists_concatenate() {
        let cache = RemoteStateCache::new();
        cache.replace_scenes([enabled_scene(
            "Stream",
            vec![
                input_item(1, "First", "vlc_source"),
                input_item(2, "Mic", "wasapi_input_capture"),
                input_item(3, "Second", "vlc_source"),
            ],
        )]);
        cache.replace_inputs([
            playing_input("First", 0.2, &["1.mp3"]),
            playing_input("Second", 0.6, &["2.mp3", "3.mp3"]),
        ]);

        let action = resolve(&cache, "Stream", &dynamic("vlc_source"))
            .action
            .unwrap();
        assert_eq!(action.playlist, vec!["1.mp3", "2.mp3", "3.mp3"]);
        assert!((action.volume - 0.4).abs() < 1e-9);
    }

    #[test]
    fn gains_above_unity_are_clamped() {
        let cache = nested_cache();
        cache.apply_input_volume("MusicPlayer", 3.0);

        let action = resolve(&cache, "Stream", &dynamic("vlc_source"))
            .action
            .unwrap();
        assert_eq!(action.volume, 1.0);
    }

    #[test]
    fn unknown_items_have_no_effect() {
        let cache = RemoteStateCache::new();
        cache.replace_scenes([Scene::new(
            "Stream",
            vec![input_item(1, "Music", "vlc_source")],
            [],
        )]);
        cache.replace_inputs([playing_input("Music", 1.0, &["a.mp3"])]);

        assert_eq!(resolve(&cache, "Stream", &dynamic("vlc_source")).action, None);
        assert_eq!(resolve(&cache, "Missing", &dynamic("vlc_source")).action, None);
    }

    #[test]
    fn cyclic_nesting_terminates() {
        let cache = RemoteStateCache::new();
        cache.replace_scenes([
            enabled_scene("A", vec![nested_item(1, "B")]),
            enabled_scene(
                "B",
                vec![nested_item(2, "A"), input_item(3, "Music", "vlc_source")],
            ),
        ]);
        cache.replace_inputs([playing_input("Music", 0.5, &["a.mp3"])]);

        let resolution = resolve(&cache, "A", &dynamic("vlc_source"));
        assert_eq!(resolution.in_play, vec!["Music"]);
    }

    #[test]
    fn resolution_reads_the_latest_cache_state() {
        let cache = nested_cache();
        let selection = dynamic("vlc_source");
        assert!(resolve(&cache, "Stream", &selection).action.is_some());

        cache.apply_input_volume("MusicPlayer", 0.0);
        assert!(resolve(&cache, "Stream", &selection).action.is_none());

        cache.apply_input_volume("MusicPlayer", 0.5);
        assert_eq!(
            resolve(&cache, "Stream", &selection).action.unwrap().volume,
            0.5
        );
    }
}
