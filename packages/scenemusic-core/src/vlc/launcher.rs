//! Spawns VLC with its HTTP interface enabled.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{PlayerError, PlayerResult};
use crate::runtime::TokioSpawner;
use crate::state::VlcConfig;
use crate::utils::expand_env_vars;
use crate::vlc::process::ProcessHandle;
use crate::vlc::traits::PlayerLauncher;

pub struct VlcLauncher {
    config: VlcConfig,
    password: String,
    spawner: TokioSpawner,
}

impl VlcLauncher {
    pub fn new(config: VlcConfig, password: impl Into<String>, spawner: TokioSpawner) -> Self {
        Self {
            config,
            password: password.into(),
            spawner,
        }
    }

    fn program(&self) -> String {
        expand_env_vars(&self.config.path)
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--extraintf=http".to_string(),
            "--http-host".to_string(),
            self.config.host.clone(),
            "--http-port".to_string(),
            self.config.port.to_string(),
            "--http-password".to_string(),
            self.password.clone(),
            "--qt-start-minimized".to_string(),
        ]
    }
}

#[async_trait]
impl PlayerLauncher for VlcLauncher {
    async fn launch(&self) -> PlayerResult<ProcessHandle> {
        let program = self.program();
        log::info!(
            "[Vlc] Starting {} (http://{}:{})",
            program,
            self.config.host,
            self.config.port
        );

        let child = Command::new(&program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::Spawn(format!("{program}: {e}")))?;

        Ok(ProcessHandle::watch(
            child,
            self.config.close_grace(),
            &self.spawner,
        ))
    }
}
