// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted session replay.

use leveledit_core::config::{ConfigError, EditorConfig};
use leveledit_core::input::FrameInput;
use leveledit_core::{EditSession, NoticeLevel, SessionError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long to wait for queued models after the last frame
const ASSET_TIMEOUT: Duration = Duration::from_secs(10);

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Session error
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Config error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// File read error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Script parse error
    #[error("Script error: {0}")]
    Script(#[from] ron::error::SpannedError),
}

fn default_dt() -> f32 {
    1.0 / 60.0
}

/// Recorded input frames to feed into a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    /// Seconds per frame
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Model files queued before the first frame
    #[serde(default)]
    pub models: Vec<PathBuf>,
    /// One entry per frame
    #[serde(default)]
    pub frames: Vec<FrameInput>,
}

impl ReplayScript {
    /// Load a script from a RON file
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&content)?)
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Frames run
    pub frames: usize,
    /// Entries in the history log at the end
    pub history_entries: usize,
    /// Error notices raised along the way
    pub errors: usize,
}

/// Replay `script` against the scene at `scene_path` and save the result to `out`
pub fn run_replay(
    config: EditorConfig,
    scene_path: &Path,
    script: &ReplayScript,
    out: &Path,
) -> Result<ReplaySummary, AppError> {
    let mut session = EditSession::new(config)?;
    session.load_scene(scene_path)?;
    for model in &script.models {
        session.request_model(model.clone())?;
    }

    let mut errors = 0;
    for (frame, input) in script.frames.iter().enumerate() {
        session.update(input, script.dt);
        for notice in session.take_notices() {
            if notice.level == NoticeLevel::Error {
                errors += 1;
            }
            tracing::debug!("Frame {}: {}", frame, notice.message);
        }
    }

    let deadline = Instant::now() + ASSET_TIMEOUT;
    while session.pending_assets() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
        session.process_assets();
    }
    if session.pending_assets() > 0 {
        tracing::warn!("{} asset loads did not finish", session.pending_assets());
    }
    errors += session
        .take_notices()
        .iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .count();

    session.save_scene(out)?;
    Ok(ReplaySummary {
        frames: script.frames.len(),
        history_entries: session.history().count(),
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use leveledit_core::math::Transform;
    use leveledit_core::scene::components::{Light, Material, Mesh, Object};
    use leveledit_core::scene::{ModelData, Node, NodeKind};
    use leveledit_core::Scene;

    struct Workspace {
        dir: tempfile::TempDir,
        scene: PathBuf,
        out: PathBuf,
    }

    impl Workspace {
        /// A cube two units up, straight ahead of the reset camera
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut scene = Scene::new();
            scene.spawn(
                "Cube",
                NodeKind::Object(Object::new(Mesh::cube("Cube", 1.0, Material::default()))),
                Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            );
            let scene_path = dir.path().join("level.ron");
            scene.save(&scene_path).unwrap();
            let out = dir.path().join("edited.ron");
            Self {
                scene: scene_path,
                out,
                dir,
            }
        }

        fn config(&self) -> EditorConfig {
            EditorConfig::with_temp_dir(self.dir.path().join("staging"))
        }

        fn replay(&self, script: &str) -> (ReplaySummary, Scene) {
            let script: ReplayScript = ron::from_str(script).unwrap();
            let summary = run_replay(self.config(), &self.scene, &script, &self.out).unwrap();
            (summary, Scene::load(&self.out).unwrap())
        }
    }

    #[test]
    fn test_script_defaults() {
        let script: ReplayScript = ron::from_str("(frames: [(), (pressed: [Delete])])").unwrap();
        assert_eq!(script.frames.len(), 2);
        assert_eq!(script.dt, default_dt());
        assert!(script.models.is_empty());
    }

    #[test]
    fn test_select_and_delete() {
        let workspace = Workspace::new();
        let (summary, scene) = workspace.replay(
            "(frames: [
                (pressed: [MouseRight], pointer: (640.0, 360.0)),
                (pressed: [Delete], pointer: (640.0, 360.0)),
            ])",
        );
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.history_entries, 2);
        assert_eq!(summary.errors, 0);
        assert!(scene.find_by_name("Cube").is_none());
    }

    #[test]
    fn test_undo_restores_deleted_cube() {
        let workspace = Workspace::new();
        let (summary, scene) = workspace.replay(
            "(frames: [
                (pressed: [MouseRight], pointer: (640.0, 360.0)),
                (pressed: [Delete]),
                (down: [Control], pressed: [Z]),
            ])",
        );
        assert_eq!(summary.errors, 0);
        let cube = scene.find_by_name("Cube").unwrap();
        assert!(scene.world_translation(cube).abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));
        assert_eq!(scene.parent_of(cube), None);
    }

    #[test]
    fn test_queued_model_is_saved() {
        let workspace = Workspace::new();
        let model_path = workspace.dir.path().join("lamp.ron");
        let model = ModelData {
            nodes: vec![Node::new("Lamp", NodeKind::Light(Light::default()), Transform::IDENTITY)],
        };
        std::fs::write(&model_path, model.to_ron().unwrap()).unwrap();

        let script = format!("(models: [{:?}], frames: [()])", model_path);
        let (_, scene) = workspace.replay(&script);
        assert!(scene.find_by_name("Lamp").is_some());
        assert!(scene.find_by_name("Cube").is_some());
    }

    #[test]
    fn test_missing_scene_fails() {
        let workspace = Workspace::new();
        let script = ReplayScript {
            dt: default_dt(),
            models: Vec::new(),
            frames: Vec::new(),
        };
        let missing = workspace.dir.path().join("missing.ron");
        let result = run_replay(workspace.config(), &missing, &script, &workspace.out);
        assert!(matches!(result, Err(AppError::Session(SessionError::Scene(_)))));
    }
}
