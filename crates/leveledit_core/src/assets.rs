// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background asset loading.
//!
//! Requests go to a worker thread over an unbounded channel. The worker
//! reads and decodes files on a current-thread tokio runtime and posts an
//! [`AssetResult`] back. The worker never touches the scene; the session
//! applies results when it drains them at the start of its frame.

use crate::scene::components::Material;
use crate::scene::{ModelData, NodeId, Scene};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Material of one mesh subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialSlot {
    /// Object node
    pub node: NodeId,
    /// Subset index
    pub subset: usize,
}

impl MaterialSlot {
    /// Resolve the slot in a scene
    pub fn material_mut<'a>(&self, scene: &'a mut Scene) -> Option<&'a mut Material> {
        scene
            .object_mut(self.node)?
            .mesh
            .subsets
            .get_mut(self.subset)
            .map(|s| &mut s.material)
    }
}

/// Load state of a requested path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Worker is reading the file
    Loading,
    /// File was read and decoded
    Ready,
    /// Loading failed
    Failed(String),
}

/// Asset loading errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssetError {
    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Image decoding error
    #[error("Failed to decode image: {0}")]
    Decode(String),
    /// Model parse error
    #[error("Failed to parse model: {0}")]
    Parse(String),
    /// The worker thread is gone
    #[error("Asset worker is not running")]
    WorkerUnavailable,
}

/// Work item for the loader thread
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum AssetRequest {
    Model(PathBuf),
    Texture { path: PathBuf, slot: MaterialSlot },
}

impl AssetRequest {
    fn path(&self) -> &Path {
        match self {
            Self::Model(path) | Self::Texture { path, .. } => path,
        }
    }
}

/// Texture metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Decoded asset
#[derive(Debug, Clone)]
pub enum AssetPayload {
    /// Model ready to be instantiated
    Model(ModelData),
    /// Texture for a material slot
    Texture {
        /// Target slot
        slot: MaterialSlot,
        /// Texture size
        info: TextureInfo,
    },
}

/// Finished load
#[derive(Debug, Clone)]
pub struct AssetResult {
    /// Requested path
    pub path: PathBuf,
    /// Payload or error
    pub outcome: Result<AssetPayload, AssetError>,
}

/// Asset loader front end
pub struct AssetLoader {
    states: Arc<RwLock<HashMap<PathBuf, LoadState>>>,
    request_tx: mpsc::UnboundedSender<AssetRequest>,
    result_rx: mpsc::UnboundedReceiver<(AssetRequest, AssetResult)>,
    in_flight: HashSet<AssetRequest>,
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("pending", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    /// Create the loader and start its worker thread
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let states = Arc::new(RwLock::new(HashMap::new()));

        let worker_states = Arc::clone(&states);
        std::thread::spawn(move || {
            asset_worker(request_rx, result_tx, worker_states);
        });

        Self {
            states,
            request_tx,
            result_rx,
            in_flight: HashSet::new(),
        }
    }

    fn request(&mut self, request: AssetRequest) -> Result<(), AssetError> {
        let path = request.path().to_path_buf();
        if self.in_flight.contains(&request) {
            tracing::debug!("{:?} is already loading", request);
            return Ok(());
        }
        self.states.write().insert(path.clone(), LoadState::Loading);
        if self.request_tx.send(request.clone()).is_err() {
            self.states
                .write()
                .insert(path, LoadState::Failed(AssetError::WorkerUnavailable.to_string()));
            return Err(AssetError::WorkerUnavailable);
        }
        self.in_flight.insert(request);
        Ok(())
    }

    /// Queue a RON model file
    pub fn request_model(&mut self, path: impl Into<PathBuf>) -> Result<(), AssetError> {
        self.request(AssetRequest::Model(path.into()))
    }

    /// Queue a texture for a material slot
    pub fn request_texture(&mut self, path: impl Into<PathBuf>, slot: MaterialSlot) -> Result<(), AssetError> {
        self.request(AssetRequest::Texture {
            path: path.into(),
            slot,
        })
    }

    /// Load state of a path, if it was ever requested
    pub fn state(&self, path: &Path) -> Option<LoadState> {
        self.states.read().get(path).cloned()
    }

    /// Requests whose results were not drained yet
    pub fn pending(&self) -> usize {
        self.in_flight.len()
    }

    /// Take every finished result without blocking
    pub fn drain(&mut self) -> Vec<AssetResult> {
        let mut results = Vec::new();
        while let Ok((request, result)) = self.result_rx.try_recv() {
            self.in_flight.remove(&request);
            results.push(result);
        }
        results
    }
}

/// Worker thread entry point
fn asset_worker(
    mut request_rx: mpsc::UnboundedReceiver<AssetRequest>,
    result_tx: mpsc::UnboundedSender<(AssetRequest, AssetResult)>,
    states: Arc<RwLock<HashMap<PathBuf, LoadState>>>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start asset worker runtime: {}", e);
            return;
        }
    };

    rt.block_on(async {
        while let Some(request) = request_rx.recv().await {
            let path = request.path().to_path_buf();
            let outcome = load(request.clone()).await;
            let state = match &outcome {
                Ok(_) => LoadState::Ready,
                Err(e) => LoadState::Failed(e.to_string()),
            };
            states.write().insert(path.clone(), state);
            if result_tx.send((request, AssetResult { path, outcome })).is_err() {
                break;
            }
        }
    });
}

async fn load(request: AssetRequest) -> Result<AssetPayload, AssetError> {
    let path = request.path();
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AssetError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(AssetError::Io(e.to_string())),
    };

    match request {
        AssetRequest::Model(_) => {
            let source = String::from_utf8(data).map_err(|e| AssetError::Parse(e.to_string()))?;
            let model = ModelData::from_ron(&source).map_err(|e| AssetError::Parse(e.to_string()))?;
            Ok(AssetPayload::Model(model))
        }
        AssetRequest::Texture { slot, .. } => {
            let image = image::load_from_memory(&data).map_err(|e| AssetError::Decode(e.to_string()))?;
            Ok(AssetPayload::Texture {
                slot,
                info: TextureInfo {
                    width: image.width(),
                    height: image.height(),
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use crate::scene::components::Light;
    use crate::scene::{Node, NodeKind};
    use std::time::{Duration, Instant};

    fn wait_for(loader: &mut AssetLoader, count: usize) -> Vec<AssetResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(loader.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn test_model_and_texture_complete() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("lamp.ron");
        let model = ModelData {
            nodes: vec![Node::new("Lamp", NodeKind::Light(Light::default()), Transform::IDENTITY)],
        };
        std::fs::write(&model_path, model.to_ron().unwrap()).unwrap();
        let texture_path = dir.path().join("albedo.png");
        image::RgbaImage::new(4, 2).save(&texture_path).unwrap();

        let slot = MaterialSlot {
            node: NodeId::new(),
            subset: 0,
        };
        let mut loader = AssetLoader::new();
        loader.request_model(&model_path).unwrap();
        loader.request_texture(&texture_path, slot).unwrap();
        assert_eq!(loader.pending(), 2);

        let results = wait_for(&mut loader, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(loader.pending(), 0);
        for result in results {
            match result.outcome.unwrap() {
                AssetPayload::Model(model) => assert_eq!(model.nodes[0].name, "Lamp"),
                AssetPayload::Texture { slot: target, info } => {
                    assert_eq!(target, slot);
                    assert_eq!(info, TextureInfo { width: 4, height: 2 });
                }
            }
        }
        assert_eq!(loader.state(&model_path), Some(LoadState::Ready));
    }

    #[test]
    fn test_one_texture_for_two_slots() {
        let dir = tempfile::tempdir().unwrap();
        let texture_path = dir.path().join("albedo.png");
        image::RgbaImage::new(4, 2).save(&texture_path).unwrap();

        let node = NodeId::new();
        let first = MaterialSlot { node, subset: 0 };
        let second = MaterialSlot { node, subset: 1 };
        let mut loader = AssetLoader::new();
        loader.request_texture(&texture_path, first).unwrap();
        loader.request_texture(&texture_path, second).unwrap();
        loader.request_texture(&texture_path, second).unwrap();
        assert_eq!(loader.pending(), 2);

        let results = wait_for(&mut loader, 2);
        let mut slots: Vec<_> = results
            .into_iter()
            .map(|r| match r.outcome.unwrap() {
                AssetPayload::Texture { slot, .. } => slot.subset,
                AssetPayload::Model(_) => panic!("expected a texture"),
            })
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1]);
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.ron");
        let mut loader = AssetLoader::new();
        loader.request_model(&path).unwrap();

        let results = wait_for(&mut loader, 1);
        assert!(matches!(results[0].outcome, Err(AssetError::NotFound(_))));
        assert!(matches!(loader.state(&path), Some(LoadState::Failed(_))));
    }
}
