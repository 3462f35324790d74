// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edit session controller.
//!
//! [`EditSession::update`] runs one editor frame: drain finished asset
//! loads, move the camera, pick under the pointer, handle select, delete
//! and shortcut input, then drive the gizmo. Every undoable action is
//! recorded in the history before it mutates anything. Failures abort the
//! action and become [`Notice`]s; they never stop the frame loop.

use crate::archive::ArchiveError;
use crate::assets::{AssetError, AssetLoader, AssetPayload, MaterialSlot};
use crate::camera::EditorCamera;
use crate::clipboard::{Clipboard, ClipboardError};
use crate::commands::{CommandError, DeleteCommand, EditorCommand, RecordedCommand, SelectionCommand, TransformCommand};
use crate::config::EditorConfig;
use crate::entity::EntityRef;
use crate::gizmo::{DragEnded, Gizmo, GizmoDelta, GizmoMode, MIN_SCALE};
use crate::history::{History, HistoryError};
use crate::input::{InputSource, Key};
use crate::panels::{Inspectors, LightEdit, MaterialEdit, MeshEdit};
use crate::picking::{Picker, RayPicker};
use crate::scene::{NodeId, Scene, SceneError};
use crate::selection::{Direction, Selection};
use glam::{Quat, Vec2, Vec3};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// History could not be written or read
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Recorded command could not be decoded or applied
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Archive error
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Clipboard error
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    /// Scene file error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Asset request error
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational
    Info,
    /// Something was skipped
    Warning,
    /// An operation failed
    Error,
}

/// User-facing message produced during a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Message text
    pub message: String,
}

/// State that recorded commands operate on
#[derive(Debug)]
pub struct EditContext {
    /// Scene graph
    pub scene: Scene,
    /// Selection set
    pub selection: Selection,
    /// Transform gizmo
    pub gizmo: Gizmo,
}

impl EditContext {
    /// Wrap a scene; the gizmo helper node is added to it
    pub fn new(mut scene: Scene) -> Self {
        let gizmo = Gizmo::new(&mut scene);
        Self {
            scene,
            selection: Selection::new(),
            gizmo,
        }
    }

    /// Replace the scene, dropping the selection
    pub fn replace_scene(&mut self, scene: Scene) {
        self.scene = scene;
        self.selection.clear();
        self.gizmo.attach_to_scene(&mut self.scene);
    }

    /// Put bound transforms back under their saved parents
    pub fn release_gizmo(&mut self) {
        self.gizmo.end(&mut self.scene, &self.selection);
    }

    /// Bind the selection to the gizmo unless already bound. Returns
    /// whether the gizmo is bound afterwards.
    pub fn bind_gizmo(&mut self) -> bool {
        if self.gizmo.is_bound() {
            return true;
        }
        self.gizmo.begin(&mut self.scene, &self.selection)
    }
}

/// Editor session
pub struct EditSession {
    config: EditorConfig,
    ctx: EditContext,
    history: History,
    clipboard: Clipboard,
    camera: EditorCamera,
    inspectors: Inspectors,
    assets: AssetLoader,
    picker: Box<dyn Picker>,
    hovered: EntityRef,
    notices: Vec<Notice>,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("ctx", &self.ctx)
            .field("history", &self.history)
            .field("hovered", &self.hovered)
            .finish_non_exhaustive()
    }
}

impl EditSession {
    /// Start a session on an empty scene. The staging directory is created
    /// and cleared of stale history entries.
    pub fn new(config: EditorConfig) -> Result<Self> {
        let mut history = History::new(&config.staging.temp_dir);
        history.reset()?;
        let clipboard = Clipboard::new(config.staging.clipboard_path());

        let mut ctx = EditContext::new(Scene::new());
        ctx.gizmo.enabled = config.gizmo.enabled;
        ctx.gizmo.caps = config.gizmo.caps();

        tracing::info!("Edit session staging in {:?}", config.staging.temp_dir);
        Ok(Self {
            config,
            ctx,
            history,
            clipboard,
            camera: EditorCamera::new(),
            inspectors: Inspectors::new(),
            assets: AssetLoader::new(),
            picker: Box::new(RayPicker),
            hovered: EntityRef::NONE,
            notices: Vec::new(),
        })
    }

    /// Use a different picking service
    pub fn with_picker(mut self, picker: impl Picker + 'static) -> Self {
        self.picker = Box::new(picker);
        self
    }

    /// Session configuration
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Edit context
    pub fn context(&self) -> &EditContext {
        &self.ctx
    }

    /// Scene graph
    pub fn scene(&self) -> &Scene {
        &self.ctx.scene
    }

    /// Scene graph, mutably; edits made here are not recorded
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.ctx.scene
    }

    /// Selection set
    pub fn selection(&self) -> &Selection {
        &self.ctx.selection
    }

    /// Transform gizmo
    pub fn gizmo(&self) -> &Gizmo {
        &self.ctx.gizmo
    }

    /// Undo/redo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Editor camera
    pub fn camera(&self) -> &EditorCamera {
        &self.camera
    }

    /// Editor camera, mutably
    pub fn camera_mut(&mut self) -> &mut EditorCamera {
        &mut self.camera
    }

    /// Inspector panels
    pub fn inspectors(&self) -> &Inspectors {
        &self.inspectors
    }

    /// Entity under the pointer in the last frame
    pub fn hovered(&self) -> EntityRef {
        self.hovered
    }

    /// Take the notices produced since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => tracing::info!("{}", message),
            NoticeLevel::Warning => tracing::warn!("{}", message),
            NoticeLevel::Error => tracing::error!("{}", message),
        }
        self.notices.push(Notice { level, message });
    }

    fn report<T>(&mut self, action: &str, result: Result<T>) {
        if let Err(e) = result {
            self.notify(NoticeLevel::Error, format!("{action} failed: {e}"));
        }
    }

    /// Replace the scene with a RON scene file. History starts over.
    pub fn load_scene(&mut self, path: &Path) -> Result<()> {
        let scene = Scene::load(path)?;
        self.history.reset()?;
        self.ctx.replace_scene(scene);
        self.inspectors.clear();
        self.hovered = EntityRef::NONE;
        Ok(())
    }

    /// Replace the scene with an in-memory one. History starts over.
    pub fn set_scene(&mut self, scene: Scene) -> Result<()> {
        self.history.reset()?;
        self.ctx.replace_scene(scene);
        self.inspectors.clear();
        self.hovered = EntityRef::NONE;
        Ok(())
    }

    /// Save the scene. A drag in progress is recorded first, and a bound
    /// selection is released for the write so transforms are saved under
    /// their own parents.
    pub fn save_scene(&mut self, path: &Path) -> Result<()> {
        self.commit_drag()?;
        let rebind = self.ctx.gizmo.is_bound();
        if rebind {
            self.ctx.release_gizmo();
        }
        let result = self.ctx.scene.save(path);
        if rebind {
            self.ctx.bind_gizmo();
        }
        Ok(result?)
    }

    /// Run one frame
    pub fn update(&mut self, input: &dyn InputSource, dt: f32) {
        self.process_assets();

        self.camera.update(input, dt, &self.config.camera);

        let viewport = Vec2::new(
            self.config.viewport.width as f32,
            self.config.viewport.height as f32,
        );
        let ray = self.camera.ray(input.pointer(), viewport);
        self.hovered = self.picker.pick(&self.ctx.scene, ray, self.config.picking.mask);

        if input.pressed(self.config.picking.select_button) {
            let multi = input.down(self.config.picking.multi_select_modifier);
            let result = self.select(self.hovered, multi);
            self.report("Select", result);
        }

        if input.pressed(Key::Delete) {
            let result = self.delete_selected();
            self.report("Delete", result);
        }

        if input.down(Key::Control) {
            if input.pressed(Key::C) {
                let result = self.copy();
                self.report("Copy", result);
            }
            if input.pressed(Key::V) {
                let result = self.paste();
                self.report("Paste", result);
            }
            if input.pressed(Key::Z) {
                let result = self.undo();
                self.report("Undo", result);
            }
            if input.pressed(Key::Y) {
                let result = self.redo();
                self.report("Redo", result);
            }
        }

        let delta = input
            .down(Key::MouseLeft)
            .then(|| self.gizmo_delta(input.pointer_delta()));
        self.ctx.gizmo.update(&mut self.ctx.scene, delta);
        if let Some(drag) = self.ctx.gizmo.take_drag_ended() {
            let result = self.record_drag(drag);
            self.report("Transform", result);
        }
    }

    /// Record a finished drag. When the entry cannot be written the
    /// selection is moved back to where the drag started.
    fn record_drag(&mut self, drag: DragEnded) -> Result<()> {
        let command = TransformCommand::new(drag.start, drag.end);
        if let Err(e) = self.record(&command) {
            self.ctx
                .gizmo
                .apply_world_delta(&mut self.ctx.scene, command.world_delta(Direction::Undo));
            return Err(e);
        }
        tracing::info!("{}", command.description());
        Ok(())
    }

    /// Record the drag in progress before another action changes the
    /// selection or walks the history
    fn commit_drag(&mut self) -> Result<()> {
        match self.ctx.gizmo.finish_drag(&self.ctx.scene) {
            Some(drag) => self.record_drag(drag),
            None => Ok(()),
        }
    }

    /// Turn pointer motion into a gizmo delta for the configured mode
    fn gizmo_delta(&self, motion: Vec2) -> GizmoDelta {
        let settings = &self.config.gizmo;
        let mask = settings.constraint.mask();
        match settings.mode {
            GizmoMode::Translate => {
                let offset = (self.camera.right() * motion.x - self.camera.up() * motion.y)
                    * settings.translate_speed;
                GizmoDelta::Translate(offset * mask)
            }
            GizmoMode::Rotate => {
                let axis = settings
                    .constraint
                    .axis()
                    .unwrap_or_else(|| self.camera.forward());
                GizmoDelta::Rotate(Quat::from_axis_angle(axis, motion.x * settings.rotate_speed))
            }
            GizmoMode::Scale => {
                let factor = motion.x * settings.scale_speed;
                GizmoDelta::Scale((Vec3::ONE + mask * factor).max(Vec3::splat(MIN_SCALE)))
            }
        }
    }

    fn record(&mut self, command: &dyn EditorCommand) -> Result<usize> {
        let position = self.history.record(command.kind(), |w| command.write(w))?;
        Ok(position)
    }

    fn sync_inspectors(&mut self) {
        let primary = self.ctx.selection.primary().copied().unwrap_or(EntityRef::NONE);
        self.inspectors.sync(&self.ctx.scene, &primary);
    }

    /// Select `entity` as a select-click would. Returns false when the
    /// selection did not change.
    pub fn select(&mut self, entity: EntityRef, multi: bool) -> Result<bool> {
        let Some(change) = self.ctx.selection.plan(&entity, multi) else {
            return Ok(false);
        };
        self.commit_drag()?;
        let command = SelectionCommand::new(change);
        self.record(&command)?;
        command.apply(&mut self.ctx, Direction::Redo)?;
        self.sync_inspectors();
        tracing::info!("{}", command.description());
        Ok(true)
    }

    /// Delete every selected entity. Returns the number deleted.
    pub fn delete_selected(&mut self) -> Result<usize> {
        if self.ctx.selection.is_empty() {
            return Ok(0);
        }
        self.commit_drag()?;
        self.ctx.release_gizmo();
        let command = DeleteCommand::capture(&self.ctx.scene, &self.ctx.selection);
        if command.is_empty() {
            self.ctx.bind_gizmo();
            return Ok(0);
        }
        if let Err(e) = self.record(&command) {
            self.ctx.bind_gizmo();
            return Err(e);
        }
        command.apply(&mut self.ctx, Direction::Redo)?;
        self.inspectors.forget_missing(&self.ctx.scene);
        tracing::info!("{}", command.description());
        Ok(command.entities.len())
    }

    /// Copy the selection to the clipboard
    pub fn copy(&mut self) -> Result<usize> {
        Ok(self.clipboard.copy(&self.ctx.scene, &self.ctx.selection)?)
    }

    /// Paste the clipboard into the scene. Not recorded in the history.
    pub fn paste(&mut self) -> Result<Vec<NodeId>> {
        Ok(self.clipboard.paste(&mut self.ctx.scene)?)
    }

    /// Undo the most recent entry. Returns false at the start of the log.
    pub fn undo(&mut self) -> Result<bool> {
        self.step(Direction::Undo)
    }

    /// Redo the next entry. Returns false at the tip.
    pub fn redo(&mut self) -> Result<bool> {
        self.step(Direction::Redo)
    }

    fn step(&mut self, direction: Direction) -> Result<bool> {
        self.commit_drag()?;
        let previous = self.history.position();
        let entry = match direction {
            Direction::Undo => self.history.undo()?,
            Direction::Redo => self.history.redo()?,
        };
        let Some(mut entry) = entry else {
            return Ok(false);
        };
        let command = match RecordedCommand::read(&mut entry) {
            Ok(command) => command,
            Err(e) => {
                self.history.seek(previous);
                return Err(e.into());
            }
        };
        command.apply(&mut self.ctx, direction)?;
        self.sync_inspectors();
        tracing::info!("{:?} {} entry {}", direction, command.kind().name(), entry.position);
        Ok(true)
    }

    /// Edit the material shown in the material inspector. Not recorded in
    /// the history. Returns false when no material is inspected.
    pub fn edit_material(&mut self, edit: MaterialEdit) -> bool {
        self.inspectors.edit_material(&mut self.ctx.scene, edit)
    }

    /// Edit the mesh shown in the mesh inspector. Not recorded in the
    /// history.
    pub fn edit_mesh(&mut self, edit: MeshEdit) -> bool {
        self.inspectors.edit_mesh(&mut self.ctx.scene, edit)
    }

    /// Edit the light shown in the light inspector. Not recorded in the
    /// history.
    pub fn edit_light(&mut self, edit: LightEdit) -> bool {
        self.inspectors.edit_light(&mut self.ctx.scene, edit)
    }

    /// Queue a model file; it is instantiated when it finishes loading
    pub fn request_model(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        Ok(self.assets.request_model(path)?)
    }

    /// Queue a texture for a material slot
    pub fn request_texture(&mut self, path: impl Into<PathBuf>, slot: MaterialSlot) -> Result<()> {
        Ok(self.assets.request_texture(path, slot)?)
    }

    /// Asset requests still in flight
    pub fn pending_assets(&self) -> usize {
        self.assets.pending()
    }

    /// Apply finished asset loads
    pub fn process_assets(&mut self) {
        for result in self.assets.drain() {
            match result.outcome {
                Ok(AssetPayload::Model(model)) => {
                    let ids = self.ctx.scene.instantiate(model);
                    self.notify(
                        NoticeLevel::Info,
                        format!("Loaded {:?} ({} nodes)", result.path, ids.len()),
                    );
                }
                Ok(AssetPayload::Texture { slot, info }) => match slot.material_mut(&mut self.ctx.scene) {
                    Some(material) => {
                        material.base_color_map = Some(result.path.clone());
                        self.notify(
                            NoticeLevel::Info,
                            format!("Loaded {:?} ({}x{})", result.path, info.width, info.height),
                        );
                    }
                    None => self.notify(
                        NoticeLevel::Warning,
                        format!("Texture {:?} has no material to go to", result.path),
                    ),
                },
                Err(e) => self.notify(NoticeLevel::Error, format!("Loading {:?} failed: {e}", result.path)),
            }
        }
    }
}
