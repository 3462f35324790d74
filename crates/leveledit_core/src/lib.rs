// SPDX-License-Identifier: MIT OR Apache-2.0
//! `leveledit` core - selection, transform gizmo and undo/redo history
//! for an in-engine scene editor.
//!
//! The crate is organised leaf to root:
//! - [`scene`]: in-memory scene graph with typed payloads
//! - [`selection`]: ordered selection set with saved parents
//! - [`gizmo`]: shared proxy transform for group manipulation
//! - [`history`]: file-backed linear undo/redo log
//! - [`commands`]: recorded operations and their inverses
//! - [`session`]: the per-frame edit session controller
//!
//! ## Architecture
//!
//! The session owns an [`session::EditContext`] (scene, selection and
//! gizmo) and passes it by reference to commands when history entries are
//! applied. Picking and input are reached through the [`picking::Picker`]
//! and [`input::InputSource`] traits so a host engine can plug in its own.

pub mod archive;
pub mod assets;
pub mod camera;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod entity;
pub mod gizmo;
pub mod history;
pub mod input;
pub mod math;
pub mod panels;
pub mod picking;
pub mod scene;
pub mod selection;
pub mod session;

pub use config::EditorConfig;
pub use entity::{EntityKind, EntityRef};
pub use scene::{NodeId, Scene};
pub use session::{EditContext, EditSession, Notice, NoticeLevel, SessionError};
