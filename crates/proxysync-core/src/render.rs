//! The render boundary.
//!
//! Rendering turns a [`ConfigState`] into the text the reverse proxy reads.
//! The driving loop calls [`Render::render`] after every batch that left the
//! state dirty and writes the result to the output path.

use std::path::Path;

use serde::Serialize;

use crate::error::RenderError;
use crate::state::{ConfigState, StoreMap};

/// Turns state into the published configuration artifact.
pub trait Render: Send + Sync {
    /// Render the full state.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] if the state cannot be rendered.
    fn render(&self, state: &ConfigState) -> Result<Vec<u8>, RenderError>;
}

/// Renders the state as a JSON document.
///
/// JSON is a subset of YAML 1.2, so the output can be fed straight to a
/// YAML-reading file provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct RenderedConfig<'a> {
    remotes: &'a [String],
    stores: &'a StoreMap,
    traefik: &'a Path,
}

impl Render for JsonRenderer {
    fn render(&self, state: &ConfigState) -> Result<Vec<u8>, RenderError> {
        let view = RenderedConfig {
            remotes: &state.remotes,
            stores: &state.stores,
            traefik: &state.tracked_file_path,
        };
        let mut rendered = serde_json::to_vec_pretty(&view)?;
        rendered.push(b'\n');
        Ok(rendered)
    }
}
