use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{domain::MapPoint, Result};

/// Image geometry and marker style for one render call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapStyle {
    pub width: u32,
    pub height: u32,
    pub marker_radius: u32,
    pub font_size: u32,
    /// Label offset from the marker, in degrees.
    pub label_offset: f64,
}

impl MapStyle {
    /// Larger marker for a single looked-up city.
    pub fn single(size: (u32, u32)) -> Self {
        Self {
            width: size.0,
            height: size.1,
            marker_radius: 8,
            font_size: 16,
            label_offset: 1.0,
        }
    }

    /// Smaller markers and labels when plotting a whole list.
    pub fn multi(size: (u32, u32)) -> Self {
        Self {
            width: size.0,
            height: size.1,
            marker_radius: 5,
            font_size: 12,
            label_offset: 0.5,
        }
    }
}

/// Hexagonal port for drawing labelled points on a world map.
pub trait MapRenderer: Send + Sync {
    /// Render `points` as a PNG written to `out`.
    fn render(&self, title: &str, points: &[MapPoint], style: MapStyle, out: &Path) -> Result<()>;
}

/// A rendered map image on local disk.
///
/// The file is removed when this value is dropped, whether or not sending it
/// succeeded.
#[derive(Debug)]
pub struct RenderedMap {
    path: PathBuf,
}

impl RenderedMap {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RenderedMap {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "failed to remove rendered map: {e}"),
        }
    }
}
