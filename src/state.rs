//! Value types exchanged with clients: sources, the combined insets state, and
//! the control handed to a control target.
//!
//! Everything here has value semantics. The controller rebuilds the merged
//! state from its providers and every recipient gets its own copy, so nothing
//! handed out can alias a provider's authoritative source.

use crate::geometry::{Point, Rect};
use crate::types::{InsetType, Leash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One named region of the screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsetsSource {
    pub inset_type: InsetType,
    pub frame: Rect,
    /// Secondary frame of the part that is actually visible, when it differs.
    pub visible_frame: Option<Rect>,
    pub visible: bool,
}

impl InsetsSource {
    pub fn new(inset_type: InsetType) -> Self {
        Self {
            inset_type,
            frame: Rect::EMPTY,
            visible_frame: None,
            visible: inset_type.default_visibility(),
        }
    }

    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// All sources known on a display, ordered by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsetsState {
    pub display_frame: Rect,
    sources: BTreeMap<InsetType, InsetsSource>,
}

impl InsetsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self, inset_type: InsetType) -> Option<&InsetsSource> {
        self.sources.get(&inset_type)
    }

    pub fn contains(&self, inset_type: InsetType) -> bool {
        self.sources.contains_key(&inset_type)
    }

    /// Inserts a source, replacing any source of the same type.
    pub fn add_source(&mut self, source: InsetsSource) {
        self.sources.insert(source.inset_type, source);
    }

    pub fn remove_source(&mut self, inset_type: InsetType) -> Option<InsetsSource> {
        self.sources.remove(&inset_type)
    }

    pub fn sources(&self) -> impl Iterator<Item = &InsetsSource> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Whether the source exists and is visible.
    pub fn is_visible(&self, inset_type: InsetType) -> bool {
        self.source(inset_type).map(|s| s.visible).unwrap_or(false)
    }
}

/// What a control target receives for each type it controls.
///
/// `leash` is `None` for fake targets and for real targets whose leash has
/// not been committed by the compositor yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsetsSourceControl {
    pub inset_type: InsetType,
    pub leash: Option<Leash>,
    pub surface_position: Point,
}

impl InsetsSourceControl {
    pub fn new(inset_type: InsetType, leash: Option<Leash>, surface_position: Point) -> Self {
        Self {
            inset_type,
            leash,
            surface_position,
        }
    }

    /// Returns whether the position actually changed.
    pub fn set_surface_position(&mut self, x: i32, y: i32) -> bool {
        let position = Point::new(x, y);
        if self.surface_position == position {
            return false;
        }
        self.surface_position = position;
        true
    }

    /// Copy with the leash stripped.
    pub fn without_leash(&self) -> Self {
        Self {
            leash: None,
            ..*self
        }
    }
}
