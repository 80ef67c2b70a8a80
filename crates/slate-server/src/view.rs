//! Views and the view arena.
//!
//! Views live in an arena keyed by stable ids; parent, child, and owner
//! relations are ids, and every dereference is a fallible lookup. A view's
//! absolute position is the sum of relative positions along its parent
//! chain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slate_core::{Point, Rect};

use crate::session::SessionId;

/// Stable view identifier
pub type ViewId = u64;

/// The closed set of view kinds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    #[default]
    Ordinary,
    /// Stays above all normally ordered views and never takes input
    /// (the pointer cursor)
    PointerOrigin,
    /// Flagged as a background; normal views stack in front of it
    Background,
}

impl ViewKind {
    /// Whether views of this kind are pinned above the normal order
    #[inline]
    pub fn stay_top(self) -> bool {
        matches!(self, ViewKind::PointerOrigin)
    }

    #[inline]
    pub fn is_background(self) -> bool {
        matches!(self, ViewKind::Background)
    }
}

/// One rectangle in the compositing tree
#[derive(Clone, Debug)]
pub struct View {
    /// Own geometry, relative to the parent view (or the domain origin for
    /// top-level views)
    pub rect: Rect,
    /// Offset into the owner's texture shown at the view's top-left corner
    pub buffer_off: Point,
    pub parent: Option<ViewId>,
    pub children: Vec<ViewId>,
    /// Owning session; never changes after creation
    pub owner: SessionId,
    pub kind: ViewKind,
    /// Mirrors whether the owner's texture carries an alpha plane
    pub transparent: bool,
    pub title: String,
    /// Label position computed by placement, absolute coordinates
    pub label_rect: Rect,
    /// Marked for deferred destruction; skipped by drawing and hit testing
    pub defunct: bool,
}

impl View {
    /// Create a view owned by `owner`, optionally parented
    pub fn new(owner: SessionId, parent: Option<ViewId>) -> Self {
        Self {
            rect: Rect::EMPTY,
            buffer_off: Point::ZERO,
            parent,
            children: Vec::new(),
            owner,
            kind: ViewKind::Ordinary,
            transparent: false,
            title: String::new(),
            label_rect: Rect::EMPTY,
            defunct: false,
        }
    }
}

/// Arena of all views, keyed by id
#[derive(Clone, Debug, Default)]
pub struct ViewArena {
    views: HashMap<ViewId, View>,
    next_id: ViewId,
}

impl ViewArena {
    pub fn new() -> Self {
        Self {
            views: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a view, linking it into its parent's child list
    pub fn insert(&mut self, view: View) -> ViewId {
        let id = self.next_id;
        self.next_id += 1;
        let parent = view.parent;
        self.views.insert(id, view);
        if let Some(parent) = parent {
            if let Some(p) = self.views.get_mut(&parent) {
                p.children.push(id);
            }
        }
        id
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.views.contains_key(&id)
    }

    /// Remove a view, unlinking it from its parent; children become
    /// top-level
    pub fn remove(&mut self, id: ViewId) -> Option<View> {
        let view = self.views.remove(&id)?;
        if let Some(parent) = view.parent {
            if let Some(p) = self.views.get_mut(&parent) {
                p.children.retain(|&c| c != id);
            }
        }
        for &child in &view.children {
            if let Some(c) = self.views.get_mut(&child) {
                c.parent = None;
            }
        }
        Some(view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Absolute position: the sum of relative positions along the parent
    /// chain. A missing parent terminates the walk.
    pub fn abs_position(&self, id: ViewId) -> Point {
        let mut pos = Point::ZERO;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(view) = self.views.get(&current) else {
                break;
            };
            pos += view.rect.pos();
            cursor = view.parent;
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_with_rect(owner: SessionId, parent: Option<ViewId>, rect: Rect) -> View {
        let mut v = View::new(owner, parent);
        v.rect = rect;
        v
    }

    #[test]
    fn test_abs_position_parent_chain() {
        let mut arena = ViewArena::new();
        let root = arena.insert(view_with_rect(1, None, Rect::new(10, 10, 100, 100)));
        let child = arena.insert(view_with_rect(1, Some(root), Rect::new(5, 5, 50, 50)));
        let grandchild = arena.insert(view_with_rect(1, Some(child), Rect::new(1, 2, 10, 10)));

        assert_eq!(arena.abs_position(root), Point::new(10, 10));
        assert_eq!(arena.abs_position(child), Point::new(15, 15));
        assert_eq!(arena.abs_position(grandchild), Point::new(16, 17));
    }

    #[test]
    fn test_abs_position_tracks_geometry_changes() {
        let mut arena = ViewArena::new();
        let root = arena.insert(view_with_rect(1, None, Rect::new(0, 0, 100, 100)));
        let child = arena.insert(view_with_rect(1, Some(root), Rect::new(20, 20, 10, 10)));

        arena.get_mut(root).unwrap().rect = Rect::new(30, 40, 100, 100);
        assert_eq!(arena.abs_position(child), Point::new(50, 60));
    }

    #[test]
    fn test_remove_unlinks_relations() {
        let mut arena = ViewArena::new();
        let root = arena.insert(view_with_rect(1, None, Rect::new(0, 0, 10, 10)));
        let child = arena.insert(view_with_rect(1, Some(root), Rect::new(1, 1, 5, 5)));

        assert_eq!(arena.get(root).unwrap().children, vec![child]);

        arena.remove(child);
        assert!(arena.get(root).unwrap().children.is_empty());

        // Removing the parent orphans remaining children
        let child2 = arena.insert(view_with_rect(1, Some(root), Rect::new(2, 2, 5, 5)));
        arena.remove(root);
        assert_eq!(arena.get(child2).unwrap().parent, None);
        assert_eq!(arena.abs_position(child2), Point::new(2, 2));
    }
}
