//! Domain policy registry.
//!
//! A domain is a named policy bucket: layering, color, label visibility,
//! focus and hover rules, and the screen region the domain's views live in.
//! Sessions resolve their domain by name against the registry; the registry
//! is rebuilt wholesale on every configuration change and sessions re-resolve
//! rather than holding pointers across generations.

use serde::{Deserialize, Serialize};
use slate_core::{Area, Point};

use crate::canvas::Color;
use crate::config::DomainConfig;

/// What a domain's views show
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// Client-supplied pixels
    #[default]
    Client,
    /// Client pixels mixed with the domain color
    Tinted,
}

/// When a domain's sessions observe pointer motion
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverMode {
    /// Only while focused (or sharing the focused session's domain)
    #[default]
    Focused,
    /// Whenever the pointer is over the session's views
    Always,
}

/// How a domain's sessions acquire the keyboard focus
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    /// Never focusable by clicking
    #[default]
    None,
    /// A click commits the focus to the clicked session
    Click,
    /// A click routes one press/release sequence without moving the focus
    Transient,
}

/// Coordinate origin for a domain's views
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Views follow the current pointer position
    Pointer,
}

impl Origin {
    /// Corner of the screen this origin anchors to
    fn corner(self, screen: Area) -> Point {
        match self {
            Origin::TopLeft | Origin::Pointer => Point::ZERO,
            Origin::TopRight => Point::new(screen.w, 0),
            Origin::BottomLeft => Point::new(0, screen.h),
            Origin::BottomRight => Point::new(screen.w, screen.h),
        }
    }
}

/// One resolved domain policy entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub name: String,
    pub color: Color,
    /// Back-to-front layer; higher layers draw in front
    pub layer: u32,
    pub label_visible: bool,
    pub content: ContentMode,
    pub hover: HoverMode,
    pub focus: FocusMode,
    pub origin: Origin,
    pub offset: Point,
    /// Configured screen-area formula; non-positive components mean
    /// "screen dimension plus this value"
    pub area: Point,
}

impl DomainEntry {
    /// Translate a domain-local position into physical screen coordinates.
    ///
    /// For `Origin::Pointer` the caller adds the pointer position on top.
    pub fn phys_pos(&self, local: Point, screen: Area) -> Point {
        local + self.origin.corner(screen) + self.offset
    }

    /// Inverse of [`phys_pos`](Self::phys_pos)
    pub fn local_pos(&self, phys: Point, screen: Area) -> Point {
        phys - self.origin.corner(screen) - self.offset
    }

    /// Screen area available to this domain given the physical screen size.
    ///
    /// Positive configured components are literal; components `<= 0` track
    /// the screen dimension minus a margin, clamped to zero.
    pub fn screen_area(&self, phys: Area) -> Area {
        let dim = |configured: i32, screen: i32| {
            if configured > 0 {
                configured
            } else {
                (screen + configured).max(0)
            }
        };
        Area::new(dim(self.area.x, phys.w), dim(self.area.y, phys.h))
    }
}

/// Flat name-to-policy table, rebuilt per configuration generation
#[derive(Clone, Debug, Default)]
pub struct DomainRegistry {
    entries: Vec<DomainEntry>,
}

impl DomainRegistry {
    /// Empty registry; every session stays policy-less
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured entries.
    ///
    /// Duplicate names and entries without a layer are diagnosed and dropped;
    /// building never fails.
    pub fn build(configs: &[DomainConfig]) -> Self {
        let mut entries: Vec<DomainEntry> = Vec::with_capacity(configs.len());
        for config in configs {
            let Some(layer) = config.layer else {
                log::warn!("domain '{}' lacks a layer, entry dropped", config.name);
                continue;
            };
            if entries.iter().any(|e| e.name == config.name) {
                log::warn!("duplicate domain '{}', entry dropped", config.name);
                continue;
            }
            entries.push(DomainEntry {
                name: config.name.clone(),
                color: config.color,
                layer,
                label_visible: config.label,
                content: config.content,
                hover: config.hover,
                focus: config.focus,
                origin: config.origin,
                offset: Point::new(config.xpos, config.ypos),
                area: Point::new(config.width, config.height),
            });
        }
        Self { entries }
    }

    /// Look up a domain by exact name
    pub fn lookup(&self, name: &str) -> Option<&DomainEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;

    fn entry(origin: Origin, offset: Point, area: Point) -> DomainEntry {
        DomainEntry {
            name: "test".to_string(),
            color: Color::GRAY,
            layer: 1,
            label_visible: false,
            content: ContentMode::Client,
            hover: HoverMode::Focused,
            focus: FocusMode::Click,
            origin,
            offset,
            area,
        }
    }

    #[test]
    fn test_phys_pos_corners() {
        let screen = Area::new(1024, 768);
        let local = Point::new(10, 20);

        let tl = entry(Origin::TopLeft, Point::ZERO, Point::ZERO);
        assert_eq!(tl.phys_pos(local, screen), Point::new(10, 20));

        let br = entry(Origin::BottomRight, Point::new(-5, -5), Point::ZERO);
        assert_eq!(br.phys_pos(local, screen), Point::new(1029, 783));
    }

    #[test]
    fn test_local_pos_roundtrip_all_origins() {
        let screen = Area::new(800, 600);
        for origin in [
            Origin::TopLeft,
            Origin::TopRight,
            Origin::BottomLeft,
            Origin::BottomRight,
        ] {
            let e = entry(origin, Point::new(7, -3), Point::ZERO);
            for p in [Point::ZERO, Point::new(123, 456), Point::new(799, 599)] {
                assert_eq!(e.local_pos(e.phys_pos(p, screen), screen), p);
            }
        }
    }

    #[test]
    fn test_screen_area_formula() {
        let phys = Area::new(1024, 768);

        // Literal dimensions
        let literal = entry(Origin::TopLeft, Point::ZERO, Point::new(640, 480));
        assert_eq!(literal.screen_area(phys), Area::new(640, 480));

        // Negative tracks screen minus margin
        let tracking = entry(Origin::TopLeft, Point::ZERO, Point::new(-24, 0));
        assert_eq!(tracking.screen_area(phys), Area::new(1000, 768));

        // Margin larger than the screen clamps to zero
        let clamped = entry(Origin::TopLeft, Point::ZERO, Point::new(-2000, -2000));
        assert_eq!(clamped.screen_area(phys), Area::new(0, 0));
    }

    #[test]
    fn test_registry_drops_bad_entries() {
        let configs = vec![
            DomainConfig {
                name: "desktop".to_string(),
                layer: Some(1),
                ..Default::default()
            },
            DomainConfig {
                name: "desktop".to_string(),
                layer: Some(2),
                ..Default::default()
            },
            DomainConfig {
                name: "unlayered".to_string(),
                layer: None,
                ..Default::default()
            },
        ];

        let registry = DomainRegistry::build(&configs);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("desktop").unwrap().layer, 1);
        assert!(registry.lookup("unlayered").is_none());
    }
}
