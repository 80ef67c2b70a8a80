//! Declarative server configuration.
//!
//! The whole document is replaced on reload: domains are rebuilt into a fresh
//! registry, sessions re-resolve their domain by name, and global key
//! bindings are swapped out. Parsing is plain serde; a malformed document is
//! rejected as a unit, malformed entries inside a valid document are dropped
//! individually by the registry build.

use serde::{Deserialize, Serialize};

use crate::canvas::Color;
use crate::domain::{ContentMode, FocusMode, HoverMode, Origin};
use crate::input::Keycode;

/// Complete server configuration document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Domain policy entries
    pub domains: Vec<DomainConfig>,
    /// Focus-independent key bindings
    pub global_keys: Vec<GlobalKeyConfig>,
    /// Color painted where no view covers the screen
    pub background: Color,
    /// Which state-change reports are emitted
    pub reports: ReportToggles,
}

impl Config {
    /// Parse a configuration document from JSON
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// One configured domain entry; see [`crate::domain::DomainEntry`] for the
/// resolved form
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub name: String,
    /// Mandatory in practice: an entry without a layer is dropped
    pub layer: Option<u32>,
    pub color: Color,
    /// Whether the session label is drawn on this domain's views
    pub label: bool,
    pub content: ContentMode,
    pub hover: HoverMode,
    pub focus: FocusMode,
    pub origin: Origin,
    pub xpos: i32,
    pub ypos: i32,
    pub width: i32,
    pub height: i32,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            layer: None,
            color: Color::GRAY,
            label: true,
            content: ContentMode::default(),
            hover: HoverMode::default(),
            focus: FocusMode::default(),
            origin: Origin::default(),
            xpos: 0,
            ypos: 0,
            width: 0,
            height: 0,
        }
    }
}

/// Binds a keycode to a receiving session, independent of focus
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalKeyConfig {
    pub key: Keycode,
    /// Label of the session that receives the key sequence
    pub session: String,
}

/// Report toggles; each enabled toggle emits a small structured document on
/// the corresponding state change
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportToggles {
    pub pointer: bool,
    pub hover: bool,
    pub focus: bool,
    pub keys: bool,
    pub clicked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let text = r#"{
            "domains": [
                {"name": "desktop", "layer": 1, "focus": "click"},
                {"name": "panel", "layer": 3, "origin": "top_right", "width": -64, "height": 24}
            ],
            "global_keys": [{"key": 59, "session": "launcher"}],
            "background": {"r": 20, "g": 30, "b": 40},
            "reports": {"focus": true}
        }"#;

        let config = Config::from_json(text).unwrap();
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.domains[0].focus, FocusMode::Click);
        assert_eq!(config.domains[1].origin, Origin::TopRight);
        assert_eq!(config.domains[1].width, -64);
        assert_eq!(config.global_keys[0].session, "launcher");
        assert!(config.reports.focus);
        assert!(!config.reports.pointer);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert!(config.domains.is_empty());
        assert_eq!(config.background, Color::BLACK);
    }

    #[test]
    fn test_domain_config_defaults() {
        let d: DomainConfig = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(d.layer, None);
        assert!(d.label);
        assert_eq!(d.hover, HoverMode::Focused);
    }
}
