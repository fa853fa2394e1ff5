//! Explorer presentation settings.
//!
//! # Invariants
//! - Every field has a default; partial inputs deserialize.
//! - Host overrides that fail to parse are ignored, never fatal.

use crate::host::EditorHost;
use crate::tree::Glyphs;
use log::warn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENED_GLYPH: &str = "\u{25bd}";
pub const DEFAULT_CLOSED_GLYPH: &str = "\u{25b6}";
pub const DEFAULT_MAX_WIDTH: usize = 40;

pub const SETTING_OPENED_GLYPH: &str = "KeepExplorerNodeOpened";
pub const SETTING_CLOSED_GLYPH: &str = "KeepExplorerNodeClosed";
pub const SETTING_FIXED_WIDTH: &str = "KeepExplorerWidth";
pub const SETTING_MAX_WIDTH: &str = "KeepMaxExplorerWidth";

/// Explorer rendering and window sizing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Drawn in front of expanded (or loaded and empty) tags.
    pub node_opened_glyph: String,
    /// Drawn in front of collapsed tags.
    pub node_closed_glyph: String,
    /// Window width that overrides automatic sizing.
    pub fixed_width: Option<usize>,
    /// Upper bound for automatic sizing.
    pub max_width: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            node_opened_glyph: DEFAULT_OPENED_GLYPH.to_string(),
            node_closed_glyph: DEFAULT_CLOSED_GLYPH.to_string(),
            fixed_width: None,
            max_width: DEFAULT_MAX_WIDTH,
        }
    }
}

impl ExplorerConfig {
    /// Builds the configuration from host settings over the defaults.
    pub fn from_host(host: &dyn EditorHost) -> Self {
        let mut config = Self::default();
        if let Some(glyph) = host.global_setting(SETTING_OPENED_GLYPH) {
            config.node_opened_glyph = glyph;
        }
        if let Some(glyph) = host.global_setting(SETTING_CLOSED_GLYPH) {
            config.node_closed_glyph = glyph;
        }
        if let Some(width) = parse_width(host, SETTING_FIXED_WIDTH) {
            config.fixed_width = Some(width);
        }
        if let Some(width) = parse_width(host, SETTING_MAX_WIDTH) {
            config.max_width = width;
        }
        config
    }

    pub fn glyphs(&self) -> Glyphs {
        Glyphs {
            opened: self.node_opened_glyph.clone(),
            closed: self.node_closed_glyph.clone(),
        }
    }

    /// Window width for content whose widest line is `required` columns.
    pub fn window_width(&self, required: usize) -> usize {
        match self.fixed_width {
            Some(width) => width,
            None => required.min(self.max_width),
        }
    }
}

fn parse_width(host: &dyn EditorHost, name: &str) -> Option<usize> {
    let raw = host.global_setting(name)?;
    match raw.trim().parse::<usize>() {
        Ok(width) => Some(width),
        Err(_) => {
            warn!("event=config_parse module=explorer.config status=ignored setting={name}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExplorerConfig, DEFAULT_MAX_WIDTH};

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ExplorerConfig =
            serde_json::from_str(r#"{ "max_width": 60 }"#).expect("partial config parses");
        assert_eq!(config.max_width, 60);
        assert_eq!(config.node_opened_glyph, "\u{25bd}");
        assert_eq!(config.fixed_width, None);
    }

    #[test]
    fn window_width_is_capped_unless_fixed() {
        let mut config = ExplorerConfig::default();
        assert_eq!(config.window_width(25), 25);
        assert_eq!(config.window_width(200), DEFAULT_MAX_WIDTH);

        config.fixed_width = Some(70);
        assert_eq!(config.window_width(25), 70);
    }
}
