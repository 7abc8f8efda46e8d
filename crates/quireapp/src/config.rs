//! # Configuration
//!
//! Editor settings are loaded with [`confique`] from layered sources, in
//! priority order:
//!
//! 1. **Environment variables**: `QUIRE_PAGE_THRESHOLD`, `QUIRE_HEADER_TEXT`, ...
//! 2. **Settings file**: `settings.toml` in the data directory.
//! 3. **Compiled defaults**: A4 page, 16px text, 100 undo steps.
//!
//! Settings are an explicit value handed to whoever needs them; there is no
//! global. [`EditorSettings::apply`] pushes them into a [`Paginator`].
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `page.width` / `page.height` | `794` / `1123` | Page size in CSS pixels |
//! | `page.margin_*` | `96` | Margins |
//! | `page.header_height` / `page.footer_height` | `40` | Reserved regions |
//! | `page.overflow_threshold` | `0.95` | Fraction of the body that may fill |
//! | `text.font_size` | `16` | Base font size |
//! | `text.line_height` | `1.5` | Line height multiple |
//! | `text.indent_width` | `24` | Pixels per indent level |
//! | `history_depth` | `100` | Undo steps kept, 0 disables undo |
//! | `header_text` | `""` | Text in every page header |
//!
//! ## CLI Usage
//!
//! - `quire config` shows all values.
//! - `quire config get <key>` / `quire config set <key> <value>`.

use crate::error::{QuireError, Result};
use crate::pagination::{PageLayout, Paginator, TextMetrics};
use crate::store::fs_backend::write_atomic;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageSettings {
    #[config(default = 794.0)]
    pub width: f64,
    #[config(default = 1123.0)]
    pub height: f64,
    #[config(default = 96.0)]
    pub margin_top: f64,
    #[config(default = 96.0)]
    pub margin_bottom: f64,
    #[config(default = 96.0)]
    pub margin_left: f64,
    #[config(default = 96.0)]
    pub margin_right: f64,
    #[config(default = 40.0)]
    pub header_height: f64,
    #[config(default = 40.0)]
    pub footer_height: f64,
    #[config(default = 0.95, env = "QUIRE_PAGE_THRESHOLD")]
    pub overflow_threshold: f64,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextSettings {
    #[config(default = 16.0, env = "QUIRE_FONT_SIZE")]
    pub font_size: f64,
    #[config(default = 1.5)]
    pub line_height: f64,
    /// Average glyph width as a fraction of the font size.
    #[config(default = 0.5)]
    pub char_width_ratio: f64,
    #[config(default = 8.0)]
    pub paragraph_spacing: f64,
    #[config(default = 24.0)]
    pub indent_width: f64,
}

/// Settings for the editor and pagination, stored in `settings.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditorSettings {
    /// Undo steps kept per open note.
    #[config(default = 100, env = "QUIRE_HISTORY_DEPTH")]
    pub history_depth: usize,

    #[config(default = "", env = "QUIRE_HEADER_TEXT")]
    pub header_text: String,

    #[config(nested)]
    pub page: PageSettings,

    #[config(nested)]
    pub text: TextSettings,
}

impl Default for PageSettings {
    fn default() -> Self {
        let a4 = PageLayout::a4();
        Self {
            width: a4.page_width,
            height: a4.page_height,
            margin_top: a4.margin_top,
            margin_bottom: a4.margin_bottom,
            margin_left: a4.margin_left,
            margin_right: a4.margin_right,
            header_height: a4.header_height,
            footer_height: a4.footer_height,
            overflow_threshold: a4.overflow_threshold,
        }
    }
}

impl Default for TextSettings {
    fn default() -> Self {
        let m = TextMetrics::default();
        Self {
            font_size: m.font_size,
            line_height: m.line_height,
            char_width_ratio: m.char_width_ratio,
            paragraph_spacing: m.paragraph_spacing,
            indent_width: m.indent_width,
        }
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_depth: crate::editor::DEFAULT_HISTORY_DEPTH,
            header_text: String::new(),
            page: PageSettings::default(),
            text: TextSettings::default(),
        }
    }
}

impl EditorSettings {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE)
    }

    /// Load from environment, then `dir/settings.toml`, then defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let settings = Self::builder()
            .env()
            .file(Self::path_in(dir))
            .load()
            .map_err(|e| QuireError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write `dir/settings.toml` atomically.
    pub fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| QuireError::Config(e.to_string()))?;
        write_atomic(&Self::path_in(dir), &content)
    }

    pub fn page_layout(&self) -> PageLayout {
        PageLayout {
            page_width: self.page.width,
            page_height: self.page.height,
            margin_top: self.page.margin_top,
            margin_bottom: self.page.margin_bottom,
            margin_left: self.page.margin_left,
            margin_right: self.page.margin_right,
            header_height: self.page.header_height,
            footer_height: self.page.footer_height,
            overflow_threshold: self.page.overflow_threshold,
        }
    }

    /// Text metrics with the configured font values; atom heights keep defaults.
    pub fn text_metrics(&self) -> TextMetrics {
        TextMetrics {
            font_size: self.text.font_size,
            line_height: self.text.line_height,
            char_width_ratio: self.text.char_width_ratio,
            paragraph_spacing: self.text.paragraph_spacing,
            indent_width: self.text.indent_width,
            ..TextMetrics::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.page_layout().validate()?;
        if self.text.font_size <= 0.0 || self.text.line_height <= 0.0 {
            return Err(QuireError::Config(
                "font size and line height must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn apply(&self, paginator: &mut Paginator<TextMetrics>) {
        paginator.set_page_layout(self.page_layout());
        *paginator.measure_mut() = self.text_metrics();
        paginator.set_header_text(self.header_text.clone());
    }

    pub fn paginator(&self) -> Paginator<TextMetrics> {
        let mut paginator = Paginator::a4();
        self.apply(&mut paginator);
        paginator
    }

    /// Every dotted key with its current value, sorted by key.
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        fn walk(prefix: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
            match value {
                toml::Value::Table(table) => {
                    for (k, v) in table {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{}.{}", prefix, k)
                        };
                        walk(&key, v, out);
                    }
                }
                toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }
        let mut out = Vec::new();
        walk("", &self.to_value()?, &mut out);
        Ok(out)
    }

    pub fn get(&self, key: &str) -> Result<String> {
        self.entries()?
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| QuireError::Config(format!("unknown setting '{}'", key)))
    }

    /// Set `key` from its string form, parsed to the key's existing type.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut root = self.to_value()?;
        let mut slot = &mut root;
        for part in key.split('.') {
            slot = slot
                .get_mut(part)
                .ok_or_else(|| QuireError::Config(format!("unknown setting '{}'", key)))?;
        }
        let value = match &*slot {
            toml::Value::String(_) => toml::Value::String(raw.to_string()),
            toml::Value::Integer(_) => toml::Value::Integer(raw.trim().parse().map_err(|_| {
                QuireError::Config(format!("'{}' expects an integer, got '{}'", key, raw))
            })?),
            toml::Value::Float(_) => toml::Value::Float(raw.trim().parse().map_err(|_| {
                QuireError::Config(format!("'{}' expects a number, got '{}'", key, raw))
            })?),
            _ => {
                return Err(QuireError::Config(format!(
                    "'{}' is a section, not a value",
                    key
                )))
            }
        };
        *slot = value;
        let updated: EditorSettings = root
            .try_into()
            .map_err(|e: toml::de::Error| QuireError::Config(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn to_value(&self) -> Result<toml::Value> {
        toml::Value::try_from(self).map_err(|e| QuireError::Config(e.to_string()))
    }
}
