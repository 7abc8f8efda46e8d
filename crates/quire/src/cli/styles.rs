//! Terminal styles.
//!
//! Rendering code refers to styles by what they mark (a folder name, a
//! timestamp, a warning), never by color. `console` drops the escape codes
//! on its own when stdout is not a terminal.

use console::Style;
use once_cell::sync::Lazy;

pub struct Styles {
    pub folder: Style,
    pub note: Style,
    pub object: Style,
    pub selected: Style,
    pub id: Style,
    pub muted: Style,
    pub time: Style,
    pub title: Style,
    pub key: Style,
    pub info: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
}

pub static STYLES: Lazy<Styles> = Lazy::new(|| Styles {
    folder: Style::new().blue().bold(),
    note: Style::new(),
    object: Style::new().cyan(),
    selected: Style::new().black().on_yellow(),
    id: Style::new().yellow(),
    muted: Style::new().dim(),
    time: Style::new().color256(246).italic(),
    title: Style::new().bold(),
    key: Style::new().cyan(),
    info: Style::new().dim(),
    success: Style::new().green(),
    warning: Style::new().yellow(),
    error: Style::new().red(),
});
