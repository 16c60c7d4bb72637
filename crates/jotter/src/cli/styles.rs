//! Styles for the jotter CLI.
//!
//! Rendering code works with semantic names (a timestamp is `time`, a pinned
//! marker is `pinned`), never with raw colors. The palette sits in one place
//! so it can change without touching the renderers.
//!
//! `console` drops the escape codes on its own when the output is not a
//! terminal or `NO_COLOR` is set, so piped output stays plain.

use console::Style;
use jotterapp::commands::MessageLevel;
use once_cell::sync::Lazy;

pub struct Styles {
    pub title: Style,
    pub muted: Style,
    pub faint: Style,
    pub time: Style,
    pub pinned: Style,
    pub done: Style,
    pub success: Style,
    pub info: Style,
    pub warning: Style,
    pub error: Style,
}

pub static STYLES: Lazy<Styles> = Lazy::new(|| {
    let muted = Style::new().color256(246);
    Styles {
        title: Style::new().bold(),
        faint: Style::new().color256(242),
        time: muted.clone().italic(),
        pinned: Style::new().color256(178).bold(),
        done: muted.clone().strikethrough(),
        success: Style::new().green(),
        info: muted.clone(),
        warning: Style::new().yellow().bold(),
        error: Style::new().red().bold(),
        muted,
    }
});

impl Styles {
    pub fn for_level(&self, level: MessageLevel) -> &Style {
        match level {
            MessageLevel::Info => &self.info,
            MessageLevel::Success => &self.success,
            MessageLevel::Warning => &self.warning,
            MessageLevel::Error => &self.error,
        }
    }
}
