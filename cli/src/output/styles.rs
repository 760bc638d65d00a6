//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

use crate::domain::handles::Color;

/// Centralized stylesheet for CLI output colors.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warning messages (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Info messages (blue)
    pub info: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Bold text
    pub bold: Style,
    /// Headers/section titles
    pub header: Style,
    /// Blue target group label
    pub blue: Style,
    /// Green target group label
    pub green: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.header = Style::new().bold().cyan();
        self.blue = Style::new().bold().truecolor(26, 107, 160);
        self.green = Style::new().bold().truecolor(46, 160, 67);
    }

    /// Style of a target group color label.
    #[must_use]
    pub fn color(&self, color: Color) -> Style {
        match color {
            Color::Blue => self.blue,
            Color::Green => self.green,
        }
    }
}
