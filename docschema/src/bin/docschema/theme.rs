use colored::Color;

/// Colors for CLI messages; `help_styles` in main mirrors them for clap
pub struct ColorTheme {
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub primary: Color,
    pub secondary: Color,
    pub key: Color,
    pub value: Color,
}

pub const THEME: ColorTheme = ColorTheme {
    success: Color::Green,
    error: Color::Red,
    warning: Color::Yellow,
    info: Color::Blue,
    highlight: Color::Cyan,
    muted: Color::BrightBlack,
    primary: Color::BrightBlue,
    secondary: Color::Magenta,
    key: Color::BrightCyan,
    value: Color::White,
};

/// Message and table icons
pub struct Icons {
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub info: &'static str,
    pub arrow: &'static str,
    pub bullet: &'static str,
    pub changed: &'static str,
    pub key: &'static str,
}

pub const ICONS: Icons = Icons {
    success: "✓",
    error: "✗",
    warning: "⚠",
    info: "ℹ",
    arrow: "→",
    bullet: "•",
    changed: "~",
    key: "🔑",
};
