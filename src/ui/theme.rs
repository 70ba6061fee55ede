use ratatui::style::Color;

// Dark surface, one accent and a couple of semantic colors. Add roles here rather than inline colors.
pub const BAR_BG: Color = Color::Rgb(14, 18, 24);

pub const FG: Color = Color::Rgb(229, 231, 235);
pub const MUTED: Color = Color::Rgb(156, 163, 175);
pub const DIM: Color = Color::Rgb(107, 114, 128);
pub const BORDER: Color = Color::Rgb(55, 65, 81);

pub const ACCENT: Color = Color::Rgb(255, 159, 26);
pub const ACCENT_BG: Color = Color::Rgb(44, 32, 16);

pub const SUCCESS: Color = Color::Rgb(134, 239, 172); // connect status, result counts
pub const ERROR: Color = Color::Rgb(248, 113, 113);
