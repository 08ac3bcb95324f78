use colored::Color;

pub const PRIMARY: Color = Color::BrightWhite;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const ONLINE: Color = Color::BrightGreen;
pub const OFFLINE: Color = Color::BrightRed;
pub const TUNNEL_NUMBER: Color = Color::BrightYellow;
pub const UUID: Color = Color::Blue;
