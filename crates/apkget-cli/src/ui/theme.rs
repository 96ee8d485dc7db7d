//! Colors, icons and column widths shared by every renderer.

use crossterm::style::Color;

#[derive(Debug, Clone)]
pub struct Colors {
    pub package_name: Color,
    pub version: Color,
    pub secondary: Color,
    pub active: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub highlight: Color,
}

#[derive(Debug, Clone)]
pub struct Icons {
    pub pending: &'static str,
    pub active: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub info: &'static str,
    pub pointer: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            pending: "○",
            active: "●",
            success: "✓",
            warning: "!",
            error: "✗",
            info: "i",
            pointer: "›",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    /// Width of the split-name column, icon included.
    pub name_width: usize,
    /// Width of the size column.
    pub size_width: usize,
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: Colors,
    pub icons: Icons,
    pub layout: Layout,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: Colors {
                package_name: Color::White,
                version: Color::DarkGrey,
                secondary: Color::DarkGrey,
                active: Color::Cyan,
                success: Color::Green,
                warning: Color::Yellow,
                error: Color::Red,
                highlight: Color::Cyan,
            },
            icons: Icons::default(),
            layout: Layout {
                name_width: 34,
                size_width: 10,
            },
        }
    }
}

/// Human-readable byte count (`1.4 MB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
