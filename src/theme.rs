//! Style and size registry for the themed card.
//!
//! Both tables are constant literals: they are built into the binary, never
//! mutated, and safe to read from any number of requests at once. Lookups are
//! total over [`Theme`] and [`FontSize`]; callers normalize unknown keys to the
//! defaults before they get here (see [`crate::params`]).

use serde::{Deserialize, Serialize, Serializer};

/// An opaque sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Build a color from a `0xRRGGBB` literal.
    pub const fn hex(rgb: u32) -> Self {
        Color {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    /// `#rrggbb` form
    pub fn to_hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

/// One color stop of a gradient; `offset` is in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// Background of a style profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    Solid(Color),
    /// CSS-style linear gradient: `angle_deg` follows the CSS convention
    /// (0 points up, 90 points right).
    LinearGradient {
        angle_deg: f32,
        stops: &'static [GradientStop],
    },
}

/// Named presentation profile applied to the themed card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleProfile {
    pub background: Background,
    pub text_color: Color,
    pub secondary_color: Color,
    pub accent_color: Option<Color>,
}

impl StyleProfile {
    /// Accent color, or the secondary color for profiles without one.
    pub fn accent_or_secondary(&self) -> Color {
        self.accent_color.unwrap_or(self.secondary_color)
    }

    /// Accent color, or the text color for profiles without one.
    pub fn accent_or_text(&self) -> Color {
        self.accent_color.unwrap_or(self.text_color)
    }
}

/// Theme key accepted in the `theme` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    Gradient,
    Minimal,
    Blog,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::Light,
        Theme::Dark,
        Theme::Gradient,
        Theme::Minimal,
        Theme::Blog,
    ];

    /// Parse a query value; `None` for anything that is not an exact key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Gradient => "gradient",
            Theme::Minimal => "minimal",
            Theme::Blog => "blog",
        }
    }
}

/// Title size key accepted in the `fontSize` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Sm,
    Md,
    #[default]
    Lg,
    Xl,
}

impl FontSize {
    pub const ALL: [FontSize; 4] = [FontSize::Sm, FontSize::Md, FontSize::Lg, FontSize::Xl];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FontSize::Sm => "sm",
            FontSize::Md => "md",
            FontSize::Lg => "lg",
            FontSize::Xl => "xl",
        }
    }
}

const GRADIENT_STOPS: [GradientStop; 2] = [
    GradientStop {
        offset: 0.0,
        color: Color::hex(0x667eea),
    },
    GradientStop {
        offset: 1.0,
        color: Color::hex(0x764ba2),
    },
];

static LIGHT: StyleProfile = StyleProfile {
    background: Background::Solid(Color::hex(0xffffff)),
    text_color: Color::hex(0x1a1a1a),
    secondary_color: Color::hex(0x666666),
    accent_color: Some(Color::hex(0x3b82f6)),
};

static DARK: StyleProfile = StyleProfile {
    background: Background::Solid(Color::hex(0x0f172a)),
    text_color: Color::hex(0xf8fafc),
    secondary_color: Color::hex(0x94a3b8),
    accent_color: Some(Color::hex(0x60a5fa)),
};

static GRADIENT: StyleProfile = StyleProfile {
    background: Background::LinearGradient {
        angle_deg: 135.0,
        stops: &GRADIENT_STOPS,
    },
    text_color: Color::hex(0xffffff),
    secondary_color: Color::hex(0xe2e8f0),
    accent_color: Some(Color::hex(0xfbbf24)),
};

static MINIMAL: StyleProfile = StyleProfile {
    background: Background::Solid(Color::hex(0xfafafa)),
    text_color: Color::hex(0x18181b),
    secondary_color: Color::hex(0x71717a),
    accent_color: None,
};

static BLOG: StyleProfile = StyleProfile {
    background: Background::Solid(Color::hex(0xf9f7f3)),
    text_color: Color::hex(0x2c2c2c),
    secondary_color: Color::hex(0x6b6b6b),
    accent_color: Some(Color::hex(0x8b7355)),
};

/// Style profile for a theme.
pub fn lookup(theme: Theme) -> &'static StyleProfile {
    match theme {
        Theme::Light => &LIGHT,
        Theme::Dark => &DARK,
        Theme::Gradient => &GRADIENT,
        Theme::Minimal => &MINIMAL,
        Theme::Blog => &BLOG,
    }
}

/// Title size in pixels.
pub fn lookup_size(size: FontSize) -> u32 {
    match size {
        FontSize::Sm => 48,
        FontSize::Md => 56,
        FontSize::Lg => 64,
        FontSize::Xl => 72,
    }
}
