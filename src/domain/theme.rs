// Theme preference and the chart palette derived from it
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
    Auto,
}

impl ThemePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::Auto => "auto",
        }
    }

    /// Resolves `Auto` against the system preference reported by the client
    pub fn resolve(&self, system_prefers_dark: bool) -> ResolvedTheme {
        match self {
            ThemePreference::Light => ResolvedTheme::Light,
            ThemePreference::Dark => ResolvedTheme::Dark,
            ThemePreference::Auto if system_prefers_dark => ResolvedTheme::Dark,
            ThemePreference::Auto => ResolvedTheme::Light,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemePreference {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            "auto" => Ok(ThemePreference::Auto),
            other => Err(UnknownTheme(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTheme {
    Light,
    Dark,
}

impl ResolvedTheme {
    pub fn is_dark(&self) -> bool {
        matches!(self, ResolvedTheme::Dark)
    }

    /// ApexCharts `theme.mode`
    pub fn mode(&self) -> &'static str {
        match self {
            ResolvedTheme::Light => "light",
            ResolvedTheme::Dark => "dark",
        }
    }

    pub fn foreground(&self) -> &'static str {
        match self {
            ResolvedTheme::Light => "#373d3f",
            ResolvedTheme::Dark => "#e0e0e0",
        }
    }

    pub fn grid_color(&self) -> &'static str {
        match self {
            ResolvedTheme::Light => "#e0e0e0",
            ResolvedTheme::Dark => "#3a3f4b",
        }
    }

    pub fn background(&self) -> &'static str {
        match self {
            ResolvedTheme::Light => "#ffffff",
            ResolvedTheme::Dark => "#2a2e38",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_auto() {
        assert_eq!(ThemePreference::Auto.resolve(true), ResolvedTheme::Dark);
        assert_eq!(ThemePreference::Auto.resolve(false), ResolvedTheme::Light);
        assert_eq!(ThemePreference::Light.resolve(true), ResolvedTheme::Light);
    }

    #[test]
    fn test_parse() {
        assert_eq!("dark".parse::<ThemePreference>().unwrap(), ThemePreference::Dark);
        assert!("sepia".parse::<ThemePreference>().is_err());
    }
}
