//! The fixed set of presentation slots.
//!
//! Categories are static configuration: each one has a human label and an
//! exposure descriptor naming the page section that renders it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named presentation slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Brand identity film (home hero)
    Brand,

    /// Service demo (home teaser)
    UseCase,

    /// Vision film (edutech page)
    Vision,
}

/// Where a category's current asset is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exposure {
    /// Human-readable location
    pub label: &'static str,

    /// Route of the page that renders the slot
    pub path: &'static str,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 3] = [Category::Brand, Category::UseCase, Category::Vision];

    /// Human label
    pub fn label(self) -> &'static str {
        match self {
            Category::Brand => "Brand Identity",
            Category::UseCase => "AI Service Use Case",
            Category::Vision => "AX Vision Film",
        }
    }

    /// Short name used in analytics rows (first word of the label)
    pub fn short_name(self) -> &'static str {
        self.label().split(' ').next().unwrap_or_default()
    }

    /// CLI/config key
    pub fn key(self) -> &'static str {
        match self {
            Category::Brand => "brand",
            Category::UseCase => "use-case",
            Category::Vision => "vision",
        }
    }

    pub fn exposure(self) -> Exposure {
        match self {
            Category::Brand => Exposure {
                label: "Home > Hero section",
                path: "/",
            },
            Category::UseCase => Exposure {
                label: "Home > Service teaser section",
                path: "/",
            },
            Category::Vision => Exposure {
                label: "AI Edutech > Vision section",
                path: "/edutech",
            },
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "brand" | "brand identity" => Ok(Category::Brand),
            "use-case" | "usecase" | "ai service use case" => Ok(Category::UseCase),
            "vision" | "ax vision film" => Ok(Category::Vision),
            _ => anyhow::bail!("Unknown category: {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_and_labels() {
        assert_eq!("brand".parse::<Category>().unwrap(), Category::Brand);
        assert_eq!("USE_CASE".parse::<Category>().unwrap(), Category::UseCase);
        assert_eq!("AX Vision Film".parse::<Category>().unwrap(), Category::Vision);
        assert!("news".parse::<Category>().is_err());
    }

    #[test]
    fn test_short_names() {
        assert_eq!(Category::Brand.short_name(), "Brand");
        assert_eq!(Category::UseCase.short_name(), "AI");
        assert_eq!(Category::Vision.short_name(), "AX");
    }

    #[test]
    fn test_exposure_paths() {
        assert_eq!(Category::Brand.exposure().path, "/");
        assert_eq!(Category::Vision.exposure().path, "/edutech");
    }
}
