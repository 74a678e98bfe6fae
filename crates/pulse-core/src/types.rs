//! Domain types for content, container state, and scores.
//!
//! Enum wire names follow the uppercase vocabulary clients already speak
//! (`COLD`, `GAME_FOCUS_MODE`, ...). Every enum also parses from and
//! renders to that same string form.

use serde::{Deserialize, Serialize};

use crate::error::PulseError;

/// Unique identifier for a content item.
pub type ContentId = String;

/// Unique identifier for a client session.
pub type SessionId = String;

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum
/// using its wire names.
macro_rules! wire_enum {
    ($ty:ident, $err:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = PulseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(PulseError::$err(other.to_string())),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

// ── Content ───────────────────────────────────────────────────────

/// Kind of workload behind a content item.
///
/// Names other than `GAME` and `AI_SERVICE` are kept verbatim as
/// [`ContentType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    Game,
    AiService,
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Game => "GAME",
            Self::AiService => "AI_SERVICE",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ContentType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "GAME" => Self::Game,
            "AI_SERVICE" => Self::AiService,
            _ => Self::Other(name),
        }
    }
}

impl From<ContentType> for String {
    fn from(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

/// Lifecycle state of the container backing a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    #[default]
    Cold,
    Warm,
    Hot,
}

wire_enum!(ContainerStatus, UnknownContainerStatus {
    Cold => "COLD",
    Warm => "WARM",
    Hot => "HOT",
});

/// A streamable content item as seen by the decision loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Free-form tag used for cross-domain matching.
    pub theme: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub container_status: ContainerStatus,
    /// Workload deployment backing this item. Defaults to the content id.
    #[serde(default)]
    pub deployment_name: String,
    #[serde(default)]
    pub personal_score: f64,
    #[serde(default)]
    pub global_score: f64,
    #[serde(default)]
    pub combined_score: f64,
}

impl ContentItem {
    /// Create a COLD content item whose deployment shares its id.
    pub fn new(id: &str, content_type: ContentType, theme: &str) -> Self {
        Self {
            id: id.to_string(),
            content_type,
            theme: theme.to_string(),
            title: String::new(),
            description: String::new(),
            thumbnail_url: String::new(),
            container_status: ContainerStatus::Cold,
            deployment_name: id.to_string(),
            personal_score: 0.0,
            global_score: 0.0,
            combined_score: 0.0,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_deployment(mut self, deployment_name: &str) -> Self {
        self.deployment_name = deployment_name.to_string();
        self
    }

    pub fn with_status(mut self, status: ContainerStatus) -> Self {
        self.container_status = status;
        self
    }

    /// Deployment name, falling back to the content id when unset.
    pub fn deployment(&self) -> &str {
        if self.deployment_name.is_empty() {
            &self.id
        } else {
            &self.deployment_name
        }
    }

    /// Copy live score fields onto this item.
    pub fn apply_scores(&mut self, scores: &InputScores) {
        self.personal_score = scores.personal;
        self.global_score = scores.global;
        self.combined_score = scores.combined;
    }
}

// ── Modes ─────────────────────────────────────────────────────────

/// The user's current content-focus regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalMode {
    #[default]
    MixedStreamBrowsing,
    GameFocusMode,
    AiServiceMode,
}

wire_enum!(OperationalMode, UnknownMode {
    MixedStreamBrowsing => "MIXED_STREAM_BROWSING",
    GameFocusMode => "GAME_FOCUS_MODE",
    AiServiceMode => "AI_SERVICE_MODE",
});

impl OperationalMode {
    /// The focus mode entered by sustained engagement with this content type.
    ///
    /// Content types without a focus mode of their own return to mixed
    /// browsing.
    pub fn for_content_type(content_type: &ContentType) -> Self {
        match content_type {
            ContentType::Game => Self::GameFocusMode,
            ContentType::AiService => Self::AiServiceMode,
            ContentType::Other(_) => Self::MixedStreamBrowsing,
        }
    }

    /// True for the single-content focus modes.
    pub fn is_focus(&self) -> bool {
        !matches!(self, Self::MixedStreamBrowsing)
    }
}

// ── Scores ────────────────────────────────────────────────────────

/// Score triple for one content item from one session's point of view.
///
/// `combined` is always recomputed from the stored components by the
/// scorer and never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputScores {
    #[serde(rename = "personal_score")]
    pub personal: f64,
    #[serde(rename = "global_score")]
    pub global: f64,
    #[serde(rename = "combined_score")]
    pub combined: f64,
}

impl InputScores {
    pub fn new(personal: f64, global: f64, combined: f64) -> Self {
        Self {
            personal,
            global,
            combined,
        }
    }
}

/// Direction of an external trend signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Rising,
    #[default]
    Stable,
    Falling,
}

wire_enum!(TrendDirection, UnknownTrendDirection {
    Rising => "RISING",
    Stable => "STABLE",
    Falling => "FALLING",
});

/// Viral/trend score for a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendScore {
    pub content_id: ContentId,
    /// Viral score in [0, 1].
    pub viral_score: f64,
    #[serde(rename = "trend_direction")]
    pub direction: TrendDirection,
    /// Unix milliseconds of the last update.
    pub last_updated: u64,
    /// Set by an explicit trend-spike event; exempt from passive decay.
    pub manual_override: bool,
}
