//! Tree configuration.
//!
//! # Environment Variables
//!
//! - `PAGETREE_MAX_FANOUT`: maximum children per node (default: `256`)
//!
//! # Invariants
//!
//! - `max_fanout` is always within `MIN_MAX_FANOUT..=MAX_MAX_FANOUT`, so a
//!   page's 1-byte entry count can hold `max_fanout - 1` entries.

/// Tree configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    max_fanout: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl TreeConfig {
    /// Default maximum fanout.
    pub const DEFAULT_MAX_FANOUT: usize = 256;
    /// Smallest fanout that still lets a split leave both halves non-empty.
    pub const MIN_MAX_FANOUT: usize = 4;
    /// Largest fanout representable by the page header.
    pub const MAX_MAX_FANOUT: usize = 256;
    /// Environment variable overriding the maximum fanout.
    pub const MAX_FANOUT_VAR: &'static str = "PAGETREE_MAX_FANOUT";

    pub fn new(max_fanout: usize) -> Result<Self, ConfigError> {
        if !(Self::MIN_MAX_FANOUT..=Self::MAX_MAX_FANOUT).contains(&max_fanout) {
            return Err(ConfigError::InvalidValue {
                name: "max_fanout".to_string(),
                message: format!(
                    "{max_fanout} is outside {}..={}",
                    Self::MIN_MAX_FANOUT,
                    Self::MAX_MAX_FANOUT
                ),
            });
        }
        Ok(Self { max_fanout })
    }

    /// Load configuration from environment variables.
    ///
    /// Returns the defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let Some(value) = lookup(Self::MAX_FANOUT_VAR) else {
            return Ok(Self::default());
        };
        let max_fanout = value
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue {
                name: Self::MAX_FANOUT_VAR.to_string(),
                message: format!("'{value}' is not a valid number"),
            })?;
        Self::new(max_fanout).map_err(|e| match e {
            ConfigError::InvalidValue { message, .. } => ConfigError::InvalidValue {
                name: Self::MAX_FANOUT_VAR.to_string(),
                message,
            },
        })
    }

    /// Maximum children per node.
    #[must_use]
    pub const fn max_fanout(&self) -> usize {
        self.max_fanout
    }

    /// Maximum entries (keys) per leaf or node.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_fanout - 1
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_fanout: Self::DEFAULT_MAX_FANOUT,
        }
    }
}
