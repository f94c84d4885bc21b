use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Represents the different deployment environments the portal can read from.
#[derive(Clone, Default, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development gateway.
    Local,
    /// Staging gateway for pre-production testing.
    Staging,
    /// Production gateway.
    #[default]
    Production,
}

impl Environment {
    /// Returns the read gateway URL associated with the environment.
    pub fn gateway_url(&self) -> String {
        match self {
            Environment::Local => "http://localhost:8545".to_string(),
            Environment::Staging => "https://staging.gateway.pool-portal.app".to_string(),
            Environment::Production => "https://gateway.pool-portal.app".to_string(),
        }
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(()),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Local => write!(f, "Local"),
            Environment::Staging => write!(f, "Staging"),
            Environment::Production => write!(f, "Production"),
        }
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Environment::{}, URL: {}", self, self.gateway_url())
    }
}
