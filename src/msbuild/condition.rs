//! Configuration conditions on property groups
//!
//! Property groups are keyed by conditions such as
//! `'$(Configuration)|$(Platform)' == 'Debug|x86'`. This module parses the
//! equality form into a [`ConfigKey`]; anything more elaborate (functions,
//! `and`/`or`, inequality) is left unparsed and such groups are not treated
//! as configurations.

use std::fmt;

use serde::Serialize;

/// Name of the pseudo configuration standing for the unconditioned property group
pub const GLOBAL_CONFIGURATION: &str = "Global";

/// A configuration name crossed with an optional platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigKey {
    pub name: String,
    pub platform: Option<String>,
}

impl ConfigKey {
    pub fn new(name: impl Into<String>, platform: Option<String>) -> Self {
        Self {
            name: name.into(),
            platform,
        }
    }

    /// The key for the unconditioned group
    pub fn global() -> Self {
        Self::new(GLOBAL_CONFIGURATION, None)
    }

    pub fn is_global(&self) -> bool {
        self.name == GLOBAL_CONFIGURATION && self.platform.is_none()
    }

    /// Parse a request such as `Debug` or `Release|x86`
    pub fn from_request(request: &str) -> Self {
        match request.split_once('|') {
            Some((name, platform)) => Self::new(name.trim(), Some(platform.trim().to_string())),
            None => Self::new(request.trim(), None),
        }
    }

    /// Whether this key satisfies `request`. Names compare case-insensitively,
    /// as MSBuild does; a request without a platform matches any platform.
    pub fn matches(&self, request: &ConfigKey) -> bool {
        if !self.name.eq_ignore_ascii_case(&request.name) {
            return false;
        }
        match (&request.platform, &self.platform) {
            (None, _) => true,
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.platform {
            Some(platform) => write!(f, "{}|{}", self.name, platform),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Parse a property group condition into a configuration key.
///
/// Returns `None` when the condition is not an equality test on
/// `$(Configuration)`.
pub fn parse_condition(condition: &str) -> Option<ConfigKey> {
    let (left, right) = condition.split_once("==")?;
    if left.ends_with('!') {
        return None;
    }

    let variables = split_operand(left)?;
    let values = split_operand(right)?;
    if variables.len() != values.len() {
        return None;
    }

    let mut name = None;
    let mut platform = None;
    for (variable, value) in variables.iter().zip(values.iter()) {
        let variable = variable.strip_prefix("$(")?.strip_suffix(')')?;
        if variable.eq_ignore_ascii_case("Configuration") {
            name = Some(value.to_string());
        } else if variable.eq_ignore_ascii_case("Platform") {
            platform = Some(value.to_string());
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    Some(ConfigKey::new(name, platform.filter(|p| !p.is_empty())))
}

/// `'a|b'` -> `["a", "b"]`
fn split_operand(operand: &str) -> Option<Vec<String>> {
    let inner = operand.trim().strip_prefix('\'')?.strip_suffix('\'')?;
    if inner.contains('\'') {
        return None;
    }
    Some(inner.split('|').map(|part| part.trim().to_string()).collect())
}
