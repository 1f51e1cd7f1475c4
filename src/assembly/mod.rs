//! Assembly identity probing
//!
//! [`IdentityProbe`] is the seam the reference resolver calls for files that
//! are neither missing nor project descriptors. [`InProcessProbe`] reads the
//! metadata directly; [`IsolatedProbe`] does the same in a short-lived child
//! process so that a hostile or broken file cannot take the editor down.

pub mod isolated;
pub mod metadata;

use std::fmt;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

pub use isolated::IsolatedProbe;
pub use metadata::{MetadataError, MetadataResult};

/// Name, version, culture and public key token of an assembly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyIdentity {
    pub name: String,
    /// `major.minor.build.revision`
    pub version: String,
    /// `None` for culture-neutral assemblies
    pub culture: Option<String>,
    /// Lowercase hex, `None` when the assembly is not strong-named
    pub public_key_token: Option<String>,
}

impl AssemblyIdentity {
    /// `Foo, Version=1.2.3.4567, Culture=neutral, PublicKeyToken=null`
    pub fn full_name(&self) -> String {
        format!(
            "{}, Version={}, Culture={}, PublicKeyToken={}",
            self.name,
            self.version,
            self.culture.as_deref().unwrap_or("neutral"),
            self.public_key_token.as_deref().unwrap_or("null")
        )
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Result of probing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Identified(AssemblyIdentity),
    /// The file exists but no identity could be read from it
    Unreadable(String),
}

pub trait IdentityProbe {
    fn identity_of(&self, path: &Path) -> ProbeOutcome;
}

/// Reads metadata in the calling process
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessProbe;

impl IdentityProbe for InProcessProbe {
    fn identity_of(&self, path: &Path) -> ProbeOutcome {
        match metadata::read_identity(path) {
            Ok(identity) => {
                debug!("Probed {:?}: {}", path, identity);
                ProbeOutcome::Identified(identity)
            }
            Err(e) => {
                debug!("Could not probe {:?}: {}", path, e);
                ProbeOutcome::Unreadable(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AssemblyIdentity {
        AssemblyIdentity {
            name: "nunit.framework".to_string(),
            version: "2.5.8.10295".to_string(),
            culture: None,
            public_key_token: Some("96d09a1eb7f44a77".to_string()),
        }
    }

    #[test]
    fn test_full_name_format() {
        assert_eq!(
            identity().full_name(),
            "nunit.framework, Version=2.5.8.10295, Culture=neutral, PublicKeyToken=96d09a1eb7f44a77"
        );
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_string(&ProbeOutcome::Unreadable("bad".to_string())).unwrap();
        assert_eq!(json, r#"{"unreadable":"bad"}"#);

        let outcome = ProbeOutcome::Identified(identity());
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.starts_with(r#"{"identified":{"name":"nunit.framework""#));
        assert_eq!(serde_json::from_str::<ProbeOutcome>(&json).unwrap(), outcome);
    }

    #[test]
    fn test_in_process_probe_reports_unreadable_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("FakeAssembly.dll");
        std::fs::write(&path, b"").unwrap();
        assert!(matches!(InProcessProbe.identity_of(&path), ProbeOutcome::Unreadable(_)));
    }
}
