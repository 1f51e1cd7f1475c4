//! Reference classification
//!
//! A token typed by the user becomes one of three references:
//!
//! 1. nothing exists at the token's path: a GAC reference named by the token;
//! 2. the token names a `*proj` file: a project reference;
//! 3. anything else: a file reference, identified through an [`IdentityProbe`].
//!
//! A token such as `Foo.dll` that does not exist on disk therefore becomes a
//! GAC reference called `Foo.dll`. That is intended behavior.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use crate::assembly::{IdentityProbe, ProbeOutcome};
use crate::identifier::Identifier;
use crate::msbuild::{ProjectDescriptor, ProjectError};
use crate::paths;

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("{0}")]
    Project(#[from] ProjectError),
}

pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// How a token was classified, with the fields to store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedReference {
    Gac {
        name: String,
    },
    File {
        name: String,
        full_name: String,
        hint_path: String,
        /// Set when the file could not be identified and its name is used instead
        warning: Option<String>,
    },
    Project {
        name: String,
        project_file: String,
        project_id: Identifier,
    },
}

impl ResolvedReference {
    /// Name shown to the user
    pub fn display_name(&self) -> &str {
        match self {
            ResolvedReference::Gac { name }
            | ResolvedReference::File { name, .. }
            | ResolvedReference::Project { name, .. } => name,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            ResolvedReference::File { warning, .. } => warning.as_deref(),
            _ => None,
        }
    }
}

/// Outcome for one token of a batch
#[derive(Debug)]
pub struct ReferenceOutcome {
    pub token: String,
    pub result: ReferenceResult<ResolvedReference>,
}

pub struct ReferenceResolver<'a> {
    /// Directory tokens are resolved against
    base_dir: PathBuf,
    probe: &'a dyn IdentityProbe,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(base_dir: impl Into<PathBuf>, probe: &'a dyn IdentityProbe) -> Self {
        Self {
            base_dir: base_dir.into(),
            probe,
        }
    }

    /// Classify `token` for a reference from `project`
    pub fn resolve(&self, project: &ProjectDescriptor, token: &str) -> ReferenceResult<ResolvedReference> {
        let location = paths::absolutize(&self.base_dir, &paths::to_native(token));
        if !location.is_file() {
            debug!("No file at {:?}, treating {} as a GAC reference", location, token);
            return Ok(ResolvedReference::Gac {
                name: token.to_string(),
            });
        }

        if is_project_file(&location) {
            return self.resolve_project(project, &location);
        }

        let hint_path = paths::normalize(token);
        Ok(match self.probe.identity_of(&location) {
            ProbeOutcome::Identified(identity) => ResolvedReference::File {
                name: identity.name.clone(),
                full_name: identity.full_name(),
                hint_path,
                warning: None,
            },
            ProbeOutcome::Unreadable(reason) => {
                warn!("Couldn't load assembly {:?}: {}", location, reason);
                let name = paths::file_name(token).to_string();
                ResolvedReference::File {
                    full_name: name.clone(),
                    name,
                    hint_path,
                    warning: Some(reason),
                }
            }
        })
    }

    fn resolve_project(&self, project: &ProjectDescriptor, location: &Path) -> ReferenceResult<ResolvedReference> {
        let mut target = ProjectDescriptor::open(location)?;
        let project_dir = project
            .path()
            .map(|p| paths::absolutize(&self.base_dir, p))
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.base_dir.clone());

        Ok(ResolvedReference::Project {
            name: target.name()?,
            project_file: paths::relative_from(&project_dir, location),
            project_id: target.id()?,
        })
    }

    /// Classify `token` and stage the reference in `project`
    pub fn add(&self, project: &mut ProjectDescriptor, token: &str) -> ReferenceResult<ResolvedReference> {
        let resolved = self.resolve(project, token)?;
        match &resolved {
            ResolvedReference::Gac { name } => project.add_gac_reference(name)?,
            ResolvedReference::File {
                full_name, hint_path, ..
            } => project.add_dll(full_name, hint_path)?,
            ResolvedReference::Project {
                name,
                project_file,
                project_id,
            } => project.add_project_reference(name, project_file, *project_id)?,
        }
        Ok(resolved)
    }

    /// Add every token in order. A failing token is reported and the rest still run.
    pub fn add_all<S: AsRef<str>>(&self, project: &mut ProjectDescriptor, tokens: &[S]) -> Vec<ReferenceOutcome> {
        tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                ReferenceOutcome {
                    token: token.to_string(),
                    result: self.add(project, token),
                }
            })
            .collect()
    }
}

/// `.csproj`, `.vbproj`, `.fsproj` and friends
fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.to_ascii_lowercase().ends_with("proj"))
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
