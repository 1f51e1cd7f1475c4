//! Explicit editing context
//!
//! Built once from the command line and the environment, then passed to
//! every command. Nothing here is global.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::assembly::isolated::DEFAULT_PROBE_TIMEOUT;
use crate::assembly::{IdentityProbe, InProcessProbe, IsolatedProbe};
use crate::paths;

/// Environment variable naming the active project
pub const PROJECT_ENV: &str = "PROJEDIT_PROJECT";

const PROJECT_EXTENSION: &str = "csproj";
const SOLUTION_EXTENSION: &str = "sln";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Probe in a child process instead of in this one
    pub isolated: bool,
    pub timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            isolated: true,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EditContext {
    pub working_dir: PathBuf,
    /// Active project, absolute
    pub project: Option<PathBuf>,
    /// Explicit or discovered solution, absolute
    pub solution: Option<PathBuf>,
    pub probe: ProbeSettings,
}

impl EditContext {
    /// Context for `working_dir`. Explicit paths win over discovery and are
    /// resolved against `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>, project: Option<PathBuf>, solution: Option<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        let project = project
            .map(|p| paths::absolutize(&working_dir, &p))
            .or_else(|| single_file_with_extension(&working_dir, PROJECT_EXTENSION));
        let solution = solution
            .map(|s| paths::absolutize(&working_dir, &s))
            .or_else(|| single_file_with_extension(&working_dir, SOLUTION_EXTENSION));
        debug!(
            "Context: dir {:?}, project {:?}, solution {:?}",
            working_dir, project, solution
        );

        Self {
            working_dir,
            project,
            solution,
            probe: ProbeSettings::default(),
        }
    }

    pub fn with_probe(mut self, probe: ProbeSettings) -> Self {
        self.probe = probe;
        self
    }

    /// Resolve a user supplied path against the working directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        paths::absolutize(&self.working_dir, &paths::to_native(path))
    }

    /// Path of the solution to work on. `name` (with or without `.sln`) picks
    /// a file in the working directory; otherwise the known solution, else
    /// one named after the working directory.
    pub fn solution_path(&self, name: Option<&str>) -> PathBuf {
        if let Some(name) = name {
            let file = name.strip_suffix(".sln").unwrap_or(name);
            return self.resolve(&format!("{}.{}", file, SOLUTION_EXTENSION));
        }
        if let Some(solution) = &self.solution {
            return solution.clone();
        }
        let dir_name = self
            .working_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Solution".to_string());
        self.working_dir.join(format!("{}.{}", dir_name, SOLUTION_EXTENSION))
    }

    /// The probe matching [`ProbeSettings`]
    pub fn identity_probe(&self) -> Box<dyn IdentityProbe> {
        if self.probe.isolated {
            match IsolatedProbe::current_exe(self.probe.timeout) {
                Ok(probe) => return Box::new(probe),
                Err(e) => warn!("Cannot locate own executable, probing in process: {}", e),
            }
        }
        Box::new(InProcessProbe)
    }
}

/// The only file in `dir` with `extension`; `None` when there are none or several
fn single_file_with_extension(dir: &Path, extension: &str) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {:?}: {}", dir, e);
            return None;
        }
    };

    let mut found = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension));
    let first = found.next()?;
    if found.next().is_some() {
        debug!("Several .{} files in {:?}, none is picked", extension, dir);
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discovers_single_project_and_solution() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("App.csproj"), "<Project />").unwrap();
        fs::write(temp.path().join("App.sln"), "").unwrap();

        let ctx = EditContext::new(temp.path(), None, None);
        assert_eq!(ctx.project, Some(temp.path().join("App.csproj")));
        assert_eq!(ctx.solution, Some(temp.path().join("App.sln")));
        assert!(ctx.probe.isolated);
    }

    #[test]
    fn test_several_projects_are_ambiguous() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("A.csproj"), "<Project />").unwrap();
        fs::write(temp.path().join("B.csproj"), "<Project />").unwrap();

        assert_eq!(EditContext::new(temp.path(), None, None).project, None);
    }

    #[test]
    fn test_explicit_project_is_resolved_against_working_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = EditContext::new(temp.path(), Some(PathBuf::from("src/../Lib/Lib.csproj")), None);
        assert_eq!(ctx.project, Some(temp.path().join("Lib").join("Lib.csproj")));
    }

    #[test]
    fn test_solution_path_defaults() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("tmp");
        fs::create_dir_all(&dir).unwrap();
        let ctx = EditContext::new(&dir, None, None);

        assert_eq!(ctx.solution_path(None), dir.join("tmp.sln"));
        assert_eq!(ctx.solution_path(Some("WickedAwesome")), dir.join("WickedAwesome.sln"));
        assert_eq!(ctx.solution_path(Some("WickedAwesome.sln")), dir.join("WickedAwesome.sln"));
    }

    #[test]
    fn test_in_process_probe_when_not_isolated() {
        let temp = TempDir::new().unwrap();
        let ctx = EditContext::new(temp.path(), None, None).with_probe(ProbeSettings {
            isolated: false,
            timeout: Duration::from_secs(1),
        });
        let probe = ctx.identity_probe();
        let missing = temp.path().join("missing.dll");
        assert!(matches!(
            probe.identity_of(&missing),
            crate::assembly::ProbeOutcome::Unreadable(_)
        ));
    }
}
