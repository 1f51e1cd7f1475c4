//! Solution (.sln) files
//!
//! A solution is parsed line by line into a header, an ordered project list
//! and a list of opaque global sections. [`SolutionFile::to_text`] generates
//! the whole file from that model; it never patches the file on disk.

pub mod error;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::identifier::Identifier;
use crate::msbuild::{ProjectDescriptor, ProjectResult};
use crate::paths;

pub use error::{IoContext, SolutionError, SolutionResult};

pub const DEFAULT_FORMAT_VERSION: &str = "11.00";
pub const DEFAULT_VISUAL_STUDIO_VERSION: &str = "2010";

const HEADER_PREFIX: &str = "Microsoft Visual Studio Solution File";
const LINE_ENDING: &str = "\r\n";

static SECTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"GlobalSection\(([^\)]+)\)").expect("Failed to compile section name regex")
});
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("Failed to compile quoted field regex"));
static FORMAT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Microsoft Visual Studio Solution File, Format Version ([\d\.]+)")
        .expect("Failed to compile format version regex")
});
static VISUAL_STUDIO_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"# Visual Studio (?:Version )?(\d+)").expect("Failed to compile Visual Studio version regex")
});

/// `Project("{type}") = "Name", "path\Name.csproj", "{id}"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionProject {
    pub name: String,
    /// Path relative to the solution directory, with backslashes
    pub path: String,
    pub id: Identifier,
    pub project_type_id: Identifier,
}

impl SolutionProject {
    pub fn new(name: impl Into<String>, path: &str, id: Identifier, project_type_id: Identifier) -> Self {
        Self {
            name: name.into(),
            path: paths::normalize(path),
            id,
            project_type_id,
        }
    }

    /// Entry for `project`, with its path made relative to `solution_dir`
    pub fn for_descriptor(project: &mut ProjectDescriptor, solution_dir: &Path) -> ProjectResult<Self> {
        let path = match project.path() {
            Some(path) => paths::relative_from(solution_dir, path),
            None => project.relative_path().to_string(),
        };
        Ok(Self::new(
            project.name()?,
            &path,
            project.id()?,
            project.project_type_id()?,
        ))
    }
}

/// `GlobalSection(Name) = preSolution|postSolution` and its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionSection {
    pub name: String,
    pub pre_solution: bool,
    /// Body lines without their leading tabs, joined with `\n`
    pub text: String,
}

impl SolutionSection {
    pub fn new(name: impl Into<String>, pre_solution: bool, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pre_solution,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionFile {
    path: Option<PathBuf>,
    pub format_version: String,
    pub visual_studio_version: String,
    pub projects: Vec<SolutionProject>,
    pub sections: Vec<SolutionSection>,
}

impl Default for SolutionFile {
    fn default() -> Self {
        Self::new()
    }
}

impl SolutionFile {
    /// A fresh, unbound solution with default header versions
    pub fn new() -> Self {
        Self {
            path: None,
            format_version: DEFAULT_FORMAT_VERSION.to_string(),
            visual_studio_version: DEFAULT_VISUAL_STUDIO_VERSION.to_string(),
            projects: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Bind to `path` and parse it if it exists
    pub fn open(path: impl Into<PathBuf>) -> SolutionResult<Self> {
        let path = path.into();
        let mut solution = if path.is_file() {
            debug!("Parsing solution {:?}", path);
            let content = fs::read_to_string(&path)
                .with_io_context(&format!("Failed to read solution {:?}", path))?;
            Self::parse(&content)?
        } else {
            Self::new()
        };
        solution.path = Some(path);
        Ok(solution)
    }

    /// Like [`SolutionFile::open`], but the file has to exist
    pub fn open_existing(path: impl Into<PathBuf>) -> SolutionResult<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(SolutionError::NotFound { path });
        }
        Self::open(path)
    }

    /// Parse solution text. Headers that are missing keep their defaults.
    pub fn parse(content: &str) -> SolutionResult<Self> {
        let mut solution = Self::new();
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = line.trim_start();

            if line.starts_with(HEADER_PREFIX) {
                if let Some(version) = capture(&FORMAT_VERSION, line) {
                    solution.format_version = version;
                }
            } else if line.starts_with("# Visual Studio") {
                if let Some(version) = capture(&VISUAL_STUDIO_VERSION, line) {
                    solution.visual_studio_version = version;
                }
            } else if line.starts_with("Project(") {
                solution.projects.push(project_from_line(line, line_number)?);
            } else if trimmed.starts_with("GlobalSection(") {
                solution.sections.push(section_from_line(line, line_number)?);
            } else if !line.is_empty() && !trimmed.starts_with("EndGlobal") {
                // Everything else inside the global block belongs to the open section
                if let Some(section) = solution.sections.last_mut() {
                    let clean = line.trim_start_matches('\t').trim_end_matches(['\r', '\n']);
                    if !section.text.is_empty() {
                        section.text.push('\n');
                    }
                    section.text.push_str(clean);
                }
            }
        }

        Ok(solution)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn exists(&self) -> bool {
        self.path.as_deref().is_some_and(Path::is_file)
    }

    /// File stem of the bound path
    pub fn name(&self) -> Option<String> {
        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    /// Directory that project paths are relative to
    pub fn directory(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// Generate the file from the in-memory model
    pub fn to_text(&self) -> String {
        let mut lines: Vec<String> = vec![
            String::new(),
            format!("{}, Format Version {}", HEADER_PREFIX, self.format_version),
            format!("# Visual Studio {}", self.visual_studio_version),
        ];

        for project in &self.projects {
            lines.push(format!(
                "Project(\"{}\") = \"{}\", \"{}\", \"{}\"",
                project.project_type_id.braced(),
                project.name,
                project.path,
                project.id.braced()
            ));
            lines.push("EndProject".to_string());
        }

        lines.push("Global".to_string());
        for section in &self.sections {
            let when = if section.pre_solution { "preSolution" } else { "postSolution" };
            lines.push(format!("\tGlobalSection({}) = {}", section.name, when));
            if !section.text.is_empty() {
                lines.extend(section.text.split('\n').map(|line| format!("\t\t{}", line)));
            }
            lines.push("\tEndGlobalSection".to_string());
        }
        lines.push("EndGlobal".to_string());

        let mut text = lines.join(LINE_ENDING);
        text.push_str(LINE_ENDING);
        text
    }

    /// Write [`SolutionFile::to_text`] to the bound path
    pub fn save(&self) -> SolutionResult<()> {
        let path = self.path.as_deref().ok_or(SolutionError::NoPath)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).with_io_context(&format!("Failed to create directory {:?}", dir))?;

        let mut file = NamedTempFile::new_in(&dir)
            .with_io_context(&format!("Failed to create temporary file in {:?}", dir))?;
        file.write_all(self.to_text().as_bytes())
            .with_io_context("Failed to write solution content")?;
        file.persist(path).map_err(|e| SolutionError::Io {
            message: format!("Failed to replace {:?}", path),
            source: e.error,
        })?;

        info!("Saved solution {:?}", path);
        Ok(())
    }

    pub fn project(&self, name: &str) -> Option<&SolutionProject> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Append `project`; returns false when a project with that id or path is already listed
    pub fn add_project(&mut self, project: SolutionProject) -> bool {
        let duplicate = self
            .projects
            .iter()
            .any(|p| p.id == project.id || paths::normalize(&p.path).eq_ignore_ascii_case(&project.path));
        if duplicate {
            return false;
        }
        self.projects.push(project);
        true
    }

    /// Remove the first project whose name or relative path matches
    pub fn remove_project(&mut self, name_or_path: &str) -> Option<SolutionProject> {
        let path = paths::normalize(name_or_path);
        let index = self
            .projects
            .iter()
            .position(|p| p.name == name_or_path || paths::normalize(&p.path).eq_ignore_ascii_case(&path))?;
        Some(self.projects.remove(index))
    }
}

fn capture(pattern: &Regex, line: &str) -> Option<String> {
    pattern
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

fn project_from_line(line: &str, line_number: usize) -> SolutionResult<SolutionProject> {
    let fields: Vec<&str> = QUOTED
        .captures_iter(line)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .collect();

    let [type_id, name, path, id] = fields[..] else {
        return Err(SolutionError::MalformedProjectLine {
            line_number,
            line: line.to_string(),
        });
    };

    let parse_id = |value: &str| {
        Identifier::parse(value).map_err(|source| SolutionError::InvalidIdentifier {
            line_number,
            value: value.to_string(),
            source,
        })
    };

    Ok(SolutionProject {
        name: name.to_string(),
        path: path.to_string(),
        id: parse_id(id)?,
        project_type_id: parse_id(type_id)?,
    })
}

fn section_from_line(line: &str, line_number: usize) -> SolutionResult<SolutionSection> {
    let name = capture(&SECTION_NAME, line).ok_or_else(|| SolutionError::MalformedSectionLine {
        line_number,
        line: line.to_string(),
    })?;
    Ok(SolutionSection::new(name, line.contains("= preSolution"), String::new()))
}

#[cfg(test)]
#[path = "solution_tests.rs"]
mod tests;
