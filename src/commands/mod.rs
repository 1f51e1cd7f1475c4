//! Command implementations behind the CLI
//!
//! Every command takes the [`EditContext`] explicitly and returns a
//! line-oriented [`Response`]; printing is left to the binary.

pub mod probe;
pub mod references;
pub mod solution;
pub mod source;

use std::path::PathBuf;

use clap::Subcommand;
use log::debug;
use thiserror::Error;

use crate::context::EditContext;
use crate::msbuild::{ProjectDescriptor, ProjectError};
use crate::solution::SolutionError;

pub const NO_PROJECT_FOUND: &str = "No project found";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{0}")]
    Project(#[from] ProjectError),

    #[error("{0}")]
    Solution(#[from] SolutionError),

    #[error("Failed to encode probe outcome: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Output of a command: lines for stdout and the process exit code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub lines: Vec<String>,
    pub exit_code: i32,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single line, exit code 0
    pub fn message(line: impl Into<String>) -> Self {
        let mut response = Self::new();
        response.push(line);
        response
    }

    /// A single line with a non-zero exit code
    pub fn failure(line: impl Into<String>) -> Self {
        Self::message(line).with_exit_code(1)
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Manage a project's references
    References {
        #[command(subcommand)]
        action: Option<ReferencesAction>,
    },

    /// Manage a project's source files
    Source {
        #[command(subcommand)]
        action: Option<SourceAction>,
    },

    /// Create or inspect a solution and manage its projects
    #[command(alias = "sln")]
    Solution {
        /// Solution name, with or without `.sln`
        name: Option<String>,

        /// Same as the positional name
        #[arg(long = "name", value_name = "NAME", conflicts_with = "name")]
        named: Option<String>,

        #[command(subcommand)]
        action: Option<SolutionAction>,
    },

    /// Print the identity of one assembly as JSON
    #[command(hide = true)]
    Probe { path: PathBuf },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ReferencesAction {
    /// Add GAC names, assembly files or project files
    Add { tokens: Vec<String> },
    /// Remove references by name
    Rm { names: Vec<String> },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SourceAction {
    Add { paths: Vec<String> },
    Rm { paths: Vec<String> },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SolutionAction {
    /// Add a project file to the solution
    Add {
        #[arg(value_name = "PROJECT")]
        target: String,
    },
    /// Remove a project by name or path
    Rm {
        #[arg(value_name = "PROJECT")]
        target: String,
    },
}

pub fn run(ctx: &EditContext, command: Command) -> CommandResult<Response> {
    debug!("Running {:?}", command);
    match command {
        Command::References { action } => match action {
            None => references::list(ctx),
            Some(ReferencesAction::Add { tokens }) => {
                let probe = ctx.identity_probe();
                references::add(ctx, probe.as_ref(), &tokens)
            }
            Some(ReferencesAction::Rm { names }) => references::remove(ctx, &names),
        },
        Command::Source { action } => match action {
            None => source::list(ctx),
            Some(SourceAction::Add { paths }) => source::add(ctx, &paths),
            Some(SourceAction::Rm { paths }) => source::remove(ctx, &paths),
        },
        Command::Solution { name, named, action } => {
            let name = named.or(name);
            match action {
                None => solution::create_or_show(ctx, name.as_deref()),
                Some(SolutionAction::Add { target }) => solution::add(ctx, name.as_deref(), &target),
                Some(SolutionAction::Rm { target }) => solution::remove(ctx, name.as_deref(), &target),
            }
        }
        Command::Probe { path } => probe::run(&path),
    }
}

/// The active project, when one is configured and exists on disk
pub(crate) fn active_project(ctx: &EditContext) -> CommandResult<Option<ProjectDescriptor>> {
    match &ctx.project {
        Some(path) if path.is_file() => Ok(Some(ProjectDescriptor::open(path)?)),
        Some(path) => {
            debug!("Active project {:?} does not exist", path);
            Ok(None)
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_lines() {
        let mut response = Response::message("Added Foo.cs to App");
        response.push("Added Bar.cs to App");
        assert_eq!(response.text(), "Added Foo.cs to App\nAdded Bar.cs to App");
        assert_eq!(response.exit_code, 0);
        assert_eq!(Response::failure(NO_PROJECT_FOUND).exit_code, 1);
    }
}
