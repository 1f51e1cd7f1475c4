//! projedit
//!
//! Edits MSBuild project files (`.csproj`) and Visual Studio solution files
//! (`.sln`) from the command line: references, source files and solution
//! membership. Project edits keep the rest of the file byte for byte.

pub mod assembly;
pub mod commands;
pub mod context;
pub mod identifier;
pub mod logging;
pub mod msbuild;
pub mod paths;
pub mod resolver;
pub mod solution;
#[cfg(test)]
pub mod test_utils;
