//! MSBuild project descriptors
//!
//! Reading and lossless editing of `.csproj` files: global and
//! per-configuration properties, references, project references and
//! compile items.

pub mod condition;
pub mod error;
pub mod items;
pub mod project;
pub mod xml_tree;

pub use condition::{ConfigKey, GLOBAL_CONFIGURATION};
pub use error::{ProjectError, ProjectResult};
pub use items::{CompileItem, Configuration, ProjectReference, Property, Reference};
pub use project::ProjectDescriptor;
