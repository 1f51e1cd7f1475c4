//! Value types read out of a project descriptor

use serde::Serialize;

use crate::identifier::Identifier;

use super::condition::ConfigKey;
use super::xml_tree::XmlElement;

pub(crate) const REFERENCE: &str = "Reference";
pub(crate) const PROJECT_REFERENCE: &str = "ProjectReference";
pub(crate) const COMPILE: &str = "Compile";
pub(crate) const HINT_PATH: &str = "HintPath";
pub(crate) const SPECIFIC_VERSION: &str = "SpecificVersion";
pub(crate) const INCLUDE: &str = "Include";

/// `<Reference Include="...">`: a GAC or file reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Simple name, the part of `full_name` before the first comma
    pub name: String,
    /// The `Include` attribute as stored
    pub full_name: String,
    pub hint_path: Option<String>,
    pub specific_version: bool,
}

impl Reference {
    pub(crate) fn from_element(element: &XmlElement) -> Self {
        let full_name = element.attribute(INCLUDE).unwrap_or_default().to_string();
        let name = simple_name(&full_name).to_string();
        let hint_path = element.child(HINT_PATH).map(|e| e.text());
        let specific_version = element
            .child(SPECIFIC_VERSION)
            .map(|e| e.text().trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            name,
            full_name,
            hint_path,
            specific_version,
        }
    }

    /// True for references resolved by name only
    pub fn is_gac(&self) -> bool {
        self.hint_path.is_none()
    }
}

/// `<ProjectReference Include="..\Other\Other.csproj">`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReference {
    pub name: String,
    pub project_file: String,
    pub project_id: Option<Identifier>,
}

impl ProjectReference {
    pub(crate) fn from_element(element: &XmlElement) -> Self {
        let project_file = element.attribute(INCLUDE).unwrap_or_default().to_string();
        let name = element
            .child("Name")
            .map(|e| e.text())
            .unwrap_or_else(|| file_stem(&project_file).to_string());
        // A broken GUID here should not make the rest of the project unreadable
        let project_id = element
            .child("Project")
            .and_then(|e| Identifier::parse(&e.text()).ok());

        Self {
            name,
            project_file,
            project_id,
        }
    }
}

/// `<Compile Include="Foo.cs" />`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileItem {
    pub include: String,
}

/// A single property element inside a property group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub name: String,
    pub text: String,
}

impl Property {
    pub(crate) fn from_element(element: &XmlElement) -> Self {
        Self {
            name: element.local_name().to_string(),
            text: element.text(),
        }
    }
}

/// A configuration found in the project, in file order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub name: String,
    pub platform: Option<String>,
}

impl From<&ConfigKey> for Configuration {
    fn from(key: &ConfigKey) -> Self {
        Self {
            name: key.name.clone(),
            platform: key.platform.clone(),
        }
    }
}

impl std::fmt::Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.platform {
            Some(platform) => write!(f, "{}|{}", self.name, platform),
            None => write!(f, "{}", self.name),
        }
    }
}

/// `System.Xml, Version=4.0.0.0` -> `System.Xml`
pub fn simple_name(full_name: &str) -> &str {
    full_name.split(',').next().unwrap_or(full_name).trim()
}

fn file_stem(path: &str) -> &str {
    let file = crate::paths::file_name(path);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    }
}
