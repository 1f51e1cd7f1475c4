//! Project descriptor (.csproj) model
//!
//! A [`ProjectDescriptor`] is bound to a path (or fresh) and moves from
//! `Unparsed` to `Parsed` the first time any content is needed. After that
//! the in-memory tree is authoritative: mutations stay in memory until
//! [`ProjectDescriptor::save`], and changes made on disk by someone else are
//! only seen after [`ProjectDescriptor::reload`].

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::identifier::{CSHARP_PROJECT_TYPE, Identifier};
use crate::paths;

use super::condition::{ConfigKey, parse_condition};
use super::error::{IoContext, ProjectError, ProjectResult};
use super::items::{
    COMPILE, CompileItem, Configuration, HINT_PATH, INCLUDE, PROJECT_REFERENCE, Property,
    ProjectReference, REFERENCE, Reference, SPECIFIC_VERSION, simple_name,
};
use super::xml_tree::{XmlDocument, XmlElement, XmlNode};

const PROPERTY_GROUP: &str = "PropertyGroup";
const ITEM_GROUP: &str = "ItemGroup";
const CONDITION: &str = "Condition";
const PROJECT_GUID: &str = "ProjectGuid";
const PROJECT_TYPE_GUIDS: &str = "ProjectTypeGuids";
const ASSEMBLY_NAME: &str = "AssemblyName";
const MSBUILD_NAMESPACE: &str = "http://schemas.microsoft.com/developer/msbuild/2003";

enum ParseState {
    Unparsed,
    Parsed(ProjectModel),
}

struct ProjectModel {
    /// `None` until the file exists or the first mutation materializes a skeleton
    document: Option<XmlDocument>,
    /// Memoized identifier for projects without a `ProjectGuid`
    generated_id: Option<Identifier>,
}

/// An MSBuild project file opened for editing
pub struct ProjectDescriptor {
    path: Option<PathBuf>,
    relative_path: String,
    state: ParseState,
}

impl Default for ProjectDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectDescriptor {
    /// A fresh project that is not bound to any file
    pub fn new() -> Self {
        Self {
            path: None,
            relative_path: String::new(),
            state: ParseState::Parsed(ProjectModel {
                document: None,
                generated_id: None,
            }),
        }
    }

    /// Bind to `path` without reading it yet
    pub fn bind(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            relative_path: String::new(),
            state: ParseState::Unparsed,
        }
    }

    /// Bind to `path` and parse it now. A missing file yields an empty project.
    pub fn open(path: impl Into<PathBuf>) -> ProjectResult<Self> {
        let mut project = Self::bind(path);
        project.parse()?;
        Ok(project)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Whether the bound file exists on disk
    pub fn exists(&self) -> bool {
        self.path.as_deref().is_some_and(Path::is_file)
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.state, ParseState::Parsed(_))
    }

    /// Path of this project relative to a solution, always with backslashes
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn set_relative_path(&mut self, path: &str) {
        self.relative_path = paths::normalize(path);
    }

    /// Read the bound file, replacing any in-memory state
    pub fn parse(&mut self) -> ProjectResult<()> {
        let document = match &self.path {
            Some(path) if path.is_file() => {
                debug!("Parsing project {:?}", path);
                let content = fs::read_to_string(path)
                    .with_io_context(&format!("Failed to read project {:?}", path))?;
                let document = XmlDocument::parse(&content).map_err(|e| ProjectError::Xml {
                    file: path.clone(),
                    message: e.message,
                })?;
                Some(document)
            }
            _ => None,
        };

        self.state = ParseState::Parsed(ProjectModel {
            document,
            generated_id: None,
        });
        Ok(())
    }

    /// Discard in-memory changes and read the file again
    pub fn reload(&mut self) -> ProjectResult<()> {
        self.state = ParseState::Unparsed;
        self.parse()
    }

    /// Write the in-memory tree to the bound path
    pub fn save(&mut self) -> ProjectResult<()> {
        let path = self.path.clone().ok_or(ProjectError::NoPath)?;
        let xml = self.to_xml()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).with_io_context(&format!("Failed to create directory {:?}", dir))?;

        let mut file = NamedTempFile::new_in(&dir)
            .with_io_context(&format!("Failed to create temporary file in {:?}", dir))?;
        file.write_all(xml.as_bytes())
            .with_io_context("Failed to write project content")?;
        file.persist(&path).map_err(|e| ProjectError::Io {
            message: format!("Failed to replace {:?}", path),
            source: e.error,
        })?;

        info!("Saved project {:?}", path);
        Ok(())
    }

    /// The document as it would be saved
    pub fn to_xml(&mut self) -> ProjectResult<String> {
        let file = self.path.clone().unwrap_or_default();
        self.document_mut()?
            .to_xml()
            .map_err(|e| ProjectError::Xml { file, message: e.message })
    }

    /// File stem of the bound path, else the `AssemblyName` property
    pub fn name(&mut self) -> ProjectResult<String> {
        if let Some(stem) = self.path.as_deref().and_then(Path::file_stem) {
            return Ok(stem.to_string_lossy().into_owned());
        }
        Ok(self.global_property(ASSEMBLY_NAME)?.unwrap_or_default())
    }

    /// `ProjectGuid`, or an identifier generated once for this instance
    pub fn id(&mut self) -> ProjectResult<Identifier> {
        if let Some(text) = self.global_property(PROJECT_GUID)? {
            return Ok(Identifier::parse(&text)?);
        }
        let model = self.model()?;
        Ok(*model.generated_id.get_or_insert_with(Identifier::generate))
    }

    pub fn set_id(&mut self, id: Identifier) -> ProjectResult<()> {
        self.set_global_property(PROJECT_GUID, &id.braced())
    }

    /// Language project type: the last entry of `ProjectTypeGuids`, C# by default
    pub fn project_type_id(&mut self) -> ProjectResult<Identifier> {
        let Some(guids) = self.global_property(PROJECT_TYPE_GUIDS)? else {
            return Ok(CSHARP_PROJECT_TYPE);
        };
        match guids.split(';').map(str::trim).filter(|g| !g.is_empty()).last() {
            Some(last) => Ok(Identifier::parse(last)?),
            None => Ok(CSHARP_PROJECT_TYPE),
        }
    }

    // Global properties

    /// Properties of the first unconditioned property group, in file order
    pub fn global_properties(&mut self) -> ProjectResult<Vec<Property>> {
        let Some(root) = self.root()? else {
            return Ok(Vec::new());
        };
        Ok(find_group(root, &ConfigKey::global())
            .map(|group| group.elements().map(Property::from_element).collect())
            .unwrap_or_default())
    }

    pub fn global_property(&mut self, name: &str) -> ProjectResult<Option<String>> {
        Ok(self
            .global_properties()?
            .into_iter()
            .find(|p| p.name == name)
            .map(|p| p.text))
    }

    /// Set the first global property called `name`, creating it when missing
    pub fn set_global_property(&mut self, name: &str, value: &str) -> ProjectResult<()> {
        let file = self.path.clone().unwrap_or_default();
        let root = self.root_mut()?;
        let index = global_group_index(root);
        let group = root
            .element_at_mut(index)
            .ok_or_else(|| lost_group(file, PROPERTY_GROUP))?;
        set_property(group, name, value);
        Ok(())
    }

    pub fn remove_global_property(&mut self, name: &str) -> ProjectResult<bool> {
        let global = ConfigKey::global();
        if self.root()?.and_then(|root| find_group(root, &global)).is_none() {
            return Ok(false);
        }
        self.remove_config_property(&global.name, name)
    }

    // Configurations

    /// `Global` followed by every distinct configuration key, in file order
    pub fn configurations(&mut self) -> ProjectResult<Vec<Configuration>> {
        let mut configurations = vec![Configuration::from(&ConfigKey::global())];
        let Some(root) = self.root()? else {
            return Ok(configurations);
        };

        for group in root.elements().filter(|e| e.local_name() == PROPERTY_GROUP) {
            if let Some(key) = group.attribute(CONDITION).and_then(parse_condition) {
                let configuration = Configuration::from(&key);
                if !configurations.contains(&configuration) {
                    configurations.push(configuration);
                }
            }
        }
        Ok(configurations)
    }

    /// Properties of the group matching `config` (`Debug`, `Release|x86`, `Global`)
    pub fn config_properties(&mut self, config: &str) -> ProjectResult<Vec<Property>> {
        let request = ConfigKey::from_request(config);
        let group = self
            .root()?
            .and_then(|root| find_group(root, &request))
            .ok_or_else(|| ProjectError::ConfigurationNotFound {
                name: config.to_string(),
            })?;
        Ok(group.elements().map(Property::from_element).collect())
    }

    /// Text of `property` in configuration `config`; `None` when not set
    pub fn config_property(&mut self, config: &str, property: &str) -> ProjectResult<Option<String>> {
        Ok(self
            .config_properties(config)?
            .into_iter()
            .find(|p| p.name == property)
            .map(|p| p.text))
    }

    /// Change an existing property node or append a new one
    pub fn set_config_property(&mut self, config: &str, property: &str, value: &str) -> ProjectResult<()> {
        let request = ConfigKey::from_request(config);
        if request.is_global() {
            return self.set_global_property(property, value);
        }
        let group = self.group_mut(config, &request)?;
        set_property(group, property, value);
        Ok(())
    }

    /// Remove the first `property` node of `config`; false if it was not there
    pub fn remove_config_property(&mut self, config: &str, property: &str) -> ProjectResult<bool> {
        let request = ConfigKey::from_request(config);
        let group = self.group_mut(config, &request)?;
        Ok(group.remove_element(|e| e.local_name() == property).is_some())
    }

    // References

    pub fn references(&mut self) -> ProjectResult<Vec<Reference>> {
        Ok(self.items(REFERENCE)?.into_iter().map(Reference::from_element).collect())
    }

    /// `<Reference Include="name" />`
    pub fn add_gac_reference(&mut self, name: &str) -> ProjectResult<()> {
        let group = self.item_group_mut(REFERENCE)?;
        let indent = group.child_indent();
        group.append_element(item_element(REFERENCE, name, &[], &indent));
        debug!("Added GAC reference {}", name);
        Ok(())
    }

    /// A reference with a hint path; `full_name` becomes the `Include`
    pub fn add_dll(&mut self, full_name: &str, hint_path: &str) -> ProjectResult<()> {
        let hint_path = paths::normalize(hint_path);
        let group = self.item_group_mut(REFERENCE)?;
        let indent = group.child_indent();
        let metadata = [(SPECIFIC_VERSION, "False"), (HINT_PATH, hint_path.as_str())];
        group.append_element(item_element(REFERENCE, full_name, &metadata, &indent));
        debug!("Added file reference {} ({})", full_name, hint_path);
        Ok(())
    }

    /// Remove the first reference whose simple name is `name`
    pub fn remove_reference(&mut self, name: &str) -> ProjectResult<bool> {
        self.remove_item(REFERENCE, |e| {
            simple_name(e.attribute(INCLUDE).unwrap_or_default()) == name
        })
    }

    pub fn project_references(&mut self) -> ProjectResult<Vec<ProjectReference>> {
        Ok(self
            .items(PROJECT_REFERENCE)?
            .into_iter()
            .map(ProjectReference::from_element)
            .collect())
    }

    pub fn add_project_reference(&mut self, name: &str, project_file: &str, project_id: Identifier) -> ProjectResult<()> {
        let project_file = paths::normalize(project_file);
        let braced = project_id.braced();
        let group = self.item_group_mut(PROJECT_REFERENCE)?;
        let indent = group.child_indent();
        let metadata = [("Project", braced.as_str()), ("Name", name)];
        group.append_element(item_element(PROJECT_REFERENCE, &project_file, &metadata, &indent));
        debug!("Added project reference {} ({})", name, project_file);
        Ok(())
    }

    /// Remove a project reference by its name or by its (normalized) path
    pub fn remove_project_reference(&mut self, name_or_path: &str) -> ProjectResult<bool> {
        let path = paths::normalize(name_or_path);
        self.remove_item(PROJECT_REFERENCE, |e| {
            let reference = ProjectReference::from_element(e);
            reference.name == name_or_path || reference.project_file.eq_ignore_ascii_case(&path)
        })
    }

    // Compile items

    pub fn compile_paths(&mut self) -> ProjectResult<Vec<CompileItem>> {
        Ok(self
            .items(COMPILE)?
            .into_iter()
            .map(|e| CompileItem {
                include: e.attribute(INCLUDE).unwrap_or_default().to_string(),
            })
            .collect())
    }

    pub fn add_compile(&mut self, include: &str) -> ProjectResult<()> {
        let include = paths::normalize(include);
        let group = self.item_group_mut(COMPILE)?;
        let indent = group.child_indent();
        group.append_element(item_element(COMPILE, &include, &[], &indent));
        Ok(())
    }

    /// Remove the compile item whose normalized include equals `include`
    pub fn remove_compile(&mut self, include: &str) -> ProjectResult<bool> {
        let include = paths::normalize(include);
        self.remove_item(COMPILE, |e| {
            paths::normalize(e.attribute(INCLUDE).unwrap_or_default()) == include
        })
    }

    // Internals

    fn model(&mut self) -> ProjectResult<&mut ProjectModel> {
        if !self.is_parsed() {
            self.parse()?;
        }
        match &mut self.state {
            ParseState::Parsed(model) => Ok(model),
            ParseState::Unparsed => Err(ProjectError::NotFound {
                path: self.path.clone().unwrap_or_default(),
            }),
        }
    }

    fn root(&mut self) -> ProjectResult<Option<&XmlElement>> {
        let file = self.path.clone().unwrap_or_default();
        match &self.model()?.document {
            Some(document) => document.root().map(Some).ok_or_else(|| ProjectError::Xml {
                file,
                message: "Document has no root element".to_string(),
            }),
            None => Ok(None),
        }
    }

    /// The document, materializing a skeleton for projects that have none yet
    fn document_mut(&mut self) -> ProjectResult<&mut XmlDocument> {
        let name = self
            .path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned());
        let model = self.model()?;
        let generated_id = &mut model.generated_id;
        Ok(model.document.get_or_insert_with(|| {
            let id = *generated_id.get_or_insert_with(Identifier::generate);
            debug!("Starting new project document {}", id);
            skeleton(id, name.as_deref())
        }))
    }

    fn root_mut(&mut self) -> ProjectResult<&mut XmlElement> {
        let file = self.path.clone().unwrap_or_default();
        self.document_mut()?.root_mut().ok_or_else(|| ProjectError::Xml {
            file,
            message: "Document has no root element".to_string(),
        })
    }

    fn group_mut(&mut self, config: &str, request: &ConfigKey) -> ProjectResult<&mut XmlElement> {
        if self.root()?.is_none() {
            return Err(ProjectError::ConfigurationNotFound {
                name: config.to_string(),
            });
        }
        let root = self.root_mut()?;
        let index = root
            .position_of(|e| group_matches(e, request))
            .ok_or_else(|| ProjectError::ConfigurationNotFound {
                name: config.to_string(),
            })?;
        root.element_at_mut(index)
            .ok_or_else(|| ProjectError::ConfigurationNotFound {
                name: config.to_string(),
            })
    }

    /// Every `<item_name>` element across all item groups
    fn items(&mut self, item_name: &str) -> ProjectResult<Vec<&XmlElement>> {
        let Some(root) = self.root()? else {
            return Ok(Vec::new());
        };
        Ok(root
            .elements()
            .filter(|e| e.local_name() == ITEM_GROUP)
            .flat_map(|group| group.elements().filter(|e| e.local_name() == item_name))
            .collect())
    }

    /// The item group already holding `item_name` items, or a new one
    fn item_group_mut(&mut self, item_name: &str) -> ProjectResult<&mut XmlElement> {
        let file = self.path.clone().unwrap_or_default();
        let root = self.root_mut()?;
        let existing = root.position_of(|e| e.local_name() == ITEM_GROUP && e.child(item_name).is_some());
        let index = match existing {
            Some(index) => index,
            None => {
                let anchor = root.children().iter().rposition(|node| {
                    matches!(node, XmlNode::Element(e)
                        if e.local_name() == ITEM_GROUP || e.local_name() == PROPERTY_GROUP)
                });
                let closing = element_indent(root, anchor);
                let group = XmlElement::new_block(ITEM_GROUP, &closing);
                match anchor {
                    Some(anchor) => root.insert_element_after(anchor, group),
                    None => root.append_element(group),
                }
            }
        };
        root.element_at_mut(index)
            .ok_or_else(|| lost_group(file, ITEM_GROUP))
    }

    fn remove_item(&mut self, item_name: &str, predicate: impl Fn(&XmlElement) -> bool) -> ProjectResult<bool> {
        if self.root()?.is_none() {
            return Ok(false);
        }
        let root = self.root_mut()?;
        for group in root.elements_mut().filter(|e| e.local_name() == ITEM_GROUP) {
            if group
                .remove_element(|e| e.local_name() == item_name && predicate(e))
                .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn group_matches(element: &XmlElement, request: &ConfigKey) -> bool {
    if element.local_name() != PROPERTY_GROUP {
        return false;
    }
    match element.attribute(CONDITION) {
        None => request.is_global(),
        Some(condition) => parse_condition(condition).is_some_and(|key| key.matches(request)),
    }
}

fn find_group<'a>(root: &'a XmlElement, request: &ConfigKey) -> Option<&'a XmlElement> {
    root.elements().find(|e| group_matches(e, request))
}

/// Node index of the unconditioned property group, created in front of everything else when missing
fn global_group_index(root: &mut XmlElement) -> usize {
    let request = ConfigKey::global();
    if let Some(index) = root.position_of(|e| group_matches(e, &request)) {
        return index;
    }
    let first = root
        .children()
        .iter()
        .position(|node| matches!(node, XmlNode::Element(_)));
    let closing = element_indent(root, first);
    let group = XmlElement::new_block(PROPERTY_GROUP, &closing);
    match first {
        Some(first) => root.insert_element_before(first, group),
        None => root.append_element(group),
    }
}

fn lost_group(file: PathBuf, group: &str) -> ProjectError {
    ProjectError::Xml {
        file,
        message: format!("Lost {} while editing", group),
    }
}

fn set_property(group: &mut XmlElement, name: &str, value: &str) {
    match group.child_mut(name) {
        Some(property) => property.set_text(value),
        None => {
            group.append_element(XmlElement::with_text(name, value));
        }
    }
}

/// Whitespace in front of the child element at `index` (or of a new child)
fn element_indent(parent: &XmlElement, index: Option<usize>) -> String {
    if let Some(index) = index {
        if let Some(XmlNode::Text(raw)) = index.checked_sub(1).and_then(|i| parent.children().get(i)) {
            if raw.chars().all(char::is_whitespace) {
                return raw.clone();
            }
        }
    }
    parent.child_indent()
}

/// An item element; with metadata it spans several lines indented below `indent`
fn item_element(name: &str, include: &str, metadata: &[(&str, &str)], indent: &str) -> XmlElement {
    let mut element = if metadata.is_empty() {
        XmlElement::new(name)
    } else {
        XmlElement::new_block(name, indent)
    };
    element.set_attribute(INCLUDE, include);
    for (key, value) in metadata {
        element.append_element(XmlElement::with_text(*key, value));
    }
    element
}

/// Minimal project written for descriptors that do not exist yet
fn skeleton(id: Identifier, name: Option<&str>) -> XmlDocument {
    let mut root = XmlElement::new_block("Project", "\n");
    root.set_attribute("ToolsVersion", "4.0");
    root.set_attribute("DefaultTargets", "Build");
    root.set_attribute("xmlns", MSBUILD_NAMESPACE);

    let mut globals = XmlElement::new_block(PROPERTY_GROUP, "\n  ");
    globals.append_element(XmlElement::with_text(PROJECT_GUID, &id.braced()));
    if let Some(name) = name {
        globals.append_element(XmlElement::with_text("RootNamespace", name));
        globals.append_element(XmlElement::with_text(ASSEMBLY_NAME, name));
    }
    root.append_element(globals);

    let mut import = XmlElement::new("Import");
    import.set_attribute("Project", "$(MSBuildToolsPath)\\Microsoft.CSharp.targets");
    root.append_element(import);

    XmlDocument::with_root(Some(r#"xml version="1.0" encoding="utf-8""#), root)
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
