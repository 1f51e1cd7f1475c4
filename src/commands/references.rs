//! `references`, `references add`, `references rm`

use log::info;

use crate::assembly::IdentityProbe;
use crate::context::EditContext;
use crate::resolver::{ReferenceResolver, ResolvedReference};

use super::{CommandResult, NO_PROJECT_FOUND, Response, active_project};

pub fn list(ctx: &EditContext) -> CommandResult<Response> {
    let Some(mut project) = active_project(ctx)? else {
        return Ok(Response::failure(NO_PROJECT_FOUND));
    };

    let mut response = Response::new();
    for reference in project.references()? {
        match &reference.hint_path {
            Some(hint_path) => response.push(format!("{} ({})", reference.full_name, hint_path)),
            None => response.push(reference.full_name),
        }
    }
    for reference in project.project_references()? {
        response.push(format!("{} (project {})", reference.name, reference.project_file));
    }
    if response.lines.is_empty() {
        response.push("This project has no references");
    }
    Ok(response)
}

/// Add every token, reporting each, and save once at the end
pub fn add<S: AsRef<str>>(ctx: &EditContext, probe: &dyn IdentityProbe, tokens: &[S]) -> CommandResult<Response> {
    let Some(mut project) = active_project(ctx)? else {
        return Ok(Response::failure(NO_PROJECT_FOUND));
    };
    if tokens.is_empty() {
        return Ok(Response::failure("No references passed to add?"));
    }

    let project_name = project.name()?;
    let resolver = ReferenceResolver::new(&ctx.working_dir, probe);
    let mut response = Response::new();
    for outcome in resolver.add_all(&mut project, tokens) {
        match outcome.result {
            Ok(resolved) => {
                if resolved.warning().is_some() {
                    response.push(format!("Couldn't load assembly: {}.  Adding anyway.", outcome.token));
                }
                response.push(format!("Added reference {} to {}", resolved.display_name(), project_name));
                if let ResolvedReference::File { full_name, .. } = &resolved {
                    info!("Reference {} resolved to {}", outcome.token, full_name);
                }
            }
            Err(e) => {
                response.push(format!("Failed to add reference {}: {}", outcome.token, e));
                response.exit_code = 1;
            }
        }
    }

    project.save()?;
    Ok(response)
}

/// Remove file or GAC references by name, else project references by name or path
pub fn remove<S: AsRef<str>>(ctx: &EditContext, names: &[S]) -> CommandResult<Response> {
    let Some(mut project) = active_project(ctx)? else {
        return Ok(Response::failure(NO_PROJECT_FOUND));
    };
    if names.is_empty() {
        return Ok(Response::failure("No references passed to remove?"));
    }

    let project_name = project.name()?;
    let mut response = Response::new();
    let mut changed = false;
    for name in names {
        let name = name.as_ref();
        if project.remove_reference(name)? || project.remove_project_reference(name)? {
            changed = true;
            response.push(format!("Removed reference {} from {}", name, project_name));
        } else {
            response.push(format!("Reference {} not found in {}", name, project_name));
        }
    }

    if changed {
        project.save()?;
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{AssemblyIdentity, ProbeOutcome};
    use crate::msbuild::ProjectDescriptor;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct FakeProbe;

    impl IdentityProbe for FakeProbe {
        fn identity_of(&self, path: &Path) -> ProbeOutcome {
            if path.file_name().is_some_and(|name| name == "Foo.dll") {
                ProbeOutcome::Identified(AssemblyIdentity {
                    name: "Foo".to_string(),
                    version: "1.2.3.4567".to_string(),
                    culture: None,
                    public_key_token: None,
                })
            } else {
                ProbeOutcome::Unreadable("bad image".to_string())
            }
        }
    }

    fn workspace() -> (TempDir, EditContext) {
        let temp = TempDir::new().unwrap();
        let mut project = ProjectDescriptor::bind(temp.path().join("CoolProject.csproj"));
        project.save().unwrap();
        let ctx = EditContext::new(temp.path(), None, None);
        (temp, ctx)
    }

    #[test]
    fn test_add_reports_each_token() {
        let (temp, ctx) = workspace();
        fs::write(temp.path().join("Foo.dll"), b"MZ").unwrap();
        fs::write(temp.path().join("FakeAssembly.dll"), b"").unwrap();

        let response = add(&ctx, &FakeProbe, &["System.Xml", "Foo.dll", "FakeAssembly.dll"]).unwrap();
        assert_eq!(
            response.lines,
            [
                "Added reference System.Xml to CoolProject",
                "Added reference Foo to CoolProject",
                "Couldn't load assembly: FakeAssembly.dll.  Adding anyway.",
                "Added reference FakeAssembly.dll to CoolProject",
            ]
        );
        assert_eq!(response.exit_code, 0);

        let listed = list(&ctx).unwrap();
        assert_eq!(
            listed.lines,
            [
                "System.Xml",
                "Foo, Version=1.2.3.4567, Culture=neutral, PublicKeyToken=null (Foo.dll)",
                "FakeAssembly.dll (FakeAssembly.dll)",
            ]
        );
    }

    #[test]
    fn test_add_without_project() {
        let temp = TempDir::new().unwrap();
        let ctx = EditContext::new(temp.path(), None, None);
        let response = add(&ctx, &FakeProbe, &["System.Xml"]).unwrap();
        assert_eq!(response.text(), NO_PROJECT_FOUND);
        assert_eq!(response.exit_code, 1);
    }

    #[test]
    fn test_add_without_tokens() {
        let (_temp, ctx) = workspace();
        let response = add::<&str>(&ctx, &FakeProbe, &[]).unwrap();
        assert_eq!(response.text(), "No references passed to add?");
    }

    #[test]
    fn test_remove_gac_and_project_references() {
        let (temp, ctx) = workspace();
        let lib_dir = temp.path().join("Lib");
        let mut lib = ProjectDescriptor::bind(lib_dir.join("Lib.csproj"));
        lib.add_compile("Lib.cs").unwrap();
        lib.save().unwrap();

        add(&ctx, &FakeProbe, &["System.Xml", "Lib/Lib.csproj"]).unwrap();
        let listed = list(&ctx).unwrap();
        assert_eq!(listed.lines, ["System.Xml", "Lib (project Lib\\Lib.csproj)"]);

        let response = remove(&ctx, &["System.Xml", "Lib", "Missing"]).unwrap();
        assert_eq!(
            response.lines,
            [
                "Removed reference System.Xml from CoolProject",
                "Removed reference Lib from CoolProject",
                "Reference Missing not found in CoolProject",
            ]
        );
        assert_eq!(list(&ctx).unwrap().text(), "This project has no references");
    }

    #[test]
    fn test_explicit_project_outside_working_dir() {
        let temp = TempDir::new().unwrap();
        let project_path: PathBuf = temp.path().join("nested").join("App.csproj");
        let mut project = ProjectDescriptor::bind(&project_path);
        project.save().unwrap();

        let ctx = EditContext::new(temp.path(), Some(PathBuf::from("nested/App.csproj")), None);
        let response = add(&ctx, &FakeProbe, &["System"]).unwrap();
        assert_eq!(response.text(), "Added reference System to App");
    }
}
