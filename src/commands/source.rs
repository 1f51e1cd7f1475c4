//! `source`, `source add`, `source rm`

use crate::context::EditContext;
use crate::paths;

use super::{CommandResult, NO_PROJECT_FOUND, Response, active_project};

pub fn list(ctx: &EditContext) -> CommandResult<Response> {
    let Some(mut project) = active_project(ctx)? else {
        return Ok(Response::failure(NO_PROJECT_FOUND));
    };

    let mut response = Response::new();
    for item in project.compile_paths()? {
        response.push(item.include);
    }
    if response.lines.is_empty() {
        response.push("This project has no source files");
    }
    Ok(response)
}

pub fn add<S: AsRef<str>>(ctx: &EditContext, includes: &[S]) -> CommandResult<Response> {
    let Some(mut project) = active_project(ctx)? else {
        return Ok(Response::failure(NO_PROJECT_FOUND));
    };
    if includes.is_empty() {
        return Ok(Response::failure("No source passed to add?"));
    }

    let project_name = project.name()?;
    let mut response = Response::new();
    let mut changed = false;
    for include in includes {
        let include = include.as_ref();
        let normalized = paths::normalize(include);
        let present = project
            .compile_paths()?
            .iter()
            .any(|item| paths::normalize(&item.include) == normalized);
        if present {
            response.push(format!("{} already added to {}", include, project_name));
        } else {
            project.add_compile(include)?;
            changed = true;
            response.push(format!("Added {} to {}", include, project_name));
        }
    }

    if changed {
        project.save()?;
    }
    Ok(response)
}

pub fn remove<S: AsRef<str>>(ctx: &EditContext, includes: &[S]) -> CommandResult<Response> {
    let Some(mut project) = active_project(ctx)? else {
        return Ok(Response::failure(NO_PROJECT_FOUND));
    };
    if includes.is_empty() {
        return Ok(Response::failure("No source passed to remove?"));
    }

    let project_name = project.name()?;
    let mut response = Response::new();
    let mut changed = false;
    for include in includes {
        let include = include.as_ref();
        if project.remove_compile(include)? {
            changed = true;
            response.push(format!("Removed {} from {}", include, project_name));
        } else {
            response.push(format!("{} not found in {}", include, project_name));
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
    use crate::msbuild::ProjectDescriptor;
    use tempfile::TempDir;

    fn workspace() -> (TempDir, EditContext) {
        let temp = TempDir::new().unwrap();
        let mut project = ProjectDescriptor::bind(temp.path().join("App.csproj"));
        project.save().unwrap();
        let ctx = EditContext::new(temp.path(), None, None);
        (temp, ctx)
    }

    #[test]
    fn test_add_and_list_source() {
        let (_temp, ctx) = workspace();
        assert_eq!(list(&ctx).unwrap().text(), "This project has no source files");

        let response = add(&ctx, &["Program.cs", "Properties/AssemblyInfo.cs"]).unwrap();
        assert_eq!(
            response.lines,
            ["Added Program.cs to App", "Added Properties/AssemblyInfo.cs to App"]
        );
        assert_eq!(list(&ctx).unwrap().lines, ["Program.cs", "Properties\\AssemblyInfo.cs"]);
    }

    #[test]
    fn test_add_existing_source_is_reported() {
        let (_temp, ctx) = workspace();
        add(&ctx, &["Properties\\AssemblyInfo.cs"]).unwrap();

        let response = add(&ctx, &["Properties/AssemblyInfo.cs"]).unwrap();
        assert_eq!(response.text(), "Properties/AssemblyInfo.cs already added to App");
        assert_eq!(list(&ctx).unwrap().lines.len(), 1);
    }

    #[test]
    fn test_remove_source() {
        let (_temp, ctx) = workspace();
        add(&ctx, &["Program.cs", "Other.cs"]).unwrap();

        let response = remove(&ctx, &["Program.cs", "Missing.cs"]).unwrap();
        assert_eq!(response.lines, ["Removed Program.cs from App", "Missing.cs not found in App"]);
        assert_eq!(list(&ctx).unwrap().lines, ["Other.cs"]);
    }

    #[test]
    fn test_missing_arguments_and_project() {
        let (_temp, ctx) = workspace();
        assert_eq!(add::<&str>(&ctx, &[]).unwrap().text(), "No source passed to add?");

        let empty = TempDir::new().unwrap();
        let ctx = EditContext::new(empty.path(), None, None);
        assert_eq!(list(&ctx).unwrap().text(), NO_PROJECT_FOUND);
    }
}
