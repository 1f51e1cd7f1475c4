//! `solution` (alias `sln`): create, inspect and edit a solution

use log::info;

use crate::context::EditContext;
use crate::msbuild::ProjectDescriptor;
use crate::paths;
use crate::solution::{SolutionFile, SolutionProject};

use super::{CommandResult, Response, active_project};

/// Create the solution when it is missing, else describe it
pub fn create_or_show(ctx: &EditContext, name: Option<&str>) -> CommandResult<Response> {
    let path = ctx.solution_path(name);
    let mut solution = SolutionFile::open(&path)?;
    let display_name = solution.name().unwrap_or_default();

    if !solution.exists() {
        if let Some(mut project) = active_project(ctx)? {
            let entry = SolutionProject::for_descriptor(&mut project, solution_dir(&solution, ctx))?;
            solution.add_project(entry);
        }
        solution.save()?;
        info!("Created solution {:?}", path);
        return Ok(Response::message(format!("Created new solution: {}", display_name)));
    }

    let mut response = Response::new();
    if name.is_some() {
        response.push(format!("Project already exists: {}", display_name));
    }
    describe(&solution, &display_name, &mut response);
    Ok(response)
}

pub fn add(ctx: &EditContext, name: Option<&str>, project: &str) -> CommandResult<Response> {
    let project_path = ctx.resolve(project);
    if !project_path.is_file() {
        return Ok(Response::failure(format!("Project not found: {}", project)));
    }

    let mut solution = SolutionFile::open(ctx.solution_path(name))?;
    let mut descriptor = ProjectDescriptor::open(&project_path)?;
    let entry = SolutionProject::for_descriptor(&mut descriptor, solution_dir(&solution, ctx))?;
    let project_name = entry.name.clone();

    if !solution.add_project(entry) {
        return Ok(Response::message(format!("{} is already in Solution", project_name)));
    }
    solution.save()?;
    Ok(Response::message(format!("Added {} to Solution", project_name)))
}

/// Remove by project name, else by path relative to the working directory
pub fn remove(ctx: &EditContext, name: Option<&str>, project: &str) -> CommandResult<Response> {
    let path = ctx.solution_path(name);
    if !path.is_file() {
        return Ok(Response::failure(format!(
            "Solution not found: {}",
            paths::file_name(&path.to_string_lossy())
        )));
    }

    let mut solution = SolutionFile::open(&path)?;
    let relative = paths::relative_from(solution_dir(&solution, ctx), &ctx.resolve(project));
    let removed = solution
        .remove_project(project)
        .or_else(|| solution.remove_project(&relative));

    match removed {
        Some(removed) => {
            solution.save()?;
            Ok(Response::message(format!("Removed {} from Solution", removed.name)))
        }
        None => Ok(Response::failure(format!("{} is not in Solution", project))),
    }
}

fn solution_dir<'a>(solution: &'a SolutionFile, ctx: &'a EditContext) -> &'a std::path::Path {
    solution.directory().unwrap_or(&ctx.working_dir)
}

fn describe(solution: &SolutionFile, name: &str, response: &mut Response) {
    response.push(format!("Solution: {}", name));
    response.push(format!("Format Version: {}", solution.format_version));
    response.push(format!("Visual Studio: {}", solution.visual_studio_version));
    if solution.projects.is_empty() {
        response.push("No projects");
        return;
    }
    response.push("Projects:");
    for project in &solution.projects {
        response.push(format!("  {} ({})", project.name, project.path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn working_dir(temp: &TempDir) -> PathBuf {
        let dir = temp.path().join("tmp");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_creates_solution_named_after_directory() {
        let temp = TempDir::new().unwrap();
        let dir = working_dir(&temp);
        let ctx = EditContext::new(&dir, None, None);

        let response = create_or_show(&ctx, None).unwrap();
        assert_eq!(response.text(), "Created new solution: tmp");

        let solution = SolutionFile::open_existing(dir.join("tmp.sln")).unwrap();
        assert!(solution.projects.is_empty());
        assert_eq!(solution.format_version, "11.00");
    }

    #[test]
    fn test_created_solution_includes_active_project() {
        let temp = TempDir::new().unwrap();
        let dir = working_dir(&temp);
        let mut project = ProjectDescriptor::bind(dir.join("App").join("App.csproj"));
        project.save().unwrap();
        let ctx = EditContext::new(&dir, Some(PathBuf::from("App/App.csproj")), None);

        let response = create_or_show(&ctx, Some("WickedAwesome.sln")).unwrap();
        assert_eq!(response.text(), "Created new solution: WickedAwesome");

        let solution = SolutionFile::open_existing(dir.join("WickedAwesome.sln")).unwrap();
        assert_eq!(solution.projects.len(), 1);
        assert_eq!(solution.projects[0].name, "App");
        assert_eq!(solution.projects[0].path, "App\\App.csproj");
        assert_eq!(solution.projects[0].id, project.id().unwrap());
    }

    #[test]
    fn test_existing_solution_is_described() {
        let temp = TempDir::new().unwrap();
        let dir = working_dir(&temp);
        let ctx = EditContext::new(&dir, None, None);
        create_or_show(&ctx, Some("Foo")).unwrap();

        let response = create_or_show(&ctx, Some("Foo")).unwrap();
        assert_eq!(
            response.lines,
            [
                "Project already exists: Foo",
                "Solution: Foo",
                "Format Version: 11.00",
                "Visual Studio: 2010",
                "No projects",
            ]
        );
    }

    #[test]
    fn test_add_and_remove_projects() {
        let temp = TempDir::new().unwrap();
        let dir = working_dir(&temp);
        for name in ["App", "Lib"] {
            let mut project = ProjectDescriptor::bind(dir.join(name).join(format!("{}.csproj", name)));
            project.save().unwrap();
        }
        let ctx = EditContext::new(&dir, None, None);

        assert_eq!(add(&ctx, None, "App/App.csproj").unwrap().text(), "Added App to Solution");
        assert_eq!(add(&ctx, None, "Lib\\Lib.csproj").unwrap().text(), "Added Lib to Solution");
        assert_eq!(add(&ctx, None, "App/App.csproj").unwrap().text(), "App is already in Solution");

        let shown = create_or_show(&ctx, None).unwrap();
        assert_eq!(
            &shown.lines[3..],
            ["Projects:", "  App (App\\App.csproj)", "  Lib (Lib\\Lib.csproj)"]
        );

        assert_eq!(remove(&ctx, None, "App").unwrap().text(), "Removed App from Solution");
        assert_eq!(remove(&ctx, None, "Lib/Lib.csproj").unwrap().text(), "Removed Lib from Solution");
        let missing = remove(&ctx, None, "Lib").unwrap();
        assert_eq!(missing.text(), "Lib is not in Solution");
        assert_eq!(missing.exit_code, 1);
    }

    #[test]
    fn test_add_missing_project() {
        let temp = TempDir::new().unwrap();
        let ctx = EditContext::new(working_dir(&temp), None, None);
        let response = add(&ctx, None, "Nope.csproj").unwrap();
        assert_eq!(response.text(), "Project not found: Nope.csproj");
        assert_eq!(response.exit_code, 1);
    }
}
