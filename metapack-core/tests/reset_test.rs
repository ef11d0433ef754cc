mod common;

use std::fs;
use std::path::Path;

use common::FakeRunner;
use metapack_core::graph::ProjectRoot;
use metapack_core::reset::{unlink_namespace, ResetOptions, ResetPlan, WorkspaceReset};
use metapack_core::Error;
use tempfile::TempDir;

fn roots() -> Vec<ProjectRoot> {
    vec![
        ProjectRoot::new("packages/cli"),
        ProjectRoot::new("extensions/cut"),
    ]
}

fn populate(ws: &Path) {
    for dir in ["packages/cli", "extensions/cut", "."] {
        let modules = ws.join(dir).join("node_modules/lodash");
        fs::create_dir_all(&modules).unwrap();
        fs::write(modules.join("index.js"), "module.exports = {};").unwrap();
    }
}

#[test]
fn test_plan_installs_each_project_then_workspace() {
    let ws = Path::new("/ws");
    let plan = ResetPlan::new(ws, &roots(), ResetOptions::default());

    assert_eq!(
        plan.removals,
        vec![
            ws.join("packages/cli/node_modules"),
            ws.join("extensions/cut/node_modules"),
            ws.join("node_modules"),
        ]
    );
    let cwds: Vec<_> = plan.installs.iter().map(|c| c.cwd.clone().unwrap()).collect();
    assert_eq!(
        cwds,
        vec![ws.join("packages/cli"), ws.join("extensions/cut"), ws.to_path_buf()]
    );
    assert!(plan
        .installs
        .iter()
        .all(|c| c.to_string() == "npm i --no-workspaces"));
}

#[test]
fn test_metapackage_plan_installs_once() {
    let ws = Path::new("/ws");
    let plan = ResetPlan::new(
        ws,
        &roots(),
        ResetOptions {
            metapackage: true,
            ..Default::default()
        },
    );

    assert_eq!(plan.removals.len(), 3);
    assert_eq!(plan.installs.len(), 1);
    assert_eq!(plan.installs[0].to_string(), "npm i");
    assert_eq!(plan.installs[0].cwd.as_deref(), Some(ws));
}

#[test]
fn test_quick_plan_skips_removal() {
    let plan = ResetPlan::new(
        Path::new("/ws"),
        &roots(),
        ResetOptions {
            quick: true,
            ..Default::default()
        },
    );
    assert!(plan.removals.is_empty());
    assert_eq!(plan.installs.len(), 3);
}

#[test]
fn test_execute_removes_and_installs() {
    let temp_dir = TempDir::new().unwrap();
    let ws = temp_dir.path();
    populate(ws);
    // Already reset projects are fine.
    fs::remove_dir_all(ws.join("extensions/cut/node_modules")).unwrap();

    let options = ResetOptions::default();
    let plan = ResetPlan::new(ws, &roots(), options);
    let runner = FakeRunner::new();
    let mut steps = Vec::new();
    WorkspaceReset::new(&runner, options)
        .execute(&plan, |step| steps.push(step.to_string()))
        .unwrap();

    assert!(!ws.join("packages/cli/node_modules").exists());
    assert!(!ws.join("node_modules").exists());
    assert!(ws.join("packages/cli").exists());
    assert_eq!(runner.calls().len(), 3);
    assert_eq!(steps.len(), 6);
}

#[test]
fn test_dry_run_touches_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let ws = temp_dir.path();
    populate(ws);

    let options = ResetOptions {
        dry_run: true,
        ..Default::default()
    };
    let plan = ResetPlan::new(ws, &roots(), options);
    let runner = FakeRunner::new();
    WorkspaceReset::new(&runner, options)
        .execute(&plan, |_| {})
        .unwrap();

    assert!(ws.join("packages/cli/node_modules/lodash/index.js").exists());
    assert!(ws.join("node_modules").exists());
    assert!(runner.calls().is_empty());
}

#[test]
fn test_failed_install_aborts() {
    let temp_dir = TempDir::new().unwrap();
    let ws = temp_dir.path();
    fs::create_dir_all(ws.join("packages/cli")).unwrap();
    fs::create_dir_all(ws.join("extensions/cut")).unwrap();

    let options = ResetOptions {
        quick: true,
        ..Default::default()
    };
    let plan = ResetPlan::new(ws, &roots(), options);
    let runner = FakeRunner::new().failing_on("npm");
    let result = WorkspaceReset::new(&runner, options).execute(&plan, |_| {});

    assert!(matches!(result, Err(Error::CommandFailed { .. })));
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_unlink_namespace_removes_scope_only() {
    let temp_dir = TempDir::new().unwrap();
    let ws = temp_dir.path();
    let scope = ws.join("packages/cli/node_modules/@diplodoc/transform");
    fs::create_dir_all(&scope).unwrap();
    fs::create_dir_all(ws.join("packages/cli/node_modules/lodash")).unwrap();

    unlink_namespace(ws, &roots(), "@diplodoc").unwrap();

    assert!(!ws.join("packages/cli/node_modules/@diplodoc").exists());
    assert!(ws.join("packages/cli/node_modules/lodash").exists());
}
