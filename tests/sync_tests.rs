//! Integration tests for moving definitions between the canonical store and projects
//!
//! Tests the full workflow: init, merge, sync, clean

// Allow expect/unwrap in tests for brevity
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{definition, TestContext};
use fs_err as fs;
use vibe::VibeError;

#[test]
fn test_init_populates_empty_store_and_registers_project() {
    let ctx = TestContext::new();
    let (init, clones) = ctx.initializer(&["architect.mdc", "nested/reviewer.mdc", "README.md"]);
    let project = ctx.project("web-app");

    let report = init.init_in(&project).expect("init should succeed");

    assert!(report.setup_ran);
    assert!(report.registered);
    assert_eq!(clones.get(), 1);
    assert_eq!(report.copied.added.len(), 2);
    assert!(ctx.project_rules(&project).join("architect.mdc").is_file());
    assert!(ctx.project_rules(&project).join("nested/reviewer.mdc").is_file());
    assert!(!ctx.project_rules(&project).join("README.md").exists());

    let gitignore = fs::read_to_string(project.join(".gitignore")).unwrap();
    assert_eq!(gitignore.matches(".cursor\n").count(), 1);
}

#[test]
fn test_init_with_populated_store_skips_setup() {
    let ctx = TestContext::new();
    ctx.create_store_definition("planner.mdc", &definition("Planner", "Plans work"));
    let (init, clones) = ctx.initializer(&[]);
    let project = ctx.project("api");

    let report = init.init_in(&project).unwrap();

    assert!(!report.setup_ran);
    assert_eq!(clones.get(), 0);
    assert_eq!(
        ctx.read_project_definition(&project, "planner.mdc"),
        definition("Planner", "Plans work")
    );
}

#[test]
fn test_init_twice_registers_once() {
    let ctx = TestContext::new();
    ctx.create_store_definition("planner.mdc", &definition("Planner", "Plans work"));
    let (init, _) = ctx.initializer(&[]);
    let project = ctx.project("api");

    init.init_in(&project).unwrap();
    let saves = init.registry().save_count();
    let again = init.init_in(&project).unwrap();

    assert!(!again.registered);
    assert_eq!(again.copied.unchanged.len(), 1);
    assert_eq!(init.registry().len(), 1);
    assert_eq!(init.registry().save_count(), saves);

    let gitignore = fs::read_to_string(project.join(".gitignore")).unwrap();
    assert_eq!(gitignore.matches(".cursor\n").count(), 1);
}

#[test]
fn test_init_fails_when_setup_fails() {
    let ctx = TestContext::new();
    let init = ctx.offline_initializer();
    let project = ctx.project("api");

    match init.init_in(&project) {
        Err(VibeError::Operation { op, source, .. }) => {
            assert_eq!(op, "setup");
            assert!(source.to_string().contains("could not resolve host"));
        }
        other => unreachable!("Expected setup failure, got: {other:?}"),
    }
    assert!(init.registry().is_empty());
}

#[test]
fn test_sync_is_idempotent() {
    let ctx = TestContext::new();
    ctx.create_store_definition("planner.mdc", &definition("Planner", "Plans work"));
    ctx.create_store_definition("coder.mdc", &definition("Coder", "Writes code"));
    let (init, _) = ctx.initializer(&[]);
    let project = ctx.project("api");

    let first = init.sync_into(&project).unwrap();
    assert_eq!(first.added.len(), 2);

    let second = init.sync_into(&project).unwrap();
    assert_eq!(second.written(), 0);
    assert_eq!(second.unchanged.len(), 2);

    // sync never registers
    assert!(init.registry().is_empty());
}

#[test]
fn test_sync_overwrites_local_edits() {
    let ctx = TestContext::new();
    ctx.create_store_definition("planner.mdc", &definition("Planner", "Plans work"));
    let (init, _) = ctx.initializer(&[]);
    let project = ctx.project("api");
    ctx.create_project_definition(&project, "planner.mdc", "# Local edit\n");
    ctx.create_project_definition(&project, "local-only.mdc", "# Mine\n");

    let report = init.sync_into(&project).unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(
        ctx.read_project_definition(&project, "planner.mdc"),
        definition("Planner", "Plans work")
    );
    // files the store does not have are left alone
    assert!(ctx.project_rules(&project).join("local-only.mdc").is_file());
}

#[test]
fn test_merge_fans_out_and_collects_failures() {
    let ctx = TestContext::new();
    ctx.create_store_definition("planner.mdc", &definition("Planner", "Plans work"));
    let (init, _) = ctx.initializer(&[]);

    let first = ctx.project("first");
    let second = ctx.project("second");
    let doomed = ctx.project("doomed");
    for project in [&first, &second, &doomed] {
        init.init_in(project).unwrap();
    }
    fs::remove_dir_all(&doomed).unwrap();

    ctx.create_project_definition(&first, "planner.mdc", &definition("Planner", "Plans better"));
    ctx.create_project_definition(&first, "tester.mdc", &definition("Tester", "Breaks things"));

    let report = init.merge_from(&first).expect("merge should succeed");

    assert_eq!(report.merged.added.len(), 1);
    assert_eq!(report.merged.updated.len(), 1);
    assert_eq!(report.succeeded, vec![second.clone()]);
    assert!(report.has_errors());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, doomed);
    assert!(report.failed[0].1.is_not_found());

    assert_eq!(
        fs::read_to_string(ctx.store().join("planner.mdc")).unwrap(),
        definition("Planner", "Plans better")
    );
    assert_eq!(
        ctx.read_project_definition(&second, "tester.mdc"),
        definition("Tester", "Breaks things")
    );
}

#[test]
fn test_merge_without_local_rules_fails() {
    let ctx = TestContext::new();
    let (init, _) = ctx.initializer(&[]);
    let project = ctx.project("bare");

    match init.merge_from(&project) {
        Err(VibeError::Operation { op, source, .. }) => {
            assert_eq!(op, "merge");
            assert!(source.is_not_found());
        }
        other => unreachable!("Expected merge failure, got: {other:?}"),
    }
}

#[test]
fn test_clean_forgets_deleted_projects() {
    let ctx = TestContext::new();
    ctx.create_store_definition("planner.mdc", &definition("Planner", "Plans work"));
    let (init, _) = ctx.initializer(&[]);

    let kept = ctx.project("kept");
    let gone = ctx.project("gone");
    init.init_in(&kept).unwrap();
    init.init_in(&gone).unwrap();
    fs::remove_dir_all(&gone).unwrap();

    assert_eq!(init.clean_projects().unwrap(), 1);
    assert_eq!(init.registry().len(), 1);

    // the registry file reflects the cleanup for the next run
    let (reloaded, _) = ctx.initializer(&[]);
    assert_eq!(reloaded.registry().len(), 1);
    assert_eq!(reloaded.clean_projects().unwrap(), 0);
}
