//! End-to-end scaffolding into a temporary project.

use std::collections::BTreeMap;
use std::fs;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use waymark_core::{reconcile, MigrationId, Settings, Status};
use waymark_scaffold::{create_migration, plan_id, IdPlan, ScaffoldError, TemplateEngine};

fn project() -> (TempDir, Settings) {
    let tmp = TempDir::new().expect("tempdir");
    let settings = Settings::from_parts(tmp.path(), "dev", BTreeMap::new());
    (tmp, settings)
}

#[test]
fn creates_readme_and_executable_script() {
    let (_tmp, settings) = project();
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let id = plan_id("add-orders", 1_700_000_000).unwrap().resolve(|_| false).unwrap();
    assert_eq!(id.as_str(), "1700000000-add-orders");

    let engine = TemplateEngine::new(None).unwrap();
    let created = create_migration(&settings, &engine, &id, now).expect("create");

    assert_eq!(created.dir, settings.migrations_dir().join("1700000000-add-orders"));
    assert_eq!(created.files.len(), 2);
    let readme = fs::read_to_string(created.dir.join("README.md")).unwrap();
    assert!(readme.starts_with("1700000000-add-orders\n"));
    assert!(readme.contains("2023-11-14T22:13:20Z"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(created.dir.join("migrate.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o775);
    }
}

#[test]
fn existing_directory_is_refused_and_left_alone() {
    let (_tmp, settings) = project();
    let id = MigrationId::from("1700000000-taken");
    let dir = settings.migration_dir(&id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("migrate.py"), "keep me").unwrap();

    let engine = TemplateEngine::new(None).unwrap();
    let err = create_migration(&settings, &engine, &id, Utc::now()).unwrap_err();
    assert!(matches!(err, ScaffoldError::AlreadyExists { .. }), "got: {err}");
    assert_eq!(fs::read_to_string(dir.join("migrate.py")).unwrap(), "keep me");
    assert!(!dir.join("README.md").exists());
}

#[test]
fn scaffolded_migration_reconciles_as_manual() {
    let (_tmp, settings) = project();
    let id = MigrationId::from("1700000000-manual");
    let engine = TemplateEngine::new(None).unwrap();
    create_migration(&settings, &engine, &id, Utc::now()).unwrap();

    let registry = settings.registry();
    let report = reconcile(&registry, "main").unwrap();
    assert_eq!(report.inserted, vec![id.clone()]);
    assert_eq!(registry.get_status(&id), Status::Manual);
}

#[test]
fn old_timestamp_requires_confirmation() {
    let plan = plan_id("1400000000-legacy", 1_700_000_000).unwrap();
    assert!(matches!(plan, IdPlan::NeedsConfirmation { timestamp: 1_400_000_000, .. }));
    let err = plan.resolve(|_| false).unwrap_err();
    assert!(matches!(err, ScaffoldError::Unconfirmed { .. }));
}

#[test]
fn configured_template_dir_is_used() {
    let (tmp, _) = project();
    let templates = tmp.path().join("tpl");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("readme.md.tera"), "custom {{ migration_id }}\n").unwrap();

    let mut vars = BTreeMap::new();
    vars.insert("TEMPLATES_DIR".to_string(), "tpl".to_string());
    let settings = Settings::from_parts(tmp.path(), "dev", vars);

    let engine = TemplateEngine::new(settings.templates_dir().as_deref()).unwrap();
    let id = MigrationId::from("1700000000-custom");
    let created = create_migration(&settings, &engine, &id, Utc::now()).unwrap();
    let readme = fs::read_to_string(created.dir.join("README.md")).unwrap();
    assert!(readme.starts_with("custom 1700000000-custom"));
}
