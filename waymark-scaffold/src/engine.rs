//! Tera rendering engine: embedded scaffold templates plus user overrides.
//!
//! | File         | Template             | Mode  |
//! |--------------|----------------------|-------|
//! | `README.md`  | `readme.md.tera`     | 0o664 |
//! | `migrate.sh` | `migrate.sh.tera`    | 0o775 |
//!
//! A project can override either template by dropping a file with the same
//! name into the directory named by `TEMPLATES_DIR` in `waymark.conf`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::ScaffoldContext;
use crate::error::{io_err, ScaffoldError};

const TPLS: &[(&str, &str)] = &[
    ("readme.md.tera", include_str!("templates/readme.md.tera")),
    ("migrate.sh.tera", include_str!("templates/migrate.sh.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, ScaffoldError> {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "no user template directory");
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let name = normalize_template_name(Path::new(file_name));
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        tracing::debug!(template = %name, "user template override");
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, ScaffoldError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| (name.to_string(), content.to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ScaffoldFile
// ---------------------------------------------------------------------------

/// Files written into a fresh migration directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaffoldFile {
    Readme,
    MigrateScript,
}

impl ScaffoldFile {
    pub fn all() -> &'static [ScaffoldFile] {
        &[ScaffoldFile::Readme, ScaffoldFile::MigrateScript]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            ScaffoldFile::Readme => "readme.md.tera",
            ScaffoldFile::MigrateScript => "migrate.sh.tera",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ScaffoldFile::Readme => "README.md",
            ScaffoldFile::MigrateScript => "migrate.sh",
        }
    }

    /// Unix permission bits applied after writing.
    pub fn mode(&self) -> u32 {
        match self {
            ScaffoldFile::Readme => 0o664,
            ScaffoldFile::MigrateScript => 0o775,
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Embedded templates, overridden by any `*.tera` in `user_template_dir`.
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, ScaffoldError> {
        Ok(TemplateEngine {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render every scaffold file. Paths are relative to `migration_dir`.
    pub fn render(
        &self,
        ctx: &ScaffoldContext,
        migration_dir: &Path,
    ) -> Result<Vec<(ScaffoldFile, PathBuf, String)>, ScaffoldError> {
        let tera_ctx = ctx.to_tera_context()?;
        ScaffoldFile::all()
            .iter()
            .map(|file| {
                let content = self.tera.render(file.template_name(), &tera_ctx)?;
                Ok((*file, migration_dir.join(file.file_name()), content))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use waymark_core::{MigrationId, Settings};

    fn ctx(id: &str) -> ScaffoldContext {
        let settings = Settings::from_parts("/srv/app", "dev", BTreeMap::new());
        ScaffoldContext::new(&MigrationId::from(id), &settings, Utc::now())
    }

    #[test]
    fn embedded_templates_render() {
        let engine = TemplateEngine::new(None).expect("embedded templates");
        let out = engine.render(&ctx("1700000000-seed"), Path::new("/m/1700000000-seed")).unwrap();
        assert_eq!(out.len(), 2);

        let (_, readme_path, readme) = &out[0];
        assert_eq!(readme_path, &PathBuf::from("/m/1700000000-seed/README.md"));
        assert!(readme.starts_with("1700000000-seed\n===============\n"));

        let (_, script_path, script) = &out[1];
        assert!(script_path.ends_with("migrate.sh"));
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("case $1 in"));
        assert!(script.contains("${1}"), "shell expansions must survive rendering");
    }

    #[test]
    fn user_template_overrides_embedded() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("migrate.sh.tera"), "#!/bin/sh\necho {{ migration_id }}\n").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let engine = TemplateEngine::new(Some(tmp.path())).unwrap();
        let out = engine.render(&ctx("1700000000-x"), Path::new("m")).unwrap();
        assert!(out[1].2.starts_with("#!/bin/sh\necho 1700000000-x"));
        assert!(out[0].2.contains("Sample README.md"));
    }

    #[test]
    fn missing_user_dir_falls_back_to_embedded() {
        let tmp = TempDir::new().unwrap();
        TemplateEngine::new(Some(&tmp.path().join("nope"))).expect("fallback");
    }

    #[test]
    fn broken_user_template_is_reported() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("readme.md.tera"), "{{ unclosed").unwrap();
        assert!(matches!(TemplateEngine::new(Some(tmp.path())), Err(ScaffoldError::Tera(_))));
    }

    #[test]
    fn no_crlf_in_rendered_output() {
        let engine = TemplateEngine::new(None).unwrap();
        for (file, _, content) in engine.render(&ctx("1700000000-lf"), Path::new("m")).unwrap() {
            assert!(!content.contains('\r'), "{file:?} contains CR");
        }
    }
}
