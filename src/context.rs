/*!
 * Translation context files.
 *
 * Maintainers describe tone, audience and glossary in a `TRANSLATING.md`
 * next to the config file (project context) or next to an app's `locale/`
 * directory (app context). The effective context of a catalog is the project
 * context followed by its app context.
 */

use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the context file
pub const CONTEXT_FILE_NAME: &str = "TRANSLATING.md";

/// Heading inserted between project and app context
pub const APP_CONTEXT_HEADING: &str = "\n\n## App-Specific Context\n";

/// Read `dir/TRANSLATING.md`, trimmed; `None` when missing, unreadable or blank
pub fn read_context_file(dir: &Path) -> Option<String> {
    let path = dir.join(CONTEXT_FILE_NAME);
    if !path.is_file() {
        return None;
    }
    match fs::read_to_string(&path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
        }
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

/// Combine project and app context; either alone when the other is absent
pub fn combine_context(project: Option<&str>, app: Option<&str>) -> Option<String> {
    let project = project.map(str::trim).filter(|s| !s.is_empty());
    let app = app.map(str::trim).filter(|s| !s.is_empty());
    match (project, app) {
        (Some(p), Some(a)) => Some(format!("{}{}{}", p, APP_CONTEXT_HEADING, a)),
        (Some(p), None) => Some(p.to_string()),
        (None, Some(a)) => Some(a.to_string()),
        (None, None) => None,
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Resolves the effective context of catalogs, reading each file once
#[derive(Debug, Default)]
pub struct ContextResolver {
    project_dir: Option<PathBuf>,
    project: Option<String>,
    app_contexts: HashMap<PathBuf, Option<String>>,
}

impl ContextResolver {
    /// Look for the project context in `search_dirs`, first match wins
    pub fn new(search_dirs: &[PathBuf]) -> Self {
        for dir in search_dirs {
            if let Some(content) = read_context_file(dir) {
                info!("📋 Found {} in {}, using project context", CONTEXT_FILE_NAME, dir.display());
                return Self {
                    project_dir: Some(dir.clone()),
                    project: Some(content),
                    app_contexts: HashMap::new(),
                };
            }
        }
        Self::default()
    }

    /// Project context, if any
    pub fn project_context(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Effective context for a catalog whose `locale/` tree lives in `base_dir`
    pub fn context_for(&mut self, base_dir: &Path) -> Option<String> {
        let is_project_dir = self
            .project_dir
            .as_deref()
            .map(|dir| same_dir(dir, base_dir))
            .unwrap_or(false);
        if is_project_dir {
            return self.project.clone();
        }

        let app = self
            .app_contexts
            .entry(base_dir.to_path_buf())
            .or_insert_with(|| {
                let content = read_context_file(base_dir);
                if content.is_some() {
                    info!("📋 Found {} for {}", CONTEXT_FILE_NAME, base_dir.display());
                }
                content
            })
            .clone();
        combine_context(self.project.as_deref(), app.as_deref())
    }
}
