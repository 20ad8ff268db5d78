//! Locating the catalogs of a language.
//!
//! Catalogs live at `<locale dir>/<locale>/LC_MESSAGES/<domain>.po`, where the
//! locale directory is either a configured project path or an app's `locale/`.

use anyhow::{Result, anyhow};
use log::debug;
use std::path::{Path, PathBuf};

use crate::app_config::CatalogConfig;
use crate::file_utils::FileManager;
use crate::language_utils::to_locale;

/// Where a catalog was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLocation {
    /// The `.po` file
    pub path: PathBuf,
    /// Directory holding the `locale/` tree, searched for app context
    pub base_dir: PathBuf,
    /// App name when found under an app directory
    pub app: Option<String>,
}

/// Locale directories to search, with their base directory and app name
fn locale_dirs(config: &CatalogConfig, apps: &[String]) -> Result<Vec<(PathBuf, PathBuf, Option<String>)>> {
    let mut dirs = Vec::new();

    if apps.is_empty() {
        for locale_path in &config.locale_paths {
            let base = locale_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            dirs.push((locale_path.clone(), base, None));
        }
    }

    for name in apps {
        if !config.apps.iter().any(|a| a.name.eq_ignore_ascii_case(name)) {
            let available: Vec<&str> = config.apps.iter().map(|a| a.name.as_str()).collect();
            return Err(anyhow!(
                "Unknown app '{}'. Configured apps: {}",
                name,
                if available.is_empty() { "(none)".to_string() } else { available.join(", ") }
            ));
        }
    }

    for app in &config.apps {
        if !apps.is_empty() && !apps.iter().any(|n| n.eq_ignore_ascii_case(&app.name)) {
            continue;
        }
        dirs.push((app.path.join("locale"), app.path.clone(), Some(app.name.clone())));
    }

    Ok(dirs)
}

/// Find the catalogs of `language`, optionally restricted to `apps`.
///
/// Finding none is an error listing every location checked.
pub fn find_catalogs(config: &CatalogConfig, language: &str, apps: &[String]) -> Result<Vec<CatalogLocation>> {
    let locale = to_locale(language);
    let mut checked = Vec::new();
    let mut found: Vec<CatalogLocation> = Vec::new();

    for (dir, base_dir, app) in locale_dirs(config, apps)? {
        for domain in &config.domains {
            let path = dir.join(&locale).join("LC_MESSAGES").join(format!("{}.po", domain));
            if FileManager::file_exists(&path) && !found.iter().any(|l| l.path == path) {
                debug!("Found catalog: {}", path.display());
                found.push(CatalogLocation {
                    path: path.clone(),
                    base_dir: base_dir.clone(),
                    app: app.clone(),
                });
            }
            checked.push(path);
        }
    }

    if found.is_empty() {
        let listed: Vec<String> = checked.iter().map(|p| format!("  - {}", p.display())).collect();
        return Err(anyhow!(
            "No translation files found for language '{}' (locale '{}'). Checked:\n{}",
            language,
            locale,
            listed.join("\n")
        ));
    }

    Ok(found)
}

/// Every catalog of a configured domain, any language
pub fn all_catalog_paths(config: &CatalogConfig) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for (dir, _, _) in locale_dirs(config, &[])? {
        for path in FileManager::find_files(&dir, "po")? {
            let in_domain = path
                .file_stem()
                .map(|stem| config.domains.iter().any(|d| stem.to_string_lossy() == d.as_str()))
                .unwrap_or(false);
            if in_domain && !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    Ok(paths)
}
