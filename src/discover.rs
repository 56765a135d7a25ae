//! Module discovery: locate a module on the search paths and walk its
//! package tree in a stable order.
//!
//! Directories are only descended into when they are importable packages
//! (contain `__init__.py`) and are not private (`_` prefix). Private files
//! and `_version.py` are hidden. Paths are always built from an explicit
//! base; the working directory is never changed.

use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

static RE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// File stems that are never documented.
const HIDDEN: &[&str] = &["_version"];

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("module `{name}` not found on search paths {paths:?}")]
    ModuleNotFound { name: String, paths: Vec<PathBuf> },
    #[error("invalid walk pattern")]
    Pattern(#[from] glob::PatternError),
}

/// A module found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModule {
    /// Dotted name, e.g. `pkg.sub.mod`
    pub name: String,
    /// Source file
    pub file: PathBuf,
    /// `file` relative to the search path it was found on
    pub rel_path: PathBuf,
    /// False for packages (`__init__.py`), which render to `index.md`
    pub is_leaf: bool,
}

/// Find `module_name` on `search_paths` and list it and, for a package,
/// every public submodule beneath it.
pub fn discover(
    module_name: &str,
    search_paths: &[PathBuf],
) -> Result<Vec<DiscoveredModule>, DiscoverError> {
    let rel: PathBuf = module_name.split('.').collect();

    for base in search_paths {
        let dir = base.join(&rel);
        if dir.join("__init__.py").is_file() {
            return walk_package(base, &dir);
        }
        let file = dir.with_extension("py");
        if file.is_file() {
            return Ok(vec![DiscoveredModule {
                name: module_name.to_string(),
                rel_path: rel.with_extension("py"),
                file,
                is_leaf: true,
            }]);
        }
    }

    Err(DiscoverError::ModuleNotFound {
        name: module_name.to_string(),
        paths: search_paths.to_vec(),
    })
}

fn walk_package(base: &Path, package_dir: &Path) -> Result<Vec<DiscoveredModule>, DiscoverError> {
    let pattern = format!(
        "{}/**/*.py",
        glob::Pattern::escape(&package_dir.to_string_lossy())
    );
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("cannot read {}: {}", e.path().display(), e.error());
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    sort_module_files(&mut files);

    let mut skipped: BTreeSet<PathBuf> = BTreeSet::new();
    let mut modules = Vec::new();

    'files: for file in files {
        let Ok(rel_path) = file.strip_prefix(base).map(Path::to_path_buf) else {
            continue;
        };
        let package_depth = package_dir.strip_prefix(base).map_or(0, |p| p.components().count());

        // every directory below the package root must itself be a public package
        let mut dir = base.to_path_buf();
        let mut parts: Vec<String> = Vec::new();
        let dirs: Vec<_> = rel_path.parent().into_iter().flat_map(Path::components).collect();
        for (depth, component) in dirs.iter().enumerate() {
            let name = component.as_os_str().to_string_lossy().into_owned();
            dir.push(&name);
            let importable = RE_IDENTIFIER.is_match(&name) && dir.join("__init__.py").is_file();
            if depth >= package_depth && (name.starts_with('_') || !importable) {
                if skipped.insert(dir.clone()) {
                    info!("Skipping {} - not a module.", dir.display());
                }
                continue 'files;
            }
            parts.push(name);
        }

        let Some(stem) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let is_leaf = stem != "__init__";
        if is_leaf {
            if stem.starts_with('_') || HIDDEN.contains(&stem.as_str()) {
                continue;
            }
            if !RE_IDENTIFIER.is_match(&stem) {
                warn!("Skipping {} - not an importable name.", file.display());
                continue;
            }
            parts.push(stem);
        }

        modules.push(DiscoveredModule {
            name: parts.join("."),
            file,
            rel_path,
            is_leaf,
        });
    }
    Ok(modules)
}

/// Order by directory; within a directory `index`/`README` come first,
/// then named files alphabetically, then `__init__`.
pub fn sort_module_files(files: &mut [PathBuf]) {
    files.sort_by(|a, b| compare_module_files(a, b));
}

fn compare_module_files(a: &Path, b: &Path) -> Ordering {
    a.parent()
        .cmp(&b.parent())
        .then_with(|| file_rank(a).cmp(&file_rank(b)))
        .then_with(|| a.file_name().cmp(&b.file_name()))
}

fn file_rank(path: &Path) -> u8 {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some("index" | "README") => 0,
        Some("__init__") => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn init_sorts_after_named_files() {
        let mut files: Vec<PathBuf> = ["b.py", "a.py", "__init__.py"].iter().map(PathBuf::from).collect();
        sort_module_files(&mut files);
        assert_eq!(
            files,
            vec![PathBuf::from("a.py"), PathBuf::from("b.py"), PathBuf::from("__init__.py")]
        );
    }

    #[test]
    fn index_and_readme_sort_first() {
        let mut files: Vec<PathBuf> = ["d/z.py", "d/README.py", "d/a.py"].iter().map(PathBuf::from).collect();
        sort_module_files(&mut files);
        assert_eq!(files[0], PathBuf::from("d/README.py"));
    }

    #[test]
    fn walks_public_packages_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for f in [
            "pkg/__init__.py",
            "pkg/alpha.py",
            "pkg/_private.py",
            "pkg/_version.py",
            "pkg/sub/__init__.py",
            "pkg/sub/beta.py",
            "pkg/_internal/__init__.py",
            "pkg/_internal/gamma.py",
            "pkg/loose/delta.py",
        ] {
            touch(&root.join(f));
        }

        let found = discover("pkg", &[root.to_path_buf()]).unwrap();
        let names: Vec<(&str, bool)> = found.iter().map(|m| (m.name.as_str(), m.is_leaf)).collect();
        assert_eq!(
            names,
            vec![("pkg.alpha", true), ("pkg", false), ("pkg.sub.beta", true), ("pkg.sub", false)]
        );
        assert_eq!(found[2].rel_path, PathBuf::from("pkg/sub/beta.py"));
    }

    #[test]
    fn single_file_module() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("tool.py"));
        let found = discover("tool", &[tmp.path().to_path_buf()]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_leaf);
    }

    #[test]
    fn missing_module_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover("nope", &[tmp.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, DiscoverError::ModuleNotFound { .. }));
    }
}
