//! Site integration: one virtual page per discovered module, rendered on
//! demand from the current source, plus nav anchor expansion and source
//! watching for live rebuilds.

use crate::anchor;
use crate::config::SiteConfig;
use crate::discover::DiscoveredModule;
use crate::parser;
use crate::render::module::{doc_path, render_module};
use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Something that can watch source files and trigger a rebuild.
pub trait WatchRegistry {
    fn watch(&mut self, path: &Path) -> Result<()>;
}

/// A page whose markdown is generated rather than read from the docs dir.
#[derive(Debug, Clone)]
pub struct VirtualPage {
    pub section: String,
    pub module: DiscoveredModule,
    pub source_repo: String,
    /// `<section>/<path of the module file>`, e.g. `api/pkg/sub/mod.py`
    pub src_path: PathBuf,
    pub url: String,
}

impl VirtualPage {
    fn new(section: &str, source_repo: &str, module: &DiscoveredModule) -> Self {
        let src_path = Path::new(section).join(&module.rel_path);
        Self {
            section: section.to_string(),
            module: module.clone(),
            source_repo: source_repo.to_string(),
            url: page_url(&src_path),
            src_path,
        }
    }

    /// Markdown path relative to the docs dir.
    pub fn dest_path(&self) -> PathBuf {
        doc_path(&self.module.name, Path::new(&self.section), self.module.is_leaf)
    }

    /// Re-read and render the module's page.
    pub fn render(&self) -> Result<String> {
        let module = parser::load(&self.module)?;
        render_module(&self.module.name, &module, &self.source_repo)
            .with_context(|| format!("cannot render {}", self.module.name))
    }
}

#[derive(Debug)]
pub struct Plugin {
    pages: Vec<VirtualPage>,
    nav: Option<Value>,
}

impl Plugin {
    /// Validate the plugin block, register a page per module and splice
    /// each section's page tree into the nav at its `api-docs-<section>`
    /// anchor.
    pub fn on_config(site: &SiteConfig) -> Result<Self> {
        let targets = site.plugin()?.targets()?;
        let mut nav = site.nav.clone();
        let mut pages = Vec::new();

        for target in &targets {
            let section_pages: Vec<VirtualPage> = target
                .modules
                .iter()
                .map(|m| VirtualPage::new(&target.section, &target.source_repo, m))
                .collect();

            if let Some(nav) = nav.as_mut() {
                let anchor = format!("api-docs-{}", target.section);
                let tree = nest_paths(section_pages.iter().map(VirtualPage::dest_path));
                if let Some(first) = tree.first() {
                    if replace_anchor(nav, &anchor, &first.to_yaml()) {
                        debug!(%anchor, "nav anchor replaced");
                    }
                }
            }
            pages.extend(section_pages);
        }

        Ok(Self { pages, nav })
    }

    pub fn pages(&self) -> &[VirtualPage] {
        &self.pages
    }

    /// The site nav with anchors expanded, if the site has one.
    pub fn nav(&self) -> Option<&Value> {
        self.nav.as_ref()
    }

    /// Fresh markdown for a page this plugin owns, `None` otherwise.
    pub fn on_page_read_source(&self, url: &str) -> Option<Result<String>> {
        self.pages.iter().find(|p| p.url == url).map(VirtualPage::render)
    }

    /// Register every page's source file for watching.
    pub fn on_serve(&self, registry: &mut dyn WatchRegistry) -> Result<()> {
        for page in &self.pages {
            registry.watch(&page.module.file)?;
        }
        Ok(())
    }

    /// Pages generated from `file`.
    pub fn pages_for_source<'a>(&'a self, file: &'a Path) -> impl Iterator<Item = &'a VirtualPage> {
        self.pages.iter().filter(move |p| p.module.file == file)
    }
}

/// Directory-style URL: `api/pkg/mod.py` -> `api/pkg/mod/`, and
/// `index`/`README`/`__init__` files map to their directory.
fn page_url(src_path: &Path) -> String {
    let dir: Vec<String> = src_path
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let stem = src_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut url = dir.join("/");
    if !matches!(stem.as_str(), "index" | "README" | "__init__") {
        if !url.is_empty() {
            url.push('/');
        }
        url.push_str(&stem);
    }
    url.push('/');
    url
}

// -- Navigation ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum NavNode {
    Page(String),
    Section(String, Vec<NavNode>),
}

impl NavNode {
    fn to_yaml(&self) -> Value {
        match self {
            NavNode::Page(path) => Value::String(path.clone()),
            NavNode::Section(title, children) => {
                let mut map = Mapping::new();
                map.insert(
                    Value::String(title.clone()),
                    Value::Sequence(children.iter().map(NavNode::to_yaml).collect()),
                );
                Value::Mapping(map)
            }
        }
    }
}

/// Group page paths into nested sections titled after their directories.
fn nest_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<NavNode> {
    let mut nested = Vec::new();
    for path in paths {
        let parts: Vec<String> = path
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .map(|c| anchor::dirname_to_title(&c.as_os_str().to_string_lossy()))
            .collect();
        let text = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        insert_node(&mut nested, &parts, text);
    }
    nested
}

fn insert_node(branch: &mut Vec<NavNode>, parts: &[String], path: String) {
    let Some((first, rest)) = parts.split_first() else {
        branch.push(NavNode::Page(path));
        return;
    };
    let idx = match branch
        .iter()
        .position(|n| matches!(n, NavNode::Section(title, _) if title == first))
    {
        Some(idx) => idx,
        None => {
            branch.push(NavNode::Section(first.clone(), Vec::new()));
            branch.len() - 1
        }
    };
    if let NavNode::Section(_, children) = &mut branch[idx] {
        insert_node(children, rest, path);
    }
}

/// Replace the first nav entry equal to `anchor`, searching depth-first.
fn replace_anchor(nav: &mut Value, anchor: &str, replacement: &Value) -> bool {
    match nav {
        Value::Sequence(items) => {
            for item in items.iter_mut() {
                if item.as_str() == Some(anchor) {
                    *item = replacement.clone();
                    return true;
                }
                if replace_anchor(item, anchor, replacement) {
                    return true;
                }
            }
            false
        }
        Value::Mapping(map) => map
            .iter_mut()
            .any(|(_, value)| replace_anchor(value, anchor, replacement)),
        _ => false,
    }
}
