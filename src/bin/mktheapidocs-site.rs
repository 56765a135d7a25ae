//! mktheapidocs-site: render the configured API pages into a site's docs tree.
//!
//! - `mktheapidocs-site build mkdocs.yml` writes every page once.
//! - `mktheapidocs-site serve mkdocs.yml` builds, then rewrites pages as their
//!   Python sources change.
//! - `mktheapidocs-site nav mkdocs.yml` prints the nav with API anchors expanded.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mktheapidocs::config::SiteConfig;
use mktheapidocs::plugin::{Plugin, VirtualPage};
use mktheapidocs::logging;
use mktheapidocs::watch::SourceWatcher;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "mktheapidocs-site", about = "Build API pages for a documentation site")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output (-vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Write every API page under the docs directory
    Build { config: PathBuf },
    /// Build, then rebuild pages when their sources change
    Serve { config: PathBuf },
    /// Print the site nav with API anchors expanded
    Nav { config: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet)?;

    match cli.command {
        Command::Build { config } => {
            let (site, plugin) = load(&config)?;
            build(&site.docs_dir, &plugin)
        }
        Command::Serve { config } => serve(&config),
        Command::Nav { config } => {
            let (_, plugin) = load(&config)?;
            let nav = plugin.nav().context("the site config has no `nav`")?;
            print!("{}", serde_yaml::to_string(nav)?);
            Ok(())
        }
    }
}

fn load(config: &Path) -> Result<(SiteConfig, Plugin)> {
    let site = SiteConfig::load(config)?;
    let plugin = Plugin::on_config(&site)
        .with_context(|| format!("invalid plugin configuration in {}", config.display()))?;
    Ok((site, plugin))
}

fn build(docs_dir: &Path, plugin: &Plugin) -> Result<()> {
    for page in plugin.pages() {
        write_page(docs_dir, plugin, page)?;
    }
    info!("built {} pages into {}", plugin.pages().len(), docs_dir.display());
    Ok(())
}

fn write_page(docs_dir: &Path, plugin: &Plugin, page: &VirtualPage) -> Result<()> {
    let text = plugin
        .on_page_read_source(&page.url)
        .with_context(|| format!("no page registered at {}", page.url))??;
    let path = docs_dir.join(page.dest_path());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    info!("{} -> {}", page.url, path.display());
    Ok(())
}

fn serve(config: &Path) -> Result<()> {
    let (site, plugin) = load(config)?;
    build(&site.docs_dir, &plugin)?;

    let mut watcher = SourceWatcher::new()?;
    plugin.on_serve(&mut watcher)?;
    info!("watching {} sources, Ctrl-C to stop", plugin.pages().len());

    watcher.run(|changed| {
        for page in plugin.pages_for_source(changed) {
            write_page(&site.docs_dir, &plugin, page)?;
        }
        Ok(())
    });
    Ok(())
}
