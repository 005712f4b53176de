//! CLI command implementations

use crate::GraphKind;
use anyhow::Context as _;
use grove_core::{CacheStore, detect_cycles, file_detail, find_dead_code};
use grove_indexer::{
    BundleFormat, Bundler, Coordinator, GroveConfig, NameLister, ScanOutcome, ScanRequest,
    discover_files,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolved project root, its configuration and the coordinator over its cache.
pub struct Context {
    root: PathBuf,
    config: GroveConfig,
    coordinator: Arc<Coordinator>,
}

impl Context {
    pub fn open(root: &Path, cache_dir: Option<&Path>) -> anyhow::Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("invalid project root {}", root.display()))?;
        let config = GroveConfig::load(&root)?;
        let cache_root = config.cache_root(cache_dir);
        tracing::debug!("Cache root: {}", cache_root.display());
        let cache = CacheStore::new(&cache_root)
            .with_context(|| format!("cannot open cache at {}", cache_root.display()))?;

        Ok(Context {
            root,
            config,
            coordinator: Arc::new(Coordinator::new(Arc::new(cache))),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan on the blocking pool; Ctrl-C cancels between files.
    async fn scan(&self, force: bool) -> anyhow::Result<ScanOutcome> {
        let request = ScanRequest::from_config(&self.root, &self.config)?.with_force(force);
        let cancel = request.cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling scan");
                cancel.cancel();
            }
        });

        let coordinator = Arc::clone(&self.coordinator);
        let outcome = tokio::task::spawn_blocking(move || coordinator.scan(&request)).await;
        interrupt.abort();
        Ok(outcome??)
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn scan(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let outcome = ctx.scan(force).await?;
    tracing::info!(
        "{} files, {} functions, {} classes ({})",
        outcome.summary.file_count,
        outcome.summary.function_count,
        outcome.summary.class_count,
        if outcome.summary.cached { "cached" } else { "fresh" }
    );
    print_json(&outcome.summary)
}

pub async fn graph(ctx: &Context, kind: GraphKind) -> anyhow::Result<()> {
    let outcome = ctx.scan(false).await?;
    match kind {
        GraphKind::File => print_json(&outcome.graph.files),
        GraphKind::Function => print_json(&outcome.graph.functions),
    }
}

pub async fn file(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let outcome = ctx.scan(false).await?;
    let path = path.trim_start_matches("./").replace('\\', "/");
    let detail = file_detail(&outcome.files, &outcome.graph.files, &path)
        .with_context(|| format!("{} is not part of the scanned set", path))?;
    print_json(&detail)
}

pub async fn analyze(ctx: &Context) -> anyhow::Result<()> {
    let outcome = ctx.scan(false).await?;
    let cycles = detect_cycles(&outcome.graph.files);
    let dead = find_dead_code(&outcome.graph.files, &outcome.graph.functions);
    tracing::info!(
        "{} cycles, {} unused files, {} unused functions",
        cycles.len(),
        dead.unused_files.len(),
        dead.unused_functions.len()
    );
    print_json(&serde_json::json!({
        "cycles": cycles,
        "unused_files": dead.unused_files,
        "unused_functions": dead.unused_functions,
    }))
}

pub async fn stats(ctx: &Context, cache: bool) -> anyhow::Result<()> {
    if cache {
        return print_json(&ctx.coordinator.cache().cache_stats(Some(&ctx.root)));
    }
    let outcome = ctx.scan(false).await?;
    print_json(&outcome.stats)
}

pub fn bundle(ctx: &Context, output: Option<PathBuf>, plain: bool) -> anyhow::Result<()> {
    let filters = ctx.config.filter_set()?;
    let files = discover_files(&ctx.root, &filters);
    let format = if plain {
        BundleFormat::Plain
    } else {
        BundleFormat::Formatted
    };
    let bundler = Bundler::new(format).with_max_file_bytes(ctx.config.max_file_bytes());

    let summary = match &output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            let summary = bundler.write(&ctx.root, &files, &mut out)?;
            out.flush()?;
            tracing::info!("Bundle written to {}", path.display());
            summary
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            bundler.write(&ctx.root, &files, &mut out)?
        }
    };

    if summary.skipped > 0 {
        tracing::info!("Skipped {} binary, oversized or unreadable files", summary.skipped);
    }
    Ok(())
}

pub fn names(ctx: &Context, include_files: bool, include_size: bool, text: bool) -> anyhow::Result<()> {
    let filters = ctx.config.filter_set()?;
    let entries = NameLister::new()
        .with_files(include_files)
        .with_sizes(include_size)
        .list(&ctx.root, &filters);
    if !text {
        return print_json(&entries);
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for entry in &entries {
        writeln!(out, "{}", entry)?;
    }
    Ok(())
}

pub fn clear(ctx: &Context, all: bool) -> anyhow::Result<()> {
    let cache = ctx.coordinator.cache();
    let removed = if all {
        tracing::info!("Clearing every project cache under {}", cache.root().display());
        cache.clear_cache(None)?
    } else {
        tracing::info!("Clearing cache for: {}", ctx.root.display());
        cache.clear_cache(Some(&ctx.root))?
    };
    tracing::info!("Cache cleared ({} project directories removed)", removed);
    Ok(())
}
