//! Command implementations for the pavise CLI.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::SearchConfig;
use crate::mapper::{ExtractorRegistry, MappingRegistry};
use crate::source::EmptySource;
use crate::store::Registry;

/// Execute a CLI command.
pub fn execute_command(args: PaviseArgs) -> anyhow::Result<()> {
    let registry = open_registry(&args)?;

    match &args.command {
        Command::List => list_indexes(&registry, &args),
        Command::Optimize(index) => optimize_index(&registry, index, &args),
        Command::Reopen(index) => reopen_index(&registry, index, &args),
        Command::Delete(index) => delete_index(&registry, index, &args),
        Command::DeleteAll => delete_all(&registry, &args),
        Command::Has(index) => has_index(&registry, index, &args),
        Command::Search(search) => search_index(&registry, search, &args),
    }?;

    registry.close().context("Failed to close indexes")
}

/// A registry over the root with no mappings and no datastore: the CLI
/// only works on what the indexes themselves hold.
fn open_registry(args: &PaviseArgs) -> anyhow::Result<Registry> {
    let config = SearchConfig::new(&args.root).with_analyzer(args.analyzer.as_str());
    Registry::new(
        config,
        MappingRegistry::new(),
        Arc::new(EmptySource),
        Arc::new(ExtractorRegistry::new()),
    )
    .with_context(|| format!("Cannot open index root {}", args.root.display()))
}

fn require_index(registry: &Registry, name: &str) -> anyhow::Result<()> {
    if !registry.has_index(name) {
        bail!(
            "No index named '{name}' under {}",
            registry.root().display()
        );
    }
    Ok(())
}

fn list_indexes(registry: &Registry, args: &PaviseArgs) -> anyhow::Result<()> {
    let indexes = registry
        .index_names()?
        .iter()
        .map(|name| {
            registry
                .stats(name)
                .with_context(|| format!("Cannot read index '{name}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    output_result(
        &IndexList {
            root: registry.root().display().to_string(),
            indexes,
        },
        args,
    )
}

fn optimize_index(registry: &Registry, index: &IndexArgs, args: &PaviseArgs) -> anyhow::Result<()> {
    require_index(registry, &index.name)?;

    let start = Instant::now();
    let before = registry.stats(&index.name)?;
    let merged = registry
        .optimize(&index.name)
        .with_context(|| format!("Failed to optimize '{}'", index.name))?;
    let after = registry.stats(&index.name)?;

    output_result(
        &OptimizationResult {
            index: index.name.clone(),
            merged,
            segments_before: before.segment_count,
            segments_after: after.segment_count,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        args,
    )
}

fn reopen_index(registry: &Registry, index: &IndexArgs, args: &PaviseArgs) -> anyhow::Result<()> {
    require_index(registry, &index.name)?;

    let searcher = registry
        .reopen(&index.name)
        .with_context(|| format!("Failed to reopen '{}'", index.name))?;

    output_result(
        &ReopenResult {
            index: index.name.clone(),
            generation: searcher.generation(),
            num_docs: searcher.num_docs(),
        },
        args,
    )
}

fn delete_index(registry: &Registry, index: &IndexArgs, args: &PaviseArgs) -> anyhow::Result<()> {
    let existed = registry.has_index(&index.name);
    registry
        .delete(&index.name)
        .with_context(|| format!("Failed to delete '{}'", index.name))?;

    let deleted = if existed {
        vec![index.name.clone()]
    } else {
        Vec::new()
    };
    output_result(&DeletionResult { deleted }, args)
}

fn delete_all(registry: &Registry, args: &PaviseArgs) -> anyhow::Result<()> {
    let deleted = registry.index_names()?;
    registry
        .delete_all()
        .context("Failed to delete indexes")?;

    output_result(&DeletionResult { deleted }, args)
}

fn has_index(registry: &Registry, index: &IndexArgs, args: &PaviseArgs) -> anyhow::Result<()> {
    output_result(
        &ExistenceResult {
            index: index.name.clone(),
            exists: registry.has_index(&index.name),
        },
        args,
    )
}

fn search_index(registry: &Registry, search: &SearchArgs, args: &PaviseArgs) -> anyhow::Result<()> {
    require_index(registry, &search.name)?;

    let start = Instant::now();
    let mut query = registry
        .search(search.query.as_str(), search.name.as_str())
        .order_by(search.sort.iter().cloned())
        .page(search.offset, search.size);
    if search.reverse {
        query = query.reverse();
    }

    let total_hits = query.count()?;
    let hits = query
        .execute_query(false)?
        .into_iter()
        .map(|result| SearchHit {
            id: result.id,
            score: result.score,
        })
        .collect();

    output_result(
        &SearchResults {
            index: search.name.clone(),
            query: search.query.clone(),
            total_hits,
            offset: search.offset,
            hits,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        args,
    )
}
