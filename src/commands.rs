use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{Config, run_interactive_config, show_config};
use crate::database::{PgVectorStore, SearchResult, VectorStore};
use crate::embeddings::{Embedder, OllamaClient};
use crate::extractor::TextSource;
use crate::indexer::Indexer;

pub type PgIndexer = Indexer<OllamaClient, PgVectorStore>;

/// Load configuration from `config_dir`, or from the default directory
#[inline]
pub fn load_config(config_dir: Option<&Path>) -> Result<Config> {
    match config_dir {
        Some(dir) => Config::load_from(dir),
        None => Config::load(),
    }
}

/// Connect the embedder and the store described by `config`
#[inline]
pub async fn open_indexer(config: &Config) -> Result<PgIndexer> {
    let embedder = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;

    let store = PgVectorStore::connect(&config.database, embedder.dimension())
        .await
        .with_context(|| format!("Failed to connect to {}", config.database.display_url()))?;

    Ok(Indexer::new(embedder, store).with_chunking(config.chunking.clone()))
}

/// Interactive configuration, or print the current one with `show`
#[inline]
pub fn configure(config_dir: Option<&Path>, show: bool) -> Result<()> {
    if show {
        let config = load_config(config_dir)?;
        show_config(&config);
        return Ok(());
    }

    let dir = match config_dir {
        Some(dir) => dir.to_path_buf(),
        None => Config::config_dir().context("Failed to determine config directory")?,
    };
    run_interactive_config(&dir)
}

/// Create the pgvector extension and the record table if needed
#[inline]
pub async fn init(config_dir: Option<&Path>) -> Result<()> {
    let config = load_config(config_dir)?;
    let indexer = open_indexer(&config).await?;

    let result = indexer
        .ensure_schema()
        .await
        .context("Failed to prepare the record table");
    indexer.close().await;
    result?;

    println!(
        "{} table {} is ready ({} dimensions)",
        style("✓").green(),
        style(&config.database.table).cyan(),
        config.ollama.embedding_dimension
    );
    Ok(())
}

/// Index each PDF in turn, printing the number of chunks stored
#[inline]
pub async fn index_pdfs(config_dir: Option<&Path>, paths: &[PathBuf]) -> Result<()> {
    let config = load_config(config_dir)?;
    let indexer = open_indexer(&config).await?;

    let sources: Vec<TextSource> = paths.iter().cloned().map(TextSource::Pdf).collect();
    let result = index_sources(&indexer, &sources).await;
    indexer.close().await;

    let total = result?;
    if sources.len() > 1 {
        println!(
            "Indexed {} chunks from {} documents",
            style(total).bold(),
            sources.len()
        );
    }
    Ok(())
}

/// Chunk and index one literal string
#[inline]
pub async fn index_text(config_dir: Option<&Path>, text: &str) -> Result<()> {
    let config = load_config(config_dir)?;
    let indexer = open_indexer(&config).await?;

    let sources = [TextSource::Literal(text.to_string())];
    let result = index_sources(&indexer, &sources).await;
    indexer.close().await;

    result.map(|_| ())
}

async fn index_sources(indexer: &PgIndexer, sources: &[TextSource]) -> Result<usize> {
    indexer
        .ensure_schema()
        .await
        .context("Failed to prepare the record table")?;

    let mut total = 0;
    for source in sources {
        let bar = progress_bar(&source.to_string());

        let report = indexer
            .index_with_progress(source, |done, len| {
                bar.set_length(len as u64);
                bar.set_position(done as u64);
            })
            .await;
        bar.finish_and_clear();

        let report = report.with_context(|| format!("Failed to index {}", source))?;
        println!(
            "{} {} chunks from {}",
            style("Indexed").green(),
            style(report.chunks_indexed).bold(),
            source
        );
        total += report.chunks_indexed;
    }

    info!("Indexed {} chunks from {} sources", total, sources.len());
    Ok(total)
}

/// Store each literal text as one record, without chunking
#[inline]
pub async fn insert_texts(config_dir: Option<&Path>, texts: &[String]) -> Result<()> {
    let config = load_config(config_dir)?;
    let indexer = open_indexer(&config).await?;

    let result = insert_all(&indexer, texts).await;
    indexer.close().await;
    result
}

async fn insert_all(indexer: &PgIndexer, texts: &[String]) -> Result<()> {
    indexer
        .ensure_schema()
        .await
        .context("Failed to prepare the record table")?;

    for text in texts {
        let id = indexer
            .insert_document(text)
            .await
            .with_context(|| format!("Failed to insert {}", TextSource::Literal(text.clone())))?;
        println!("{} record {}", style("Inserted").green(), style(id).bold());
    }

    println!("Data inserted successfully!");
    Ok(())
}

/// Print the texts nearest to `query`
#[inline]
pub async fn search(config_dir: Option<&Path>, query: &str, top_k: Option<usize>) -> Result<()> {
    let config = load_config(config_dir)?;
    let k = top_k.unwrap_or(config.search.top_k);
    let indexer = open_indexer(&config).await?;

    let result = search_records(&indexer, query, k).await;
    indexer.close().await;
    let results = result?;

    if results.is_empty() {
        println!("{}", style("No records stored yet.").yellow());
        return Ok(());
    }

    println!("{}", style("Top Matches:").bold().cyan());
    for (rank, hit) in results.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            rank + 1,
            hit.content,
            style(format!("(id {}, distance {:.4})", hit.id, hit.distance)).dim()
        );
    }
    Ok(())
}

/// Prepare the store, then return the `k` records nearest to `query`.
///
/// A store that has never been written to answers with no results.
#[inline]
pub async fn search_records<E, S>(
    indexer: &Indexer<E, S>,
    query: &str,
    k: usize,
) -> Result<Vec<SearchResult>>
where
    E: Embedder,
    S: VectorStore,
{
    indexer
        .ensure_schema()
        .await
        .context("Failed to prepare the record table")?;

    indexer
        .query_with_scores(query, k)
        .await
        .with_context(|| format!("Search for \"{}\" failed", query))
}

/// Report store location, record count and embedder health
#[inline]
pub async fn show_status(config_dir: Option<&Path>) -> Result<()> {
    let config = load_config(config_dir)?;

    println!("{}", style("📊 Status").bold().cyan());
    println!("{}", "=".repeat(50));

    println!("🗄️  Store:");
    println!("   Location: {}", config.database.display_url());
    println!("   Table: {}", config.database.table);
    match PgVectorStore::connect(&config.database, config.ollama.embedding_dimension as usize)
        .await
    {
        Ok(store) => {
            match store.count().await {
                Ok(count) => println!("   ✅ Connected, {} records", count),
                Err(e) => println!("   ⚠️  Connected but the table is unusable - {}", e),
            }
            store.close().await;
        }
        Err(e) => println!("   ❌ Failed to connect - {}", e),
    }

    println!("🤖 Embedder:");
    println!("   Model: {}", config.ollama.model);
    match OllamaClient::new(&config.ollama) {
        Ok(client) => {
            let url = client.base_url().clone();
            let health = tokio::task::spawn_blocking(move || client.health_check()).await;
            match health {
                Ok(Ok(())) => println!("   ✅ Ollama healthy at {}", url),
                Ok(Err(e)) => println!("   ⚠️  Ollama unhealthy at {} - {}", url, e),
                Err(e) => {
                    warn!("Health check task failed: {}", e);
                    println!("   ❌ Health check did not complete");
                }
            }
        }
        Err(e) => println!("   ❌ Invalid Ollama settings - {}", e),
    }

    Ok(())
}

fn progress_bar(label: &str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len} chunks")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(format!("Embedding {}", label));
    bar
}
