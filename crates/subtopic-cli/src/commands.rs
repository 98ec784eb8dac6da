//! Command implementations for the subtopic binary.
//!
//! Handles:
//! - search/batch: memoized keyword searches against the store
//! - export/browse/status: read-only views of the store
//! - trial/stats: trial logs and the statistics report

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use subtopic_oracle::{ApiOracle, OracleGateway};
use subtopic_search::{
    outcome_from_record, SearchEngine, SearchRecordStore, SearchResult, TopicGraph, TopicId,
    TrialRunner,
};
use subtopic_stats::{compute_statistics, read_outcomes, BatchStatistics, OutcomeLog};
use subtopic_storage::Storage;
use subtopic_types::{OracleProvider, OracleSettings, Settings};

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }

    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the RocksDB store, creating parent directories if needed.
pub fn open_storage(settings: &Settings) -> Result<Arc<Storage>> {
    let db_path = settings.expanded_db_path();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let storage = Storage::open(&db_path).context("Failed to open storage")?;
    Ok(Arc::new(storage))
}

/// Provider-specific environment variable holding the API key.
fn api_key_env_var(provider: OracleProvider) -> &'static str {
    match provider {
        OracleProvider::Anthropic => "ANTHROPIC_API_KEY",
        OracleProvider::Chat | OracleProvider::Completions => "OPENAI_API_KEY",
    }
}

fn api_oracle(settings: &OracleSettings) -> Result<ApiOracle> {
    let mut settings = settings.clone();
    if settings.api_key.is_none() {
        settings.api_key = std::env::var(api_key_env_var(settings.provider)).ok();
    }
    let oracle = ApiOracle::new(&settings).context("Failed to create oracle backend")?;
    info!(model = %oracle.model(), provider = ?settings.provider, "Oracle backend ready");
    Ok(oracle)
}

/// Build the oracle gateway, with the repair backend when configured.
pub fn build_gateway(settings: &Settings) -> Result<OracleGateway> {
    let mut gateway = OracleGateway::new(Arc::new(api_oracle(&settings.oracle)?));
    if let Some(repair) = &settings.repair {
        gateway = gateway.with_repair(Arc::new(api_oracle(repair)?));
    }
    Ok(gateway)
}

/// Read a newline-delimited keyword list in full, skipping blank lines.
///
/// Each keyword is the line exactly as written, since records are keyed
/// by the keyword text.
pub fn read_keywords(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read keyword file {}", path.display()))?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

fn describe(result: &SearchResult) -> String {
    match (&result.topic, result.failed) {
        (Some(topic), _) => format!("found ({})", topic),
        (None, true) => "failed".to_string(),
        (None, false) => "not found".to_string(),
    }
}

/// Search one keyword and print the result with its stored path.
pub async fn run_search(
    engine: &SearchEngine,
    keyword: &str,
    max_depth: usize,
    out: &mut impl Write,
) -> Result<SearchResult> {
    let (result, path) = engine.search_with_path(keyword, max_depth).await?;
    writeln!(out, "{}: {}", keyword, describe(&result))?;
    writeln!(out, "  {}", path.join(" -> "))?;
    Ok(result)
}

/// Search every keyword in order, one line per keyword.
pub async fn run_batch(
    engine: &SearchEngine,
    keywords: &[String],
    max_depth: usize,
    out: &mut impl Write,
) -> Result<BatchStatistics> {
    let mut outcomes = Vec::with_capacity(keywords.len());
    for (i, keyword) in keywords.iter().enumerate() {
        let result = engine.search_with_depth(keyword, max_depth).await?;
        writeln!(out, "{}: {}", keyword, describe(&result))?;

        if let Some(record) = engine.records().load(keyword)? {
            outcomes.push(outcome_from_record(engine.graph(), &record)?);
        }
        info!(done = i + 1, total = keywords.len(), "Batch progress");
    }
    Ok(compute_statistics(&outcomes))
}

/// Write `"{keyword}: {path}"` for every stored record, in store order.
pub fn export_paths(
    graph: &TopicGraph,
    records: &SearchRecordStore,
    out: &mut impl Write,
) -> Result<usize> {
    let records = records.list()?;
    for record in &records {
        let path = graph.resolve_path(&record.path)?;
        writeln!(out, "{}: {:?}", record.keyword, path)?;
    }
    Ok(records.len())
}

fn print_topic(graph: &TopicGraph, topic_id: TopicId, out: &mut impl Write) -> Result<()> {
    let topic = graph.topic(topic_id)?;
    let state = if topic.expanded { "expanded" } else { "not expanded" };
    writeln!(out, "Topic {}: {} ({})", topic.topic_id, topic.name, state)?;

    writeln!(out, "Parents:")?;
    for parent in graph.parents_of(topic_id)? {
        writeln!(out, "  {}: {}", parent, graph.name_of(parent)?)?;
    }
    writeln!(out, "Children:")?;
    for child in graph.children_of(topic_id)? {
        writeln!(out, "  {}: {}", child, graph.name_of(child)?)?;
    }
    Ok(())
}

/// Interactive walk over the graph.
///
/// Shows a topic with its parents and children, then reads the next topic
/// id from `input`. An empty line or end of input ends the walk.
pub fn browse(
    graph: &TopicGraph,
    start: TopicId,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let mut current = start;
    loop {
        print_topic(graph, current, out)?;
        write!(out, "Topic id (empty to quit): ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        match line.parse::<TopicId>() {
            Ok(next) if graph.get_topic(next)?.is_some() => current = next,
            Ok(next) => writeln!(out, "No topic with id {}", next)?,
            Err(_) => writeln!(out, "Not a topic id: {}", line)?,
        }
    }
    Ok(())
}

/// Run trials for every keyword into a new log.
pub async fn run_trials(
    runner: &TrialRunner,
    keywords: &[String],
    repeat: usize,
    output: &Path,
) -> Result<BatchStatistics> {
    let mut log = OutcomeLog::create(output)
        .with_context(|| format!("Refusing to write trial log {}", output.display()))?;
    let outcomes = runner.run_all(keywords, repeat, &mut log).await?;
    info!(written = log.written(), log = %output.display(), "Trials complete");
    Ok(compute_statistics(&outcomes))
}

/// Statistics over a trial log.
pub fn stats_from_log(path: &Path) -> Result<BatchStatistics> {
    let outcomes = read_outcomes(path)
        .with_context(|| format!("Failed to read trial log {}", path.display()))?;
    Ok(compute_statistics(&outcomes))
}

/// Statistics over every stored search.
pub fn stats_from_store(graph: &TopicGraph, records: &SearchRecordStore) -> Result<BatchStatistics> {
    let outcomes = records
        .list()?
        .iter()
        .map(|record| outcome_from_record(graph, record))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(compute_statistics(&outcomes))
}

/// Print store counts.
pub fn show_status(storage: &Storage, settings: &Settings, out: &mut impl Write) -> Result<()> {
    let stats = storage.get_stats()?;
    writeln!(out, "Database: {}", settings.expanded_db_path().display())?;
    writeln!(out, "Topics: {}", stats.topic_count)?;
    writeln!(out, "Edges: {}", stats.edge_key_count / 2)?;
    writeln!(out, "Keyword searches: {}", stats.keyword_search_count)?;
    writeln!(out, "Disk usage: {} bytes", stats.disk_usage_bytes)?;
    Ok(())
}

// --- Entry points used by main ---

fn max_depth_or_default(settings: &Settings, max_depth: Option<usize>) -> usize {
    max_depth.unwrap_or(settings.search.max_depth)
}

fn engine(settings: &Settings) -> Result<SearchEngine> {
    let storage = open_storage(settings)?;
    let gateway = build_gateway(settings)?;
    Ok(SearchEngine::new(storage, gateway, settings.search.clone())?)
}

pub async fn handle_search(settings: &Settings, keyword: &str, max_depth: Option<usize>) -> Result<()> {
    let engine = engine(settings)?;
    let max_depth = max_depth_or_default(settings, max_depth);
    run_search(&engine, keyword, max_depth, &mut io::stdout().lock()).await?;
    Ok(())
}

pub async fn handle_batch(settings: &Settings, keywords: &Path, max_depth: Option<usize>) -> Result<()> {
    let keywords = read_keywords(keywords)?;
    let engine = engine(settings)?;
    let max_depth = max_depth_or_default(settings, max_depth);

    let stats = run_batch(&engine, &keywords, max_depth, &mut io::stdout().lock()).await?;
    println!("{}", stats);
    Ok(())
}

pub fn handle_export(settings: &Settings, output: Option<&Path>) -> Result<()> {
    let storage = open_storage(settings)?;
    let graph = TopicGraph::open(storage.clone())?;
    let records = SearchRecordStore::new(storage);

    let count = match output {
        Some(path) => {
            let mut file = io::BufWriter::new(
                fs::File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            );
            let count = export_paths(&graph, &records, &mut file)?;
            file.flush()?;
            count
        }
        None => export_paths(&graph, &records, &mut io::stdout().lock())?,
    };
    info!(count, "Exported search paths");
    Ok(())
}

pub fn handle_browse(settings: &Settings, topic_id: Option<TopicId>) -> Result<()> {
    let storage = open_storage(settings)?;
    let graph = TopicGraph::open(storage)?;

    let start = match topic_id {
        Some(id) => id,
        None => match graph.find(&settings.search.root_topic)? {
            Some(root) => root,
            None => {
                warn!("Store has no root topic yet");
                println!("No topics stored yet; run a search first.");
                return Ok(());
            }
        },
    };
    if graph.get_topic(start)?.is_none() {
        anyhow::bail!("No topic with id {}", start);
    }

    browse(&graph, start, &mut io::stdin().lock(), &mut io::stdout().lock())
}

pub async fn handle_trial(
    settings: &Settings,
    keywords: &Path,
    output: &Path,
    repeat: usize,
) -> Result<()> {
    let keywords = read_keywords(keywords)?;
    let runner = TrialRunner::new(build_gateway(settings)?, settings.search.clone())?;
    let stats = run_trials(&runner, &keywords, repeat, output).await?;
    println!("{}", stats);
    Ok(())
}

pub fn handle_stats(settings: &Settings, input: Option<&Path>, from_store: bool) -> Result<()> {
    let stats = match input {
        Some(path) if !from_store => stats_from_log(path)?,
        _ => {
            let storage = open_storage(settings)?;
            let graph = TopicGraph::open(storage.clone())?;
            stats_from_store(&graph, &SearchRecordStore::new(storage))?
        }
    };
    println!("{}", stats);
    Ok(())
}

pub fn handle_status(settings: &Settings) -> Result<()> {
    let storage = open_storage(settings)?;
    show_status(&storage, settings, &mut io::stdout().lock())
}
