//! agentflow - research, write and review from the command line.
//!
//! Usage:
//!   agentflow run --task "topic"          Run the three-stage pipeline
//!   agentflow run --task "topic" --stats  Also print activity statistics
//!   agentflow ingest <dir> --index FILE   Index a directory of documents
//!   agentflow search "query" --index FILE Query a saved index

use agentflow::config::{
    LlmConfig, PipelineConfig, ResearchConfig, ReviewCriteria, ReviewerConfig, WriterConfig,
    WritingStyle,
};
use agentflow::events::{ChannelObserver, FanoutObserver, ObserverEvent, StatsObserver};
use agentflow::ingest::{
    DocumentLoader, Embedder, HashingEmbedder, InMemoryVectorStore, IngestionPipeline,
    OpenAiEmbedder, SimilarityIndex, SplitterConfig, TextSplitter, VectorStore,
};
use agentflow::llm::{OpenAiGenerator, RetryConfig};
use agentflow::observability::{init_tracing, LogFormat};
use agentflow::prelude::{CancellationToken, Pipeline, RunStatus, Task};
use agentflow::utils::preview;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "agentflow", version, about = "Research, write and review with an LLM")]
struct Cli {
    /// Log output format: pretty, compact or json
    #[arg(long, global = true, default_value = "compact", env = "AGENTFLOW_LOG_FORMAT")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run research, writing and review for a task
    Run(RunArgs),
    /// Load, split, embed and store a directory of documents
    Ingest(IngestArgs),
    /// Search a saved index
    Search(SearchArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// What to research and write about
    #[arg(short, long)]
    task: String,
    /// Additional requirements for the content
    #[arg(short, long, default_value = "")]
    requirements: String,
    /// Research depth, 1 to 10
    #[arg(long, default_value_t = 5)]
    depth: u8,
    /// Focus area for research; repeatable
    #[arg(long = "focus")]
    focus_areas: Vec<String>,
    /// Writing style: professional, casual, academic or creative
    #[arg(long, default_value = "professional")]
    style: String,
    /// Target length of the draft in words
    #[arg(long, default_value_t = 800)]
    target_words: u32,
    /// Review criteria: comprehensive, accuracy, readability or professional
    #[arg(long, default_value = "comprehensive")]
    criteria: String,
    /// Review strictness, 1 to 10
    #[arg(long, default_value_t = 7)]
    strictness: u8,
    /// Pipeline configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Model used by all three stages
    #[arg(long)]
    model: Option<String>,
    /// Per-stage timeout in seconds; 0 disables it
    #[arg(long)]
    timeout: Option<u64>,
    /// Retry transient generation failures with the default policy
    #[arg(long)]
    retry: bool,
    /// Write the markdown report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the run as JSON instead of markdown
    #[arg(long)]
    json: bool,
    /// Print research, writing and review statistics to stderr afterwards
    #[arg(long)]
    stats: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    /// Offline feature-hashing embedder
    Hashing,
    /// OpenAI-compatible /embeddings endpoint
    Openai,
}

#[derive(clap::Args)]
struct IngestArgs {
    /// Directory to load
    dir: PathBuf,
    /// Where to save the index
    #[arg(long, default_value = "agentflow-index.json")]
    index: PathBuf,
    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,
    /// File extension to load; repeatable (default: txt, md)
    #[arg(long = "ext")]
    extensions: Vec<String>,
    /// Maximum characters per chunk
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,
    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,
    /// Embedding backend
    #[arg(long, value_enum, default_value = "hashing")]
    embedder: EmbedderKind,
    /// Vector length of the embedder
    #[arg(long)]
    dimensions: Option<usize>,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Query text
    query: String,
    /// Index file written by `ingest`
    #[arg(long, default_value = "agentflow-index.json")]
    index: PathBuf,
    /// Number of hits
    #[arg(short, default_value_t = 5)]
    k: usize,
    /// Embedding backend; must match the one used to ingest
    #[arg(long, value_enum, default_value = "hashing")]
    embedder: EmbedderKind,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format: LogFormat = cli.log_format.parse()?;
    init_tracing(format);

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Ingest(args) => cmd_ingest(args).await,
        Commands::Search(args) => cmd_search(args).await,
    }
}

fn build_task(args: &RunArgs) -> Result<Task> {
    let mut research = ResearchConfig::new().with_depth(args.depth);
    for area in &args.focus_areas {
        research = research.with_focus_area(area);
    }
    let style: WritingStyle = args.style.parse()?;
    let criteria: ReviewCriteria = args.criteria.parse()?;

    Ok(Task::new(&args.task)
        .with_requirements(&args.requirements)
        .with_research(research)
        .with_writer(
            WriterConfig::new()
                .with_style(style)
                .with_target_words(args.target_words),
        )
        .with_reviewer(
            ReviewerConfig::new()
                .with_strictness(args.strictness)
                .with_criteria(criteria),
        ))
}

fn build_config(args: &RunArgs, llm: &LlmConfig) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::new(),
    };
    if let Some(model) = args.model.as_ref().or(llm.model.as_ref()) {
        config = config.with_model(model);
    }
    match args.timeout {
        Some(0) => config = config.with_stage_timeout(None),
        Some(seconds) => config = config.with_stage_timeout(Some(Duration::from_secs(seconds))),
        None => {}
    }
    if args.retry && config.retry.is_none() {
        config = config.with_retry(RetryConfig::default());
    }
    Ok(config)
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let task = build_task(&args)?;
    let llm = LlmConfig::from_env().context("LLM provider is not configured")?;
    let config = build_config(&args, &llm)?;
    let generator = Arc::new(OpenAiGenerator::new(llm)?);

    let (channel, events) = ChannelObserver::channel();
    let stats = Arc::new(StatsObserver::new());
    let observer = FanoutObserver::new()
        .with(Arc::new(channel))
        .with(stats.clone());
    let pipeline = Pipeline::builder()
        .generator(generator)
        .observer(Arc::new(observer))
        .config(config)
        .build()
        .context("Invalid pipeline configuration")?;
    let renderer = tokio::spawn(render_events(events));

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel("interrupted");
            }
        })
    };

    let outcome = pipeline.run_with_cancellation(task, &token).await;
    ctrl_c.abort();
    drop(pipeline);
    if renderer.await.is_err() {
        warn!("Progress renderer stopped unexpectedly");
    }
    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats.statistics())?);
    }

    let output = match outcome {
        Ok(output) => output,
        Err(failure) => {
            eprintln!("{}", serde_json::to_string_pretty(&failure.to_dict())?);
            bail!(failure);
        }
    };

    let rendered = if args.json {
        serde_json::to_string_pretty(&output.run().to_dict())?
    } else {
        output.to_markdown()
    };
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

async fn render_events(mut events: UnboundedReceiver<ObserverEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ObserverEvent::Status { status, .. } => match &status {
                RunStatus::Failed { .. } => eprintln!("✗ {status}"),
                RunStatus::Complete => eprintln!("✓ complete"),
                other => eprintln!("… {other}"),
            },
            ObserverEvent::StageResult(result) if result.is_success() => {
                eprintln!(
                    "  {} done: {} words, {}",
                    result.stage.label(),
                    result.word_count(),
                    preview(&result.content, 80)
                );
            }
            ObserverEvent::StageResult(_) => {}
        }
    }
}

fn embedder_for(kind: EmbedderKind, dimensions: Option<usize>) -> Result<Arc<dyn Embedder>> {
    Ok(match kind {
        EmbedderKind::Hashing => match dimensions {
            Some(d) => Arc::new(HashingEmbedder::new(d)?),
            None => Arc::new(HashingEmbedder::default()),
        },
        EmbedderKind::Openai => {
            let llm = LlmConfig::from_env().context("Embedding provider is not configured")?;
            let embedder = OpenAiEmbedder::new(llm)?;
            match dimensions {
                Some(d) => Arc::new(embedder.with_dimensions(d)),
                None => Arc::new(embedder),
            }
        }
    })
}

async fn open_store(path: &Path, dimensions: usize) -> Result<InMemoryVectorStore> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(InMemoryVectorStore::new(dimensions));
    }
    let store = InMemoryVectorStore::load(path)
        .await
        .with_context(|| format!("Failed to load index: {}", path.display()))?;
    if store.dimensions() != dimensions {
        bail!(
            "index {} holds {}-dimensional vectors, embedder produces {}",
            path.display(),
            store.dimensions(),
            dimensions
        );
    }
    Ok(store)
}

async fn cmd_ingest(args: IngestArgs) -> Result<()> {
    let mut loader = DocumentLoader::new().recursive(args.recursive);
    if !args.extensions.is_empty() {
        loader = loader.with_extensions(&args.extensions);
    }
    let documents = loader
        .load_dir(&args.dir)
        .await
        .with_context(|| format!("Failed to load {}", args.dir.display()))?;

    let embedder = embedder_for(args.embedder, args.dimensions)?;
    let store = Arc::new(open_store(&args.index, embedder.dimensions()).await?);
    let splitter = TextSplitter::new(SplitterConfig::new(args.chunk_size, args.chunk_overlap))?;
    let index = IngestionPipeline::new(splitter, embedder, store.clone());

    let report = index.index(&documents).await?;
    store.save(&args.index).await?;
    println!(
        "Indexed {} documents into {} chunks ({} empty skipped); {} chunks in {}",
        report.documents,
        report.chunks,
        report.skipped,
        store.len().await,
        args.index.display()
    );
    Ok(())
}

async fn cmd_search(args: SearchArgs) -> Result<()> {
    let store = InMemoryVectorStore::load(&args.index)
        .await
        .with_context(|| format!("Failed to load index: {}", args.index.display()))?;
    let embedder = embedder_for(args.embedder, Some(store.dimensions()))?;
    let splitter = TextSplitter::new(SplitterConfig::default())?;
    let index = IngestionPipeline::new(splitter, embedder, Arc::new(store));

    let hits = index.search(&args.query, args.k).await?;
    if hits.is_empty() {
        println!("No matches");
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {}", rank + 1, hit.score, hit.source);
        println!("   {}", preview(&hit.content, 160));
    }
    Ok(())
}
