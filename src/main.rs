use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledgergraph::centrality::{BetweennessConfig, CentralityEngine, PageRankConfig};
use ledgergraph::config::{load_config, AppConfig};
use ledgergraph::ingest::{read_edge_records, read_node_records, synthetic_ledger};
use ledgergraph::model::motif::MotifClass;
use ledgergraph::model::score::{CentralityResult, ScoreEntry};
use ledgergraph::motif::MotifCensus;
use ledgergraph::null_model::NullModel;
use ledgergraph::query::{activity_profile, address_volume, volume_concentration};
use ledgergraph::store::{IngestReport, TemporalGraph, TemporalView};

/// ledgergraph: temporal graph analytics for token-transfer ledgers
#[derive(Parser)]
#[command(name = "ledgergraph")]
#[command(about = "Motif census, centrality and null models for token-transfer ledgers")]
#[command(version)]
struct Cli {
    /// Configuration file, layered over ./ledgergraph.toml
    #[arg(short, long, global = true, env = "LEDGERGRAPH_CONFIG")]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Edge records as a JSON array or JSON Lines
    #[arg(short, long)]
    input: PathBuf,
    /// Optional node records (labels, attributes, first-seen times)
    #[arg(long)]
    nodes: Option<PathBuf>,
    /// Restrict analysis to edges at or after this time (unix seconds)
    #[arg(long)]
    start: Option<i64>,
    /// Restrict analysis to edges before this time (unix seconds)
    #[arg(long)]
    end: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print node/edge counts and the time span of the ledger
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Count the 40 temporal motif classes for each delta
    Motifs {
        #[command(flatten)]
        input: InputArgs,
        /// Deltas in seconds (comma-separated); defaults to motifs.deltas
        #[arg(short, long, value_delimiter = ',')]
        deltas: Vec<i64>,
    },
    /// Rank addresses by a centrality measure
    Centrality {
        #[command(flatten)]
        input: InputArgs,
        /// Number of rows to print
        #[arg(long, default_value = "10")]
        top: usize,
        #[command(subcommand)]
        algorithm: Algorithm,
    },
    /// Compare the motif census against a timestamp-permuted baseline
    NullModel {
        #[command(flatten)]
        input: InputArgs,
        #[arg(short, long, value_delimiter = ',')]
        deltas: Vec<i64>,
        /// Permutation seed; defaults to null_model.seed
        #[arg(long)]
        seed: Option<u64>,
        /// Write the permuted records to this file instead of comparing
        #[arg(long)]
        emit: Option<PathBuf>,
    },
    /// Per-tile activity, peak tiles and value concentration
    Activity {
        #[command(flatten)]
        input: InputArgs,
        /// Tile width in seconds
        #[arg(long, default_value = "86400")]
        width: i64,
        /// Tiles in the rolling mean
        #[arg(long, default_value = "7")]
        rolling: usize,
        /// Report the addresses holding this share of total volume
        #[arg(long, default_value = "0.999")]
        share: f64,
    },
    /// Run every analysis on a synthetic ledger
    Demo {
        #[arg(long, default_value = "7")]
        seed: u64,
        #[arg(long, default_value = "200")]
        addresses: usize,
        #[arg(long, default_value = "5000")]
        transfers: usize,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum Algorithm {
    /// Distinct neighbours over n - 1
    Degree,
    /// Power-iteration PageRank
    Pagerank {
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        damping: Option<f64>,
        #[arg(long)]
        tolerance: Option<f64>,
    },
    /// Brandes betweenness, optionally from a sample of sources
    Betweenness {
        /// Expand only this many seeded-random sources
        #[arg(long)]
        sample: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_env("LEDGERGRAPH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json);

    if let Err(e) = run(cli) {
        eprintln!("ledgergraph failed: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Summary { input } => {
            let (graph, report) = build_graph(&input, &config)?;
            #[derive(Serialize)]
            struct Summary {
                graph: ledgergraph::store::GraphSummary,
                ingest: IngestReport,
            }
            print_json(&Summary {
                graph: graph.summary(),
                ingest: report,
            })
        }
        Commands::Motifs { input, deltas } => {
            let (graph, _) = build_graph(&input, &config)?;
            let deltas = pick_deltas(deltas, &config);
            let census = MotifCensus::new();
            let table = match window_bounds(&input) {
                Some((start, end)) => census.count_multi(&graph.window(start, end)?, &deltas)?,
                None => census.count_multi(&graph, &deltas)?,
            };
            print_json(&table)
        }
        Commands::Centrality {
            input,
            top,
            algorithm,
        } => {
            let (graph, _) = build_graph(&input, &config)?;
            let engine = match window_bounds(&input) {
                Some((start, end)) => CentralityEngine::new(&graph.window(start, end)?),
                None => CentralityEngine::new(&graph),
            };
            let result = run_centrality(&engine, algorithm, &config)?;
            print_json(&RankedResult::new(&result, top))
        }
        Commands::NullModel {
            input,
            deltas,
            seed,
            emit,
        } => {
            if input.nodes.is_some() {
                bail!("--nodes does not apply to null-model: node records carry no edges");
            }
            let records = read_edge_records(&input.input, config.ingest.invalid_records)
                .with_context(|| format!("reading {}", input.input.display()))?
                .records;
            let seed = seed.unwrap_or(config.null_model.seed);
            let mut model = NullModel::new(MotifCensus::new(), config.ingest.invalid_records)
                .with_time_field(config.null_model.time_field.as_str());
            if let Some((start, end)) = window_bounds(&input) {
                model = model.with_window(start, end)?;
            }
            if let Some(path) = emit {
                let permuted = model.permuted(&records, seed)?;
                std::fs::write(&path, serde_json::to_string_pretty(&permuted)?)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "permuted records written");
                return Ok(());
            }
            let deltas = pick_deltas(deltas, &config);
            print_json(&model.compare(&records, &deltas, seed)?)
        }
        Commands::Activity {
            input,
            width,
            rolling,
            share,
        } => {
            let (graph, _) = build_graph(&input, &config)?;
            match window_bounds(&input) {
                Some((start, end)) => {
                    print_activity(&graph.window(start, end)?, width, rolling, share)
                }
                None => print_activity(&graph, width, rolling, share),
            }
        }
        Commands::Demo {
            seed,
            addresses,
            transfers,
        } => run_demo(&config, seed, addresses, transfers),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_graph(
    input: &InputArgs,
    config: &AppConfig,
) -> anyhow::Result<(TemporalGraph, IngestReport)> {
    let policy = config.ingest.invalid_records;
    let edges = read_edge_records(&input.input, policy)
        .with_context(|| format!("reading {}", input.input.display()))?;

    let mut graph = TemporalGraph::new();
    let report = edges.merge_report(graph.ingest_edges(&edges.records, policy)?);
    if let Some(path) = &input.nodes {
        let nodes = read_node_records(path, policy)
            .with_context(|| format!("reading {}", path.display()))?;
        graph.ingest_nodes(&nodes.records, policy)?;
    }
    graph.freeze();
    Ok((graph, report))
}

fn window_bounds(input: &InputArgs) -> Option<(i64, i64)> {
    match (input.start, input.end) {
        (None, None) => None,
        (start, end) => Some((start.unwrap_or(i64::MIN), end.unwrap_or(i64::MAX))),
    }
}

fn pick_deltas(cli: Vec<i64>, config: &AppConfig) -> Vec<i64> {
    if cli.is_empty() {
        config.motifs.deltas.clone()
    } else {
        cli
    }
}

fn run_centrality(
    engine: &CentralityEngine,
    algorithm: Algorithm,
    config: &AppConfig,
) -> anyhow::Result<CentralityResult> {
    let result = match algorithm {
        Algorithm::Degree => engine.degree(),
        Algorithm::Pagerank {
            iterations,
            damping,
            tolerance,
        } => {
            let defaults = config.centrality.pagerank;
            engine.pagerank(&PageRankConfig {
                iterations: iterations.unwrap_or(defaults.iterations),
                damping: damping.unwrap_or(defaults.damping),
                tolerance: tolerance.or(defaults.tolerance),
            })?
        }
        Algorithm::Betweenness { sample, seed } => {
            let defaults = config.centrality.betweenness;
            engine.betweenness(&BetweennessConfig {
                sample_size: sample.or(defaults.sample_size),
                seed: seed.unwrap_or(defaults.seed),
                normalized: defaults.normalized,
            })?
        }
    };
    Ok(result)
}

#[derive(Serialize)]
struct RankedResult<'a> {
    algorithm: String,
    iterations: usize,
    warnings: &'a [ledgergraph::model::score::CentralityWarning],
    top: Vec<ScoreEntry>,
}

impl<'a> RankedResult<'a> {
    fn new(result: &'a CentralityResult, top: usize) -> Self {
        Self {
            algorithm: result.algorithm.to_string(),
            iterations: result.iterations,
            warnings: &result.warnings,
            top: result.top_n(top),
        }
    }
}

fn print_activity<V: TemporalView>(
    view: &V,
    width: i64,
    rolling: usize,
    share: f64,
) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct Activity {
        profile: ledgergraph::query::ActivityProfile,
        concentration: Vec<ScoreEntry>,
    }
    let profile = activity_profile(view, width, rolling)?;
    let concentration = volume_concentration(&address_volume(view), share)?;
    print_json(&Activity {
        profile,
        concentration,
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Demo
// ---------------------------------------------------------------------------

fn run_demo(
    config: &AppConfig,
    seed: u64,
    addresses: usize,
    transfers: usize,
) -> anyhow::Result<()> {
    println!("=== ledgergraph demo: synthetic token-transfer ledger ===\n");

    let records = synthetic_ledger(seed, addresses, transfers, 1_700_000_000, 30);
    let (graph, report) = TemporalGraph::from_records(&records, config.ingest.invalid_records)?;
    println!(
        "Ingested {} records ({} rejected)",
        report.accepted,
        report.rejected_count()
    );
    println!("Store: {}\n", graph.summary());

    println!("=== Motif census ===\n");
    let deltas = &config.motifs.deltas;
    let table = MotifCensus::new().count_multi(&graph, deltas)?;
    for row in &table.rows {
        println!(
            "delta {:>6}s: {} occurrences, {} cycles (star {}, pair {}, triangle {})",
            row.delta(),
            row.total(),
            row.get(MotifClass::CYCLE),
            row.star_counts().iter().sum::<u64>(),
            row.two_node_counts().iter().sum::<u64>(),
            row.triangle_counts().iter().sum::<u64>(),
        );
    }

    println!("\n=== Centrality (top 5) ===\n");
    let engine = CentralityEngine::new(&graph);
    let sample = config
        .centrality
        .betweenness
        .sample_size
        .or(Some(50.min(graph.node_count().max(1))));
    let results = [
        engine.degree(),
        engine.pagerank(&config.centrality.pagerank)?,
        engine.betweenness(&BetweennessConfig {
            sample_size: sample,
            ..config.centrality.betweenness
        })?,
    ];
    for result in &results {
        println!("{}:", result.algorithm);
        for entry in result.top_n(5) {
            println!("  {:.6}  {}", entry.score, entry.node);
        }
        for warning in &result.warnings {
            println!("  note: {warning:?}");
        }
    }

    println!("\n=== Null model (seed {}) ===\n", config.null_model.seed);
    let model = NullModel::new(MotifCensus::new(), config.ingest.invalid_records)
        .with_time_field(config.null_model.time_field.as_str());
    for row in model.compare(&records, deltas, config.null_model.seed)? {
        let excess: i64 = row.excess().iter().sum();
        println!(
            "delta {:>6}s: real {} vs null {} (excess {excess:+})",
            row.delta,
            row.real.total(),
            row.null.total(),
        );
    }

    println!("\n=== Activity ===\n");
    let profile = activity_profile(&graph, 86_400, 7)?;
    println!(
        "{} daily tiles, mean {:.1} transfers/day",
        profile.tiles.len(),
        profile.mean
    );
    for tile in profile.peaks() {
        println!("  peak at {}: {} transfers", tile.start, tile.edge_count);
    }
    let whales = volume_concentration(&address_volume(&graph), 0.5)?;
    println!("{} addresses move half of all value", whales.len());

    Ok(())
}
