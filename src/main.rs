// Clippy allows
#![allow(clippy::too_many_arguments)]

//! ccsig: calling-cards promoter significance
//!
//! Usage: ccsig <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use ccsig::chrom::ChromMap;
use ccsig::config::{QuantConfig, DEFAULT_MAX_ROWS, DEFAULT_QUERY_PSEUDOCOUNT};
use ccsig::count::total_counts;
use ccsig::error::Result;
use ccsig::output::TableWriter;
use ccsig::pipeline::{SignificancePipeline, SignificanceQuery};
use ccsig::table;

#[derive(Parser)]
#[command(name = "ccsig")]
#[command(version)]
#[command(
    about = "Calling-cards promoter significance: hop counts, enrichment and p-values",
    long_about = None
)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Chromosome alias file (alias<TAB>canonical) applied to every table
    #[arg(long, global = true)]
    chrom_map: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score promoters for experiments against background sources
    Significance {
        /// Experiment table (id, batch, replicate, tf_id, tf_locus_tag, tf_gene)
        #[arg(long)]
        experiments: PathBuf,

        /// Experiment hops (chrom, start, end, strand, experiment_id[, hops_source])
        #[arg(long)]
        experiment_events: PathBuf,

        /// Background hops (chrom, start, end, strand, background_source)
        #[arg(long)]
        background_events: PathBuf,

        /// Promoter table (chrom, start, end, strand, id, target_gene_id, source)
        #[arg(long)]
        promoters: PathBuf,

        /// Hops source to use from the experiment hop table
        #[arg(long)]
        hops_source: String,

        /// Background source(s) to score against
        #[arg(long = "background-source", required = true, num_args = 1..)]
        background_sources: Vec<String>,

        /// Promoter source(s) to include (default: all)
        #[arg(long = "promoter-source", num_args = 1..)]
        promoter_sources: Vec<String>,

        /// Score a single experiment
        #[arg(long, conflicts_with_all = ["batch", "tf_id", "tf_locus_tag", "tf_gene"])]
        experiment_id: Option<String>,

        /// Restrict to experiments from this batch
        #[arg(long)]
        batch: Option<String>,

        /// Restrict to experiments for this TF id
        #[arg(long)]
        tf_id: Option<String>,

        /// Restrict to experiments for this TF locus tag
        #[arg(long)]
        tf_locus_tag: Option<String>,

        /// Restrict to experiments for this TF gene name
        #[arg(long)]
        tf_gene: Option<String>,

        /// Only count hops on the promoter's strand (or unstranded hops)
        #[arg(long)]
        consider_strand: bool,

        /// Pseudocount for enrichment and Poisson p-value
        #[arg(long, default_value_t = DEFAULT_QUERY_PSEUDOCOUNT)]
        pseudocount: f64,

        /// Refuse queries producing more rows than this
        #[arg(long, default_value_t = DEFAULT_MAX_ROWS)]
        max_rows: u64,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report total hops per experiment id or background source
    Totals {
        /// Hop table (chrom, start, end, strand, group[, hops_source])
        #[arg(short, long)]
        events: PathBuf,

        /// Only count rows from this hops source
        #[arg(long)]
        hops_source: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = load_chrom_map(cli.chrom_map.as_deref()).and_then(|chroms| match cli.command {
        Commands::Significance {
            experiments,
            experiment_events,
            background_events,
            promoters,
            hops_source,
            background_sources,
            promoter_sources,
            experiment_id,
            batch,
            tf_id,
            tf_locus_tag,
            tf_gene,
            consider_strand,
            pseudocount,
            max_rows,
            output,
        } => {
            let mut query = SignificanceQuery::new(hops_source, background_sources);
            query.promoter_sources = promoter_sources;
            query.experiment_id = experiment_id;
            query.experiment_batch = batch;
            query.tf_id = tf_id;
            query.tf_locus_tag = tf_locus_tag;
            query.tf_gene = tf_gene;
            query.consider_strand = consider_strand;
            query.pseudocount = pseudocount;

            run_significance(
                &chroms,
                &query,
                &experiments,
                &experiment_events,
                &background_events,
                &promoters,
                max_rows,
                output.as_deref(),
            )
        }
        Commands::Totals {
            events,
            hops_source,
            output,
        } => run_totals(&chroms, &events, hops_source.as_deref(), output.as_deref()),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_chrom_map(path: Option<&Path>) -> Result<ChromMap> {
    match path {
        Some(p) => {
            let map = ChromMap::from_file(p)?;
            info!("Loaded {} chromosome aliases", map.len());
            Ok(map)
        }
        None => Ok(ChromMap::new()),
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(p) => Box::new(File::create(p)?),
        None => Box::new(io::stdout().lock()),
    };
    Ok(writer)
}

fn run_significance(
    chroms: &ChromMap,
    query: &SignificanceQuery,
    experiments_path: &Path,
    experiment_events_path: &Path,
    background_events_path: &Path,
    promoters_path: &Path,
    max_rows: u64,
    output: Option<&Path>,
) -> Result<()> {
    let experiments = table::read_experiments(experiments_path)?;
    let experiment_events =
        table::read_events(experiment_events_path, chroms, Some(query.hops_source.as_str()))?;
    let background_events = table::read_events(background_events_path, chroms, None)?;
    let promoters = table::read_promoters(promoters_path, chroms)?;
    info!(
        "Loaded {} experiments, {} experiment hops, {} background hops, {} promoters",
        experiments.len(),
        experiment_events.len(),
        background_events.len(),
        promoters.len()
    );

    let pipeline = SignificancePipeline::new(QuantConfig::default().with_max_rows(max_rows));
    let rows = pipeline.run(
        query,
        &experiments,
        &experiment_events,
        &background_events,
        &promoters,
    )?;

    TableWriter::new(open_output(output)?).write_significance(&rows)
}

fn run_totals(
    chroms: &ChromMap,
    events_path: &Path,
    hops_source: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let events = table::read_events(events_path, chroms, hops_source)?;
    let records = total_counts(&events);
    TableWriter::new(open_output(output)?).write_counts(&records)
}
