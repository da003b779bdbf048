//! Cinegraph CLI - load IMDb / MovieLens exports and query the graph
//!
//! # Commands
//!
//! ```bash
//! cinegraph load                      # Load everything, print per-dataset counts
//! cinegraph load --report run.json    # ... and write the load report as JSON
//! cinegraph stats                     # Graph statistics
//! cinegraph movie "Rashomon"          # Movie details
//! cinegraph person "Akira Kurosawa"   # Filmography, best rated first
//! cinegraph tag "samurai"             # Movies with a tag
//! cinegraph export out/               # CSV snapshot keyed by surrogate id
//! cinegraph shell                     # Interactive queries after one load
//! ```
//!
//! Global flags (`--data-dir`, `--config`, `--workers`, `--channel-capacity`)
//! override `CINEGRAPH_*` variables, which override the config file.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use cinegraph::views::{movie_view, person_view, stats_view, tag_view};
use cinegraph::{load, write_csv_snapshot, write_report_json, LoadedGraph, LoaderConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cinegraph")]
#[command(about = "Load IMDb and MovieLens exports into one movie graph", long_about = None)]
struct Cli {
    /// Directory holding the seven input files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workers per pipeline stage (default: number of CPUs)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Capacity of every bounded channel
    #[arg(long, global = true)]
    channel_capacity: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all datasets and print a per-dataset summary
    Load {
        /// Write the load report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print graph statistics
    Stats,

    /// Show a movie by exact title
    Movie {
        title: String,
    },

    /// Show a person's movies by exact full name
    Person {
        name: String,
    },

    /// Show the movies carrying a tag
    Tag {
        name: String,
    },

    /// Write a CSV snapshot of the graph
    Export {
        /// Output directory
        dir: PathBuf,

        /// Also write the load report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Interactive query loop
    Shell,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = build_config(&cli).map_err(Into::into).and_then(|config| match cli.command {
        Commands::Load { report } => cmd_load(&config, report.as_deref()),
        Commands::Stats => cmd_stats(&config),
        Commands::Movie { title } => cmd_lookup(&config, |l| movie_view(&l.graph, &l.indexes, &title)),
        Commands::Person { name } => cmd_lookup(&config, |l| person_view(&l.graph, &l.indexes, &name)),
        Commands::Tag { name } => cmd_lookup(&config, |l| tag_view(&l.graph, &l.indexes, &name)),
        Commands::Export { dir, report } => cmd_export(&config, &dir, report.as_deref()),
        Commands::Shell => cmd_shell(&config),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Config file, then environment, then command-line flags.
fn build_config(cli: &Cli) -> Result<LoaderConfig, cinegraph::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_json_file(path)?,
        None => LoaderConfig::default(),
    };
    config.apply_env()?;

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(capacity) = cli.channel_capacity {
        config.channel_capacity = Some(capacity);
    }
    config.validate()?;
    Ok(config)
}

fn cmd_load(config: &LoaderConfig, report_path: Option<&Path>) -> CliResult {
    let loaded = load(config)?;
    let report = &loaded.report;

    eprintln!(
        "{:<12} {:>10} {:>9} {:>10} {:>8} {:>10} {:>9} {:>9} {:>7} {:>8}",
        "dataset", "read", "rejected", "parsed", "skipped", "merged", "dupes", "misses", "peak", "ms"
    );
    for dataset in &report.datasets {
        let c = &dataset.counts;
        eprintln!(
            "{:<12} {:>10} {:>9} {:>10} {:>8} {:>10} {:>9} {:>9} {:>7} {:>8}",
            dataset.dataset.name(),
            c.read,
            c.rejected,
            c.parsed,
            c.skipped,
            c.merged(),
            c.duplicates,
            c.join_misses,
            dataset.peak_queue_depth(),
            dataset.elapsed_ms
        );
    }
    eprintln!();
    eprint!("{}", stats_view(&report.stats));
    eprintln!("Loaded in {} ms (run {})", report.elapsed_ms(), report.run_id);

    if let Some(path) = report_path {
        write_report_json(report, path)?;
        eprintln!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn cmd_stats(config: &LoaderConfig) -> CliResult {
    let loaded = load(config)?;
    print!("{}", stats_view(&loaded.graph.stats()));
    Ok(())
}

fn cmd_lookup(config: &LoaderConfig, view: impl Fn(&LoadedGraph) -> Option<String>) -> CliResult {
    let loaded = load(config)?;
    match view(&loaded) {
        Some(text) => {
            print!("{}", text);
            Ok(())
        }
        None => Err("Not found".into()),
    }
}

fn cmd_export(config: &LoaderConfig, dir: &Path, report_path: Option<&Path>) -> CliResult {
    let loaded = load(config)?;
    let summary = write_csv_snapshot(&loaded.graph, dir)?;
    eprintln!(
        "Wrote {} movies, {} people, {} tags, {} cast links, {} tag links to {}",
        summary.movies,
        summary.people,
        summary.tags,
        summary.movie_actors,
        summary.movie_tags,
        dir.display()
    );

    if let Some(path) = report_path {
        write_report_json(&loaded.report, path)?;
        eprintln!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn cmd_shell(config: &LoaderConfig) -> CliResult {
    let loaded = load(config)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    eprintln!("Commands: movie <title> | person <name> | tag <name> | stats | exit");
    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        let (command, argument) = input.split_once(' ').unwrap_or((input, ""));
        let argument = argument.trim();

        let output = match command {
            "" => continue,
            "exit" | "quit" => break,
            "stats" => Some(stats_view(&loaded.graph.stats())),
            "movie" => movie_view(&loaded.graph, &loaded.indexes, argument),
            "person" => person_view(&loaded.graph, &loaded.indexes, argument),
            "tag" => tag_view(&loaded.graph, &loaded.indexes, argument),
            other => {
                println!("Unknown command: {}", other);
                continue;
            }
        };

        match output {
            Some(text) => print!("{}", text),
            None => println!("Not found: {}", argument),
        }
    }
    Ok(())
}
