//! Command-line interface for building and inspecting concept stores.
//!
//! This CLI builds the multilingual concept store from local dictionary data,
//! prints the summary of an existing store, and explains how a single gloss
//! is classified.

use clap::{Parser, Subcommand};
use colored::*;
use concepts_rs::{
    BuildOptions, BuildReport, BuildStats, Classification, GlossClassifier, StoreSummary,
    build_concept_graph, canonicalize, clear_store, data, db, default_store_path,
    error::Result,
    progress::{ProgressCallback, ProgressUpdate},
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{LevelFilter, error, info};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multilingual concept store builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding langpacks/, dumps/ and translations/ (optional)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Path of the concept store (optional)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Set verbosity level (use -v, -vv, or -vvv for increasing verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the concept store, replacing any existing one
    Build {
        /// Languages to include
        #[arg(long, value_delimiter = ',', default_values = concepts_rs::DEFAULT_LANGUAGES)]
        languages: Vec<String>,
        /// Hub language used for clustering
        #[arg(long, default_value = concepts_rs::DEFAULT_PIVOT)]
        pivot: String,
        /// Directions with fewer records are sparse
        #[arg(long, default_value_t = concepts_rs::augment::DEFAULT_SPARSE_THRESHOLD)]
        sparse_threshold: usize,
        /// Directions with more records are rich
        #[arg(long, default_value_t = concepts_rs::augment::DEFAULT_RICH_THRESHOLD)]
        rich_threshold: usize,
        /// Maximum senses per language and concept
        #[arg(long, default_value_t = concepts_rs::cluster::DEFAULT_MAX_SENSES)]
        max_senses: usize,
        /// Maximum accepted glosses per dictionary sense
        #[arg(long, default_value_t = 3)]
        max_glosses: usize,
    },
    /// Show row counts and build metadata of an existing store
    Stats,
    /// Classify a gloss and show its canonical lemma
    Classify {
        /// The gloss text
        gloss: String,
        /// Source language of the dictionary entry
        #[arg(long)]
        lang: Option<String>,
        /// Topic category of the sense (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Delete the concept store
    Clear,
}

/// Sets up logging based on verbosity level.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

/// Creates a progress callback that renders one bar per stage.
fn create_progress_callback(
    multi_progress: MultiProgress,
    progress_bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
) -> ProgressCallback {
    Box::new(move |update: ProgressUpdate| {
        let mut bars = progress_bars.lock().unwrap();

        if update.current_item == 0 && !bars.contains_key(&update.stage_description) {
            let pb = multi_progress.add(ProgressBar::new(update.total_items.unwrap_or(0)));
            let style_template = if update.total_items.is_some() {
                "{prefix:>18.cyan.bold} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({percent}%) {msg}"
            } else {
                "{prefix:>18.cyan.bold} [{elapsed_precise}] {spinner} {msg}"
            };

            pb.set_style(
                ProgressStyle::default_bar()
                    .template(style_template)
                    .unwrap()
                    .progress_chars("##-"),
            );
            pb.set_prefix(update.stage_description.clone());
            pb.set_message(update.message.unwrap_or_default());
            pb.enable_steady_tick(Duration::from_millis(100));
            bars.insert(update.stage_description.clone(), pb);
        } else if let Some(pb) = bars.get(&update.stage_description) {
            pb.set_position(update.current_item);
            if let Some(msg) = update.message.clone() {
                pb.set_message(msg);
            }
            if update.is_complete() {
                pb.finish_and_clear();
            }
        }
    })
}

fn store_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.output {
        return Ok(path.clone());
    }
    match &cli.base_dir {
        Some(dir) => Ok(dir.join(data::STORE_FILENAME)),
        None => default_store_path(),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Build {
            languages,
            pivot,
            sparse_threshold,
            rich_threshold,
            max_senses,
            max_glosses,
        } => {
            let options = BuildOptions {
                base_dir: cli.base_dir.clone(),
                output_path: cli.output.clone(),
                languages: languages.clone(),
                pivot: pivot.clone(),
                sparse_threshold: *sparse_threshold,
                rich_threshold: *rich_threshold,
                max_senses_per_language: *max_senses,
                max_glosses_per_sense: *max_glosses,
            };
            handle_build(options).await;
        }
        Commands::Stats => {
            let path = store_path(&cli).unwrap_or_else(|e| exit_with("Error locating store", e));
            match db::read_summary(&path) {
                Ok(summary) => print_summary(&summary),
                Err(e) => exit_with(&format!("Error reading {}", path.display()), e),
            }
        }
        Commands::Classify {
            gloss,
            lang,
            categories,
        } => handle_classify(gloss, lang.as_deref(), categories),
        Commands::Clear => {
            let path = store_path(&cli).unwrap_or_else(|e| exit_with("Error locating store", e));
            info!("Clearing store {:?}...", path);
            match clear_store(&path) {
                Ok(true) => println!("{}", "Store cleared successfully.".green()),
                Ok(false) => println!("No store at {}.", path.display().to_string().yellow()),
                Err(e) => exit_with("Error clearing store", e),
            }
        }
    }

    Ok(())
}

fn exit_with(context: &str, e: impl std::fmt::Display) -> ! {
    error!("{}: {}", context, e);
    eprintln!("{}", format!("{}: {}", context, e).red());
    std::process::exit(1);
}

async fn handle_build(options: BuildOptions) {
    info!("Building concept store...");

    let multi_progress = MultiProgress::new();
    let progress_bars = Arc::new(Mutex::new(HashMap::<String, ProgressBar>::new()));
    let callback = create_progress_callback(multi_progress.clone(), progress_bars.clone());

    let build_handle =
        tokio::task::spawn_blocking(move || build_concept_graph(&options, Some(callback)));

    let build_result = build_handle.await.unwrap_or_else(|e| {
        eprintln!("Error awaiting build task: {}", e);
        std::process::exit(1);
    });

    // Clean up progress bars
    {
        let bars = progress_bars.lock().unwrap();
        for (_, pb) in bars.iter() {
            pb.finish_and_clear();
        }
    }
    drop(multi_progress);
    std::io::stdout().flush().ok();

    match build_result {
        Ok(report) => print_report(&report),
        Err(e) => exit_with("Build failed", e),
    }
}

fn print_report(report: &BuildReport) {
    println!(
        "\n{} {}",
        "Built".green().bold(),
        report.output_path.display().to_string().cyan()
    );
    for augmentation in &report.augmentations {
        println!(
            "  {} {} from {} ({} mirrored onto {} existing)",
            "Augmented".magenta(),
            augmentation.sparse,
            augmentation.rich,
            augmentation.mirrored,
            augmentation.original
        );
    }
    print_stats(&report.stats);
    print_summary(&report.summary);
}

fn print_stats(stats: &BuildStats) {
    println!("\n{}", "Ingestion".bold());
    println!("  Raw records:        {}", stats.raw_records);
    println!("  Accepted:           {}", stats.accepted_records.to_string().green());
    println!("  Inflections:        {}", stats.skipped_inflections);
    println!("  Technical:          {}", stats.skipped_technical);
    println!("  Self/empty:         {}", stats.skipped_self_or_empty);
    println!("  Other language:     {}", stats.skipped_language);
    println!("  Duplicates:         {}", stats.duplicate_records);
    println!("  Malformed:          {}", stats.malformed_records);
    println!("  Missing sources:    {}", stats.missing_sources);
    println!("\n{}", "Clustering".bold());
    println!("  Clustered records:  {}", stats.clustered_records);
    println!("  Mirrored records:   {}", stats.mirrored_records);
    println!("  Pivot-source skip:  {}", stats.excluded_pivot_source);
    println!("  Cross-pair skip:    {}", stats.excluded_cross_pair);
    println!("  New lemmas:         {}", stats.lemmas_from_translations);
}

fn print_summary(summary: &StoreSummary) {
    println!("\n{} {}", "Store".bold(), summary.path.display().to_string().cyan());
    println!("  Size:        {} bytes", summary.file_size);
    if let Some(version) = summary.schema_version {
        println!("  Schema:      v{}", version);
    }
    if let Some(pivot) = &summary.pivot_language {
        println!("  Pivot:       {}", pivot.italic());
    }
    if !summary.languages.is_empty() {
        println!("  Languages:   {}", summary.languages.join(", "));
    }
    if let Some(built_at) = summary.built_at {
        println!("  Built at:    {} (unix)", built_at);
    }
    println!("  Forms:       {}", summary.forms);
    println!("  Lemmas:      {}", summary.lemmas);
    for (lang, count) in &summary.lemmas_per_language {
        println!("    {:<4} {}", lang.dimmed(), count);
    }
    println!("  Concepts:    {}", summary.concepts);
    println!("  Senses:      {}", summary.senses);
}

fn handle_classify(gloss: &str, lang: Option<&str>, categories: &[String]) {
    let classifier = match lang {
        Some(lang) => GlossClassifier::for_language(lang),
        None => GlossClassifier::new(),
    };
    let (verdict, rule) = classifier.classify_with_rule(gloss, categories);
    let verdict_text = match verdict {
        Classification::Genuine => verdict.to_string().green(),
        Classification::InflectionReference => verdict.to_string().yellow(),
        Classification::Technical => verdict.to_string().red(),
    };
    println!("{}: {}", "Verdict".bold(), verdict_text);
    if let Some(rule) = rule {
        println!("{}: {}", "Rule".bold(), rule);
    }
    if verdict == Classification::Genuine {
        let canonical = canonicalize(gloss);
        if canonical.is_empty() {
            println!("{}: {}", "Canonical".bold(), "(empty, discarded)".dimmed());
        } else {
            println!("{}: {}", "Canonical".bold(), canonical.cyan());
        }
    }
}
