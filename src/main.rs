use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use domainmatch::batch::load_records;
use domainmatch::cli::{Cli, Commands};
use domainmatch::config::{self, AppConfig, OutputFormat};
use domainmatch::domain_utils::CanonicalDomain;
use domainmatch::export;
use domainmatch::labels::LabelEncoder;
use domainmatch::logger::{RunLogger, VerbosityLevel};
use domainmatch::pipeline::{Pipeline, PipelineOptions};
use domainmatch::prediction::{decode_predictions, load_predictions};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let ansi = !cli.no_color && std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(ansi)
        .with_writer(io::stderr)
        .init();

    // Handle --init flag first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run domainmatch again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = cli.validate() {
        eprintln!("❌ Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    let logger = match &cli.log_file {
        Some(path) => RunLogger::with_log_file(verbosity, path.clone()),
        None => RunLogger::new(verbosity),
    };

    let app_config = if cli.needs_config() {
        Some(load_config(cli.config.as_deref()))
    } else {
        None
    };

    let result = match (cli.command, app_config) {
        (Some(Commands::Canon { urls }), _) => {
            run_canon(&urls);
            Ok(())
        }
        (
            Some(Commands::Features { query, search, output_dir, format, label_map, threads, sequential }),
            Some(app_config),
        ) => {
            let format = format
                .as_deref()
                .and_then(OutputFormat::parse)
                .unwrap_or(app_config.output.format);
            let options = FeatureRun { query, search, output_dir, format, label_map, threads, sequential };
            run_features(&app_config, &logger, options)
        }
        (Some(Commands::Decode { query, search, predictions, label_map, output }), Some(app_config)) => {
            run_decode(&app_config, &logger, &query, &search, &predictions, &label_map, output)
        }
        _ => Ok(()),
    };

    if logger.is_log_export_enabled() {
        if let Err(e) = logger.export_logs() {
            eprintln!("⚠️  Failed to export logs: {}", e);
        }
    }

    if let Err(e) = result {
        logger.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Load configuration, offering to create the default file when it is missing.
fn load_config(path: Option<&Path>) -> AppConfig {
    let loaded = match path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    };

    match loaded {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            let prompted = if path.as_path() == Path::new(config::CONFIG_PATH) {
                AppConfig::prompt_create_config()
            } else {
                Ok(None)
            };
            match prompted {
                Ok(Some(created_path)) => {
                    println!("✅ Created default configuration file at: {}", created_path.display());
                    println!("   Edit this file to customize settings, then run domainmatch again.");
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", path.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

struct FeatureRun {
    query: PathBuf,
    search: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    format: OutputFormat,
    label_map: Option<PathBuf>,
    threads: Option<usize>,
    sequential: bool,
}

fn run_features(app_config: &AppConfig, logger: &RunLogger, run: FeatureRun) -> Result<()> {
    let output_dir = run
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&app_config.output.directory));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let search_paths: Vec<&Path> = run.search.iter().map(PathBuf::as_path).collect();
    let records = load_records(&run.query, &search_paths, &app_config.input)?;
    logger.log_records_loaded(&run.query, search_paths.len(), records.len());

    let options = PipelineOptions {
        parallel: app_config.processing.parallel && !run.sequential,
        threads: run.threads.unwrap_or(app_config.processing.threads),
        suffix_pattern: app_config.suffix_regex()?,
    };
    let mut pipeline = Pipeline::new(options);
    if let Some(path) = &run.label_map {
        let encoder = LabelEncoder::load(path)?;
        logger.log_label_map(&format!("loaded from {}", path.display()), encoder.classes());
        pipeline = pipeline.with_encoder(encoder);
    }

    logger.start_progress(records.len() as u64);
    let output = pipeline.run_with_progress(&records, |n| logger.advance_progress(n));
    logger.finish_progress(&format!("Computed features for {} records", records.len()));
    let output = output?;

    if run.label_map.is_none() {
        logger.log_label_map("fitted", output.encoder.classes());
    }
    let summary = &output.summary;
    logger.log_run_complete(
        summary.total_records,
        summary.matched_records,
        summary.unmatched_records,
        summary.vocabulary_size,
        &summary.label_classes,
    );

    let features_path = output_dir.join(format!(
        "{}.{}",
        app_config.output.features_file,
        run.format.extension()
    ));
    logger.log_export_start("features", run.format.extension());
    match run.format {
        OutputFormat::Csv => export::export_features_csv(&output.features, &app_config.input.entity_column, &features_path)?,
        OutputFormat::Json => export::export_features_json(&output.features, summary, &features_path)?,
    }
    logger.log_export_success(&features_path);

    let entity_ids: Vec<&str> = output.features.iter().map(|f| f.entity_id.as_str()).collect();
    let labels_path = output_dir.join(&app_config.output.labels_file);
    export::export_labels_csv(
        &entity_ids,
        &output.label_matrix,
        &output.encoder,
        &app_config.input.entity_column,
        &labels_path,
    )?;
    logger.log_export_success(&labels_path);

    let label_map_path = output_dir.join(&app_config.output.label_map_file);
    output.encoder.save(&label_map_path)?;
    logger.log_export_success(&label_map_path);

    let summary_path = output_dir.join(&app_config.output.summary_file);
    summary.export(&summary_path)?;
    logger.log_export_success(&summary_path);

    logger.print_final_summary();
    Ok(())
}

fn run_decode(
    app_config: &AppConfig,
    logger: &RunLogger,
    query: &Path,
    search: &[PathBuf],
    predictions: &Path,
    label_map: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let search_paths: Vec<&Path> = search.iter().map(PathBuf::as_path).collect();
    let records = load_records(query, &search_paths, &app_config.input)?;
    logger.log_records_loaded(query, search_paths.len(), records.len());

    let encoder = LabelEncoder::load(label_map)?;
    logger.log_label_map(&format!("loaded from {}", label_map.display()), encoder.classes());

    let rows = load_predictions(predictions, &app_config.input.entity_column, &encoder)?;
    let decoded = decode_predictions(&records, &rows, &encoder)
        .with_context(|| format!("Failed to decode predictions from {}", predictions.display()))?;

    let output_path = output.unwrap_or_else(|| {
        Path::new(&app_config.output.directory).join(&app_config.output.predictions_file)
    });
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    export::export_predictions_csv(&decoded, &output_path)?;
    logger.log_export_success(&output_path);
    logger.info(&format!("Decoded {} predictions", decoded.len()));
    for prediction in decoded.iter().take(10) {
        logger.debug(&format!(
            "{}: {} ({})",
            prediction.entity_id,
            prediction.predicted_url(),
            prediction.predicted_domain()
        ));
    }

    Ok(())
}

fn run_canon(urls: &[String]) {
    for url in urls.iter().filter(|u| !u.trim().is_empty()) {
        let domain = CanonicalDomain::from_url(Some(url.as_str()));
        println!(
            "{}\t{}\t{}",
            url,
            domain.host.as_deref().unwrap_or("-"),
            domain.registrable.as_deref().unwrap_or("-")
        );
    }
}
