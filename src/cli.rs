use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "domainmatch")]
#[command(about = "Builds entity-to-URL matching features and multi-label targets for company website discovery")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Create default configuration file at ./config/domainmatch.toml
    #[arg(long, global = true)]
    pub init: bool,

    /// Configuration file (defaults to ./config/domainmatch.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging (use -v for details and warnings, -vv for debug output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export execution logs to a file (specify file path)
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    /// Disable colored output (also respects NO_COLOR environment variable)
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute feature rows and match labels for a batch of records
    Features {
        /// Query table: entity id, official name, abbreviation and known URL
        #[arg(short, long, value_name = "FILE")]
        query: PathBuf,

        /// Search result table(s) holding the candidate URL columns; repeatable.
        /// Without it, candidates are read from the query table
        #[arg(short, long, value_name = "FILE")]
        search: Vec<PathBuf>,

        /// Output directory (overrides config)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Feature table format: 'csv' or 'json' (overrides config)
        #[arg(short, long)]
        format: Option<String>,

        /// Reuse an existing label map instead of fitting a new one
        #[arg(long, value_name = "FILE")]
        label_map: Option<PathBuf>,

        /// Worker threads (0 = one per core, overrides config)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Process records on the calling thread only
        #[arg(long)]
        sequential: bool,
    },

    /// Turn a classifier's binary predictions back into candidate URLs
    Decode {
        /// Query table the predictions were made for
        #[arg(short, long, value_name = "FILE")]
        query: PathBuf,

        /// Search result table(s) holding the candidate URL columns; repeatable
        #[arg(short, long, value_name = "FILE")]
        search: Vec<PathBuf>,

        /// Prediction table with one 0/1 column per label-map class
        #[arg(short, long, value_name = "FILE")]
        predictions: PathBuf,

        /// Label map written by the features command
        #[arg(short, long, value_name = "FILE")]
        label_map: PathBuf,

        /// Output CSV (defaults to the configured predictions file)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the canonical host and registrable domain of URLs
    Canon {
        /// URLs to canonicalize
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            None if !self.init => {
                Err("A command is required (features, decode or canon), or use --init".to_string())
            }
            Some(Commands::Features { format, threads, sequential, .. }) => {
                if let Some(format) = format {
                    if OutputFormat::parse(format).is_none() {
                        return Err("Output format must be 'csv' or 'json'".to_string());
                    }
                }
                if let Some(threads) = threads {
                    if *threads > 256 {
                        return Err("Threads cannot exceed 256".to_string());
                    }
                    if *sequential && *threads > 1 {
                        return Err("--threads cannot be combined with --sequential".to_string());
                    }
                }
                Ok(())
            }
            Some(Commands::Canon { urls }) if urls.iter().all(|u| u.trim().is_empty()) => {
                Err("At least one non-empty URL is required".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Whether the command needs the configuration file.
    pub fn needs_config(&self) -> bool {
        !matches!(self.command, Some(Commands::Canon { .. }) | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_features_args() {
        let cli = parse(&[
            "domainmatch", "-vv", "features", "--query", "q.csv", "--search", "a.csv", "--search", "b.csv",
            "--format", "json", "-j", "4",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Features { query, search, format, threads, sequential, .. }) => {
                assert_eq!(query, PathBuf::from("q.csv"));
                assert_eq!(search, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
                assert_eq!(format.as_deref(), Some("json"));
                assert_eq!(threads, Some(4));
                assert!(!sequential);
            }
            other => panic!("expected features command, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let cli = parse(&["domainmatch", "features", "-q", "q.csv", "-f", "parquet"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_validate_requires_command_without_init() {
        assert!(parse(&["domainmatch"]).validate().is_err());
        assert!(parse(&["domainmatch", "--init"]).validate().is_ok());
    }

    #[test]
    fn test_canon_needs_no_config() {
        let cli = parse(&["domainmatch", "canon", "https://www.acme.be"]);
        assert!(cli.validate().is_ok());
        assert!(!cli.needs_config());
    }

    #[test]
    fn test_decode_requires_label_map() {
        assert!(Cli::try_parse_from(["domainmatch", "decode", "-q", "q.csv", "-p", "p.csv"]).is_err());
        let cli = parse(&["domainmatch", "decode", "-q", "q.csv", "-p", "p.csv", "-l", "labels.json"]);
        assert!(cli.needs_config());
    }
}
