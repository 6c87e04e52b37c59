use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,    // Only show progress bar and final summary
    Summary = 1,   // Run stages and totals (default)
    Detailed = 2,  // Per-file details and warnings
    Debug = 3,     // Everything
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

/// User-facing run log: timestamped console lines, a progress bar over records,
/// an optional log-file buffer and the end-of-run summary.
#[derive(Clone)]
pub struct RunLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<RwLock<Option<ProgressBar>>>,
    run_metadata: Arc<Mutex<RunMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<String>,
}

#[derive(Default, Clone)]
struct RunMetadata {
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    records_loaded: usize,
    search_files: usize,
    records_processed: usize,
    matched_records: usize,
    unmatched_records: usize,
    vocabulary_size: usize,
    label_classes: Vec<i32>,
    output_files: Vec<String>,
}

impl RunLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(RwLock::new(None)),
            run_metadata: Arc::new(Mutex::new(RunMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: String) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.print_message("WARN", message);
        }
    }

    /// Errors print at every verbosity.
    pub fn error(&self, message: &str) {
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", Local::now().format("%H:%M:%S%.3f"), level, message);

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Print above an active progress bar instead of through it
        if let Ok(guard) = self.progress_bar.try_read() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    pub fn start_progress(&self, total_records: u64) {
        let pb = if self.verbosity == VerbosityLevel::Silent || total_records == 0 {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_records)
        };

        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("Computing features...");

        if let Ok(mut guard) = self.progress_bar.write() {
            *guard = Some(pb);
        }
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.start_time = Some(SystemTime::now());
        }
    }

    pub fn update_progress(&self, message: &str) {
        if let Ok(guard) = self.progress_bar.read() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(message.to_string());
            }
        }
    }

    /// Safe to call from rayon workers.
    pub fn advance_progress(&self, steps: u64) {
        if let Ok(guard) = self.progress_bar.read() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(steps);
            }
        }
    }

    pub fn finish_progress(&self, final_message: &str) {
        if let Ok(mut guard) = self.progress_bar.write() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.end_time = Some(SystemTime::now());
        }
        self.info(final_message);
    }

    pub fn log_records_loaded(&self, query_path: &Path, search_files: usize, records: usize) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.records_loaded = records;
            metadata.search_files = search_files;
        }
        self.info(&format!(
            "Loaded {} records from {} ({} search result file(s))",
            records,
            query_path.display(),
            search_files
        ));
    }

    pub fn log_label_map(&self, source: &str, classes: &[i32]) {
        self.info(&format!("Label map ({}): {:?}", source, classes));
    }

    pub fn log_run_complete(&self, processed: usize, matched: usize, unmatched: usize, vocabulary_size: usize, classes: &[i32]) {
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.records_processed = processed;
            metadata.matched_records = matched;
            metadata.unmatched_records = unmatched;
            metadata.vocabulary_size = vocabulary_size;
            metadata.label_classes = classes.to_vec();
        }
        self.debug(&format!("Suffix vocabulary holds {} suffixes", vocabulary_size));
    }

    pub fn log_export_start(&self, what: &str, format: &str) {
        self.debug(&format!("Exporting {} as {}", what, format));
    }

    pub fn log_export_success(&self, path: &Path) {
        let path = path.display().to_string();
        self.info(&format!("Export completed: {}", path));
        if let Ok(mut metadata) = self.run_metadata.lock() {
            metadata.output_files.push(path);
        }
    }

    pub fn print_final_summary(&self) {
        let metadata = match self.run_metadata.lock() {
            Ok(metadata) => metadata.clone(),
            Err(_) => return,
        };

        print!("\x1b[2K\r");
        let _ = io::stdout().flush();

        println!("\n=== RUN SUMMARY ===");
        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            let duration = end.duration_since(start).unwrap_or_default();
            println!("Run Duration: {:.2}s", duration.as_secs_f64());
        }
        println!("Records Loaded: {}", metadata.records_loaded);
        println!("Search Result Files: {}", metadata.search_files);
        println!("Records Processed: {}", metadata.records_processed);
        println!("Matched Records: {}", metadata.matched_records);
        println!("Records Without Match: {}", metadata.unmatched_records);
        println!("Suffix Vocabulary Size: {}", metadata.vocabulary_size);
        println!("Label Columns: {:?}", metadata.label_classes);
        for path in &metadata.output_files {
            println!("Written: {}", path);
        }
        println!("===================\n");

        if metadata.records_processed > 0 {
            println!(
                "✅ Features computed for {} records ({} with a matching candidate).",
                metadata.records_processed, metadata.matched_records
            );
        } else {
            println!("✅ Run completed. No records processed.");
        }
    }

    /// Write every buffered log line to the log file, if one was configured.
    pub fn export_logs(&self) -> io::Result<()> {
        let Some(ref log_file_path) = self.log_file_path else {
            return Ok(());
        };
        let buffer = match self.log_buffer.lock() {
            Ok(buffer) => buffer,
            Err(_) => return Ok(()),
        };

        if let Some(parent) = Path::new(log_file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)?;
        for log_entry in buffer.iter() {
            writeln!(file, "{}", log_entry)?;
        }
        file.flush()
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn get_log_count(&self) -> usize {
        self.log_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verbosity_from_count() {
        assert_eq!(VerbosityLevel::from_verbose_count(0), VerbosityLevel::Summary);
        assert_eq!(VerbosityLevel::from_verbose_count(1), VerbosityLevel::Detailed);
        assert_eq!(VerbosityLevel::from_verbose_count(5), VerbosityLevel::Debug);
    }

    #[test]
    fn test_buffer_respects_verbosity() {
        let logger = RunLogger::with_log_file(VerbosityLevel::Summary, "unused.log".to_string());
        logger.info("kept");
        logger.debug("dropped");
        logger.warn("dropped");
        logger.error("kept");
        assert_eq!(logger.get_log_count(), 2);
    }

    #[test]
    fn test_no_buffer_without_log_file() {
        let logger = RunLogger::new(VerbosityLevel::Debug);
        logger.info("message");
        assert!(!logger.is_log_export_enabled());
        assert_eq!(logger.get_log_count(), 0);
    }

    #[test]
    fn test_export_logs_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let logger = RunLogger::with_log_file(VerbosityLevel::Debug, path.display().to_string());
        logger.info("first");
        logger.debug("second");
        logger.export_logs().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO: first"));
        assert!(lines[1].ends_with("DEBUG: second"));
    }

    #[test]
    fn test_progress_lifecycle() {
        let logger = RunLogger::new(VerbosityLevel::Silent);
        logger.start_progress(3);
        logger.advance_progress(1);
        logger.update_progress("half way");
        logger.finish_progress("done");
        logger.advance_progress(1);
        assert!(logger.progress_bar.read().unwrap().is_none());
    }
}
