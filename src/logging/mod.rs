//! Logging and output control
//!
//! This module provides the [`Logger`] used by every stage of a sync run.
//! It supports quiet and verbose output and stamps each line with the time
//! elapsed since the run started, so worker output from a long run can be
//! correlated without a wall clock.

use std::time::{Duration, Instant};

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
    pub quiet: bool,
    pub start_time: Instant,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            quiet: false,
            start_time: Instant::now(),
        }
    }

    pub fn new_quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
            start_time: Instant::now(),
        }
    }

    fn stamp(&self) -> String {
        format!("[{:>8.1}s]", self.start_time.elapsed().as_secs_f64())
    }

    /// Main section heading
    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n=== {} ===", title);
        }
    }

    /// Sub-section heading
    pub fn subsection(&self, title: &str) {
        if !self.quiet {
            println!("\n--- {} ---", title);
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("📝 {} {}", self.stamp(), message);
        }
    }

    /// Information message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("ℹ️  {} {}", self.stamp(), message);
        }
    }

    /// Success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("✅ {} {}", self.stamp(), message);
        }
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("⚠️  {} WARNING: {}", self.stamp(), message);
        }
    }

    /// Error message, printed even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("❌ {} ERROR: {}", self.stamp(), message);
    }

    /// Step information
    pub fn step(&self, message: &str) {
        if !self.quiet {
            println!("▶️  {} {}", self.stamp(), message);
        }
    }

    /// Detailed information (only shown in verbose mode)
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            println!("   {}", message);
        }
    }

    /// Key-value pair summary display
    pub fn summary_kv(&self, title: &str, items: &[(&str, String)]) {
        if !self.quiet {
            self.subsection(title);
            let width = items.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
            for (key, value) in items {
                println!("  {:<width$} : {}", key, value, width = width);
            }
        }
    }

    // Plain list output; used for --print-list so it ignores quiet mode
    pub fn list(&self, title: &str, items: &[String]) {
        println!("\n📋 {}", title);
        for item in items {
            println!("{}", item);
        }
        if items.is_empty() {
            println!("  (No items to display)");
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        let secs = duration.as_secs();
        if secs < 60 {
            format!("{:.1}s", duration.as_secs_f64())
        } else if secs < 3600 {
            format!("{}m{}s", secs / 60, secs % 60)
        } else {
            format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}
