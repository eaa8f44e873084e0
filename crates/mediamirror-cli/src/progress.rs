use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use mediamirror_core::{Confirm, ProgressReporter};
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Metadata resolution: spinner
/// - Sync: bar over the pending file count
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_metadata_fetch(&self, url: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICKS));
        }
        pb.set_message(format!("Resolving {}", url));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_plan_complete(&self, items: usize, files: usize) {
        self.finish_bar();
        eprintln!(
            "  {} Planned {} items, {} files",
            "✓".green(),
            items,
            files
        );
    }

    fn on_sync_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Downloading [{bar:30.cyan/dim}] {pos}/{len} {msg}",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICKS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_file_start(&self, filepath: &str) {
        self.with_bar(|pb| pb.set_message(filepath.to_string()));
    }

    fn on_file_complete(&self, filepath: &str, success: bool) {
        self.with_bar(|pb| {
            if !success {
                pb.println(format!("  {} {}", "✗".red(), filepath));
            }
            pb.inc(1);
        });
    }

    fn on_sync_complete(&self, downloaded: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        let failed = if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        };
        eprintln!(
            "  {} Sync complete: {} downloaded, {} failed in {:.2}s",
            "✓".green(),
            downloaded,
            failed,
            duration_secs
        );
    }
}

/// Blocking `(y/N)` prompt on the controlling terminal.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> mediamirror_core::Result<bool> {
        Ok(prompt_confirm(prompt, Some(false))?)
    }
}

pub fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        // EOF means nobody is there to say yes.
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
