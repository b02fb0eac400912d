//! Terminal progress for the CLI.
//!
//! In log-only mode bars stay hidden and phases report through periodic
//! `[phase] n/total (pct%)` lines on stderr, which survive `tail -f`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    log_only: bool,
}

impl Progress {
    pub fn new(log_only: bool) -> Self {
        Self { log_only }
    }

    pub fn bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if self.log_only {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(msg.to_string());
        pb
    }

    pub fn spinner(&self, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if self.log_only {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            if let Ok(style) = ProgressStyle::default_spinner().template("{msg} {spinner} [{elapsed_precise}]") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Print a progress line every `interval` steps and at the end.
    pub fn log(&self, phase: &str, current: u64, total: u64, interval: u64) {
        if let Some(line) = self.log_line(phase, current, total, interval) {
            eprintln!("{}", line);
        }
    }

    fn log_line(&self, phase: &str, current: u64, total: u64, interval: u64) -> Option<String> {
        if !self.log_only || total == 0 {
            return None;
        }
        if current % interval.max(1) != 0 && current != total {
            return None;
        }
        let pct = 100.0 * current as f64 / total as f64;
        Some(format!("[{}] {}/{} ({:.1}%)", phase, current, total, pct))
    }
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
