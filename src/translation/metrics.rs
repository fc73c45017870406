//! Translation metrics and observability.
//!
//! Process-wide counters for calls to the external model, their failures
//! and timeouts, parse yield, and token consumption.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Global translation metrics singleton.
pub struct TranslationMetrics {
    /// Number of calls made to the model
    api_calls: AtomicUsize,

    /// Calls that returned an error (including timeouts)
    api_failures: AtomicUsize,

    /// Calls abandoned because they exceeded the per-call timeout
    timeouts: AtomicUsize,

    /// Source strings sent for translation
    strings_requested: AtomicUsize,

    /// Strings recovered from model output
    strings_parsed: AtomicUsize,

    /// Model output lines that could not be used
    lines_dropped: AtomicUsize,

    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

static METRICS: OnceLock<TranslationMetrics> = OnceLock::new();

impl TranslationMetrics {
    pub fn global() -> &'static TranslationMetrics {
        METRICS.get_or_init(|| TranslationMetrics {
            api_calls: AtomicUsize::new(0),
            api_failures: AtomicUsize::new(0),
            timeouts: AtomicUsize::new(0),
            strings_requested: AtomicUsize::new(0),
            strings_parsed: AtomicUsize::new(0),
            lines_dropped: AtomicUsize::new(0),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        })
    }

    pub fn record_api_call(&self, strings: usize) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.strings_requested.fetch_add(strings, Ordering::Relaxed);
    }

    pub fn record_api_failure(&self) {
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse(&self, parsed: usize, dropped_lines: usize) {
        self.strings_parsed.fetch_add(parsed, Ordering::Relaxed);
        self.lines_dropped.fetch_add(dropped_lines, Ordering::Relaxed);
    }

    pub fn record_tokens(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub fn api_failures(&self) -> usize {
        self.api_failures.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> MetricsReport {
        let calls = self.api_calls();
        let failures = self.api_failures();
        let api_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        let requested = self.strings_requested.load(Ordering::Relaxed);
        let parsed = self.strings_parsed.load(Ordering::Relaxed);
        let parse_yield = if requested > 0 {
            (parsed as f64 / requested as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            api_calls: calls,
            api_failures: failures,
            timeouts: self.timeouts(),
            api_success_rate,
            strings_requested: requested,
            strings_parsed: parsed,
            parse_yield,
            lines_dropped: self.lines_dropped.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    pub fn reset(&self) {
        self.api_calls.store(0, Ordering::Relaxed);
        self.api_failures.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.strings_requested.store(0, Ordering::Relaxed);
        self.strings_parsed.store(0, Ordering::Relaxed);
        self.lines_dropped.store(0, Ordering::Relaxed);
        self.prompt_tokens.store(0, Ordering::Relaxed);
        self.completion_tokens.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub api_calls: usize,
    pub api_failures: usize,
    pub timeouts: usize,
    /// Percentage of calls that returned a response (0-100)
    pub api_success_rate: f64,
    pub strings_requested: usize,
    pub strings_parsed: usize,
    /// Percentage of requested strings recovered from output (0-100)
    pub parse_yield: f64,
    pub lines_dropped: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}
