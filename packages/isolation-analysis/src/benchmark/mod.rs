//! Benchmark log summary
//!
//! Scans libtest bench output for `bench: N ns/iter` lines. Thousands
//! separators inside `N` are ignored.

use std::fmt;
use std::io::{self, BufRead};

const BENCH_MARKER: &str = "bench:";
const UNIT_MARKER: &str = "ns/iter";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BenchSummary {
    pub count: u64,
    pub total: u64,
}

impl BenchSummary {
    /// Mean ns/iter; zero when nothing was measured
    pub fn average(&self) -> u64 {
        self.total / self.count.max(1)
    }

    pub fn add(&mut self, ns_per_iter: u64) {
        self.count += 1;
        self.total = self.total.saturating_add(ns_per_iter);
    }
}

impl fmt::Display for BenchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Count: {}, Total: {}, Average: {}",
            self.count,
            self.total,
            self.average()
        )
    }
}

/// Value of one bench line, `None` if the line is not a measurement
pub fn parse_line(line: &str) -> Option<u64> {
    let begin = line.find(BENCH_MARKER)? + BENCH_MARKER.len();
    let end = line[begin..].find(UNIT_MARKER)? + begin;
    let digits: String = line[begin..end]
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

pub fn summarize(reader: impl BufRead) -> io::Result<BenchSummary> {
    let mut summary = BenchSummary::default();
    for line in reader.lines() {
        let line = line?;
        if !line.contains(BENCH_MARKER) {
            continue;
        }
        match parse_line(&line) {
            Some(value) => summary.add(value),
            None => tracing::warn!(line = %line, "bench line without a value; skipped"),
        }
    }
    Ok(summary)
}
