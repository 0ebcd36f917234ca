//! Statistics aggregator for newline-delimited float streams
//!
//! Reads one floating-point value per line on stdin and prints count, sum,
//! mean, max, min and population standard deviation on one line. Feed it a
//! cadence log, or one column of a prediction log:
//!
//! ```sh
//! stats < out/cadence-client-0.txt
//! cut -d' ' -f1 out/pred-client-0.txt | stats
//! ```

use std::io::{self, BufRead};
use std::process::ExitCode;

#[derive(Debug, PartialEq)]
struct Summary {
    count: usize,
    sum: f64,
    mean: f64,
    max: f64,
    min: f64,
    stddev: f64,
}

fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    Some(Summary {
        count,
        sum,
        mean,
        max,
        min,
        stddev: variance.sqrt(),
    })
}

fn main() -> io::Result<ExitCode> {
    let stdin = io::stdin();
    let mut values = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => eprintln!("skipping unparseable line: {trimmed}"),
        }
    }

    match summarize(&values) {
        Some(s) => {
            println!(
                "{} {} {} {} {} {}",
                s.count, s.sum, s.mean, s.max, s.min, s.stddev
            );
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("no values on stdin");
            Ok(ExitCode::FAILURE)
        }
    }
}
