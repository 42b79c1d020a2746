//! Wall-clock timing for the stand-alone benchmark runner.

use std::time::{Duration, Instant};

/// Accumulating stopwatch.
#[derive(Debug, Default)]
pub struct Timer {
    start: Option<Instant>,
    total: Duration,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
    }

    /// Stop and add the lap to the total. Returns the lap.
    pub fn stop(&mut self) -> Duration {
        match self.start.take() {
            Some(start) => {
                let elapsed = start.elapsed();
                self.total += elapsed;
                elapsed
            }
            None => Duration::ZERO,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn total_ms(&self) -> f64 {
        self.total.as_secs_f64() * 1000.0
    }
}

/// Summary of repeated timings, in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkStats {
    pub runs: usize,
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub median_ms: f64,
}

impl BenchmarkStats {
    /// `None` when no time was recorded.
    pub fn from_times(mut times: Vec<f64>) -> Option<Self> {
        if times.is_empty() {
            return None;
        }
        times.sort_by(f64::total_cmp);

        let n = times.len();
        let mean = times.iter().sum::<f64>() / n as f64;
        let variance = times.iter().map(|&t| (t - mean).powi(2)).sum::<f64>() / n as f64;
        let median = if n % 2 == 0 {
            (times[n / 2 - 1] + times[n / 2]) / 2.0
        } else {
            times[n / 2]
        };

        Some(Self {
            runs: n,
            mean_ms: mean,
            std_dev_ms: variance.sqrt(),
            min_ms: times[0],
            max_ms: times[n - 1],
            median_ms: median,
        })
    }
}

/// Run `f` `warmup` times untimed, then `iterations` times timed.
///
/// Returns the last result together with the timing summary.
pub fn benchmark_with_warmup<F, R>(
    warmup: usize,
    iterations: usize,
    mut f: F,
) -> (Option<R>, Option<BenchmarkStats>)
where
    F: FnMut() -> R,
{
    for _ in 0..warmup {
        let _ = f();
    }

    let mut last = None;
    let mut times = Vec::with_capacity(iterations);
    let mut timer = Timer::new();
    for _ in 0..iterations {
        timer.start();
        let result = f();
        times.push(timer.stop().as_secs_f64() * 1000.0);
        last = Some(result);
    }
    (last, BenchmarkStats::from_times(times))
}
