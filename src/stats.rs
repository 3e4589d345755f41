use crate::chains::ChainKind;
use crate::checks::HealthCheck;
use anyhow::{Context, Result};
use chrono::Utc;
use prettytable::{format, Cell, Row, Table};
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// 吞吐量测试默认请求次数
pub const DEFAULT_REQUEST_COUNT: usize = 20;

/// 低于该耗时视为无法计算 RPS
const MIN_MEASURABLE: Duration = Duration::from_millis(1);

/// 一次吞吐量测试的结果
#[derive(Debug, Clone)]
pub struct ThroughputSample {
    /// 链类型
    pub chain: ChainKind,
    /// 请求次数
    pub attempts: usize,
    /// 成功次数
    pub successes: usize,
    /// 整个测试的耗时
    pub elapsed: Duration,
    /// 成功请求的延迟（毫秒）
    pub latencies_ms: Vec<f64>,
}

/// 成功请求的延迟统计（毫秒）
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
}

impl ThroughputSample {
    /// 每秒成功请求数；耗时过短时返回 `None`
    pub fn requests_per_second(&self) -> Option<f64> {
        if self.elapsed < MIN_MEASURABLE {
            return None;
        }
        Some(self.successes as f64 / self.elapsed.as_secs_f64())
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.successes as f64 / self.attempts as f64
    }

    /// 没有成功请求时返回 `None`
    pub fn latency_summary(&self) -> Option<LatencySummary> {
        if self.latencies_ms.is_empty() {
            return None;
        }

        let mut data = Data::new(self.latencies_ms.clone());
        Some(LatencySummary {
            min: Statistics::min(self.latencies_ms.iter()),
            max: Statistics::max(self.latencies_ms.iter()),
            mean: Statistics::mean(self.latencies_ms.iter()),
            median: data.quantile(0.5),
            p95: data.percentile(95),
        })
    }
}

/// 以静默模式顺序调用 `count` 次健康检查。单次失败只计数，不中断测试。
pub async fn measure_throughput<C>(checker: &C, chain: ChainKind, count: usize) -> ThroughputSample
where
    C: HealthCheck + ?Sized,
{
    let mut successes = 0;
    let mut latencies_ms = Vec::with_capacity(count);

    let start = Instant::now();
    for attempt in 0..count {
        let call_start = Instant::now();
        match checker.check(chain, true).await {
            Ok(_) => {
                successes += 1;
                latencies_ms.push(call_start.elapsed().as_secs_f64() * 1000.0);
            }
            Err(e) => log::debug!("burst request {} failed: {}", attempt + 1, e),
        }
    }
    let elapsed = start.elapsed();

    ThroughputSample {
        chain,
        attempts: count,
        successes,
        elapsed,
        latencies_ms,
    }
}

/// 在控制台中打印吞吐量结果
pub fn print_report(sample: &ThroughputSample) {
    match sample.requests_per_second() {
        Some(rps) => println!(
            "[+] Successful requests: {}/{} in {:.2}s -> RPS: {:.2}",
            sample.successes,
            sample.attempts,
            sample.elapsed.as_secs_f64(),
            rps
        ),
        None => println!("[!] Duration too short to measure RPS"),
    }

    let Some(summary) = sample.latency_summary() else {
        return;
    };

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);

    table.add_row(Row::new(vec![
        Cell::new("Chain"),
        Cell::new("Success rate"),
        Cell::new("Min (ms)"),
        Cell::new("Max (ms)"),
        Cell::new("Mean (ms)"),
        Cell::new("Median (ms)"),
        Cell::new("P95 (ms)"),
    ]));

    // 根据成功率设置颜色
    let success_rate_color = if sample.success_rate() >= 0.9 {
        "Fg=Green"
    } else if sample.success_rate() >= 0.5 {
        "Fg=Yellow"
    } else {
        "Fg=Red"
    };

    table.add_row(Row::new(vec![
        Cell::new(&sample.chain.to_string()),
        Cell::new(&format!("{:.2}%", sample.success_rate() * 100.0)).style_spec(success_rate_color),
        Cell::new(&format!("{:.2}", summary.min)),
        Cell::new(&format!("{:.2}", summary.max)),
        Cell::new(&format!("{:.2}", summary.mean)),
        Cell::new(&format!("{:.2}", summary.median)),
        Cell::new(&format!("{:.2}", summary.p95)),
    ]));

    table.printstd();
}

/// CSV 中的一行
#[derive(Debug, Serialize)]
struct ThroughputRecord<'a> {
    timestamp: String,
    endpoint: &'a str,
    chain: String,
    attempts: usize,
    successes: usize,
    elapsed_s: String,
    rps: Option<String>,
    min_latency_ms: Option<String>,
    mean_latency_ms: Option<String>,
    p95_latency_ms: Option<String>,
}

/// 将吞吐量结果追加到 CSV 文件，新文件会先写表头
pub fn append_to_csv(sample: &ThroughputSample, endpoint: &str, output_path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_path)
        .with_context(|| format!("failed to open {}", output_path.display()))?;
    let is_new = file.metadata()?.len() == 0;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);

    let summary = sample.latency_summary();
    wtr.serialize(ThroughputRecord {
        timestamp: Utc::now().to_rfc3339(),
        endpoint,
        chain: sample.chain.to_string(),
        attempts: sample.attempts,
        successes: sample.successes,
        elapsed_s: format!("{:.3}", sample.elapsed.as_secs_f64()),
        rps: sample.requests_per_second().map(|rps| format!("{:.2}", rps)),
        min_latency_ms: summary.as_ref().map(|s| format!("{:.2}", s.min)),
        mean_latency_ms: summary.as_ref().map(|s| format!("{:.2}", s.mean)),
        p95_latency_ms: summary.as_ref().map(|s| format!("{:.2}", s.p95)),
    })?;

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::Liveness;
    use crate::error::CheckError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 每次调用耗时固定、前 `failures` 次失败的模拟检查
    struct FakeCheck {
        delay: Duration,
        failures: usize,
        calls: AtomicUsize,
    }

    impl FakeCheck {
        fn new(delay: Duration, failures: usize) -> Self {
            Self {
                delay,
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl HealthCheck for FakeCheck {
        async fn check(&self, chain: ChainKind, silent: bool) -> Result<Liveness, CheckError> {
            assert!(silent, "burst calls must be silent");
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if call < self.failures {
                return Err(CheckError::LivenessAbsent {
                    chain,
                    indicator: "slot info",
                });
            }
            Ok(Liveness::Slot(call as u64))
        }
    }

    fn sample(successes: usize, elapsed: Duration) -> ThroughputSample {
        ThroughputSample {
            chain: ChainKind::Evm,
            attempts: 20,
            successes,
            elapsed,
            latencies_ms: vec![],
        }
    }

    #[test]
    fn test_rps_over_one_second() {
        let s = sample(20, Duration::from_secs(1));
        assert_eq!(s.requests_per_second(), Some(20.0));
        assert_eq!(s.success_rate(), 1.0);
    }

    #[test]
    fn test_rps_duration_too_short() {
        assert_eq!(sample(20, Duration::ZERO).requests_per_second(), None);
        assert_eq!(sample(20, Duration::from_micros(300)).requests_per_second(), None);
        assert!(sample(20, MIN_MEASURABLE).requests_per_second().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_always_succeeding_burst() {
        // 暂停时钟下 20 次 50ms 的调用正好耗时 1 秒
        let checker = FakeCheck::new(Duration::from_millis(50), 0);
        let s = measure_throughput(&checker, ChainKind::Solana, DEFAULT_REQUEST_COUNT).await;

        assert_eq!(s.attempts, 20);
        assert_eq!(s.successes, 20);
        assert_eq!(s.elapsed, Duration::from_secs(1));
        assert_eq!(s.requests_per_second(), Some(20.0));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_tolerates_failures() {
        let checker = FakeCheck::new(Duration::from_millis(100), 5);
        let s = measure_throughput(&checker, ChainKind::Sui, 10).await;

        assert_eq!(s.attempts, 10);
        assert_eq!(s.successes, 5);
        assert_eq!(s.latencies_ms.len(), 5);
        assert_eq!(s.requests_per_second(), Some(5.0));
        assert_eq!(s.success_rate(), 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_instant_burst_is_too_short() {
        let checker = FakeCheck::new(Duration::ZERO, 0);
        let s = measure_throughput(&checker, ChainKind::Evm, DEFAULT_REQUEST_COUNT).await;

        assert_eq!(s.successes, 20);
        assert_eq!(s.requests_per_second(), None);
    }

    #[test]
    fn test_latency_summary() {
        let mut s = sample(4, Duration::from_secs(1));
        assert!(s.latency_summary().is_none());

        s.latencies_ms = vec![40.0, 10.0, 30.0, 20.0];
        let summary = s.latency_summary().expect("summary");
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 40.0);
        assert_eq!(summary.mean, 25.0);
        assert!(summary.median >= 20.0 && summary.median <= 30.0);
        assert!(summary.p95 >= 30.0 && summary.p95 <= 40.0);
    }

    #[test]
    fn test_append_to_csv_writes_header_once() {
        let path = std::env::temp_dir().join(format!("rpc-probe-{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut s = sample(20, Duration::from_secs(1));
        s.latencies_ms = vec![10.0; 20];
        append_to_csv(&s, "http://node.example", &path).expect("first write");
        append_to_csv(&s, "http://node.example", &path).expect("second write");

        let content = std::fs::read_to_string(&path).expect("read csv");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,endpoint,chain,attempts,successes"));
        assert!(lines[1].contains(",http://node.example,EVM,20,20,1.000,20.00,"));

        let _ = std::fs::remove_file(&path);
    }
}
