//! 消息服务指标收集模块
//!
//! 基于 StatsSnapshot 记录和聚合调度器的投递统计。

use contracts::{MsgPriority, StatsSnapshot};
use metrics::{counter, gauge, histogram};

/// 记录一次统计 dump
///
/// 调度器每个统计周期结束时调用 (计数器随后被清零)。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_stats_dump;
///
/// let snapshot = stats.take_interval();
/// record_stats_dump("mailer", &snapshot);
/// ```
pub fn record_stats_dump(service: &str, snapshot: &StatsSnapshot) {
    counter!("messaging_sink_count", "service" => service.to_string()).increment(snapshot.sent);
    counter!("messaging_sink_error_count", "service" => service.to_string())
        .increment(snapshot.send_errors);
    counter!("messaging_fallback_count", "service" => service.to_string())
        .increment(snapshot.fallback_sent);
    counter!("messaging_fallback_error_count", "service" => service.to_string())
        .increment(snapshot.fallback_errors);

    // 本周期处理量
    histogram!("messaging_dump_processed", "service" => service.to_string())
        .record(snapshot.processed() as f64);
}

/// 记录消息提交
pub fn record_message_submitted(service: &str, priority: MsgPriority) {
    counter!(
        "messaging_messages_submitted_total",
        "service" => service.to_string(),
        "priority" => priority.to_string()
    )
    .increment(1);
}

/// 记录单次投递结果
pub fn record_delivery(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "messaging_deliveries_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录队列深度
pub fn record_queue_depth(service: &str, level: usize, depth: usize) {
    gauge!(
        "messaging_queue_depth",
        "service" => service.to_string(),
        "level" => level.to_string()
    )
    .set(depth as f64);
}

/// 记录停止超时丢弃的消息
pub fn record_shutdown_abort(service: &str, dropped: usize) {
    counter!("messaging_shutdown_dropped_total", "service" => service.to_string())
        .increment(dropped as u64);
}

/// 消息指标聚合器
///
/// 在内存中累加每次 dump，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct MessagingMetricsAggregator {
    /// dump 次数
    pub dumps: u64,

    /// 累计计数
    pub totals: StatsSnapshot,

    /// 每次 dump 的处理量
    pub processed_stats: RunningStats,

    /// 每次 dump 的主 sink 失败率 (%)
    pub error_rate_stats: RunningStats,
}

impl MessagingMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, snapshot: &StatsSnapshot) {
        self.dumps += 1;
        self.totals += *snapshot;

        let processed = snapshot.processed();
        self.processed_stats.push(processed as f64);
        if processed > 0 {
            self.error_rate_stats
                .push(snapshot.send_errors as f64 / processed as f64 * 100.0);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let processed = self.totals.processed();
        let attempts = self.totals.fallback_attempts();
        MetricsSummary {
            dumps: self.dumps,
            totals: self.totals,
            error_rate: if processed > 0 {
                self.totals.send_errors as f64 / processed as f64 * 100.0
            } else {
                0.0
            },
            fallback_error_rate: if attempts > 0 {
                self.totals.fallback_errors as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            processed_per_dump: StatsSummary::from(&self.processed_stats),
            error_rate_per_dump: StatsSummary::from(&self.error_rate_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub dumps: u64,
    pub totals: StatsSnapshot,
    pub error_rate: f64,
    pub fallback_error_rate: f64,
    pub processed_per_dump: StatsSummary,
    pub error_rate_per_dump: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Messaging Metrics Summary ===")?;
        writeln!(f, "Stats dumps: {}", self.dumps)?;
        writeln!(f, "Sent: {}", self.totals.sent)?;
        writeln!(
            f,
            "Send errors: {} ({:.2}%)",
            self.totals.send_errors, self.error_rate
        )?;
        writeln!(f, "Fallback sent: {}", self.totals.fallback_sent)?;
        writeln!(
            f,
            "Fallback errors: {} ({:.2}%)",
            self.totals.fallback_errors, self.fallback_error_rate
        )?;
        writeln!(f, "Processed per dump: {}", self.processed_per_dump)?;
        writeln!(f, "Error rate per dump (%): {}", self.error_rate_per_dump)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
