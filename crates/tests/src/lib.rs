//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 消息服务端到端场景（主 sink、备用 sink、停机排空）
//! - 配置驱动的服务装配

#[cfg(test)]
mod contract_tests {
    use contracts::{MsgPriority, StatsSnapshot};

    #[test]
    fn test_priority_ordinals_are_dense() {
        for (i, priority) in MsgPriority::ALL.iter().enumerate() {
            assert_eq!(priority.ordinal(), i);
        }
        assert_eq!(MsgPriority::SLOWEST.ordinal(), MsgPriority::COUNT - 1);
    }

    #[test]
    fn test_stats_snapshot_json_shape() {
        let json = serde_json::to_value(StatsSnapshot::default()).unwrap();
        for key in ["sent", "send_errors", "fallback_sent", "fallback_errors"] {
            assert_eq!(json[key], 0, "missing {key}");
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{ContractError, DispatchConfig, Message, MessageSink, MsgPriority};
    use dispatcher::{MessageServiceBuilder, NopSink, ServiceState};
    use parking_lot::Mutex;

    /// Sink recording every subject it is offered
    ///
    /// `reject_every` > 0 declines every n-th offer (1-based: n, 2n, ...).
    #[derive(Clone, Default)]
    struct CollectingSink {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
        offers: Arc<AtomicU64>,
        reject_every: u64,
        fail_all: bool,
        delay: Option<Duration>,
    }

    impl CollectingSink {
        fn named(name: &'static str) -> Self {
            Self {
                name,
                ..Default::default()
            }
        }

        fn subjects(&self) -> Vec<String> {
            self.seen.lock().clone()
        }
    }

    impl MessageSink for CollectingSink {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn signal_stop(&mut self) {}

        async fn wait_for_complete_stop(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn send_msg(&mut self, msg: &Message) -> Result<bool, ContractError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.seen.lock().push(msg.subject.clone());
            let n = self.offers.fetch_add(1, Ordering::Relaxed) + 1;

            if self.fail_all {
                return Err(ContractError::sink_send(self.name, "unreachable"));
            }
            Ok(self.reject_every == 0 || n % self.reject_every != 0)
        }
    }

    fn subjects(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    /// Every second message is rejected and handed to the fallback
    #[tokio::test]
    async fn test_alternate_rejections_reach_fallback() {
        let primary = CollectingSink {
            reject_every: 2,
            ..CollectingSink::named("primary")
        };
        let fallback = CollectingSink::named("fallback");
        let mut service = MessageServiceBuilder::new("alternating", DispatchConfig::default())
            .sink(primary.clone())
            .fallback(fallback.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        service.start().await.unwrap();
        for subject in subjects("m", 10) {
            messenger.send_msg(Message::new(MsgPriority::Urgent, subject, "payload"));
        }
        service.stop().await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.sent, 5);
        assert_eq!(stats.send_errors, 5);
        assert_eq!(stats.fallback_attempts(), 5);
        assert_eq!(stats.fallback_sent, 5);
        assert_eq!(primary.subjects().len(), 10);
        assert_eq!(fallback.subjects(), ["m1", "m3", "m5", "m7", "m9"]);
    }

    /// Messages of one priority leave in submission order
    #[tokio::test]
    async fn test_fifo_within_priority() {
        let primary = CollectingSink::named("primary");
        let mut service = MessageServiceBuilder::<_, NopSink>::new("fifo", DispatchConfig::default())
            .sink(primary.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        service.start().await.unwrap();
        let expected = subjects("n", 200);
        for subject in &expected {
            messenger.send_msg(Message::new(MsgPriority::Normal, subject.clone(), ""));
        }
        service.stop().await.unwrap();

        assert_eq!(primary.subjects(), expected);
    }

    /// Queued urgent traffic is served before slower traffic queued earlier
    #[tokio::test]
    async fn test_urgent_served_first() {
        let primary = CollectingSink::named("primary");
        let mut service = MessageServiceBuilder::<_, NopSink>::new("order", DispatchConfig::default())
            .sink(primary.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        service.start().await.unwrap();
        // worker has not run yet on the current-thread runtime
        for subject in subjects("slow", 3) {
            messenger.send_msg(Message::new(MsgPriority::SLOWEST, subject, ""));
        }
        for subject in subjects("fast", 3) {
            messenger.send_msg(Message::new(MsgPriority::Urgent, subject, ""));
        }
        service.stop().await.unwrap();

        assert_eq!(
            primary.subjects(),
            ["fast0", "fast1", "fast2", "slow0", "slow1", "slow2"]
        );
    }

    /// Budgets shrink per level but lower levels still get a turn each cycle
    #[tokio::test]
    async fn test_lower_levels_not_starved() {
        let primary = CollectingSink::named("primary");
        let config = DispatchConfig {
            initial_budget: 2,
            poll_interval_ms: 10,
            ..Default::default()
        };
        let mut service = MessageServiceBuilder::<_, NopSink>::new("budget", config)
            .sink(primary.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        service.start().await.unwrap();
        for subject in subjects("u", 5) {
            messenger.send_msg(Message::new(MsgPriority::Urgent, subject, ""));
        }
        for subject in subjects("n", 2) {
            messenger.send_msg(Message::new(MsgPriority::Normal, subject, ""));
        }
        for subject in subjects("b", 2) {
            messenger.send_msg(Message::new(MsgPriority::BelowNormal, subject, ""));
        }

        // wait for the running loop, not the final drain
        tokio::time::timeout(Duration::from_secs(5), async {
            while messenger.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        service.stop().await.unwrap();

        assert_eq!(
            primary.subjects(),
            ["u0", "u1", "n0", "b0", "u2", "u3", "n1", "b1", "u4"]
        );
    }

    /// With two levels configured, the slowest priority shares the last queue
    #[tokio::test]
    async fn test_priority_clamped_to_last_queue() {
        let primary = CollectingSink::named("primary");
        let config = DispatchConfig {
            priority_levels: 2,
            ..Default::default()
        };
        let mut service = MessageServiceBuilder::<_, NopSink>::new("clamp", config)
            .sink(primary.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        service.start().await.unwrap();
        messenger.send_msg(Message::new(MsgPriority::BelowNormal, "below", ""));
        messenger.send_msg(Message::new(MsgPriority::Normal, "normal", ""));
        messenger.send_msg(Message::new(MsgPriority::Urgent, "urgent", ""));
        service.stop().await.unwrap();

        // below and normal share queue 1 in FIFO order
        assert_eq!(primary.subjects(), ["urgent", "below", "normal"]);
        assert_eq!(service.stats().sent, 3);
    }

    /// Both sinks failing loses the message but keeps the service alive
    #[tokio::test]
    async fn test_double_failure_is_counted() {
        let failing = CollectingSink {
            fail_all: true,
            ..CollectingSink::named("primary")
        };
        let also_failing = CollectingSink {
            fail_all: true,
            ..CollectingSink::named("fallback")
        };
        let mut service = MessageServiceBuilder::new("doomed", DispatchConfig::default())
            .sink(failing)
            .fallback(also_failing)
            .build()
            .unwrap();
        let messenger = service.messenger();

        service.start().await.unwrap();
        for subject in subjects("x", 4) {
            messenger.send_msg(Message::new(MsgPriority::Normal, subject, ""));
        }
        service.stop().await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.send_errors, 4);
        assert_eq!(stats.fallback_errors, 4);
        assert_eq!(stats.lost(), 4);
        assert_eq!(service.state(), ServiceState::Inactive);
    }

    /// Submissions outside the running state are dropped silently
    #[tokio::test]
    async fn test_send_outside_running_is_ignored() {
        let primary = CollectingSink::named("primary");
        let mut service = MessageServiceBuilder::<_, NopSink>::new("idle", DispatchConfig::default())
            .sink(primary.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        messenger.send_msg(Message::new(MsgPriority::Urgent, "before", ""));
        assert_eq!(messenger.pending(), 0);

        service.start().await.unwrap();
        service.stop().await.unwrap();
        messenger.send_msg(Message::new(MsgPriority::Urgent, "after", ""));

        assert_eq!(messenger.pending(), 0);
        assert!(primary.subjects().is_empty());
        assert!(service.stats().is_empty());
    }

    /// A slow sink cannot hold shutdown hostage past the abort timeout
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drain_is_bounded() {
        let slow = CollectingSink {
            delay: Some(Duration::from_millis(100)),
            ..CollectingSink::named("slow")
        };
        let config = DispatchConfig {
            abort_timeout_ms: 250,
            poll_interval_ms: 50,
            ..Default::default()
        };
        let mut service = MessageServiceBuilder::<_, NopSink>::new("slow", config)
            .sink(slow.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        service.start().await.unwrap();
        for subject in subjects("s", 20) {
            messenger.send_msg(Message::new(MsgPriority::SLOWEST, subject, ""));
        }

        let started = tokio::time::Instant::now();
        service.stop().await.unwrap();

        let sent = service.stats().sent;
        assert!(sent > 0 && sent < 20, "sent {sent}");
        assert_eq!(messenger.pending(), 0);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    /// Declined messages keep reaching the fallback across restarts
    #[tokio::test]
    async fn test_service_survives_and_restarts() {
        let primary = CollectingSink {
            reject_every: 1,
            ..CollectingSink::named("primary")
        };
        let fallback = CollectingSink::named("fallback");
        let mut service = MessageServiceBuilder::new("restart", DispatchConfig::default())
            .sink(primary)
            .fallback(fallback.clone())
            .build()
            .unwrap();
        let messenger = service.messenger();

        for round in 0..2 {
            service.start().await.unwrap();
            messenger.send_msg(Message::new(MsgPriority::Urgent, format!("r{round}"), ""));
            service.stop().await.unwrap();
        }

        assert_eq!(fallback.subjects(), ["r0", "r1"]);
        assert_eq!(service.stats().fallback_sent, 2);
    }
}

#[cfg(test)]
mod config_tests {
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::{Message, MsgPriority};
    use dispatcher::{MessageServiceBuilder, ServiceState};

    /// Service assembled entirely from a TOML file
    #[tokio::test]
    async fn test_config_driven_file_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
name = "outbox"

[dispatch]
poll_interval_ms = 50

[sink]
name = "journal"
sink_type = "file"

[sink.params]
base_path = "{}"
file_name = "journal.jsonl"
"#,
            dir.path().display().to_string().replace('\\', "/")
        );
        let path = dir.path().join("messaging.toml");
        std::fs::write(&path, toml).unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        let mut service = MessageServiceBuilder::from_config(&config)
            .await
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(service.name(), "outbox");
        assert_eq!(service.config().poll_interval_ms, 50);

        service.start().await.unwrap();
        assert_eq!(service.state(), ServiceState::Running);
        let messenger = service.messenger();
        for i in 0..3 {
            messenger.send_msg(
                Message::new(MsgPriority::Normal, format!("note {i}"), "text").with_to("ops"),
            );
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.stop().await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("journal.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["subject"], "note 0");
        assert_eq!(service.stats().sent, 3);
    }

    /// Oversized packets are declined by the network sink and spooled to file
    #[tokio::test]
    async fn test_network_decline_spools_to_fallback_file() {
        let dir = tempfile::tempdir().unwrap();
        let json = serde_json::json!({
            "name": "spool",
            "sink": {
                "name": "udp",
                "sink_type": "network",
                "params": { "addr": "127.0.0.1:9", "max_packet_size": "16" }
            },
            "fallback_sink": {
                "name": "disk",
                "sink_type": "file",
                "params": { "base_path": dir.path().to_string_lossy() }
            }
        });
        let path = dir.path().join("messaging.json");
        std::fs::write(&path, json.to_string()).unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        let mut service = MessageServiceBuilder::from_config(&config)
            .await
            .unwrap()
            .build()
            .unwrap();

        service.start().await.unwrap();
        service
            .messenger()
            .send_msg(Message::new(MsgPriority::Urgent, "too big for udp", "x".repeat(64)));
        service.stop().await.unwrap();

        let stats = service.stats();
        assert_eq!(stats.send_errors, 1);
        assert_eq!(stats.fallback_sent, 1);

        let spooled = std::fs::read_to_string(dir.path().join("messages.jsonl")).unwrap();
        assert!(spooled.contains("too big for udp"));
    }

    #[test]
    fn test_config_without_sink_is_rejected() {
        let result = ConfigLoader::load_from_str(
            "name = \"bare\"",
            config_loader::ConfigFormat::Toml,
        );
        assert!(result.is_err());
    }
}
