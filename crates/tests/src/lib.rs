//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Contract snapshot tests (wire shape of results, full config parse)
//! - End-to-end `notify` through configured backends and transports

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ConsumerRecord, DeliveryOutcome, DiscoveryBackendType, DispatchResult, FanoutPolicy,
        TransportError, TransportType,
    };

    const FULL_CONFIG: &str = r#"
version = "V1"

[relay]
default_endpoint = "events"
send_timeout_ms = 250
short_circuit_any = true
refresh_on_failure = false

[discovery]
backend = "file"
cache_ttl_ms = 1000
stale_grace_ms = 5000
timeout_ms = 500

[discovery.params]
path = "/etc/relay/registry.json"

[[transports]]
name = "udp"
transport_type = "udp"

[transports.params]
bind = "0.0.0.0:0"

[[transports]]
name = "audit"
transport_type = "log"
"#;

    #[test]
    fn test_full_config_parses() {
        let config = ConfigLoader::load_from_str(FULL_CONFIG, ConfigFormat::Toml).unwrap();

        assert_eq!(config.relay.default_endpoint, "events");
        assert!(config.relay.short_circuit_any);
        assert!(!config.relay.refresh_on_failure);
        assert_eq!(config.discovery.backend, DiscoveryBackendType::File);
        assert_eq!(config.discovery.stale_grace_ms, 5000);
        assert_eq!(config.transports[0].transport_type, TransportType::Udp);
        assert_eq!(config.transports[1].name, "audit");
    }

    #[test]
    fn test_dispatch_result_json_shape() {
        let record = ConsumerRecord {
            label: "FOO".into(),
            address: "host1".to_string(),
            transport_kind: "http".to_string(),
            fanout_group: "g1".to_string(),
            policy: FanoutPolicy::All,
        };
        let result = DispatchResult {
            label: "FOO".into(),
            endpoint: "key".to_string(),
            succeeded: false,
            outcomes: vec![
                DeliveryOutcome::delivered(record.clone()),
                DeliveryOutcome::failed(record, TransportError::unknown("http")),
            ],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "FOO");
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["outcomes"][0]["status"], "delivered");
        assert_eq!(json["outcomes"][1]["status"], "failed");
        assert_eq!(json["outcomes"][1]["error"], "unknown transport kind 'http'");
        assert_eq!(json["outcomes"][1]["record"]["policy"], "all");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ConsumerEntry, DiscoveryBackend, DiscoveryError, FanoutPolicy, ServiceConfig,
        TransportError,
    };
    use discovery::{DirectoryConfig, DiscoveryDirectory, FileDiscovery, StaticDiscovery};
    use dispatcher::{DispatchError, Dispatcher, MemoryTransport};
    use observability::RelayMetricsAggregator;
    use tokio::net::UdpSocket;

    /// Static table that counts queries and answers slowly
    #[derive(Clone)]
    struct CountingBackend {
        inner: StaticDiscovery,
        calls: Arc<AtomicUsize>,
    }

    impl CountingBackend {
        fn new(services: Vec<ServiceConfig>) -> Self {
            Self {
                inner: StaticDiscovery::new(services),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DiscoveryBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        async fn list_consumers(&self, label: &str) -> Result<Vec<ConsumerEntry>, DiscoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.list_consumers(label).await
        }
    }

    fn service(name: &str, hosts: &[&str], transport: &str, policy: FanoutPolicy) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            labels: vec!["FOO".to_string()],
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            transport: transport.to_string(),
            policy,
        }
    }

    fn registry_json(hosts: &[&str]) -> String {
        serde_json::json!({
            "services": [{
                "name": "g1",
                "labels": ["FOO"],
                "hosts": hosts,
                "transport": "http",
                "policy": "all",
            }]
        })
        .to_string()
    }

    /// "FOO" → one ANY consumer, send succeeds
    #[tokio::test]
    async fn test_scenario_single_consumer() {
        let http = MemoryTransport::new();
        let directory = DiscoveryDirectory::new(
            StaticDiscovery::new(vec![service("g1", &["host1"], "http", FanoutPolicy::Any)]),
            DirectoryConfig::default(),
        );
        let dispatcher = Dispatcher::builder(directory)
            .transport("http", http.clone())
            .build();

        let result = dispatcher.notify("FOO", "payload", None).await.unwrap();

        assert!(result.succeeded);
        assert_eq!(result.outcomes.len(), 1);
        assert!(result.outcomes[0].is_delivered());
        assert_eq!(http.delivered_to("host1").await, 1);
    }

    /// "FOO" → ALL group of two, one times out
    #[tokio::test(start_paused = true)]
    async fn test_scenario_all_group_timeout() {
        let http = MemoryTransport::new().with_delay("host2", Duration::from_secs(30));
        let directory = DiscoveryDirectory::new(
            StaticDiscovery::new(vec![service(
                "g1",
                &["host1", "host2"],
                "http",
                FanoutPolicy::All,
            )]),
            DirectoryConfig::default(),
        );
        let dispatcher = Dispatcher::builder(directory)
            .transport("http", http.clone())
            .send_timeout(Duration::from_millis(500))
            .build();

        let err = dispatcher.notify("FOO", "payload", None).await.unwrap_err();

        let DispatchError::AggregateDeliveryFailure { failed, .. } = &err else {
            panic!("expected aggregate failure, got {err:?}");
        };
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].record.address, "host2");
        assert!(matches!(
            failed[0].error(),
            Some(TransportError::Timeout { .. })
        ));
        assert_eq!(http.delivered_to("host1").await, 1);
    }

    /// Backend fails for "BAR" with nothing cached
    #[tokio::test]
    async fn test_scenario_discovery_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let http = MemoryTransport::new();
        let directory = DiscoveryDirectory::new(
            FileDiscovery::new(dir.path().join("missing.json")).unwrap(),
            DirectoryConfig::default(),
        );
        let dispatcher = Dispatcher::builder(directory)
            .transport("http", http.clone())
            .build();

        let err = dispatcher.notify("BAR", "payload", None).await.unwrap_err();

        assert!(err.is_discovery_unavailable());
        assert!(http.deliveries().await.is_empty());
    }

    /// Record with an unregistered kind fails alone
    #[tokio::test]
    async fn test_scenario_unknown_transport() {
        let http = MemoryTransport::new();
        let directory = DiscoveryDirectory::new(
            StaticDiscovery::new(vec![
                service("g1", &["coop"], "carrier-pigeon", FanoutPolicy::All),
                service("g2", &["host1", "host2"], "http", FanoutPolicy::All),
            ]),
            DirectoryConfig::default(),
        );
        let dispatcher = Dispatcher::builder(directory)
            .transport("http", http.clone())
            .build();

        let err = dispatcher.notify("FOO", "payload", None).await.unwrap_err();

        let failed = err.failed_outcomes();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error(), Some(&TransportError::unknown("carrier-pigeon")));
        assert_eq!(http.delivered_to("host1").await, 1);
        assert_eq!(http.delivered_to("host2").await, 1);
    }

    #[tokio::test]
    async fn test_stale_registry_masks_backend_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, registry_json(&["host1"])).unwrap();

        let http = MemoryTransport::new();
        let directory = DiscoveryDirectory::new(
            FileDiscovery::new(&path).unwrap(),
            DirectoryConfig {
                cache_ttl: Duration::from_millis(20),
                stale_grace: Duration::from_secs(60),
                timeout: Duration::from_secs(2),
            },
        );
        let dispatcher = Dispatcher::builder(directory)
            .transport("http", http.clone())
            .build();

        dispatcher.notify("FOO", "a", None).await.unwrap();

        std::fs::write(&path, "{ not json").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = dispatcher.notify("FOO", "b", None).await.unwrap();
        assert_eq!(result.delivered_count(), 1);
        assert_eq!(http.delivered_to("host1").await, 2);
    }

    #[tokio::test]
    async fn test_registry_changes_seen_after_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, registry_json(&["host1"])).unwrap();

        let directory = DiscoveryDirectory::new(
            FileDiscovery::new(&path).unwrap(),
            DirectoryConfig {
                cache_ttl: Duration::from_millis(30),
                ..DirectoryConfig::default()
            },
        );
        let label = "FOO".into();

        assert_eq!(directory.resolve(&label).await.unwrap().len(), 1);

        std::fs::write(&path, registry_json(&["host1", "host2"])).unwrap();
        // Still inside the TTL
        assert_eq!(directory.resolve(&label).await.unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(directory.resolve(&label).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_registry_without_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "services = 3").unwrap();

        let directory =
            DiscoveryDirectory::new(FileDiscovery::new(&path).unwrap(), DirectoryConfig::default());
        let err = directory.resolve(&"FOO".into()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_file_transport_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
[relay]
default_endpoint = "events.log"

[[discovery.services]]
name = "archive"
labels = ["FOO"]
hosts = ["."]
transport = "FILE"

[[transports]]
name = "file"
transport_type = "file"

[transports.params]
base_dir = "{}"
"#,
            dir.path().display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = Dispatcher::from_config(&config).unwrap();

        dispatcher.notify("FOO", "first", None).await.unwrap();
        dispatcher
            .bind("FOO")
            .notify(Bytes::from_static(b"second"))
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
        assert_eq!(written, "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_udp_transport_from_config() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let content = format!(
            r#"
[[discovery.services]]
name = "listener"
labels = ["FOO"]
hosts = ["{target}"]
transport = "udp"
policy = "all"

[[transports]]
name = "udp"
transport_type = "udp"

[transports.params]
bind = "127.0.0.1:0"
"#
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        let dispatcher = Dispatcher::from_config(&config).unwrap();

        let result = dispatcher.notify("FOO", "datagram", None).await.unwrap();
        assert!(result.succeeded);

        let mut buf = [0u8; 64];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"datagram");
    }

    #[tokio::test]
    async fn test_env_backend_from_config() {
        std::env::set_var(
            "RELAY_E2E_SERVICES",
            r#"[{"name":"g1","labels":["FOO"],"hosts":["h1","h2"],"transport":"mem","policy":"any"}]"#,
        );
        let content = r#"
[discovery]
backend = "env"

[discovery.params]
var = "RELAY_E2E_SERVICES"

[[transports]]
name = "mem"
transport_type = "memory"
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let dispatcher = Dispatcher::from_config(&config).unwrap();

        let result = dispatcher.notify("FOO", "x", None).await.unwrap();
        assert_eq!(result.delivered_count(), 2);
        assert_eq!(dispatcher.directory().backend_name(), "env");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_notifies_share_one_lookup() {
        let http = MemoryTransport::new();
        let backend =
            CountingBackend::new(vec![service("g1", &["host1"], "http", FanoutPolicy::All)]);
        let directory = DiscoveryDirectory::new(backend.clone(), DirectoryConfig::default());
        let dispatcher = Dispatcher::builder(directory)
            .transport("http", http.clone())
            .build();

        let mut handles = Vec::new();
        for i in 0..8 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.notify("FOO", format!("msg-{i}"), None).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap().succeeded);
        }

        assert_eq!(backend.calls(), 1);
        assert_eq!(http.delivered_to("host1").await, 8);
    }

    #[tokio::test]
    async fn test_metrics_summary_over_notifies() {
        let http = MemoryTransport::new().with_failure("host2");
        let dispatcher = Dispatcher::builder(DiscoveryDirectory::new(
            StaticDiscovery::new(vec![service(
                "g1",
                &["host1", "host2"],
                "http",
                FanoutPolicy::Any,
            )]),
            DirectoryConfig::default(),
        ))
        .transport("http", http)
        .build();

        let dir = tempfile::tempdir().unwrap();
        let unreachable = Dispatcher::builder(DiscoveryDirectory::new(
            FileDiscovery::new(dir.path().join("missing.json")).unwrap(),
            DirectoryConfig::default(),
        ))
        .build();

        let mut aggregator = RelayMetricsAggregator::new();
        let attempts = [
            dispatcher.notify("FOO", "a", None).await,
            dispatcher.notify("FOO", "b", None).await,
            dispatcher.notify("BAR", "c", None).await,
            unreachable.notify("FOO", "d", None).await,
        ];
        for attempt in &attempts {
            match attempt {
                Ok(result) => aggregator.update(result, 1.0),
                Err(err) => match err.dispatch_result() {
                    Some(result) => aggregator.update(result, 1.0),
                    None => aggregator.update_unavailable(),
                },
            }
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_notifies, 4);
        assert_eq!(summary.failed_notifies, 1);
        assert_eq!(summary.unavailable_notifies, 1);
        assert_eq!(summary.total_delivered, 2);
        assert_eq!(summary.total_failed_deliveries, 2);
        assert_eq!(summary.failures_by_address.get("host2"), Some(&2));
        assert!((summary.failure_rate - 25.0).abs() < f64::EPSILON);
    }
}
