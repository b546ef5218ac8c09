//! End-to-end resolver scenarios driven by fakes.

use std::fs;

use redis_bootstrap::discovery::DiscoveryError;
use redis_bootstrap::error::BootstrapError;
use redis_bootstrap::node::{MasterLocation, Role};
use redis_bootstrap::resolver::Resolver;

mod common;

use common::{config, found, secs, unreachable, FlakyProber, RecordingSleeper, ScriptedDiscovery};

#[tokio::test]
async fn test_default_master_without_existing_master_starts_master() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-0", "redis-0");
    let discovery = ScriptedDiscovery::new(vec![unreachable()]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Master);
    assert_eq!(launch.program, "redis-server");
    assert_eq!(launch.config_path, cfg.paths.server_config);
    assert_eq!(discovery.calls(), 2);
    assert_eq!(sleeper.sleeps(), vec![secs(10)]);
    assert!(prober.probed().is_empty());
    assert!(cfg.paths.data_dir.is_dir());

    let written = fs::read_to_string(&cfg.paths.server_config).unwrap();
    assert!(!written.contains("slaveof"));
    assert!(written.contains(&format!("dir {}", cfg.paths.data_dir.display())));
}

#[tokio::test]
async fn test_default_master_writes_mounted_template_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-0", "redis-0");
    let template = "port 6379\nappendonly yes\nmaxmemory 100mb\n";
    fs::create_dir_all(cfg.paths.server_template.parent().unwrap()).unwrap();
    fs::write(&cfg.paths.server_template, template).unwrap();

    let discovery = ScriptedDiscovery::new(vec![unreachable()]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Master);
    assert_eq!(fs::read_to_string(&cfg.paths.server_config).unwrap(), template);
}

#[tokio::test]
async fn test_default_master_with_shared_slave_template_has_no_unresolved_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-0", "redis-0");
    fs::create_dir_all(cfg.paths.server_template.parent().unwrap()).unwrap();
    fs::write(
        &cfg.paths.server_template,
        "port 6379\nslaveof %master-ip% %master-port%\n",
    )
    .unwrap();

    let discovery = ScriptedDiscovery::new(vec![unreachable()]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Master);
    assert_eq!(fs::read_to_string(&cfg.paths.server_config).unwrap(), "port 6379\n");
}

#[tokio::test]
async fn test_promoted_slave_with_shared_template_has_no_unresolved_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), true, "redis-1", "redis-0");
    cfg.node.pod_ip = Some("10.0.0.6".into());
    fs::create_dir_all(cfg.paths.server_template.parent().unwrap()).unwrap();
    fs::write(
        &cfg.paths.server_template,
        "port 6379\nslaveof %master-ip% %master-port%\n",
    )
    .unwrap();

    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.6", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Master);
    let written = fs::read_to_string(&cfg.paths.server_config).unwrap();
    assert!(!written.contains('%'));
}

#[tokio::test]
async fn test_default_master_demotes_when_other_master_exists() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-0", "redis-0");
    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.7", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Slave);
    assert_eq!(prober.probed(), vec![MasterLocation::new("10.0.0.7", 6379)]);
    let written = fs::read_to_string(&cfg.paths.server_config).unwrap();
    assert!(written.ends_with("slaveof 10.0.0.7 6379\n"));
}

#[tokio::test]
async fn test_default_master_listed_as_master_stays_master() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), true, "redis-0", "redis-0");
    cfg.node.pod_ip = Some("10.0.0.9".into());
    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.9", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg, &discovery, &prober, &sleeper).run().await.unwrap();

    assert_eq!(launch.role, Role::Master);
    assert_eq!(discovery.calls(), 1);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_slave_appends_slaveof_and_hands_off() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-1", "redis-0");
    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.5", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Slave);
    assert_eq!(
        launch.to_string(),
        format!("redis-server {} --protected-mode no", cfg.paths.server_config.display())
    );
    let written = fs::read_to_string(&cfg.paths.server_config).unwrap();
    let slaveof: Vec<_> = written.lines().filter(|l| l.starts_with("slaveof")).collect();
    assert_eq!(slaveof, ["slaveof 10.0.0.5 6379"]);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_slave_substitutes_template_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-2", "redis-0");
    fs::create_dir_all(cfg.paths.server_template.parent().unwrap()).unwrap();
    fs::write(
        &cfg.paths.server_template,
        "port 6379\nslaveof %master-ip% %master-port%\n",
    )
    .unwrap();

    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.5", 6380)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    Resolver::new(cfg.clone(), &discovery, &prober, &sleeper).run().await.unwrap();

    assert_eq!(
        fs::read_to_string(&cfg.paths.server_config).unwrap(),
        "port 6379\nslaveof 10.0.0.5 6380\n"
    );
}

#[tokio::test]
async fn test_slave_discovery_exhaustion_is_fatal_after_grace() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-1", "redis-0");
    let discovery = ScriptedDiscovery::new(vec![unreachable()]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let err = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap_err();

    match &err {
        BootstrapError::DiscoveryExhausted { attempts, last_error, .. } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(last_error, DiscoveryError::Unreachable { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 1);
    assert_eq!(discovery.calls(), 3);
    assert_eq!(sleeper.sleeps(), vec![secs(10), secs(10), secs(30)]);
    assert!(!cfg.paths.server_config.exists());
}

#[tokio::test]
async fn test_slave_recovers_when_discovery_succeeds_within_budget() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-1", "redis-0");
    let discovery =
        ScriptedDiscovery::new(vec![unreachable(), unreachable(), found("10.0.0.5", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg, &discovery, &prober, &sleeper).run().await.unwrap();

    assert_eq!(launch.role, Role::Slave);
    assert_eq!(sleeper.sleeps(), vec![secs(10), secs(10)]);
}

#[tokio::test]
async fn test_slave_waits_indefinitely_for_known_master() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-1", "redis-0");
    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.5", 6379)]);
    let prober = FlakyProber::failing(25);
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg, &discovery, &prober, &sleeper).run().await.unwrap();

    assert_eq!(launch.role, Role::Slave);
    assert_eq!(discovery.calls(), 1);
    assert_eq!(prober.probed().len(), 26);
    assert!(prober.probed().iter().all(|m| *m == MasterLocation::new("10.0.0.5", 6379)));
    assert_eq!(sleeper.sleeps(), vec![secs(10); 25]);
}

#[tokio::test]
async fn test_slave_promoted_by_failover_starts_as_master() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), true, "redis-1", "redis-0");
    cfg.node.pod_ip = Some("10.0.0.6".into());
    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.6", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg, &discovery, &prober, &sleeper).run().await.unwrap();

    assert_eq!(launch.role, Role::Master);
}

#[tokio::test]
async fn test_sentinel_uses_discovered_master() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false, "redis-sentinel-0", "redis-0");
    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.5", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Sentinel);
    assert_eq!(launch.program, "redis-sentinel");
    assert_eq!(launch.config_path, cfg.paths.sentinel_config);

    let written = fs::read_to_string(&cfg.paths.sentinel_config).unwrap();
    let monitors: Vec<_> = written.lines().filter(|l| l.starts_with("sentinel monitor")).collect();
    assert_eq!(monitors, ["sentinel monitor mymaster 10.0.0.5 6379 2"]);
    assert!(written.contains("sentinel down-after-milliseconds mymaster 60000"));
    assert!(written.contains("sentinel failover-timeout mymaster 180000"));
    assert!(written.contains("sentinel parallel-syncs mymaster 1"));
}

#[tokio::test]
async fn test_sentinel_falls_back_to_default_master_and_keeps_probing() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path(), false, "redis-sentinel-0", "redis-0");
    cfg.node.service_name = Some("redis".into());
    cfg.sentinel.master_name = "cache".into();
    let discovery = ScriptedDiscovery::new(vec![unreachable()]);
    let prober = FlakyProber::failing(4);
    let sleeper = RecordingSleeper::default();

    let launch = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap();

    assert_eq!(launch.role, Role::Sentinel);
    assert_eq!(discovery.calls(), 5);
    assert_eq!(sleeper.sleeps(), vec![secs(10); 4]);
    assert!(prober
        .probed()
        .iter()
        .all(|m| *m == MasterLocation::new("redis-0.redis", 6379)));

    let written = fs::read_to_string(&cfg.paths.sentinel_config).unwrap();
    assert!(written.starts_with("sentinel monitor cache redis-0.redis 6379 2\n"));
}

#[tokio::test]
async fn test_sentinel_template_placeholders() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), false, "redis-sentinel-1", "redis-0");
    fs::create_dir_all(cfg.paths.sentinel_template.parent().unwrap()).unwrap();
    fs::write(
        &cfg.paths.sentinel_template,
        "sentinel monitor mymaster %master-ip% %master-port% 3\nport 26379\n",
    )
    .unwrap();

    let discovery = ScriptedDiscovery::new(vec![found("10.0.0.5", 6379)]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    Resolver::new(cfg.clone(), &discovery, &prober, &sleeper).run().await.unwrap();

    assert_eq!(
        fs::read_to_string(&cfg.paths.sentinel_config).unwrap(),
        "sentinel monitor mymaster 10.0.0.5 6379 3\nport 26379\n"
    );
}

#[tokio::test]
async fn test_unreadable_template_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), true, "redis-0", "redis-0");
    // A directory where the template file should be.
    fs::create_dir_all(&cfg.paths.server_template).unwrap();

    let discovery = ScriptedDiscovery::new(vec![unreachable()]);
    let prober = FlakyProber::default();
    let sleeper = RecordingSleeper::default();

    let err = Resolver::new(cfg.clone(), &discovery, &prober, &sleeper)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Template(_)));
    assert!(!cfg.paths.server_config.exists());
}
