use agentconf_synth::{synthesize, AgentConfig, ConfigSynthesizer};
use agentconf_topology::{
    Application, ApplicationId, ApplicationKind, ApplicationType, Downstream, InstanceId,
    InstrumentationPolicy, InstrumentationSettings, Snapshot,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn policy() -> InstrumentationPolicy {
    InstrumentationPolicy::builtin().expect("builtin policy")
}

fn pg_id() -> ApplicationId {
    ApplicationId::new(ApplicationKind::StatefulSet, "pg")
}

fn postgres_app() -> Application {
    Application::new(pg_id())
        .override_instrumentation(
            ApplicationType::Postgres,
            Some(InstrumentationSettings::new(5432).credentials("agent", "secret")),
        )
        .instance("pg-0", |i| {
            i.application_type(ApplicationType::Postgres)
                .listen("10.0.1.10", 5432, true)
                .listen("127.0.0.1", 5432, true)
                .listen("10.0.1.10", 9187, true)
        })
        .instance("pg-1", |i| {
            i.application_type(ApplicationType::Postgres)
                .listen("10.0.1.11", 5432, true)
                .obsolete(true)
        })
        .instance("pg-2", |i| {
            i.application_type(ApplicationType::Postgres)
                .listen("10.0.1.12", 5432, false)
        })
}

fn cache_app() -> Application {
    Application::new(ApplicationId::new(ApplicationKind::Deployment, "cache"))
        .instance("cache-0", |i| {
            i.application_type(ApplicationType::Redis)
                .application_type(ApplicationType::Memcached)
                .listen("10.0.2.5", 6379, true)
                .listen("10.0.2.5", 11211, true)
                .listen("fd00::5", 6379, true)
        })
        .instance("cache-1", |i| {
            i.application_type(ApplicationType::Redis)
                .listen("10.0.2.6", 6379, true)
        })
}

fn hosts(config: &AgentConfig) -> Vec<(ApplicationType, String)> {
    config
        .application_instrumentation
        .iter()
        .map(|e| (e.application_type, e.host.clone()))
        .collect()
}

#[test]
fn empty_snapshot_yields_empty_config() {
    let config = synthesize(&Snapshot::empty(), &policy(), json!({}));
    assert!(config.is_empty());
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        json!({"integrations": {}, "application_instrumentation": []})
    );
}

#[test]
fn entries_follow_application_type_instance_order() {
    let snapshot = Snapshot::new(vec![postgres_app(), cache_app()], Vec::new());
    let config = synthesize(&snapshot, &policy(), json!({}));

    assert_eq!(
        hosts(&config),
        vec![
            (ApplicationType::Postgres, "127.0.0.1".to_string()),
            (ApplicationType::Redis, "10.0.2.5".to_string()),
            (ApplicationType::Redis, "10.0.2.6".to_string()),
            (ApplicationType::Memcached, "10.0.2.5".to_string()),
        ]
    );

    let pg = &config.application_instrumentation[0];
    assert_eq!(pg.port, 5432);
    assert!(pg.enabled);
    let creds = pg.credentials.as_ref().expect("credentials");
    assert_eq!(creds.username, "agent");
    assert_eq!(creds.password, "secret");
}

#[test]
fn obsolete_and_unreachable_instances_are_skipped() {
    let snapshot = Snapshot::new(vec![postgres_app()], Vec::new());
    let config = synthesize(&snapshot, &policy(), json!({}));

    let emitted: Vec<String> = hosts(&config).into_iter().map(|(_, h)| h).collect();
    assert!(!emitted.contains(&"10.0.1.11".to_string()), "obsolete pg-1 emitted");
    assert!(!emitted.contains(&"10.0.1.12".to_string()), "inactive pg-2 emitted");
    assert_eq!(emitted.len(), 1);
}

#[test]
fn postgres_without_credentials_is_never_emitted() {
    let app = Application::new(pg_id()).instance("pg-0", |i| {
        i.application_type(ApplicationType::Postgres)
            .listen("10.0.1.10", 5432, true)
    });
    let snapshot = Snapshot::new(vec![app], Vec::new());

    assert!(synthesize(&snapshot, &policy(), json!({})).is_empty());
}

#[test]
fn disabled_override_suppresses_only_its_type() {
    let app = cache_app().override_instrumentation(
        ApplicationType::Redis,
        Some(InstrumentationSettings::new(6379).disabled()),
    );
    let snapshot = Snapshot::new(vec![app], Vec::new());
    let config = synthesize(&snapshot, &policy(), json!({}));

    assert_eq!(
        hosts(&config),
        vec![(ApplicationType::Memcached, "10.0.2.5".to_string())]
    );
}

#[test]
fn override_port_drives_candidate_selection() {
    let app = cache_app().override_instrumentation(
        ApplicationType::Memcached,
        Some(InstrumentationSettings::new(11212)),
    );
    let snapshot = Snapshot::new(vec![app], Vec::new());
    let config = synthesize(&snapshot, &policy(), json!({}));

    assert!(config
        .application_instrumentation
        .iter()
        .all(|e| e.application_type != ApplicationType::Memcached));
}

#[test]
fn external_service_is_instrumented_through_remote_instances() {
    let remote = |name: &str| Some(InstanceId::new(pg_id(), name));
    let external = Application::new(ApplicationId::new(
        ApplicationKind::ExternalService,
        "pg.internal:5432",
    ))
    .override_instrumentation(
        ApplicationType::Postgres,
        Some(InstrumentationSettings::new(5432).credentials("ext", "pw")),
    )
    .downstream(Downstream::new(remote("pg-0")).requests("postgres", 42))
    .downstream(Downstream::new(remote("pg-1")).requests("postgres", 3));

    // the workload itself carries no credentials, so only the external
    // service can emit for pg-0
    let pg = Application::new(pg_id())
        .instance("pg-0", |i| {
            i.application_type(ApplicationType::Postgres)
                .listen("10.0.1.10", 5432, true)
        })
        .instance("pg-1", |i| {
            i.application_type(ApplicationType::Postgres)
                .listen("10.0.1.11", 5432, true)
                .obsolete(true)
        });
    let snapshot = Snapshot::new(vec![pg, external], Vec::new());
    let config = synthesize(&snapshot, &policy(), json!({}));

    assert_eq!(
        hosts(&config),
        vec![(ApplicationType::Postgres, "10.0.1.10".to_string())]
    );
    let creds = config.application_instrumentation[0]
        .credentials
        .as_ref()
        .expect("credentials");
    assert_eq!(creds.username, "ext");
}

#[test]
fn external_service_edge_to_obsolete_instance_yields_nothing() {
    let external =
        Application::new(ApplicationId::new(ApplicationKind::ExternalService, "redis")).downstream(
            Downstream::new(Some(InstanceId::new(
                ApplicationId::new(ApplicationKind::Deployment, "cache"),
                "cache-old",
            )))
            .requests("redis", 5),
        );
    let cache = Application::new(ApplicationId::new(ApplicationKind::Deployment, "cache"))
        .instance("cache-old", |i| {
            i.listen("10.0.2.9", 6379, true).obsolete(true)
        });
    let snapshot = Snapshot::new(vec![cache, external], Vec::new());

    assert!(synthesize(&snapshot, &policy(), json!({})).is_empty());
}

#[test]
fn integrations_are_echoed_unchanged() {
    let integrations = json!({
        "aws": {"region": "us-east-2", "credentials_secret": {"name": "aws"}}
    });
    let config = synthesize(&Snapshot::empty(), &policy(), integrations.clone());
    assert_eq!(config.integrations, integrations);
}

#[test]
fn synthesis_is_idempotent() {
    let snapshot = Snapshot::new(vec![postgres_app(), cache_app()], Vec::new());
    let policy = policy();
    let synthesizer = ConfigSynthesizer::new(&policy);

    let first = serde_json::to_vec(&synthesizer.synthesize(&snapshot, json!({"k": 1}))).unwrap();
    let second = serde_json::to_vec(&synthesizer.synthesize(&snapshot, json!({"k": 1}))).unwrap();
    assert_eq!(first, second);
}

#[test]
fn snapshot_json_fixture_synthesizes() {
    let snapshot: Snapshot = serde_json::from_value(json!({
        "applications": [
            {
                "id": {"kind": "deployment", "name": "mongo"},
                "instances": [
                    {
                        "id": {"application": {"kind": "deployment", "name": "mongo"}, "name": "mongo-0"},
                        "application_types": ["mongodb"],
                        "tcp_listens": [
                            {"ip": "172.17.0.4", "port": 27017},
                            {"ip": "192.168.10.4", "port": 27017}
                        ]
                    }
                ],
                "settings": {
                    "instrumentation": {
                        "mongodb": {"port": 27017, "params": {"authSource": "admin"}}
                    }
                }
            }
        ],
        "nodes": [{"name": "node-a"}]
    }))
    .unwrap();

    let config = synthesize(&snapshot, &policy(), json!({}));
    assert_eq!(
        serde_json::to_value(&config.application_instrumentation).unwrap(),
        json!([
            {
                "type": "mongodb",
                "enabled": true,
                "port": 27017,
                "host": "172.17.0.4",
                "params": {"authSource": "admin"}
            }
        ])
    );
}
