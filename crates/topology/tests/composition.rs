//! End-to-end composition scenarios.

use std::path::PathBuf;
use topology::backend::BackendCall;
use topology::compute::SAME_HOST;
use topology::{
    CompositionRequest, DeployTarget, EngineKind, EnvironmentMode, Error, ErrorCategory,
    MockBackend, StackConfig, compose,
};

fn target() -> DeployTarget {
    DeployTarget::new("123456789012", "eu-west-1")
}

fn request(mode: EnvironmentMode) -> CompositionRequest {
    CompositionRequest {
        config: StackConfig::default(),
        mode,
        target: target(),
        project_root: PathBuf::from("/srv/project"),
    }
}

#[test]
fn dev_stack_for_app_example_com() {
    let backend = MockBackend::with_default_fixtures(&target());
    let topology = compose(&backend, &request(EnvironmentMode::Dev)).unwrap();
    let plan = topology.to_plan().unwrap();

    assert_eq!(plan.of_type("AWS::ECS::Cluster").count(), 1);
    assert_eq!(plan.of_type("AWS::ECS::TaskDefinition").count(), 1);
    assert_eq!(topology.compute.task.containers().len(), 2);

    assert_eq!(plan.of_type("AWS::CertificateManager::Certificate").count(), 1);
    assert_eq!(topology.edge.certificate.domain_name, "app.example.com");
    assert_eq!(topology.edge.zone.name, "example.com");

    assert_eq!(topology.service.health_check.http_codes(), "200,307");
    assert_eq!(topology.service.health_check.interval.as_secs(), 300);
    assert_eq!(topology.service.desired_count, 1);

    let grants: Vec<_> = plan.of_type("AWS::EC2::SecurityGroupIngress").collect();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].dependencies(), vec!["Service", "Database"]);
    assert_eq!(plan.position("DatabaseIngressFromService"), Some(plan.total_resources() - 1));
}

#[test]
fn dev_and_production_policies() {
    let backend = MockBackend::with_default_fixtures(&target());

    let dev = compose(&backend, &request(EnvironmentMode::Dev)).unwrap();
    assert_eq!(dev.database.removal_policy.deletion_policy(), "Delete");
    assert!(!dev.database.retain_automated_backups);

    let prod = compose(&backend, &request(EnvironmentMode::Production)).unwrap();
    assert_eq!(prod.database.removal_policy.deletion_policy(), "Snapshot");
    assert!(prod.database.retain_automated_backups);
    assert_eq!(prod.stack_name, "SymfonyAppProdStack");

    for topology in [&dev, &prod] {
        assert!(!topology.database.publicly_accessible);
        assert!(topology.service.assign_public_ip);
    }
}

#[test]
fn runtime_container_is_never_exposed() {
    let backend = MockBackend::with_default_fixtures(&target());
    let topology = compose(&backend, &request(EnvironmentMode::Dev)).unwrap();
    let task = &topology.compute.task;

    assert!(task.runtime().port_mappings.is_empty());
    assert_eq!(task.edge().port_mappings.len(), 1);
    assert_eq!(topology.service.target_port, task.exposed_port().container_port);
    assert_eq!(task.edge().environment["PHP_HOST"], SAME_HOST);
}

#[test]
fn missing_network_aborts_before_anything_else() {
    let backend = MockBackend::new();
    let err = compose(&backend, &request(EnvironmentMode::Dev)).unwrap_err();

    assert!(matches!(err, Error::NetworkNotFound { .. }));
    assert_eq!(err.category(), ErrorCategory::Lookup);
    assert_eq!(backend.calls(), vec![BackendCall::LookupNetwork]);
}

#[test]
fn missing_credentials_abort_before_compute() {
    let backend = MockBackend::with_default_fixtures(&target());
    backend.fail_secret_generation();
    let err = compose(&backend, &request(EnvironmentMode::Dev)).unwrap_err();

    assert!(matches!(err, Error::MissingCredentials { .. }));
    assert_eq!(err.category(), ErrorCategory::Precondition);
    assert!(
        !backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::ResolveImage(_) | BackendCall::LookupZone(_)))
    );
}

#[test]
fn unresolved_image_aborts_composition() {
    let backend = MockBackend::with_default_fixtures(&target());
    backend.fail_image("nginx");
    let err = compose(&backend, &request(EnvironmentMode::Dev)).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::BuildContext);
    assert!(
        !backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::LookupZone(_)))
    );
}

#[test]
fn grant_port_follows_database_port() {
    let backend = MockBackend::with_default_fixtures(&target());

    let default = compose(&backend, &request(EnvironmentMode::Dev)).unwrap();
    assert_eq!(default.grant.port, default.database.port());
    assert_eq!(default.grant.port, 3306);

    let mut req = request(EnvironmentMode::Dev);
    req.config.database.engine = EngineKind::Postgres;
    req.config.database.engine_version = "15".into();
    let postgres = compose(&backend, &req).unwrap();
    assert_eq!(postgres.grant.port, 5432);

    let mut req = request(EnvironmentMode::Dev);
    req.config.database.port = Some(13306);
    let custom = compose(&backend, &req).unwrap();
    assert_eq!(custom.grant.port, 13306);
    assert_ne!(custom.fingerprint().unwrap(), default.fingerprint().unwrap());
}

#[test]
fn composing_twice_is_structurally_identical() {
    let backend = MockBackend::with_default_fixtures(&target());
    let first = compose(&backend, &request(EnvironmentMode::Production)).unwrap();
    let second = compose(&backend, &request(EnvironmentMode::Production)).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.to_plan().unwrap().ids(), second.to_plan().unwrap().ids());
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
}

#[test]
fn secrets_are_referenced_not_copied() {
    let backend = MockBackend::with_default_fixtures(&target());
    let topology = compose(&backend, &request(EnvironmentMode::Dev)).unwrap();
    let runtime = topology.compute.task.runtime();
    let secret_id = &topology.database.credentials.secret.logical_id;

    assert_eq!(runtime.secrets.len(), 5);
    assert!(runtime.secrets.values().all(|r| &r.secret_id == secret_id));

    let doc = topology.render().unwrap();
    let rendered = serde_json::to_string(&doc).unwrap();
    assert!(!rendered.contains("\"DB_PASS\",\"Value\""));
}
