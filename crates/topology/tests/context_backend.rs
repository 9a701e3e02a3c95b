//! Composition against a lookup context file and a real build context.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use topology::backend::context::{NetworkEntry, ZoneEntry};
use topology::types::Subnet;
use topology::{
    CONTEXT_FILE, CompositionRequest, ContextBackend, DeployTarget, EnvironmentMode, Error,
    LookupContext, StackConfig, compose, template,
};

fn write_project(root: &Path) {
    for (dir, content) in [
        ("app/docker/nginx", "FROM nginx:alpine\n"),
        ("app/docker/php-fpm", "FROM php:8.2-fpm\n"),
    ] {
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(root.join(dir).join("Dockerfile"), content).unwrap();
    }
}

fn write_context(root: &Path) -> ContextBackend {
    let context = LookupContext {
        networks: vec![NetworkEntry {
            account: "123456789012".into(),
            region: "eu-west-1".into(),
            is_default: true,
            vpc_id: "vpc-0abc".into(),
            public_subnets: vec![
                Subnet {
                    id: "subnet-a".into(),
                    availability_zone: "eu-west-1a".into(),
                },
                Subnet {
                    id: "subnet-b".into(),
                    availability_zone: "eu-west-1b".into(),
                },
            ],
            private_subnets: vec![],
        }],
        hosted_zones: vec![ZoneEntry {
            account: "123456789012".into(),
            name: "example.com".into(),
            zone_id: "Z123".into(),
        }],
    };
    let path = root.join(CONTEXT_FILE);
    fs::write(&path, context.to_json_string().unwrap()).unwrap();
    ContextBackend::load(path).unwrap()
}

fn request(root: &Path) -> CompositionRequest {
    CompositionRequest {
        config: StackConfig::default(),
        mode: EnvironmentMode::Dev,
        target: DeployTarget::new("123456789012", "eu-west-1"),
        project_root: root.to_path_buf(),
    }
}

#[test]
fn compose_from_context_file() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let backend = write_context(dir.path());

    let topology = compose(&backend, &request(dir.path())).unwrap();
    assert_eq!(topology.network.vpc_id, "vpc-0abc");
    assert_eq!(topology.database.subnet_ids, vec!["subnet-a", "subnet-b"]);
    assert_eq!(topology.edge.zone.zone_id, "Z123");

    let [edge, runtime] = topology.compute.task.containers();
    assert_eq!(edge.image.context, dir.path().join("app"));
    assert_ne!(edge.image.asset_hash, runtime.image.asset_hash);
}

#[test]
fn missing_build_file_is_a_build_context_error() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    fs::remove_file(dir.path().join("app/docker/php-fpm/Dockerfile")).unwrap();
    let backend = write_context(dir.path());

    let err = compose(&backend, &request(dir.path())).unwrap_err();
    match err {
        Error::ImageBuildContext { container, .. } => assert_eq!(container, "php"),
        other => panic!("expected ImageBuildContext, got {other:?}"),
    }
}

#[test]
fn synthesized_template_loads_back_without_changes() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let backend = write_context(dir.path());
    let topology = compose(&backend, &request(dir.path())).unwrap();

    let path = dir.path().join("template.json");
    let doc = topology.render().unwrap();
    fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let old = template::load_plan(&path).unwrap();
    let new = topology.to_plan().unwrap();
    assert!(declarative::compute_diffs(&old, &new).is_empty());
}

#[test]
fn editing_a_build_file_changes_the_task_only() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let backend = write_context(dir.path());
    let before = compose(&backend, &request(dir.path()))
        .unwrap()
        .to_plan()
        .unwrap();

    fs::write(
        dir.path().join("app/docker/nginx/Dockerfile"),
        "FROM nginx:1.27-alpine\n",
    )
    .unwrap();
    let after = compose(&backend, &request(dir.path()))
        .unwrap()
        .to_plan()
        .unwrap();

    let diffs = declarative::compute_diffs(&before, &after);
    let ids: Vec<&str> = diffs.iter().map(|d| d.resource_id.as_str()).collect();
    assert_eq!(ids, vec!["TaskDefinition"]);
}
