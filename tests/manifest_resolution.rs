// ABOUTME: End-to-end manifest resolution scenarios.
// ABOUTME: Exercises placeholder substitution, routes, and instance counts together.

use windlass::manifest::{
    ManifestError, ManifestPackage, resolve_application_name, resolve_instance_count,
    resolve_placeholders, resolve_routes, substitute_route_placeholders,
};

fn package(manifest: &str, vars: &[&str]) -> ManifestPackage {
    ManifestPackage {
        manifest_yaml: manifest.to_string(),
        variable_yamls: vars.iter().map(|v| v.to_string()).collect(),
        autoscaler_yaml: None,
    }
}

/// Test: a fully templated manifest resolves name, count, and routes from one
/// variable file plus infrastructure configuration.
#[test]
fn templated_manifest_resolves_end_to_end() {
    let manifest = r#"
applications:
  - name: ((APP_NAME))
    instances: ((COUNT))
    routes: []
"#;
    let pkg = package(manifest, &["APP_NAME: svc1\nCOUNT: \"4\""]);
    let block = pkg.application_block().unwrap();
    let infra_routes = vec!["svc1.example.com".to_string()];

    let name = resolve_application_name(&block, &pkg, "app__svc__env").unwrap();
    assert_eq!(name, "svc1");

    let count = resolve_instance_count(&block, &pkg, 2).unwrap();
    assert_eq!(count, 4);

    let routes = resolve_routes(&block, &infra_routes, block.use_no_route()).unwrap();
    assert_eq!(routes, infra_routes);
}

/// Test: later variable files override earlier ones, last file wins.
#[test]
fn later_variable_files_override_earlier_ones() {
    let resolved = resolve_placeholders("((x))", &["x: 1".to_string(), "x: 2".to_string()]).unwrap();
    assert_eq!(resolved, "2");
}

/// Test: substitution is idempotent once no tokens remain; unresolved tokens
/// pass through verbatim.
#[test]
fn substitution_is_idempotent_and_lenient() {
    let vars = vec!["host: api.example.com".to_string()];
    let once = resolve_placeholders("((host))/v1", &vars).unwrap();
    let twice = resolve_placeholders(&once, &vars).unwrap();
    assert_eq!(once, "api.example.com/v1");
    assert_eq!(once, twice);

    let unresolved = resolve_placeholders("((missing))", &vars).unwrap();
    assert_eq!(unresolved, "((missing))");
}

/// Test: no-route opts out of the infrastructure fallback.
#[test]
fn no_route_flag_suppresses_infrastructure_routes() {
    let manifest = r#"
applications:
  - name: a
    no-route: true
"#;
    let pkg = package(manifest, &[]);
    let block = pkg.application_block().unwrap();
    let infra_routes = vec!["r1".to_string()];

    assert!(block.use_no_route());
    let routes = resolve_routes(&block, &infra_routes, block.use_no_route()).unwrap();
    assert!(routes.is_empty());

    // Without the flag the same manifest falls back to infra routes.
    let manifest = "applications:\n  - name: a\n";
    let pkg = package(manifest, &[]);
    let block = pkg.application_block().unwrap();
    let routes = resolve_routes(&block, &infra_routes, block.use_no_route()).unwrap();
    assert_eq!(routes, infra_routes);
}

/// Test: templated route literals resolve through the same variable files.
#[test]
fn route_literals_resolve_from_variable_files() {
    let manifest = r#"
applications:
  - name: a
    routes:
      - route: ((HOST))
      - route: static.example.com
"#;
    let pkg = package(manifest, &["HOST: dyn.example.com"]);
    let block = pkg.application_block().unwrap();

    let routes = resolve_routes(&block, &[], false).unwrap();
    let routes = substitute_route_placeholders(routes, &pkg).unwrap();
    assert_eq!(
        routes,
        vec!["dyn.example.com".to_string(), "static.example.com".to_string()]
    );
}

/// Test: a templated instance count with no variable files is a hard error,
/// and an unparseable substitution is reported with the offending value.
#[test]
fn instance_count_errors_are_specific() {
    let manifest = "applications:\n  - instances: ((COUNT))\n";
    let pkg = package(manifest, &[]);
    let block = pkg.application_block().unwrap();
    assert!(matches!(
        resolve_instance_count(&block, &pkg, 2),
        Err(ManifestError::MissingVariableFile)
    ));

    let pkg = package(manifest, &["COUNT: many"]);
    assert!(matches!(
        resolve_instance_count(&block, &pkg, 2),
        Err(ManifestError::InvalidInstanceCount(v)) if v == "many"
    ));
}

/// Test: manifests without an application list are rejected up front.
#[test]
fn manifest_without_applications_is_rejected() {
    let pkg = package("name: not-a-manifest", &[]);
    assert!(matches!(
        pkg.application_block(),
        Err(ManifestError::NoApplicationList)
    ));
}
