// ABOUTME: Application-block parsing and field resolution for deployment manifests.
// ABOUTME: Derives application name, route list, and instance count from the manifest.

use std::collections::BTreeMap;

use serde_yaml::Value;

use super::error::ManifestError;
use super::template::{has_placeholder, resolve_placeholders, scalar_to_string};
use super::{
    APPLICATIONS_ELEMENT, DEPRECATED_INSTANCE_PLACEHOLDER, DEPRECATED_ROUTE_PLACEHOLDER,
    INSTANCES_ELEMENT, LEGACY_NAME_PLACEHOLDER, ManifestPackage, NAME_ELEMENT, NO_ROUTE_ELEMENT,
    ROUTE_ELEMENT, ROUTES_ELEMENT,
};

/// The first application entry of a manifest, with case-insensitive keys.
///
/// Manifests may list several applications; the first one is always the
/// application being deployed.
#[derive(Debug, Clone)]
pub struct ApplicationBlock {
    entries: BTreeMap<String, Value>,
}

impl ApplicationBlock {
    /// Parse the manifest document and extract its first application block.
    pub fn parse(manifest_yaml: &str) -> Result<Self, ManifestError> {
        let document: Value = serde_yaml::from_str(manifest_yaml)?;

        let applications = document
            .get(APPLICATIONS_ELEMENT)
            .and_then(Value::as_sequence)
            .filter(|seq| !seq.is_empty())
            .ok_or(ManifestError::NoApplicationList)?;

        let first = applications[0]
            .as_mapping()
            .ok_or(ManifestError::NoApplicationList)?;

        let mut entries = BTreeMap::new();
        for (key, value) in first {
            if let Some(key) = key.as_str() {
                entries.insert(key.to_lowercase(), value.clone());
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&key.to_lowercase())
    }

    fn get_text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    /// True iff the block carries a no-route flag set to true.
    pub fn use_no_route(&self) -> bool {
        self.get(NO_ROUTE_ELEMENT)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Resolve the application name from the manifest block.
///
/// A blank name or the legacy placeholder literal falls back to
/// `default_name` (conventionally app__service__env). Otherwise `((…))`
/// tokens are substituted when variable files exist.
pub fn resolve_application_name(
    block: &ApplicationBlock,
    package: &ManifestPackage,
    default_name: &str,
) -> Result<String, ManifestError> {
    let name = match block.get_text(NAME_ELEMENT) {
        Some(name) if !name.trim().is_empty() && name != LEGACY_NAME_PLACEHOLDER => name,
        _ => return Ok(default_name.to_string()),
    };

    if package.variable_yamls.is_empty() {
        Ok(name)
    } else {
        resolve_placeholders(&name, &package.variable_yamls)
    }
}

/// Resolve the route list for the application.
///
/// Routes missing from the manifest fall back to the infrastructure-configured
/// list unless the manifest opts out with no-route. A single entry holding the
/// deprecated route placeholder also reads from infrastructure. Concrete
/// entries are taken literally, in order.
pub fn resolve_routes(
    block: &ApplicationBlock,
    infra_routes: &[String],
    no_route: bool,
) -> Result<Vec<String>, ManifestError> {
    let entries = match block.get(ROUTES_ELEMENT) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(route_entry_value)
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ManifestError::InvalidRouteFormat),
    };

    if entries.is_empty() {
        if no_route || infra_routes.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(infra_routes.to_vec());
    }

    if entries.len() == 1 && entries[0] == DEPRECATED_ROUTE_PLACEHOLDER {
        return Ok(infra_routes.to_vec());
    }

    Ok(entries)
}

fn route_entry_value(entry: &Value) -> Result<String, ManifestError> {
    entry
        .as_mapping()
        .and_then(|map| map.get(Value::from(ROUTE_ELEMENT)))
        .and_then(scalar_to_string)
        .ok_or(ManifestError::InvalidRouteFormat)
}

/// Apply variable substitution to resolved route literals, when variable
/// files are present. Blank routes are dropped.
pub fn substitute_route_placeholders(
    routes: Vec<String>,
    package: &ManifestPackage,
) -> Result<Vec<String>, ManifestError> {
    if package.variable_yamls.is_empty() {
        return Ok(routes);
    }

    routes
        .into_iter()
        .filter(|route| !route.trim().is_empty())
        .map(|route| {
            if has_placeholder(&route) {
                resolve_placeholders(&route, &package.variable_yamls)
            } else {
                Ok(route)
            }
        })
        .collect()
}

/// Resolve the instance-count field of the manifest block.
///
/// Blank values and the deprecated placeholder fall back to `fallback_max`.
/// A `((…))` token requires at least one variable file to substitute from.
pub fn resolve_instance_count(
    block: &ApplicationBlock,
    package: &ManifestPackage,
    fallback_max: i32,
) -> Result<i32, ManifestError> {
    let raw = match block.get_text(INSTANCES_ELEMENT) {
        Some(raw) if !raw.trim().is_empty() && raw != DEPRECATED_INSTANCE_PLACEHOLDER => raw,
        _ => return Ok(fallback_max),
    };

    let resolved = if has_placeholder(&raw) {
        if package.variable_yamls.is_empty() {
            return Err(ManifestError::MissingVariableFile);
        }
        resolve_placeholders(&raw, &package.variable_yamls)?
    } else {
        raw
    };

    resolved
        .trim()
        .parse::<i32>()
        .map_err(|_| ManifestError::InvalidInstanceCount(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(manifest: &str, vars: &[&str]) -> ManifestPackage {
        ManifestPackage {
            manifest_yaml: manifest.to_string(),
            variable_yamls: vars.iter().map(|v| v.to_string()).collect(),
            autoscaler_yaml: None,
        }
    }

    const MANIFEST: &str = r#"
applications:
  - name: my-app
    instances: 3
    routes:
      - route: app.example.com
"#;

    #[test]
    fn parses_first_application_block_with_case_insensitive_keys() {
        let manifest = r#"
applications:
  - Name: first
  - name: second
"#;
        let block = ApplicationBlock::parse(manifest).unwrap();
        assert_eq!(block.get("name").unwrap().as_str(), Some("first"));
        assert_eq!(block.get("NAME").unwrap().as_str(), Some("first"));
    }

    #[test]
    fn missing_application_list_is_an_error() {
        assert!(matches!(
            ApplicationBlock::parse("instances: 2"),
            Err(ManifestError::NoApplicationList)
        ));
        assert!(matches!(
            ApplicationBlock::parse("applications: []"),
            Err(ManifestError::NoApplicationList)
        ));
    }

    #[test]
    fn blank_or_legacy_name_uses_default() {
        let manifest = "applications:\n  - name: ${APPLICATION_NAME}\n";
        let pkg = package(manifest, &[]);
        let block = ApplicationBlock::parse(manifest).unwrap();
        let name = resolve_application_name(&block, &pkg, "app__svc__env").unwrap();
        assert_eq!(name, "app__svc__env");
    }

    #[test]
    fn name_placeholders_resolve_from_variable_files() {
        let manifest = "applications:\n  - name: ((APP_NAME))\n";
        let pkg = package(manifest, &["APP_NAME: svc1"]);
        let block = ApplicationBlock::parse(manifest).unwrap();
        let name = resolve_application_name(&block, &pkg, "default").unwrap();
        assert_eq!(name, "svc1");
    }

    #[test]
    fn name_without_variable_files_is_verbatim() {
        let manifest = "applications:\n  - name: ((APP_NAME))\n";
        let pkg = package(manifest, &[]);
        let block = ApplicationBlock::parse(manifest).unwrap();
        let name = resolve_application_name(&block, &pkg, "default").unwrap();
        assert_eq!(name, "((APP_NAME))");
    }

    #[test]
    fn missing_routes_fall_back_to_infrastructure() {
        let manifest = "applications:\n  - name: a\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        let infra = vec!["r1".to_string()];
        assert_eq!(resolve_routes(&block, &infra, false).unwrap(), infra);
        assert!(resolve_routes(&block, &infra, true).unwrap().is_empty());
        assert!(resolve_routes(&block, &[], false).unwrap().is_empty());
    }

    #[test]
    fn deprecated_route_placeholder_reads_infrastructure() {
        let manifest = "applications:\n  - routes:\n      - route: ${ROUTE_MAP}\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        let infra = vec!["r1".to_string(), "r2".to_string()];
        assert_eq!(resolve_routes(&block, &infra, false).unwrap(), infra);
        assert!(resolve_routes(&block, &[], false).unwrap().is_empty());
    }

    #[test]
    fn concrete_routes_are_taken_in_order() {
        let block = ApplicationBlock::parse(MANIFEST).unwrap();
        assert_eq!(
            resolve_routes(&block, &["ignored".to_string()], false).unwrap(),
            vec!["app.example.com".to_string()]
        );

        let manifest = "applications:\n  - routes:\n      - route: a.io\n      - route: b.io\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        assert_eq!(
            resolve_routes(&block, &[], false).unwrap(),
            vec!["a.io".to_string(), "b.io".to_string()]
        );
    }

    #[test]
    fn malformed_route_entries_are_rejected() {
        let manifest = "applications:\n  - routes:\n      - just-a-string\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        assert!(matches!(
            resolve_routes(&block, &[], false),
            Err(ManifestError::InvalidRouteFormat)
        ));
    }

    #[test]
    fn route_literals_pick_up_variable_substitution() {
        let pkg = package(MANIFEST, &["HOST: svc.example.com"]);
        let routes = vec!["((HOST))".to_string(), " ".to_string()];
        assert_eq!(
            substitute_route_placeholders(routes, &pkg).unwrap(),
            vec!["svc.example.com".to_string()]
        );
    }

    #[test]
    fn instance_count_literal_and_fallbacks() {
        let block = ApplicationBlock::parse(MANIFEST).unwrap();
        let pkg = package(MANIFEST, &[]);
        assert_eq!(resolve_instance_count(&block, &pkg, 9).unwrap(), 3);

        let manifest = "applications:\n  - name: a\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        assert_eq!(resolve_instance_count(&block, &pkg, 9).unwrap(), 9);

        let manifest = "applications:\n  - instances: ${INSTANCE_COUNT}\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        assert_eq!(resolve_instance_count(&block, &pkg, 9).unwrap(), 9);
    }

    #[test]
    fn instance_count_placeholder_requires_variable_file() {
        let manifest = "applications:\n  - instances: ((COUNT))\n";
        let block = ApplicationBlock::parse(manifest).unwrap();

        let empty = package(manifest, &[]);
        assert!(matches!(
            resolve_instance_count(&block, &empty, 9),
            Err(ManifestError::MissingVariableFile)
        ));

        let with_vars = package(manifest, &["COUNT: \"4\""]);
        assert_eq!(resolve_instance_count(&block, &with_vars, 9).unwrap(), 4);
    }

    #[test]
    fn unparseable_instance_count_is_an_error() {
        let manifest = "applications:\n  - instances: ((COUNT))\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        let pkg = package(manifest, &["COUNT: lots"]);
        assert!(matches!(
            resolve_instance_count(&block, &pkg, 9),
            Err(ManifestError::InvalidInstanceCount(v)) if v == "lots"
        ));
    }

    #[test]
    fn no_route_flag_is_read_from_the_block() {
        let manifest = "applications:\n  - no-route: true\n";
        let block = ApplicationBlock::parse(manifest).unwrap();
        assert!(block.use_no_route());

        let block = ApplicationBlock::parse(MANIFEST).unwrap();
        assert!(!block.use_no_route());
    }
}
