//! # plangate-gcp
//!
//! The built-in Google Cloud policy for plangate.
//!
//! - [`catalog::catalog`] builds the policy in code; [`catalog::engine`] wraps
//!   it in a ready `CatalogEngine`.
//! - [`predicates`] holds the custom checks (project ID format, KMS rotation
//!   period) and a registry exposing them to TOML policy files.
//! - [`catalog::GCP_POLICY_TOML`] is the same policy written as TOML.

pub mod catalog;
pub mod predicates;

pub use catalog::{catalog, engine, GCP_POLICY_TOML};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use plangate_contracts::{change::ResourceChange, report::Report};
    use plangate_core::{traits::PolicyEngine, Aggregator};
    use plangate_plan::load_plan_str;
    use plangate_policy::{file::catalog_from_toml_str, CatalogEngine};

    use crate::{engine, predicates, GCP_POLICY_TOML};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Wrap resource entries in a minimal `terraform show -json` document.
    /// Actions are comma separated, e.g. `"delete,create"`.
    fn plan(entries: &[(&str, &str, &str, Value)]) -> String {
        let changes: Vec<Value> = entries
            .iter()
            .map(|(kind, name, actions, after)| {
                json!({
                    "address": format!("{kind}.{name}"),
                    "mode": "managed",
                    "type": kind,
                    "name": name,
                    "change": {
                        "actions": actions.split(',').collect::<Vec<_>>(),
                        "before": null,
                        "after": after
                    }
                })
            })
            .collect();
        json!({ "format_version": "1.2", "resource_changes": changes }).to_string()
    }

    fn check(plan_text: &str) -> Report {
        let changes = load_plan_str(plan_text).unwrap();
        Aggregator::new(Box::new(engine().unwrap())).run(&changes)
    }

    fn evaluate(kind: &str, config: Value) -> Vec<plangate_contracts::report::Violation> {
        engine().unwrap().evaluate(&ResourceChange::new(kind, "r", config))
    }

    /// A plan in which every policed kind is compliant.
    fn compliant_plan() -> String {
        plan(&[
            (
                "google_project",
                "main",
                "create",
                json!({ "project_id": "acme-payments-prod-01", "labels": { "product": "payments", "env": "prod" } }),
            ),
            ("google_compute_network", "vpc", "create", json!({ "delete_default_routes_on_create": true })),
            ("google_kms_key_ring", "ring", "create", json!({ "location": "us-east1" })),
            ("google_kms_crypto_key", "key", "create", json!({ "rotation_period": "7776000s" })),
            ("google_redis_instance", "cache", "update", json!({ "tier": "STANDARD_HA" })),
            (
                "google_bigquery_dataset",
                "events",
                "create",
                json!({ "default_encryption_configuration": [{ "kms_key_name": "k" }] }),
            ),
            (
                "google_sql_database_instance",
                "db",
                "create",
                json!({
                    "encryption_key_name": "k",
                    "region": "us-east1",
                    "replication_type": null,
                    "settings": [{
                        "availability_type": "REGIONAL",
                        "backup_configuration": [{ "enabled": true }]
                    }]
                }),
            ),
            (
                "google_compute_subnetwork",
                "subnet",
                "create",
                json!({ "log_config": [{ "aggregation_interval": "INTERVAL_5_SEC" }], "private_ip_google_access": true }),
            ),
            (
                "google_storage_bucket",
                "logs",
                "create",
                json!({ "encryption": [{ "default_kms_key_name": "k" }], "labels": { "team": "infra" } }),
            ),
            ("google_compute_firewall", "fw", "create", json!({ "enable_logging": true })),
            (
                "google_compute_instance",
                "vm",
                "create",
                json!({ "boot_disk": [{ "kms_key_self_link": "k" }] }),
            ),
            ("google_pubsub_topic", "events", "create", json!({ "kms_key_name": "k" })),
            ("google_dns_record_set", "www", "create", json!({ "ttl": 300 })),
        ])
    }

    // ── End-to-end scenarios ──────────────────────────────────────────────────

    #[test]
    fn test_compliant_plan_passes() {
        let report = check(&compliant_plan());
        assert!(report.passed, "unexpected violations: {:?}", report.violations);
        assert_eq!(report.resources_checked, 13);
    }

    /// A single healthcare dataset create fails with one forbidden-kind violation.
    #[test]
    fn test_forbidden_healthcare_dataset() {
        let report = check(&plan(&[("google_healthcare_dataset", "phi", "create", json!({ "name": "phi" }))]));

        assert!(!report.passed);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].message, "forbidden resource kind");
        assert_eq!(
            report.lines().collect::<Vec<_>>(),
            vec!["google_healthcare_dataset phi : forbidden resource kind".to_string()]
        );
    }

    /// Deleting a forbidden kind is not a violation: only creates and updates
    /// reach the evaluator.
    #[test]
    fn test_deleting_forbidden_kind_passes() {
        let report = check(&plan(&[("google_healthcare_dataset", "phi", "delete", Value::Null)]));
        assert!(report.passed);
        assert_eq!(report.resources_checked, 0);
    }

    #[test]
    fn test_kms_rotation_over_ninety_days() {
        let violations = evaluate("google_kms_crypto_key", json!({ "rotation_period": 100 * 24 * 60 * 60 }));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("90 days"), "{:?}", violations);
        assert_eq!(violations[0].field_path, "rotation_period");
    }

    #[test]
    fn test_kms_rotation_nonsense_period_fails() {
        for period in [json!("NaN"), json!("-5s"), json!(-1)] {
            let violations = evaluate("google_kms_crypto_key", json!({ "rotation_period": period }));
            assert_eq!(violations.len(), 1, "{period}: {violations:?}");
            assert_eq!(violations[0].field_path, "rotation_period");
        }
    }

    #[test]
    fn test_kms_rotation_absent_is_optional() {
        assert!(evaluate("google_kms_crypto_key", json!({})).is_empty());
        assert!(evaluate("google_kms_crypto_key", json!({ "rotation_period": null })).is_empty());
    }

    /// A bad project ID and a missing `env` label produce exactly two violations.
    #[test]
    fn test_project_format_and_missing_label() {
        let violations = evaluate(
            "google_project",
            json!({ "project_id": "abc", "labels": { "product": "x" } }),
        );

        assert_eq!(violations.len(), 2, "{:?}", violations);
        assert_eq!(violations[0].field_path, "project_id");
        assert!(violations[0].message.contains("four dash-separated"), "{:?}", violations);
        assert_eq!(violations[1].field_path, "labels.env");
        assert_eq!(violations[1].message, "missing required field env");
    }

    #[test]
    fn test_network_extra_fields_pass() {
        let violations = evaluate(
            "google_compute_network",
            json!({ "foo": "bar", "delete_default_routes_on_create": true }),
        );
        assert!(violations.is_empty(), "{:?}", violations);
    }

    #[test]
    fn test_sql_instance_violations_all_reported() {
        let violations = evaluate(
            "google_sql_database_instance",
            json!({
                "replication_type": "SYNCHRONOUS",
                "region": "us-east1",
                "settings": [{
                    "availability_type": "ZONAL",
                    "backup_configuration": [{ "enabled": false }]
                }]
            }),
        );

        let paths: Vec<&str> = violations.iter().map(|v| v.field_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "replication_type",
                "encryption_key_name",
                "settings[0].availability_type",
                "settings[0].backup_configuration[0].enabled",
            ]
        );
    }

    #[test]
    fn test_subnet_and_bigquery_custom_messages() {
        let subnet = evaluate(
            "google_compute_subnetwork",
            json!({ "log_config": [], "private_ip_google_access": false }),
        );
        let messages: Vec<&str> = subnet.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Subnets must have VPC Flow Logs enabled",
                "Private Google Access must be enabled for all subnets"
            ]
        );

        let bq = evaluate("google_bigquery_dataset", json!({ "default_encryption_configuration": [] }));
        assert_eq!(bq[0].message, "BigQuery must use CMEK");
    }

    #[test]
    fn test_instance_without_boot_disk_cmek() {
        let violations = evaluate("google_compute_instance", json!({ "boot_disk": [{ "auto_delete": true }] }));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field_path, "boot_disk[0].kms_key_self_link");
    }

    /// Violations come out in plan order even when many resources fail.
    #[test]
    fn test_report_is_exhaustive_and_ordered() {
        let report = check(&plan(&[
            ("google_compute_firewall", "a", "create", json!({ "enable_logging": false })),
            ("google_pubsub_topic", "b", "create", json!({})),
            ("google_game_services_game_server_cluster", "c", "update", json!({})),
        ]));

        let names: Vec<&str> = report.violations.iter().map(|v| v.resource_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(!report.passed);
    }

    // ── TOML twin ─────────────────────────────────────────────────────────────

    /// The bundled TOML policy and the code-built catalog agree.
    #[test]
    fn test_toml_policy_matches_builtin() {
        let toml_engine = CatalogEngine::new(
            catalog_from_toml_str(GCP_POLICY_TOML, &predicates::registry().unwrap()).unwrap(),
        );
        let builtin = engine().unwrap();
        assert_eq!(toml_engine.catalog().len(), builtin.catalog().len());

        let dirty = plan(&[
            ("google_project", "p", "create", json!({ "project_id": "abc", "labels": {} })),
            ("google_sql_database_instance", "db", "create", json!({ "authorized_gae_applications": ["x"], "settings": [] })),
            ("google_storage_bucket", "b", "create", json!({ "encryption": [], "labels": [] })),
            ("google_kms_crypto_key", "k", "create", json!({ "rotation_period": "99999999s" })),
            ("google_healthcare_dataset", "h", "create", json!({})),
        ]);

        for text in [compliant_plan(), dirty] {
            let changes = load_plan_str(&text).unwrap();
            for change in &changes {
                assert_eq!(
                    toml_engine.evaluate(change),
                    builtin.evaluate(change),
                    "engines disagree on {}",
                    change.kind
                );
            }
        }
    }
}
