//! The built-in Google Cloud security and compliance policy.
//!
//! Encodes the organization's rules for the resource kinds it cares about:
//! CMEK everywhere data is stored, HA for managed services, logging on
//! network edges, and a short list of kinds that must never be deployed.
//! Every other kind passes through unchecked.

use tracing::debug;

use plangate_contracts::error::PlangateResult;
use plangate_policy::{CatalogEngine, Constraint, PolicyCatalog, ResourceRule, ValueType};

use crate::predicates;

/// Regions where Cloud HSM is available for key rings.
pub const HSM_LOCATIONS: [&str; 7] = [
    "us",
    "us-west1",
    "us-west2",
    "us-west3",
    "us-central1",
    "us-east1",
    "us-east4",
];

/// Build the built-in catalog.
pub fn catalog() -> PlangateResult<PolicyCatalog> {
    PolicyCatalog::builder()
        .rule(
            "google_project",
            ResourceRule::new()
                .require(
                    "project_id",
                    Constraint::predicate(predicates::PROJECT_ID, predicates::project_id()?),
                )
                .require(
                    "labels",
                    Constraint::nested(
                        ResourceRule::new()
                            .require("product", Constraint::any())
                            .require("env", Constraint::any()),
                    ),
                ),
        )
        .rule(
            "google_compute_network",
            ResourceRule::new().require("delete_default_routes_on_create", Constraint::equals(true)),
        )
        .rule(
            "google_kms_key_ring",
            ResourceRule::new().require(
                "location",
                Constraint::one_of(HSM_LOCATIONS)
                    .with_message("Key Ring location must be within specific regions"),
            ),
        )
        .rule(
            "google_kms_crypto_key",
            ResourceRule::new().optional(
                "rotation_period",
                Constraint::predicate(predicates::ROTATION_PERIOD, predicates::rotation_period),
            ),
        )
        .rule(
            "google_redis_instance",
            ResourceRule::new().require(
                "tier",
                Constraint::equals("STANDARD_HA").with_message("Redis instance must be in HA configuration"),
            ),
        )
        .rule(
            "google_bigquery_dataset",
            ResourceRule::new().require(
                "default_encryption_configuration",
                Constraint::min_length(1).with_message("BigQuery must use CMEK"),
            ),
        )
        .rule(
            "google_sql_database_instance",
            ResourceRule::new()
                // First generation instance settings, deprecated.
                .forbid("replication_type")
                .forbid("authorized_gae_applications")
                .require(
                    "encryption_key_name",
                    Constraint::of_type(ValueType::String).with_message("Cloud SQL must use CMEK"),
                )
                .require("region", Constraint::of_type(ValueType::String))
                .require(
                    "settings",
                    Constraint::nested(
                        ResourceRule::new()
                            .require("availability_type", Constraint::equals("REGIONAL"))
                            .require(
                                "backup_configuration",
                                Constraint::nested(
                                    ResourceRule::new().require("enabled", Constraint::equals(true)),
                                ),
                            ),
                    ),
                ),
        )
        .rule(
            "google_compute_subnetwork",
            ResourceRule::new()
                .require(
                    "log_config",
                    Constraint::min_length(1).with_message("Subnets must have VPC Flow Logs enabled"),
                )
                .require(
                    "private_ip_google_access",
                    Constraint::equals(true)
                        .with_message("Private Google Access must be enabled for all subnets"),
                ),
        )
        .rule(
            "google_storage_bucket",
            ResourceRule::new()
                .require("encryption", Constraint::min_length(1))
                .require(
                    "labels",
                    Constraint::nested(ResourceRule::new().require("team", Constraint::any()))
                        .with_message("Must have label"),
                ),
        )
        .rule(
            "google_compute_firewall",
            ResourceRule::new().require("enable_logging", Constraint::equals(true)),
        )
        .rule(
            "google_compute_instance",
            ResourceRule::new().require(
                "boot_disk",
                Constraint::nested(
                    ResourceRule::new().require("kms_key_self_link", Constraint::of_type(ValueType::String)),
                ),
            ),
        )
        .rule(
            "google_pubsub_topic",
            ResourceRule::new().require("kms_key_name", Constraint::of_type(ValueType::String)),
        )
        .forbid("google_healthcare_dataset")
        .forbid("google_game_services_game_server_cluster")
        .build()
}

/// A ready-to-use engine over [`catalog`].
pub fn engine() -> PlangateResult<CatalogEngine> {
    let catalog = catalog()?;
    debug!(kinds = catalog.len(), "built-in policy ready");
    Ok(CatalogEngine::new(catalog))
}

/// The same policy as a TOML document, as a starting point for `--policy`
/// files.  Its `predicate` keys resolve against [`predicates::registry`].
pub const GCP_POLICY_TOML: &str = include_str!("../policies/gcp.toml");
