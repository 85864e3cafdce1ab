//! Rule model and the built-in rule tables.

use pushgate_utils::types::{ProjectType, Severity};
use serde::{Deserialize, Serialize};

/// What a rule checks about its field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Present and non-empty.
    Required,
    /// A string from a fixed, case-sensitive set.
    OneOf { values: Vec<String> },
    /// The rendered value matches a regex.
    Pattern { regex: String },
    /// A dotted version no lower than `version` (major.minor.patch).
    MinVersion { version: String },
    /// Exactly this value.
    Equals { value: serde_json::Value },
    /// A member of the configured business-unit set.
    BusinessUnit,
    /// A list containing an object whose `key` equals `value`.
    ContainsEntry { key: String, value: String },
}

/// Precondition for a rule: the rule applies only when `field` equals `equals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub equals: String,
}

/// One metadata rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    /// Dot-separated field path.
    pub field: String,
    /// Alternative paths checked in order after `field`.
    #[serde(default)]
    pub aliases: Vec<String>,
    pub check: Predicate,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub when: Option<Condition>,
    #[serde(default)]
    pub description: String,
}

impl Rule {
    fn new(id: &str, field: &str, check: Predicate, description: &str) -> Self {
        Self {
            id: id.to_string(),
            field: field.to_string(),
            aliases: Vec::new(),
            check,
            severity: Severity::Error,
            when: None,
            description: description.to_string(),
        }
    }

    fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| (*a).to_string()).collect();
        self
    }

    fn when(mut self, field: &str, equals: &str) -> Self {
        self.when = Some(Condition {
            field: field.to_string(),
            equals: equals.to_string(),
        });
        self
    }

    /// `field` followed by its aliases.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.field.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

fn one_of(values: &[&str]) -> Predicate {
    Predicate::OneOf {
        values: values.iter().map(|v| (*v).to_string()).collect(),
    }
}

fn pattern(regex: &str) -> Predicate {
    Predicate::Pattern {
        regex: regex.to_string(),
    }
}

/// The API metadata table shared by PCF and SHP/IKP repositories.
fn api_metadata_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "meta.metadata-version",
            "metaDataVersion",
            Predicate::MinVersion {
                version: "6.0.0".to_string(),
            },
            "metaDataVersion must be 6.0.0 or later",
        ),
        Rule::new(
            "meta.asset-name",
            "assetName",
            pattern(r"^[a-z]+((--|-)[a-z0-9]+)*$"),
            "assetName must be lowercase words joined by hyphens",
        ),
        Rule::new(
            "meta.asset-version",
            "assetVersion",
            pattern(r"^1\.0\.0\.\d+$"),
            "assetVersion must look like 1.0.0.<build>",
        ),
        Rule::new(
            "meta.auto-increment",
            "autoIncrementAssetVersion",
            Predicate::Equals {
                value: serde_json::Value::Bool(true),
            },
            "autoIncrementAssetVersion must be true",
        ),
        Rule::new(
            "meta.contract-file-name",
            "contractFileName",
            Predicate::Required,
            "contractFileName must be set",
        ),
        Rule::new(
            "meta.ignore",
            "ignore",
            Predicate::Equals {
                value: serde_json::Value::Bool(false),
            },
            "ignore must be false",
        ),
        Rule::new(
            "api.layer",
            "API.layer",
            one_of(&["xAPI", "sAPI", "eAPI"]),
            "API.layer must be xAPI, sAPI or eAPI",
        ),
        Rule::new(
            "api.audience",
            "API.audience",
            one_of(&["internal", "external"]),
            "API.audience must be internal or external",
        ),
        Rule::new(
            "api.contract-version",
            "API.version.contractVersion",
            pattern(r"^[vV]?[0-9]+(?:\.[0-9]+){1,2}$"),
            "API.version.contractVersion must be a dotted version",
        ),
        Rule::new(
            "api.status",
            "API.version.status",
            one_of(&["develop", "test", "prelive", "live", "deprecated", "demised"]),
            "API.version.status must be a lifecycle stage",
        ),
        Rule::new(
            "api.private-api",
            "API.version.privateAPI",
            Predicate::Required,
            "API.version.privateAPI must be set",
        ),
        Rule::new(
            "api.api-style",
            "API.version.apiStyle",
            one_of(&[
                "HYDROGEN",
                "DOMAIN_PAPI",
                "ORIGINATIONS",
                "BANKING 2.0",
                "FIRST_DIRECT",
                "BERLIN",
                "STET",
                "OBIE",
                "OTHER",
            ]),
            "API.version.apiStyle must be a known style",
        ),
        Rule::new(
            "api.implementation-framework",
            "API.version.implementationFramework",
            one_of(&[
                "CARBON",
                "SPRING_BOOT",
                "SILVER",
                "SILVER_1S",
                "NODE JS",
                "DOMAIN_PAPI",
                "MULESOFT",
                "OTHER",
            ]),
            "API.version.implementationFramework must be a known framework",
        ),
        Rule::new(
            "api.architectural-style",
            "API.version.architecturalStyle",
            one_of(&["REST", "GRAPHQL", "SOAP", "RPC"]),
            "API.version.architecturalStyle must be REST, GRAPHQL, SOAP or RPC",
        ),
        Rule::new(
            "api.business-models",
            "API.version.businessModels",
            Predicate::ContainsEntry {
                key: "name".to_string(),
                value: "WPB-CIDM".to_string(),
            },
            "eAPI business models must include WPB-CIDM",
        )
        .when("API.layer", "eAPI"),
        Rule::new(
            "api.transaction-names",
            "API.version.transactionNames",
            Predicate::Required,
            "sAPI must list its transaction names",
        )
        .when("API.layer", "sAPI"),
        Rule::new(
            "api.data-classification",
            "API.version.dataClassification",
            one_of(&["public", "internal", "confidential", "restricted", "secret"]),
            "API.version.dataClassification must be a known classification",
        ),
        Rule::new(
            "owner.business-unit",
            "API.contract.GBGF",
            Predicate::BusinessUnit,
            "the owning business unit must be a configured code",
        )
        .aliases(&["contractOwner.GBGF", "API.contractOwner.GBGF"]),
        Rule::new(
            "owner.service-line",
            "API.contractOwner.serviceLine",
            Predicate::Required,
            "the owning service line must be set",
        )
        .aliases(&["contractOwner.serviceLine"]),
        Rule::new(
            "owner.team-name",
            "API.contractOwner.teamName",
            Predicate::Required,
            "the owning team name must be set",
        )
        .aliases(&["contractOwner.teamName"]),
        Rule::new(
            "owner.team-email",
            "API.contractOwner.teamEmailAddress",
            Predicate::Required,
            "the owning team email must be set",
        )
        .aliases(&["contractOwner.teamEmailAddress"]),
    ]
}

/// Built-in table for a project type. General has no rules.
#[must_use]
pub fn builtin_rules(project_type: ProjectType) -> Vec<Rule> {
    match project_type {
        ProjectType::General => Vec::new(),
        ProjectType::Pcf | ProjectType::ShpIkp => api_metadata_rules(),
    }
}
