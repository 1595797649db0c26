//! Taxonomy definition file format
//!
//! One definition per (entity type, country). Every level is a name-keyed map
//! so sibling names are unique by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root of a taxonomy definition file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyDefinition {
    pub entity_type: String,
    pub country: String,
    pub version: String,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DefinitionMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDef {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub activities: BTreeMap<String, ActivityDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDef {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub document_types: Vec<String>,
    /// Country code → rule
    #[serde(default)]
    pub retention: BTreeMap<String, RetentionRule>,
}

/// How long records of an activity must be kept in one jurisdiction.
///
/// `years == Some(0)` means the records are kept permanently. A rule with no
/// `years` or an empty `authority` is present but not usable for provisioning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRule {
    #[serde(default)]
    pub years: Option<u32>,
    #[serde(default)]
    pub authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date_basis: Option<DateBasis>,
}

impl RetentionRule {
    pub fn new(years: u32, authority: impl Into<String>) -> Self {
        Self {
            years: Some(years),
            authority: authority.into(),
            notes: None,
            from_date_basis: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_basis(mut self, basis: DateBasis) -> Self {
        self.from_date_basis = Some(basis);
        self
    }

    /// Both the period and the citation are populated
    pub fn is_complete(&self) -> bool {
        self.years.is_some() && !self.authority.trim().is_empty()
    }

    pub fn is_permanent(&self) -> bool {
        self.years == Some(0)
    }
}

/// Event a retention period is counted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateBasis {
    Creation,
    FiscalYearEnd,
    ElectionDate,
    DistributionDate,
}

impl DateBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateBasis::Creation => "creation",
            DateBasis::FiscalYearEnd => "fiscalYearEnd",
            DateBasis::ElectionDate => "electionDate",
            DateBasis::DistributionDate => "distributionDate",
        }
    }
}

impl std::fmt::Display for DateBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionMetadata {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
entityType: household
country: US
version: "2024.1"
functions:
  HealthManagement:
    description: Health records
    keywords: [health, medical]
    services:
      MedicalCare:
        activities:
          Consultations:
            documentTypes: [VisitSummary, Referral]
            retention:
              US:
                years: 7
                authority: HIPAA 45 CFR 164.316
                fromDateBasis: creation
"#;

    #[test]
    fn test_parse_yaml_definition() {
        let def: TaxonomyDefinition = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(def.entity_type, "household");
        assert_eq!(def.version, "2024.1");

        let activity = &def.functions["HealthManagement"].services["MedicalCare"].activities
            ["Consultations"];
        assert_eq!(activity.document_types, vec!["VisitSummary", "Referral"]);

        let rule = &activity.retention["US"];
        assert_eq!(rule.years, Some(7));
        assert_eq!(rule.from_date_basis, Some(DateBasis::Creation));
        assert!(rule.is_complete());
        assert!(def.metadata.is_none());
    }

    #[test]
    fn test_incomplete_rule() {
        let rule: RetentionRule = serde_json::from_str(r#"{"authority": "IRS"}"#).unwrap();
        assert!(!rule.is_complete());

        let rule: RetentionRule = serde_json::from_str(r#"{"years": 3, "authority": "  "}"#).unwrap();
        assert!(!rule.is_complete());
    }

    #[test]
    fn test_permanent_rule() {
        assert!(RetentionRule::new(0, "State probate code").is_permanent());
        assert!(!RetentionRule::new(7, "IRS").is_permanent());
    }

    #[test]
    fn test_date_basis_wire_names() {
        let json = serde_json::to_string(&DateBasis::FiscalYearEnd).unwrap();
        assert_eq!(json, "\"fiscalYearEnd\"");
        assert_eq!(DateBasis::DistributionDate.to_string(), "distributionDate");
    }
}
