//! Legacy flat-type mapping tables

use serde::{Deserialize, Serialize};

/// Sentinel hierarchical path for flat types that have no single target
pub const AMBIGUOUS_PATH: &str = "AMBIGUOUS";

/// Certainty of an automatic flat → hierarchical mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// One row of a mapping table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMapping {
    pub flat_type: String,
    /// `Function/Service/Activity`, or [`AMBIGUOUS_PATH`]
    pub hierarchical_path: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<String>,
}

impl MigrationMapping {
    pub fn is_ambiguous(&self) -> bool {
        self.hierarchical_path.trim() == AMBIGUOUS_PATH
    }

    /// Ambiguous or low-confidence rows are never applied automatically
    pub fn needs_review(&self) -> bool {
        self.is_ambiguous() || self.confidence == Confidence::Low
    }

    pub fn has_alternatives(&self) -> bool {
        !self.alternatives.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_table() {
        let json = r#"[
            {"flatType": "Medical", "hierarchicalPath": "HealthManagement/MedicalCare/Consultations",
             "confidence": "high", "rationale": "direct"},
            {"flatType": "Misc", "hierarchicalPath": "AMBIGUOUS", "confidence": "low",
             "rationale": "too broad", "alternatives": ["A/B/C", "D/E/F"]}
        ]"#;
        let rows: Vec<MigrationMapping> = serde_json::from_str(json).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(!rows[0].needs_review());
        assert!(rows[0].alternatives.is_empty());
        assert!(rows[1].is_ambiguous());
        assert!(rows[1].needs_review());
        assert_eq!(rows[1].alternatives.len(), 2);
    }

    #[test]
    fn test_low_confidence_needs_review() {
        let row = MigrationMapping {
            flat_type: "Receipts".to_string(),
            hierarchical_path: "FinancialManagement/Spending/Purchases".to_string(),
            confidence: Confidence::Low,
            rationale: String::new(),
            alternatives: vec![],
        };
        assert!(!row.is_ambiguous());
        assert!(row.needs_review());
        assert!(!row.has_alternatives());
    }
}
