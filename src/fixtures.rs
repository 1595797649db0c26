//! Shared unit-test fixtures

use records_taxonomy_types::TaxonomyDefinition;

pub(crate) fn sample_definition() -> TaxonomyDefinition {
    serde_yaml::from_str(
        r#"
entityType: household
country: us
version: "1"
functions:
  HealthManagement:
    keywords: [health]
    services:
      MedicalCare:
        keywords: [clinic]
        activities:
          Consultations:
            keywords: [doctor]
            documentTypes: [VisitSummary, Referral]
            retention:
              us: { years: 7, authority: "HIPAA", fromDateBasis: creation }
          Prescriptions:
            documentTypes: [Prescription, VisitSummary]
            retention:
              US: { years: 3, authority: "State pharmacy law" }
  FinancialManagement:
    keywords: [money]
    services:
      Taxation:
        keywords: [irs]
        activities:
          IncomeTaxReturns:
            keywords: [tax]
            documentTypes: [Form1040]
            retention:
              US: { years: 7, authority: "IRC 6501", fromDateBasis: fiscalYearEnd }
"#,
    )
    .unwrap()
}

/// Same shape as [`sample_definition`] but for a trust, with one activity
/// missing its document types and another missing a usable rule
pub(crate) fn incomplete_definition() -> TaxonomyDefinition {
    serde_yaml::from_str(
        r#"
entityType: trust
country: US
version: "1"
functions:
  TrustAdministration:
    services:
      Governance:
        activities:
          TrustInstrument:
            documentTypes: []
            retention:
              US: { years: 0, authority: "State trust code" }
          Minutes:
            documentTypes: [MeetingMinutes]
            retention:
              US: { authority: "" }
"#,
    )
    .unwrap()
}

pub(crate) fn trust_definition() -> TaxonomyDefinition {
    serde_yaml::from_str(
        r#"
entityType: trust
country: US
version: "1"
functions:
  TrustAdministration:
    services:
      Governance:
        activities:
          TrustInstrument:
            documentTypes: [TrustDeed, Amendment]
            retention:
              US: { years: 0, authority: "State trust code" }
  FinancialManagement:
    services:
      Taxation:
        activities:
          FiduciaryReturns:
            documentTypes: [Form1041, Form1040]
            retention:
              US: { years: 7, authority: "IRC 6501" }
"#,
    )
    .unwrap()
}
