//! Immutable taxonomy tree with per-level name indexes

use std::collections::{BTreeMap, BTreeSet, HashMap};

use records_taxonomy_types::{ActivityDef, FunctionDef, RetentionRule, ServiceDef, TaxonomyDefinition};

use super::path::ActivityPath;

static NO_RETENTION: BTreeMap<String, RetentionRule> = BTreeMap::new();

/// Lowercase name → position among siblings
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    by_lower: HashMap<String, usize>,
}

impl NameIndex {
    fn build<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        let mut by_lower = HashMap::new();
        for (position, name) in names.enumerate() {
            // Siblings differing only by case: the first one wins
            by_lower.entry(name.to_lowercase()).or_insert(position);
        }
        Self { by_lower }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_lower.get(&name.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.by_lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lower.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    services: Vec<ServiceNode>,
    index: NameIndex,
}

impl FunctionNode {
    fn build(name: String, def: FunctionDef) -> Self {
        let services: Vec<ServiceNode> = def
            .services
            .into_iter()
            .map(|(name, def)| ServiceNode::build(name, def))
            .collect();
        let index = NameIndex::build(services.iter().map(|s| s.name.as_str()));
        Self {
            name,
            description: def.description,
            keywords: def.keywords,
            services,
            index,
        }
    }

    pub fn services(&self) -> &[ServiceNode] {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&ServiceNode> {
        self.index.position(name).map(|i| &self.services[i])
    }
}

#[derive(Debug, Clone)]
pub struct ServiceNode {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    activities: Vec<ActivityNode>,
    index: NameIndex,
}

impl ServiceNode {
    fn build(name: String, def: ServiceDef) -> Self {
        let activities: Vec<ActivityNode> = def
            .activities
            .into_iter()
            .map(|(name, def)| ActivityNode::build(name, def))
            .collect();
        let index = NameIndex::build(activities.iter().map(|a| a.name.as_str()));
        Self {
            name,
            description: def.description,
            keywords: def.keywords,
            activities,
            index,
        }
    }

    pub fn activities(&self) -> &[ActivityNode] {
        &self.activities
    }

    pub fn activity(&self, name: &str) -> Option<&ActivityNode> {
        self.index.position(name).map(|i| &self.activities[i])
    }
}

#[derive(Debug, Clone)]
pub struct ActivityNode {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub document_types: Vec<String>,
    /// Country code → rule
    pub retention: BTreeMap<String, RetentionRule>,
}

impl ActivityNode {
    fn build(name: String, def: ActivityDef) -> Self {
        Self {
            name,
            description: def.description,
            keywords: def.keywords,
            document_types: def.document_types,
            retention: def
                .retention
                .into_iter()
                .map(|(country, rule)| (country.trim().to_uppercase(), rule))
                .collect(),
        }
    }

    /// Canonical spelling of a document type, matched case-insensitively
    pub fn document_type(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.document_types
            .iter()
            .find(|dt| dt.to_lowercase() == wanted)
            .map(String::as_str)
    }

    pub fn retention_for(&self, country: &str) -> Option<&RetentionRule> {
        self.retention.get(&country.trim().to_uppercase())
    }

    /// At least one document type and one usable retention rule
    pub fn is_complete(&self) -> bool {
        !self.document_types.is_empty() && self.retention.values().any(RetentionRule::is_complete)
    }
}

/// One entity type's hierarchy for one country
#[derive(Debug, Clone)]
pub struct TaxonomyTree {
    entity_type: String,
    country_code: String,
    version: String,
    functions: Vec<FunctionNode>,
    index: NameIndex,
}

impl TaxonomyTree {
    pub fn from_definition(def: TaxonomyDefinition) -> Self {
        let functions: Vec<FunctionNode> = def
            .functions
            .into_iter()
            .map(|(name, def)| FunctionNode::build(name, def))
            .collect();
        let index = NameIndex::build(functions.iter().map(|f| f.name.as_str()));

        Self {
            entity_type: def.entity_type,
            country_code: def.country.trim().to_uppercase(),
            version: def.version,
            functions,
            index,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn functions(&self) -> &[FunctionNode] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&FunctionNode> {
        self.index.position(name).map(|i| &self.functions[i])
    }

    pub fn service(&self, function: &str, service: &str) -> Option<&ServiceNode> {
        self.function(function)?.service(service)
    }

    pub fn activity(&self, function: &str, service: &str, activity: &str) -> Option<&ActivityNode> {
        self.service(function, service)?.activity(activity)
    }

    pub fn services(&self, function: &str) -> &[ServiceNode] {
        self.function(function)
            .map(FunctionNode::services)
            .unwrap_or(&[])
    }

    pub fn activities(&self, function: &str, service: &str) -> &[ActivityNode] {
        self.service(function, service)
            .map(ServiceNode::activities)
            .unwrap_or(&[])
    }

    pub fn document_types(&self, function: &str, service: &str, activity: &str) -> &[String] {
        self.activity(function, service, activity)
            .map(|a| a.document_types.as_slice())
            .unwrap_or(&[])
    }

    pub fn retention(
        &self,
        function: &str,
        service: &str,
        activity: &str,
    ) -> &BTreeMap<String, RetentionRule> {
        self.activity(function, service, activity)
            .map(|a| &a.retention)
            .unwrap_or(&NO_RETENTION)
    }

    /// Every activity with its full path, in tree order
    pub fn activity_paths(&self) -> Vec<(ActivityPath, &ActivityNode)> {
        let mut paths = Vec::new();
        for function in &self.functions {
            for service in function.services() {
                for activity in service.activities() {
                    paths.push((
                        ActivityPath::new(&function.name, &service.name, &activity.name),
                        activity,
                    ));
                }
            }
        }
        paths
    }

    pub fn activity_count(&self) -> usize {
        self.functions
            .iter()
            .flat_map(|f| f.services())
            .map(|s| s.activities().len())
            .sum()
    }

    /// Union of every activity's document types
    pub fn all_document_types(&self) -> BTreeSet<String> {
        self.functions
            .iter()
            .flat_map(|f| f.services())
            .flat_map(|s| s.activities())
            .flat_map(|a| a.document_types.iter().cloned())
            .collect()
    }

    /// Function name → that function's activity names followed by its
    /// document types
    pub fn all_tag_categories(&self) -> BTreeMap<String, Vec<String>> {
        self.functions
            .iter()
            .map(|function| {
                let activities: Vec<&ActivityNode> = function
                    .services()
                    .iter()
                    .flat_map(|s| s.activities())
                    .collect();

                let mut entries: Vec<String> =
                    activities.iter().map(|a| a.name.clone()).collect();
                entries.extend(
                    activities
                        .iter()
                        .flat_map(|a| a.document_types.iter().cloned()),
                );
                (function.name.clone(), entries)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_definition;
    use records_taxonomy_types::DateBasis;

    #[test]
    fn test_case_insensitive_lookup() {
        let tree = TaxonomyTree::from_definition(sample_definition());
        assert_eq!(tree.country_code(), "US");

        let activity = tree
            .activity("healthmanagement", "MEDICALCARE", "consultations")
            .unwrap();
        assert_eq!(activity.name, "Consultations");
        assert_eq!(
            tree.retention("HealthManagement", "MedicalCare", "Consultations")["US"]
                .from_date_basis,
            Some(DateBasis::Creation)
        );
    }

    #[test]
    fn test_unknown_names_degrade_to_empty() {
        let tree = TaxonomyTree::from_definition(sample_definition());
        assert!(tree.services("Nope").is_empty());
        assert!(tree.activities("HealthManagement", "Nope").is_empty());
        assert!(tree.document_types("HealthManagement", "MedicalCare", "Nope").is_empty());
        assert!(tree.retention("X", "Y", "Z").is_empty());
        assert!(tree.function("").is_none());
    }

    #[test]
    fn test_all_document_types_is_union() {
        let tree = TaxonomyTree::from_definition(sample_definition());
        let all = tree.all_document_types();
        let expected: BTreeSet<String> = ["VisitSummary", "Referral", "Prescription", "Form1040"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(all, expected);
        assert_eq!(all, tree.all_document_types());
    }

    #[test]
    fn test_tag_categories() {
        let tree = TaxonomyTree::from_definition(sample_definition());
        let categories = tree.all_tag_categories();
        assert_eq!(
            categories["HealthManagement"],
            vec![
                "Consultations",
                "Prescriptions",
                "VisitSummary",
                "Referral",
                "Prescription",
                "VisitSummary"
            ]
        );
        assert_eq!(
            categories["FinancialManagement"],
            vec!["IncomeTaxReturns", "Form1040"]
        );
    }

    #[test]
    fn test_activity_paths() {
        let tree = TaxonomyTree::from_definition(sample_definition());
        let paths: Vec<String> = tree
            .activity_paths()
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        assert_eq!(paths.len(), tree.activity_count());
        assert!(paths.contains(&"FinancialManagement/Taxation/IncomeTaxReturns".to_string()));
    }

    #[test]
    fn test_document_type_lookup() {
        let tree = TaxonomyTree::from_definition(sample_definition());
        let activity = tree
            .activity("HealthManagement", "MedicalCare", "Consultations")
            .unwrap();
        assert_eq!(activity.document_type("referral"), Some("Referral"));
        assert!(activity.document_type("Invoice").is_none());
        assert!(activity.is_complete());
        assert!(activity.retention_for("us").is_some());
    }
}
