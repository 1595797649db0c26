//! Tag sets and storage paths derived from tree positions

use std::collections::HashSet;

use super::resolver::PathResolver;

/// `"HealthManagement"` → `"Health Management"`
pub fn humanize_identifier(identifier: &str) -> String {
    let mut spaced = String::with_capacity(identifier.len() + 8);
    for (i, ch) in identifier.chars().enumerate() {
        if i > 0 && ch.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(ch);
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `/domain/Function Words/Service Words/Activity Words`
pub fn generate_storage_path(domain: &str, function: &str, service: &str, activity: &str) -> String {
    format!(
        "/{}/{}/{}/{}",
        domain.trim_matches('/'),
        humanize_identifier(function),
        humanize_identifier(service),
        humanize_identifier(activity)
    )
}

impl PathResolver {
    /// Function, service and activity names followed by the activity's
    /// keywords, case-insensitively de-duplicated in first-seen order.
    /// Names are canonicalised when the path resolves.
    pub fn generate_hierarchical_tags(
        &self,
        function: &str,
        service: &str,
        activity: &str,
    ) -> Vec<String> {
        let node = self.tree().activity(function, service, activity);

        let mut candidates: Vec<String> = match node {
            Some(node) => {
                let canonical_function = self
                    .tree()
                    .function(function)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| function.to_string());
                let canonical_service = self
                    .tree()
                    .service(function, service)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| service.to_string());
                let mut names = vec![canonical_function, canonical_service, node.name.clone()];
                names.extend(node.keywords.iter().cloned());
                names
            }
            None => vec![function.to_string(), service.to_string(), activity.to_string()],
        };

        let mut seen = HashSet::new();
        candidates.retain(|tag| !tag.trim().is_empty() && seen.insert(tag.to_lowercase()));
        candidates
    }

    /// Storage path for a resolvable activity, using canonical names
    pub fn storage_path_for(
        &self,
        domain: &str,
        function: &str,
        service: &str,
        activity: &str,
    ) -> Option<String> {
        let service_node = self.tree().service(function, service)?;
        let activity_node = service_node.activity(activity)?;
        let function_node = self.tree().function(function)?;
        Some(generate_storage_path(
            domain,
            &function_node.name,
            &service_node.name,
            &activity_node.name,
        ))
    }
}
