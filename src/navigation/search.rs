//! Keyword search across every level of a tree

use serde::Serialize;

use super::resolver::PathResolver;

pub const MAX_SEARCH_RESULTS: usize = 20;

const FUNCTION_NAME: u32 = 10;
const FUNCTION_KEYWORD: u32 = 5;
const SERVICE_NAME: u32 = 8;
const SERVICE_KEYWORD: u32 = 4;
const ACTIVITY_NAME: u32 = 7;
const ACTIVITY_DOCUMENT_TYPE: u32 = 6;
const ACTIVITY_KEYWORD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchLevel {
    Function,
    Service,
    Activity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    Name,
    Keyword,
    DocumentType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// `Function`, `Function/Service` or `Function/Service/Activity`
    pub path: String,
    pub level: SearchLevel,
    pub match_kind: MatchKind,
    pub relevance: u32,
    /// The name, keyword or document type that matched
    pub matched: String,
}

fn find_match<'a>(needle: &str, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .find(|c| c.to_lowercase().contains(needle))
        .map(String::as_str)
}

impl PathResolver {
    /// Every function, service and activity whose name, keywords or (for
    /// activities) document types contain `keyword`, best first
    pub fn search_by_keyword(&self, keyword: &str) -> Vec<SearchHit> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for function in self.tree().functions() {
            if function.name.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    path: function.name.clone(),
                    level: SearchLevel::Function,
                    match_kind: MatchKind::Name,
                    relevance: FUNCTION_NAME,
                    matched: function.name.clone(),
                });
            } else if let Some(kw) = find_match(&needle, &function.keywords) {
                hits.push(SearchHit {
                    path: function.name.clone(),
                    level: SearchLevel::Function,
                    match_kind: MatchKind::Keyword,
                    relevance: FUNCTION_KEYWORD,
                    matched: kw.to_string(),
                });
            }

            for service in function.services() {
                let service_path = format!("{}/{}", function.name, service.name);
                if service.name.to_lowercase().contains(&needle) {
                    hits.push(SearchHit {
                        path: service_path.clone(),
                        level: SearchLevel::Service,
                        match_kind: MatchKind::Name,
                        relevance: SERVICE_NAME,
                        matched: service.name.clone(),
                    });
                } else if let Some(kw) = find_match(&needle, &service.keywords) {
                    hits.push(SearchHit {
                        path: service_path.clone(),
                        level: SearchLevel::Service,
                        match_kind: MatchKind::Keyword,
                        relevance: SERVICE_KEYWORD,
                        matched: kw.to_string(),
                    });
                }

                for activity in service.activities() {
                    let path = format!("{}/{}", service_path, activity.name);
                    // A document-type hit labels the activity even when its
                    // name also matches
                    let hit = if let Some(dt) = find_match(&needle, &activity.document_types) {
                        Some((MatchKind::DocumentType, ACTIVITY_DOCUMENT_TYPE, dt.to_string()))
                    } else if activity.name.to_lowercase().contains(&needle) {
                        Some((MatchKind::Name, ACTIVITY_NAME, activity.name.clone()))
                    } else {
                        find_match(&needle, &activity.keywords)
                            .map(|kw| (MatchKind::Keyword, ACTIVITY_KEYWORD, kw.to_string()))
                    };

                    if let Some((match_kind, relevance, matched)) = hit {
                        hits.push(SearchHit {
                            path,
                            level: SearchLevel::Activity,
                            match_kind,
                            relevance,
                            matched,
                        });
                    }
                }
            }
        }

        // sort_by is stable: ties keep tree order
        hits.sort_by(|a, b| b.relevance.cmp(&a.relevance));
        hits.truncate(MAX_SEARCH_RESULTS);
        hits
    }
}
