//! `Function/Service/Activity` path value

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActivityPath {
    pub function: String,
    pub service: String,
    pub activity: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected Function/Service/Activity, got '{0}'")]
pub struct ParseActivityPathError(pub String);

impl ActivityPath {
    pub fn new(
        function: impl Into<String>,
        service: impl Into<String>,
        activity: impl Into<String>,
    ) -> Self {
        Self {
            function: function.into(),
            service: service.into(),
            activity: activity.into(),
        }
    }

    pub fn segments(&self) -> [&str; 3] {
        [&self.function, &self.service, &self.activity]
    }
}

impl fmt::Display for ActivityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.function, self.service, self.activity)
    }
}

impl FromStr for ActivityPath {
    type Err = ParseActivityPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s
            .split('/')
            .map(str::trim)
            .filter(|seg| !seg.is_empty())
            .collect();

        match segments.as_slice() {
            [function, service, activity] => Ok(Self::new(*function, *service, *activity)),
            _ => Err(ParseActivityPathError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path: ActivityPath = " /HealthManagement/MedicalCare/Consultations/ ".parse().unwrap();
        assert_eq!(path.function, "HealthManagement");
        assert_eq!(path.activity, "Consultations");
        assert_eq!(
            path.to_string(),
            "HealthManagement/MedicalCare/Consultations"
        );
    }

    #[test]
    fn test_wrong_segment_count() {
        assert!("HealthManagement/MedicalCare".parse::<ActivityPath>().is_err());
        assert!("A/B/C/D".parse::<ActivityPath>().is_err());
        assert!("AMBIGUOUS".parse::<ActivityPath>().is_err());
    }
}
