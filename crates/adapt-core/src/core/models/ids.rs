use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a node in the task graph. Stays valid for the graph's lifetime.
pub type TaskId = NodeIndex;

/// Stable identifier shared by every task and record belonging to one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A variant of the identifier that is safe to use as a file stem.
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if stem.is_empty() {
            "campaign".to_string()
        } else {
            stem
        }
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_replaces_path_separators_and_spaces() {
        let id = CampaignId::new("Pt(111)/CO top site");
        assert_eq!(id.file_stem(), "Pt_111__CO_top_site");
    }

    #[test]
    fn file_stem_of_empty_identifier_falls_back_to_placeholder() {
        assert_eq!(CampaignId::new("").file_stem(), "campaign");
    }
}
