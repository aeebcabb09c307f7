use serde::{Deserialize, Serialize};

/// Reference to a team the user belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: String,
    pub summary: String,
}

/// A user of the incident source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Display name, matched against log entry summaries
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub teams: Vec<TeamRef>,
}

impl User {
    pub fn team_ids(&self) -> Vec<String> {
        self.teams.iter().map(|team| team.id.clone()).collect()
    }

    pub fn has_teams(&self) -> bool {
        !self.teams.is_empty()
    }
}
