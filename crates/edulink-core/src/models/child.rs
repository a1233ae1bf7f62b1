use serde::{Deserialize, Serialize};

/// A learner linked to the parent account, as returned by `EduLink.Login`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Child {
    pub id: String,
    pub forename: String,
    pub surname: String,
    pub gender: String,
    pub community_group_id: String,
    pub form_group_id: String,
    pub year_group_id: String,
}

impl Child {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.forename, self.surname).trim().to_string()
    }
}
