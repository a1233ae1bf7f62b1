use serde::{Deserialize, Serialize};

/// School details from `EduLink.SchoolDetails` (also embedded in the login result).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Establishment {
    pub name: String,
    /// Base64 encoded logo.
    pub logo: String,
    pub rooms: Vec<Room>,
    pub year_groups: Vec<Group>,
    pub community_groups: Vec<Group>,
    pub form_groups: Vec<FormGroup>,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Room {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormGroup {
    pub id: String,
    pub name: String,
    pub employee_id: String,
    pub room_id: String,
    pub year_group_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub active: bool,
}

impl Establishment {
    pub fn form_group_name(&self, id: &str) -> Option<&str> {
        self.form_groups
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.name.as_str())
    }

    pub fn year_group_name(&self, id: &str) -> Option<&str> {
        self.year_groups
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.name.as_str())
    }
}
