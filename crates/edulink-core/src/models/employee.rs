use serde::{Deserialize, Serialize};

/// A member of staff referenced by behaviour or achievement records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Employee {
    pub id: String,
    pub title: String,
    pub forename: String,
    pub surname: String,
    pub gender: String,
    pub email: String,
    pub phone: String,
    pub mobile_phone: String,
}

impl Employee {
    /// "Mrs Jones", falling back to forename and surname when there is no title.
    pub fn display_name(&self) -> String {
        let name = if self.title.is_empty() {
            format!("{} {}", self.forename, self.surname)
        } else {
            format!("{} {}", self.title, self.surname)
        };
        name.trim().to_string()
    }
}

/// A base64 thumbnail for a learner or an employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Photo {
    pub id: String,
    /// Server-side cache tag for the image.
    pub cache: String,
    pub photo: String,
}
