
use crate::api::methods::{LoginResult, LoginUser};
use crate::models::{Child, Establishment};

/// Result of a successful login: the bearer token plus the account's
/// children, in the order the API listed them.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub user: LoginUser,
    pub children: Vec<Child>,
    pub establishment: Establishment,
}

impl Session {
    pub fn from_login(username: &str, login: LoginResult) -> Self {
        Self {
            token: login.authtoken,
            username: username.to_string(),
            user: login.user,
            children: login.children,
            establishment: login.establishment,
        }
    }

    pub fn token(&self) -> Option<&str> {
        if self.token.is_empty() {
            None
        } else {
            Some(&self.token)
        }
    }

    /// "Title Surname" of the logged-in parent, for log lines.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.user.title, self.user.surname);
        match name.trim() {
            "" => self.username.clone(),
            trimmed => trimmed.to_string(),
        }
    }
}
