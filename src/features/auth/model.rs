use super::guest::is_guest_username;

/// Caller identity resolved from a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Guest {
        username: String,
    },
    OAuth2 {
        username: String,
        email: String,
        verified_email: bool,
    },
}

impl Identity {
    pub fn username(&self) -> &str {
        match self {
            Identity::Guest { username } | Identity::OAuth2 { username, .. } => username,
        }
    }

    /// Whether this identity may manage the files of `owner`
    pub fn can_access(&self, owner: &str) -> bool {
        match self {
            Identity::Guest { username } => is_guest_username(owner) && username == owner,
            Identity::OAuth2 {
                username,
                verified_email,
                ..
            } => !is_guest_username(owner) && *verified_email && username == owner,
        }
    }
}
