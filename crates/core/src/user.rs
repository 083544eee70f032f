use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity a privilege check is made against: `username@hostname`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grantee {
    pub username: String,
    pub hostname: String,
}

impl Grantee {
    pub fn new(username: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self { username: username.into(), hostname: hostname.into() }
    }
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.hostname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "User::any_host")]
    pub hostname: String,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into(), hostname: hostname.into() }
    }

    fn any_host() -> String { "%".to_string() }

    pub fn grantee(&self) -> Grantee {
        Grantee::new(self.username.clone(), self.hostname.clone())
    }

    /// `%` accepts any host; hostnames compare case-insensitively.
    pub fn accepts(&self, grantee: &Grantee) -> bool {
        self.username == grantee.username
            && (self.hostname == "%" || self.hostname.eq_ignore_ascii_case(&grantee.hostname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_host_accepts_any() {
        let root = User::new("root", "root", "%");
        assert!(root.accepts(&Grantee::new("root", "10.0.0.7")));
        assert!(root.accepts(&root.grantee()));
        assert!(!root.accepts(&Grantee::new("sharding", "%")));
    }

    #[test]
    fn exact_host_match() {
        let u = User::new("sharding", "sharding", "localhost");
        assert!(u.accepts(&Grantee::new("sharding", "LOCALHOST")));
        assert!(!u.accepts(&Grantee::new("sharding", "10.0.0.7")));
    }
}
