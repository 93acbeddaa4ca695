use std::fmt;

/// Login for the secondary portal. Passed explicitly into each resolution.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<U, P>(username: U, password: P) -> Self
    where
        U: Into<String>,
        P: Into<String>,
    {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both halves must be non-blank for a login attempt to make sense.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

// Never print the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_complete() {
        assert!(Credentials::new("user", "secret").is_complete());
        assert!(!Credentials::new("", "secret").is_complete());
        assert!(!Credentials::new("   ", "secret").is_complete());
        assert!(!Credentials::new("user", "").is_complete());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("user", "hunter2"));
        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
