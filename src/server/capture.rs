use parking_lot::Mutex;

use crate::protocol::StartupParameters;

/// Credentials offered by a client during startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl Credentials {
    pub fn new(parameters: &StartupParameters, password: Option<String>) -> Self {
        Self {
            user: parameters.user().map(str::to_string),
            password,
            database: parameters.database().map(str::to_string),
        }
    }

    /// Neither a user nor a password was offered.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(str::is_empty);
        blank(&self.user) && blank(&self.password)
    }
}

/// Receives the credentials captured by each session.
///
/// A sink is handed to the [`Server`](crate::server::Server) and shared by
/// every session it spawns.
pub trait CredentialSink: Send + Sync {
    fn capture(&self, credentials: &Credentials);
}

/// Records captures as `tracing` events in the current session span.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl CredentialSink for TracingSink {
    fn capture(&self, credentials: &Credentials) {
        tracing::info!(
            user = credentials.user.as_deref().unwrap_or_default(),
            password = credentials.password.as_deref().unwrap_or_default(),
            database = credentials.database.as_deref().unwrap_or_default(),
            "credentials from client"
        );
    }
}

/// Keeps captures in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    captured: Mutex<Vec<Credentials>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything captured so far, oldest first.
    pub fn captured(&self) -> Vec<Credentials> {
        self.captured.lock().clone()
    }
}

impl CredentialSink for MemorySink {
    fn capture(&self, credentials: &Credentials) {
        self.captured.lock().push(credentials.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_from_parameters() {
        let params: StartupParameters = [("user", "alice"), ("database", "postgres")]
            .into_iter()
            .collect();
        let creds = Credentials::new(&params, Some("secret123".to_string()));

        assert_eq!(creds.user.as_deref(), Some("alice"));
        assert_eq!(creds.password.as_deref(), Some("secret123"));
        assert_eq!(creds.database.as_deref(), Some("postgres"));
        assert!(!creds.is_empty());
    }

    #[test]
    fn test_credentials_empty() {
        let params: StartupParameters = [("database", "postgres")].into_iter().collect();
        assert!(Credentials::new(&params, None).is_empty());
        assert!(Credentials::new(&params, Some(String::new())).is_empty());
        assert!(!Credentials::new(&params, Some("pw".to_string())).is_empty());
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        for user in ["a", "b"] {
            sink.capture(&Credentials {
                user: Some(user.to_string()),
                ..Default::default()
            });
        }
        let users: Vec<_> = sink
            .captured()
            .into_iter()
            .filter_map(|c| c.user)
            .collect();
        assert_eq!(users, vec!["a", "b"]);
    }
}
