use crate::config::AdminConfig;

/// Header carrying the staff credential on administrative routes.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Allow/deny decision for staff-only operations.
pub trait AccessPolicy: Send + Sync {
    fn allows(&self, credential: Option<&str>) -> bool;
}

/// One shared secret for all staff. No identities, no expiry.
#[derive(Clone)]
pub struct SharedSecretPolicy {
    secret: Option<String>,
}

impl SharedSecretPolicy {
    pub fn new(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            secret: (!secret.is_empty()).then_some(secret),
        }
    }

    /// A policy with no secret denies everyone.
    pub fn deny_all() -> Self {
        Self { secret: None }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        match &config.admin_token {
            Some(token) => Self::new(token.clone()),
            None => Self::deny_all(),
        }
    }
}

impl AccessPolicy for SharedSecretPolicy {
    fn allows(&self, credential: Option<&str>) -> bool {
        match (&self.secret, credential) {
            (Some(secret), Some(credential)) => {
                constant_time_eq(secret.as_bytes(), credential.trim().as_bytes())
            }
            _ => false,
        }
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_secret_is_allowed() {
        let policy = SharedSecretPolicy::new("road-crew");
        assert!(policy.allows(Some("road-crew")));
        assert!(policy.allows(Some(" road-crew\n")));
    }

    #[test]
    fn wrong_or_missing_credential_is_denied() {
        let policy = SharedSecretPolicy::new("road-crew");
        assert!(!policy.allows(Some("road-crew2")));
        assert!(!policy.allows(Some("")));
        assert!(!policy.allows(None));
    }

    #[test]
    fn unconfigured_policy_denies_everyone() {
        let policy = SharedSecretPolicy::from_config(&AdminConfig { admin_token: None });
        assert!(!policy.allows(Some("")));
        assert!(!policy.allows(Some("anything")));
        assert!(!SharedSecretPolicy::new("").allows(Some("")));
    }
}
