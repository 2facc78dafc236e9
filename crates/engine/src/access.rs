//! Caller identity and the privileged-capability check.

use roster_core::roles::ROLE_ADMIN;

/// The authenticated caller of a service verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
        }
    }
}

/// Decides whether a caller may run privileged operations (group
/// provisioning, roles updates).
pub trait AccessPolicy: Send + Sync {
    fn is_privileged(&self, caller: &Caller) -> bool;
}

/// Privileged iff the caller carries the `admin` role.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAccessPolicy;

impl AccessPolicy for RoleAccessPolicy {
    fn is_privileged(&self, caller: &Caller) -> bool {
        caller.role == ROLE_ADMIN
    }
}
