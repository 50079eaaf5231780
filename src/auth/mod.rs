//! Authentication and role verification
//!
//! Token handling is deliberately thin: the JWT proves who is calling,
//! nothing more. What a caller may do is decided by the role stored in
//! the identity directory, checked server-side on every gated operation.

pub mod jwt;
pub mod middleware;

pub use jwt::{decode_jwt, encode_jwt, Claims};
pub use middleware::require_auth;

use crate::error::{MarketError, Result};
use crate::store::models::Role;
use crate::store::DocumentStore;

/// Verify that `user_id` holds the Admin role in the identity directory.
///
/// The rejection is a generic `Unauthorized` in every failure case
/// (unknown user, missing role, wrong role) so callers cannot probe
/// which of these applied.
pub async fn ensure_admin(store: &dyn DocumentStore, user_id: &str) -> Result<()> {
    match store.get_user(user_id).await? {
        Some(user) if user.role == Some(Role::Admin) => Ok(()),
        _ => Err(MarketError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockDocumentStore;
    use crate::test_helpers::test_user_with_role;

    #[tokio::test]
    async fn test_ensure_admin_accepts_only_admins() {
        let store = MockDocumentStore::new();
        store
            .upsert_user(&test_user_with_role("admin-1", Role::Admin))
            .await
            .unwrap();
        store
            .upsert_user(&test_user_with_role("exec-1", Role::Executive))
            .await
            .unwrap();

        assert!(ensure_admin(&store, "admin-1").await.is_ok());

        let err = ensure_admin(&store, "exec-1").await.unwrap_err();
        assert!(matches!(err, MarketError::Unauthorized));
        // Unknown ids and wrong roles are indistinguishable.
        let err = ensure_admin(&store, "nobody").await.unwrap_err();
        assert!(matches!(err, MarketError::Unauthorized));
    }
}
