//! Customer profile lifecycle.

use std::future::Future;

use tracing::{info, instrument};

use photostock_core::{CustomerId, UserId};

use crate::db::RepositoryError;
use crate::models::{CustomerProfile, FieldError, ProfileForm, ProfileInput};

/// Persistence for customer profiles.
pub trait ProfileStore {
    fn find_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<CustomerProfile>, RepositoryError>> + Send;

    /// Insert a profile. Returns `RepositoryError::Conflict` if the user already has one.
    fn create(
        &self,
        user_id: UserId,
        input: &ProfileInput,
    ) -> impl Future<Output = Result<CustomerProfile, RepositoryError>> + Send;

    fn update(
        &self,
        customer_id: CustomerId,
        input: &ProfileInput,
    ) -> impl Future<Output = Result<CustomerProfile, RepositoryError>> + Send;
}

/// Result of submitting the create or update form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    Saved(CustomerProfile),
    /// Create was requested but a profile exists; nothing was written.
    AlreadyExists(CustomerProfile),
    /// Validation failed; nothing was written.
    Invalid(Vec<FieldError>),
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("no profile for this user")]
    NoProfile,

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Create the profile for `user_id` from a submitted form.
///
/// # Errors
///
/// Returns `ProfileError::Storage` if the store fails.
#[instrument(skip(store, form))]
pub async fn create<S>(
    store: &S,
    user_id: UserId,
    form: &ProfileForm,
) -> Result<ProfileOutcome, ProfileError>
where
    S: ProfileStore + Sync,
{
    if let Some(existing) = store.find_by_user(user_id).await? {
        return Ok(ProfileOutcome::AlreadyExists(existing));
    }

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(ProfileOutcome::Invalid(errors)),
    };

    match store.create(user_id, &input).await {
        Ok(profile) => {
            info!(customer_id = %profile.id, "Customer profile created");
            Ok(ProfileOutcome::Saved(profile))
        }
        // Lost a race with a concurrent submission
        Err(RepositoryError::Conflict(_)) => store
            .find_by_user(user_id)
            .await?
            .map(ProfileOutcome::AlreadyExists)
            .ok_or(ProfileError::NoProfile),
        Err(e) => Err(e.into()),
    }
}

/// Update the existing profile for `user_id`.
///
/// # Errors
///
/// Returns `ProfileError::NoProfile` if there is nothing to update.
#[instrument(skip(store, form))]
pub async fn update<S>(
    store: &S,
    user_id: UserId,
    form: &ProfileForm,
) -> Result<ProfileOutcome, ProfileError>
where
    S: ProfileStore + Sync,
{
    let existing = store
        .find_by_user(user_id)
        .await?
        .ok_or(ProfileError::NoProfile)?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(ProfileOutcome::Invalid(errors)),
    };

    let profile = store.update(existing.id, &input).await?;
    info!(customer_id = %profile.id, "Customer profile updated");
    Ok(ProfileOutcome::Saved(profile))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::fakes::InMemoryStore;

    const USER: UserId = UserId::new(42);

    fn form(first_name: &str) -> ProfileForm {
        ProfileForm {
            first_name: first_name.to_string(),
            last_name: "Tan".to_string(),
            email: "mei@example.sg".to_string(),
            phone: String::new(),
            country: "Singapore".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_create_again_does_not_duplicate() {
        let store = InMemoryStore::default();

        let first = create(&store, USER, &form("Mei")).await.unwrap();
        let ProfileOutcome::Saved(profile) = first else {
            panic!("expected a saved profile");
        };

        let second = create(&store, USER, &form("Someone")).await.unwrap();
        assert_eq!(second, ProfileOutcome::AlreadyExists(profile));
        assert_eq!(store.profile_count(), 1);
    }

    #[tokio::test]
    async fn invalid_form_writes_nothing() {
        let store = InMemoryStore::default();
        let outcome = create(&store, USER, &form("")).await.unwrap();

        assert!(matches!(
            outcome,
            ProfileOutcome::Invalid(ref errors) if errors[0].field == "first_name"
        ));
        assert_eq!(store.profile_count(), 0);
    }

    #[tokio::test]
    async fn update_requires_existing_profile() {
        let store = InMemoryStore::default();
        assert!(matches!(
            update(&store, USER, &form("Mei")).await,
            Err(ProfileError::NoProfile)
        ));
    }

    #[tokio::test]
    async fn update_changes_fields_and_keeps_id() {
        let store = InMemoryStore::default();
        let ProfileOutcome::Saved(created) = create(&store, USER, &form("Mei")).await.unwrap()
        else {
            panic!("expected a saved profile");
        };

        let ProfileOutcome::Saved(updated) = update(&store, USER, &form("Mei Ling")).await.unwrap()
        else {
            panic!("expected a saved profile");
        };

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.first_name, "Mei Ling");
    }

    #[tokio::test]
    async fn invalid_update_keeps_old_values() {
        let store = InMemoryStore::default();
        create(&store, USER, &form("Mei")).await.unwrap();

        let outcome = update(&store, USER, &form(&"x".repeat(101))).await.unwrap();
        assert!(matches!(outcome, ProfileOutcome::Invalid(_)));
        assert_eq!(
            store.find_by_user(USER).await.unwrap().unwrap().first_name,
            "Mei"
        );
    }
}
