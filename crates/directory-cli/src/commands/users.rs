//! Login accounts.

use clap::Args;
use directory_core::{NewUser, User};
use directory_crypto::hash_password;
use directory_storage::{DirectoryStore, StorageError};
use tracing::info;

use crate::output::{success, CliError};

/// Create a login account.
#[derive(Args)]
pub struct CreateUserCommand {
    /// Login name
    pub username: String,

    /// Allow access to the admin surface
    #[arg(long)]
    pub staff: bool,

    /// Account password
    #[arg(long, env = "DIRECTORY_USER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl CreateUserCommand {
    /// Creates the account.
    pub async fn run(self, store: &dyn DirectoryStore) -> Result<(), CliError> {
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CliError::validation("A password is required. Use --password or set DIRECTORY_USER_PASSWORD"))?;
        let user = create_user(store, &self.username, &password, self.staff).await?;
        success(&format!(
            "Created {} '{}' (id {})",
            if user.is_staff { "staff user" } else { "user" },
            user.username,
            user.id
        ));
        Ok(())
    }
}

/// Validates and stores a new account with an Argon2 password hash.
pub async fn create_user(
    store: &dyn DirectoryStore,
    username: &str,
    password: &str,
    is_staff: bool,
) -> Result<User, CliError> {
    let new_user = NewUser {
        username: username.trim().to_string(),
        password_hash: hash_password(password)?,
        is_staff,
    };
    new_user.validate()?;

    let user = store.create_user(new_user).await.map_err(|e| match e {
        StorageError::Conflict(_) => CliError::validation(format!("User '{}' already exists", username.trim())),
        other => other.into(),
    })?;
    info!(user_id = %user.id, is_staff, "Created user");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory_crypto::verify_password;
    use directory_storage::InMemoryStore;

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let store = InMemoryStore::new();
        let user = create_user(&store, "admin", "s3cret!", true).await.unwrap();

        assert!(user.is_staff);
        assert_ne!(user.password_hash, "s3cret!");
        assert!(verify_password("s3cret!", &user.password_hash));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let store = InMemoryStore::new();
        create_user(&store, "sam", "pw", false).await.unwrap();

        let err = create_user(&store, "sam", "pw", false).await.unwrap_err();
        assert_eq!(err.message, "User 'sam' already exists");
    }

    #[tokio::test]
    async fn test_invalid_username() {
        let store = InMemoryStore::new();
        let err = create_user(&store, "no spaces", "pw", false).await.unwrap_err();
        assert!(err.message.contains("username"));
    }
}
