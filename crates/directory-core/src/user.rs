//! User accounts for API authentication.

use crate::validation::{self, USERNAME_MAX};
use crate::{UserId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// May use the admin surface.
    pub is_staff: bool,
    /// Disabled accounts cannot log in.
    pub is_active: bool,
    /// Creation time.
    pub date_joined: DateTime<Utc>,
}

/// Fields for creating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Staff flag.
    pub is_staff: bool,
}

impl NewUser {
    /// Usernames are letters, digits and `@.+-_`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validation::required(&mut errors, "username", &self.username);
        validation::max_chars(&mut errors, "username", Some(&self.username), USERNAME_MAX);
        if !self
            .username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        errors.into_result()
    }

    /// Materializes the account.
    #[must_use]
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            username: self.username,
            password_hash: self.password_hash,
            is_staff: self.is_staff,
            is_active: true,
            date_joined: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.into(),
            password_hash: "$argon2id$stub".into(),
            is_staff: false,
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(new_user("sam.lee+ops@shop").validate().is_ok());
        assert!(new_user("").validate().is_err());
        assert!(new_user("has space").validate().is_err());
    }

    #[test]
    fn test_hash_not_serialized() {
        let user = new_user("sam").into_user(UserId::new(1));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "sam");
        assert!(user.is_active);
    }
}
