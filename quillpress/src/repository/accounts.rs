use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString},
};
use chrono::Utc;
use rand_core::OsRng;

use super::BlogRepository;
use crate::{
    errors::{IssueCollector, RepoError},
    id::generate_entity_id,
    models::{PublicUser, Registration, User},
    store::{DocumentStore, UniqueValue},
    validators::is_valid_email,
};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Hashes a password into an Argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, RepoError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| RepoError::other(format!("argon2 hash failed: {err}")))?
        .to_string();
    Ok(hash)
}

fn validate(registration: &Registration) -> Result<(), RepoError> {
    let mut issues = IssueCollector::new();
    issues.require_non_empty("userName", &registration.user_name);
    issues.require_non_empty("firstName", &registration.first_name);
    issues.require_non_empty("lastName", &registration.last_name);
    if !is_valid_email(registration.email.trim()) {
        issues.push("email", "validation.email", "must be a valid email address");
    }
    if registration.password.chars().count() < MIN_PASSWORD_LENGTH {
        issues.push(
            "password",
            "validation.length",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }
    if let Some(confirm) = &registration.confirm_password
        && confirm != &registration.password
    {
        issues.push("confirmPassword", "validation.mismatch", "passwords do not match");
    }
    Ok(issues.finish()?)
}

impl<S> BlogRepository<S>
where
    S: DocumentStore,
{
    /// Creates a user. User names and emails are unique regardless of case.
    pub async fn register_user(&self, registration: Registration) -> Result<PublicUser, RepoError> {
        validate(&registration)?;

        let now = Utc::now();
        let user = User {
            id: generate_entity_id(),
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            user_name: registration.user_name.trim().to_string(),
            email: registration.email.trim().to_string(),
            avatar: registration.avatar.filter(|avatar| !avatar.trim().is_empty()),
            password_hash: hash_password(&registration.password)?,
            liked_posts: Vec::new(),
            saved_posts: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let unique = [
            UniqueValue::case_insensitive("userName", &user.user_name),
            UniqueValue::case_insensitive("email", &user.email),
        ];
        self.store.insert(&user, &unique).await?;
        log::info!("registered user {} ({})", user.user_name, user.id);
        Ok(user.public())
    }

    pub async fn find_user_by_name(&self, user_name: &str) -> Result<Option<PublicUser>, RepoError> {
        let user: Option<User> = self
            .store
            .find_unique(&UniqueValue::case_insensitive("userName", user_name))
            .await?;
        Ok(user.map(|user| user.public()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            user_name: "ada".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "analytical".into(),
            confirm_password: Some("analytical".into()),
            avatar: None,
        }
    }

    #[test]
    fn hashes_are_salted_phc_strings() {
        let first = hash_password("analytical").unwrap();
        let second = hash_password("analytical").unwrap();
        assert!(first.starts_with("$argon2"));
        assert_ne!(first, second);
    }

    #[test]
    fn accepts_complete_registration() {
        assert!(validate(&registration()).is_ok());
    }

    #[test]
    fn reports_every_invalid_field() {
        let mut input = registration();
        input.user_name = " ".into();
        input.email = "not-an-email".into();
        input.password = "short".into();
        input.confirm_password = Some("other".into());

        let Err(RepoError::Validation(err)) = validate(&input) else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = err.issues.iter().map(|issue| issue.field.as_str()).collect();
        assert_eq!(fields, ["userName", "email", "password", "confirmPassword"]);
    }
}
