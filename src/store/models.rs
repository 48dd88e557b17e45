//! Entity types and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub age: Option<f64>,
}

/// A `NewUser` that passed validation.
#[derive(Debug, Clone)]
pub struct ValidUser {
    pub username: String,
    pub email: String,
    pub age: Option<u32>,
}

impl NewUser {
    /// Validate the payload, collecting every problem.
    pub fn validate(self) -> Result<ValidUser, Vec<String>> {
        let mut errors = Vec::new();

        let username = self.username.map(|u| u.trim().to_string()).unwrap_or_default();
        if username.is_empty() {
            errors.push("Username is required".to_string());
        }

        let email = self.email.map(|e| e.trim().to_string()).unwrap_or_default();
        if !is_valid_email(&email) {
            errors.push("Valid email is required".to_string());
        }

        let age = match self.age {
            None => None,
            Some(age) if age.is_finite() && age > 0.0 && age.fract() == 0.0 && age <= u32::MAX as f64 => {
                Some(age as u32)
            }
            Some(_) => {
                errors.push("Age must be a positive number".to_string());
                None
            }
        };

        if errors.is_empty() {
            Ok(ValidUser { username, email, age })
        } else {
            Err(errors)
        }
    }
}

/// Body of `POST /posts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidPost {
    pub user_id: String,
    pub title: String,
    pub content: String,
}

impl NewPost {
    pub fn validate(self) -> Result<ValidPost, Vec<String>> {
        let mut errors = Vec::new();

        let user_id = required(self.user_id, "User ID is required", &mut errors);
        let title = required(self.title, "Title is required", &mut errors);
        let content = required(self.content, "Content is required", &mut errors);

        if errors.is_empty() {
            Ok(ValidPost { user_id, title, content })
        } else {
            Err(errors)
        }
    }
}

fn required(value: Option<String>, message: &str, errors: &mut Vec<String>) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.push(message.to_string());
    }
    value
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: Option<&str>, email: Option<&str>, age: Option<f64>) -> NewUser {
        NewUser {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            age,
        }
    }

    #[test]
    fn valid_user_passes() {
        let valid = user(Some("a"), Some("b@c.com"), Some(25.0)).validate().unwrap();
        assert_eq!(valid.username, "a");
        assert_eq!(valid.email, "b@c.com");
        assert_eq!(valid.age, Some(25));
    }

    #[test]
    fn missing_username_is_reported_alone() {
        let errors = user(None, Some("b@c.com"), None).validate().unwrap_err();
        assert_eq!(errors, vec!["Username is required"]);
    }

    #[test]
    fn all_user_errors_are_collected() {
        let errors = user(Some("  "), Some("not-an-email"), Some(-3.0)).validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Username is required",
                "Valid email is required",
                "Age must be a positive number"
            ]
        );
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("b@c.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("@c.com"));
        assert!(!is_valid_email("b@com"));
        assert!(!is_valid_email("b@@c.com"));
        assert!(!is_valid_email("b c@d.com"));
    }

    #[test]
    fn post_requires_every_field() {
        let errors = NewPost::default().validate().unwrap_err();
        assert_eq!(
            errors,
            vec!["User ID is required", "Title is required", "Content is required"]
        );
    }
}
