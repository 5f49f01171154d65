//! Contact Service - messages sent through the contact form

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::Deserialize;

use crate::domain::DomainError;
use crate::models::contact_message;

pub const CATEGORIES: &[&str] = &["general", "support", "feature", "bug", "feedback"];
pub const MIN_MESSAGE_LEN: usize = 10;
pub const MAX_MESSAGE_LEN: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub message: String,
}

fn default_category() -> String {
    "general".to_string()
}

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}

pub fn validate(form: &ContactForm) -> Result<(), DomainError> {
    if form.name.trim().is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    if form.email.trim().is_empty() {
        return Err(DomainError::validation("email is required"));
    }
    if !is_valid_email(form.email.trim()) {
        return Err(DomainError::validation("email is not valid"));
    }
    if form.subject.trim().is_empty() {
        return Err(DomainError::validation("subject is required"));
    }
    if !CATEGORIES.contains(&form.category.as_str()) {
        return Err(DomainError::validation(format!(
            "category must be one of {}",
            CATEGORIES.join(", ")
        )));
    }

    let len = form.message.trim().chars().count();
    if len < MIN_MESSAGE_LEN {
        return Err(DomainError::validation(format!(
            "message must be at least {} characters",
            MIN_MESSAGE_LEN
        )));
    }
    if len > MAX_MESSAGE_LEN {
        return Err(DomainError::validation(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(())
}

/// Store a contact form submission
pub async fn submit(
    db: &DatabaseConnection,
    user_id: Option<i32>,
    form: ContactForm,
) -> Result<contact_message::Model, DomainError> {
    validate(&form)?;

    let saved = contact_message::ActiveModel {
        user_id: Set(user_id),
        name: Set(form.name.trim().to_string()),
        email: Set(form.email.trim().to_string()),
        subject: Set(form.subject.trim().to_string()),
        category: Set(form.category),
        message: Set(form.message.trim().to_string()),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("Contact message {} received ({})", saved.id, saved.category);
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            subject: "Hello".into(),
            category: "feedback".into(),
            message: "Lovely little app.".into(),
        }
    }

    #[test]
    fn accepts_complete_form() {
        assert!(validate(&form()).is_ok());
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b@c.co"));
        assert!(!is_valid_email("a@b.co."));
    }

    #[test]
    fn message_length_bounds() {
        let mut f = form();
        f.message = "too short".into();
        assert!(validate(&f).is_err());
        f.message = "x".repeat(10);
        assert!(validate(&f).is_ok());
        f.message = "x".repeat(1001);
        assert!(validate(&f).is_err());
    }

    #[test]
    fn required_fields() {
        let mut f = form();
        f.name = " ".into();
        assert!(validate(&f).is_err());

        let mut f = form();
        f.subject = String::new();
        assert!(validate(&f).is_err());

        let mut f = form();
        f.category = "spam".into();
        assert!(validate(&f).is_err());
    }
}
