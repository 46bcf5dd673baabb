//! Customer profile, download history and favourites.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use photostock_core::{CustomerId, Email, PhotoId, PhotoSize, UserId};

const MAX_NAME_LEN: usize = 100;
const MIN_COUNTRY_LEN: usize = 2;
const MAX_COUNTRY_LEN: usize = 56;
const MAX_PHONE_LEN: usize = 20;

/// A customer profile, bound 1:1 to an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw profile form submission.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
}

/// Profile fields that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub country: String,
}

/// A validation message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl ProfileForm {
    /// Pre-fill the form from an existing profile.
    #[must_use]
    pub fn from_profile(profile: &CustomerProfile) -> Self {
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.to_string(),
            phone: profile.phone.clone().unwrap_or_default(),
            country: profile.country.clone(),
        }
    }

    /// Validate every field, collecting all errors rather than the first.
    ///
    /// # Errors
    ///
    /// Returns one `FieldError` per invalid field.
    pub fn validate(&self) -> Result<ProfileInput, Vec<FieldError>> {
        let mut errors = Vec::new();

        let first_name = required_text("first_name", &self.first_name, 1, MAX_NAME_LEN, &mut errors);
        let last_name = required_text("last_name", &self.last_name, 1, MAX_NAME_LEN, &mut errors);
        let country = required_text(
            "country",
            &self.country,
            MIN_COUNTRY_LEN,
            MAX_COUNTRY_LEN,
            &mut errors,
        );

        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(FieldError {
                    field: "email",
                    message: e.to_string(),
                });
                None
            }
        };

        let phone = self.phone.trim();
        let phone = if phone.is_empty() {
            None
        } else if phone.len() > MAX_PHONE_LEN
            || !phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-'))
            || !phone.chars().any(|c| c.is_ascii_digit())
        {
            errors.push(FieldError {
                field: "phone",
                message: "phone may only contain digits, spaces, + and -".to_string(),
            });
            None
        } else {
            Some(phone.to_string())
        };

        match (first_name, last_name, email, country) {
            (Some(first_name), Some(last_name), Some(email), Some(country)) if errors.is_empty() => {
                Ok(ProfileInput {
                    first_name,
                    last_name,
                    email,
                    phone,
                    country,
                })
            }
            _ => Err(errors),
        }
    }
}

fn required_text(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = value.trim();
    let len = value.chars().count();
    if len < min || len > max {
        errors.push(FieldError {
            field,
            message: if len == 0 {
                "this field is required".to_string()
            } else {
                format!("must be between {min} and {max} characters")
            },
        });
        return None;
    }
    Some(value.to_string())
}

/// A purchased photo the customer may download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub photo_id: PhotoId,
    pub caption: String,
    pub image_url: String,
    pub size: PhotoSize,
    pub purchased_at: DateTime<Utc>,
}

/// A favourited photo, joined with its catalog data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavouritePhoto {
    pub photo_id: PhotoId,
    pub caption: String,
    pub image_url: String,
    pub favourited_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_form() -> ProfileForm {
        ProfileForm {
            first_name: " Mei ".to_string(),
            last_name: "Tan".to_string(),
            email: "mei@example.sg".to_string(),
            phone: "+65 9123-4567".to_string(),
            country: "Singapore".to_string(),
        }
    }

    #[test]
    fn valid_form_is_trimmed() {
        let input = valid_form().validate().unwrap();
        assert_eq!(input.first_name, "Mei");
        assert_eq!(input.phone.as_deref(), Some("+65 9123-4567"));
    }

    #[test]
    fn blank_phone_is_optional() {
        let form = ProfileForm {
            phone: "   ".to_string(),
            ..valid_form()
        };
        assert_eq!(form.validate().unwrap().phone, None);
    }

    #[test]
    fn every_invalid_field_is_reported() {
        let form = ProfileForm {
            first_name: String::new(),
            last_name: "x".repeat(101),
            email: "not-an-email".to_string(),
            phone: "call me".to_string(),
            country: "S".to_string(),
        };
        let errors = form.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["first_name", "last_name", "country", "email", "phone"]
        );
    }

    #[test]
    fn form_prefills_from_profile() {
        let now = Utc::now();
        let profile = CustomerProfile {
            id: CustomerId::new(1),
            user_id: UserId::new(7),
            first_name: "Mei".to_string(),
            last_name: "Tan".to_string(),
            email: Email::parse("mei@example.sg").unwrap(),
            phone: None,
            country: "Singapore".to_string(),
            created_at: now,
            updated_at: now,
        };
        let form = ProfileForm::from_profile(&profile);
        assert_eq!(form.email, "mei@example.sg");
        assert!(form.phone.is_empty());
        assert!(form.validate().is_ok());
    }
}
