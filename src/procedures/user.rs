//! User profile procedures.

use serde::{Deserialize, Serialize};

use crate::context::AuthContext;
use crate::error::{InputIssues, Result};
use crate::procedure::{NoInput, Router, Validate};

/// Profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// Input of `updateProfile`. Absent fields are left unchanged; unknown
/// fields are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> std::result::Result<(), InputIssues> {
        let mut issues = InputIssues::new();
        if let Some(name) = &self.name {
            issues.check(!name.is_empty(), "name", "must contain at least 1 character");
        }
        if let Some(email) = &self.email {
            issues.check(is_email(email), "email", "invalid email");
        }
        issues.into_result()
    }
}

/// Output of `updateProfile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdated {
    pub success: bool,
    pub message: String,
    pub data: ProfileUpdate,
}

/// Loose `local@domain.tld` check.
fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, _)| !host.is_empty())
        && !domain.ends_with('.')
}

async fn get_profile(_: NoInput, auth: AuthContext) -> Result<Profile> {
    let user = auth.user();
    tracing::debug!(user = %user.id, "Loading profile");

    Ok(Profile {
        name: user.name.clone(),
        email: user.email.clone(),
        image: user.image.clone(),
    })
}

async fn update_profile(input: ProfileUpdate, auth: AuthContext) -> Result<ProfileUpdated> {
    // No persistence layer: the update is acknowledged and echoed back.
    tracing::info!(user = %auth.user().id, update = ?input, "Updating profile");

    Ok(ProfileUpdated {
        success: true,
        message: "Profile updated successfully".to_string(),
        data: input,
    })
}

/// `getProfile` and `updateProfile`.
pub fn router() -> Router {
    Router::new()
        .protected_query("getProfile", get_profile)
        .protected_mutation("updateProfile", update_profile)
}
