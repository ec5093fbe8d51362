use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sancharie_shared::PhoneNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub phone: PhoneNumber,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub is_profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl User {
    pub fn new(phone: PhoneNumber) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phone,
            name: None,
            email: None,
            age: None,
            gender: None,
            is_profile_complete: false,
            created_at: now,
            updated_at: now,
            last_login: now,
        }
    }

    /// Name, email, age and gender are all present.
    pub fn profile_complete(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
            && self.email.as_deref().is_some_and(|e| !e.is_empty())
            && self.age.is_some()
            && self.gender.is_some()
    }

    /// Apply the present fields of `update`, leaving the rest untouched.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(name) = update.name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            self.name = Some(name.to_string());
        }
        if let Some(email) = update.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            self.email = Some(email.to_string());
        }
        if let Some(age) = update.age {
            self.age = Some(age);
        }
        if let Some(gender) = update.gender {
            self.gender = Some(gender);
        }
        self.is_profile_complete = self.profile_complete();
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let valid = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !valid {
                return Err("Please enter a valid email address".to_string());
            }
        }
        if let Some(age) = self.age {
            if age == 0 || age > 120 {
                return Err("Please enter a valid age".to_string());
            }
        }
        Ok(())
    }
}
