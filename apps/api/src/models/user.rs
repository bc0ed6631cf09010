use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    LeetCode,
    HackerRank,
    CodeChef,
    GeeksforGeeks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub solved_count: u32,
    pub ranking: u32,
}

/// A linked competitive-programming profile. Feeds the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAccount {
    pub platform: Platform,
    pub username: String,
    pub profile_url: String,
    pub stats: AccountStats,
    pub last_synced: String,
}

/// A user record as owned by the store. `password_hash` never leaves the
/// server; hand callers a [`PublicUser`] instead.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub enrolled_course_ids: Vec<String>,
    pub external_accounts: Vec<ExternalAccount>,
    pub is_verified: bool,
}

impl User {
    pub fn is_enrolled_in(&self, course_id: &str) -> bool {
        self.enrolled_course_ids.iter().any(|id| id == course_id)
    }

    /// Widened to `u64` so any number of linked accounts sums without overflow.
    pub fn total_solved(&self) -> u64 {
        self.external_accounts
            .iter()
            .map(|a| u64::from(a.stats.solved_count))
            .sum()
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            enrolled_courses: self.enrolled_course_ids.clone(),
            external_accounts: self.external_accounts.clone(),
            is_verified: self.is_verified,
        }
    }

    /// Applies only the fields a patch is allowed to touch. Identity, email
    /// and role are not patchable.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(accounts) = patch.external_accounts {
            self.external_accounts = accounts;
        }
        if let Some(verified) = patch.is_verified {
            self.is_verified = verified;
        }
    }
}

/// The user projection returned to callers. Carries no credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub enrolled_courses: Vec<String>,
    pub external_accounts: Vec<ExternalAccount>,
    pub is_verified: bool,
}

/// The mutable subset of a user.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub external_accounts: Option<Vec<ExternalAccount>>,
    pub is_verified: Option<bool>,
}

impl UserPatch {
    pub fn verified() -> Self {
        Self {
            is_verified: Some(true),
            ..Default::default()
        }
    }
}
