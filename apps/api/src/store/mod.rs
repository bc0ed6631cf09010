//! Store contracts consumed by the auth flow, the enrollment recorder and the
//! catalog endpoints.
//!
//! Two backends implement them: `InMemoryStore` (seeded demo data, the
//! default) and `PgStore` (selected when `DATABASE_URL` is set).

pub mod memory;
pub mod postgres;
pub mod seed;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::course::{
    Course, CourseFilters, LeaderboardEntry, NewCourse, ProblemCategory, Resource,
};
use crate::models::payment::Payment;
use crate::models::user::{User, UserPatch};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// User lookups and mutations. Email comparisons are case-insensitive.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a new user. Fails with `Conflict` if the email is taken, checked
    /// atomically with the insert.
    async fn create(&self, user: User) -> Result<User, StoreError>;

    /// Applies `patch` and returns the updated user, or `None` if `id` is unknown.
    async fn mutate(&self, id: &str, patch: UserPatch) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_courses(&self, filters: &CourseFilters) -> Result<Vec<Course>, StoreError>;

    async fn course_by_id(&self, id: &str) -> Result<Option<Course>, StoreError>;

    /// Distinct tags in order of first appearance.
    async fn list_tags(&self) -> Result<Vec<String>, StoreError>;

    async fn add_course(&self, course: NewCourse) -> Result<Course, StoreError>;

    async fn list_resources(&self) -> Result<Vec<Resource>, StoreError>;

    async fn list_problems(&self) -> Result<Vec<ProblemCategory>, StoreError>;

    /// Students ranked by total solved problems, descending. Ties keep
    /// insertion order.
    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Appends `payment` and adds its course to the user's enrollments (set
    /// semantics) as one atomic unit. Returns `None` if the user is unknown, in
    /// which case nothing is written.
    async fn record_enrollment(&self, payment: &Payment) -> Result<Option<User>, StoreError>;

    /// A user's transactions, newest first.
    async fn transactions_for_user(&self, user_id: &str) -> Result<Vec<Payment>, StoreError>;
}

/// Everything the service needs from persistence.
pub trait Store: UserStore + CatalogStore + PaymentLedger {}

impl<T: UserStore + CatalogStore + PaymentLedger> Store for T {}

/// Ranks students by solved count. The sort is stable so ties keep the
/// order users were created in.
pub(crate) fn rank_students<'a>(users: impl Iterator<Item = &'a User>) -> Vec<LeaderboardEntry> {
    let mut board: Vec<LeaderboardEntry> = users
        .filter(|u| u.role == crate::models::user::Role::Student)
        .map(|u| LeaderboardEntry {
            id: u.id.clone(),
            name: u.name.clone(),
            total_solved: u.total_solved(),
            rank: 0,
        })
        .collect();
    board.sort_by(|a, b| b.total_solved.cmp(&a.total_solved));
    for (i, entry) in board.iter_mut().enumerate() {
        entry.rank = i as u32 + 1;
    }
    board
}
