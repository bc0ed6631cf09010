//! Process-local store. All tables live behind one lock so that an
//! enrollment (ledger append + enrollment-set update) is observed as a
//! single step.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::course::{
    Course, CourseFilters, LeaderboardEntry, NewCourse, ProblemCategory, Resource,
};
use crate::models::payment::Payment;
use crate::models::user::{User, UserPatch};
use crate::store::seed::{seed_data, SeedData};
use crate::store::{rank_students, CatalogStore, PaymentLedger, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    courses: Vec<Course>,
    resources: Vec<Resource>,
    problems: Vec<ProblemCategory>,
    transactions: Vec<Payment>,
    next_course_seq: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with the demo catalog and accounts.
    pub fn seeded() -> Result<Self> {
        Ok(Self::from_seed(seed_data()?))
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let next_course_seq = seed.courses.len();
        Self {
            tables: RwLock::new(Tables {
                users: seed.users,
                courses: seed.courses,
                resources: seed.resources,
                problems: seed.problems,
                transactions: seed.transactions,
                next_course_seq,
            }),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn mutate(&self, id: &str, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.apply(patch);
            user.clone()
        }))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_courses(&self, filters: &CourseFilters) -> Result<Vec<Course>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .courses
            .iter()
            .filter(|c| c.matches(filters))
            .cloned()
            .collect())
    }

    async fn course_by_id(&self, id: &str) -> Result<Option<Course>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        let mut tags: Vec<String> = Vec::new();
        for tag in tables.courses.iter().flat_map(|c| c.tags.iter()) {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        Ok(tags)
    }

    async fn add_course(&self, new: NewCourse) -> Result<Course, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_course_seq += 1;
        let course = Course {
            id: format!(
                "c{}_{}",
                tables.next_course_seq,
                chrono::Utc::now().timestamp_millis()
            ),
            image_url: new.image_url(),
            title: new.title,
            description: new.description,
            instructor: new.instructor,
            price: new.price,
            tags: new.tags,
            kind: new.kind,
            modules: vec![],
            downloads: vec![],
        };
        // Newest first.
        tables.courses.insert(0, course.clone());
        Ok(course)
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, StoreError> {
        Ok(self.tables.read().await.resources.clone())
    }

    async fn list_problems(&self) -> Result<Vec<ProblemCategory>, StoreError> {
        Ok(self.tables.read().await.problems.clone())
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(rank_students(tables.users.iter()))
    }
}

#[async_trait]
impl PaymentLedger for InMemoryStore {
    async fn record_enrollment(&self, payment: &Payment) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.users.iter().position(|u| u.id == payment.user_id) else {
            return Ok(None);
        };
        tables.transactions.push(payment.clone());
        let user = &mut tables.users[idx];
        if !user.is_enrolled_in(&payment.course_id) {
            user.enrolled_course_ids.push(payment.course_id.clone());
        }
        Ok(Some(user.clone()))
    }

    async fn transactions_for_user(&self, user_id: &str) -> Result<Vec<Payment>, StoreError> {
        let tables = self.tables.read().await;
        let mut txs: Vec<Payment> = tables
            .transactions
            .iter()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::{CourseType, PriceClass};
    use crate::models::user::{AccountStats, ExternalAccount, Platform, Role};
    use chrono::Utc;
    use std::sync::Arc;

    fn student(id: &str, email: &str, solved: u32) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Student,
            enrolled_course_ids: vec![],
            external_accounts: vec![ExternalAccount {
                platform: Platform::LeetCode,
                username: id.to_string(),
                profile_url: "#".to_string(),
                stats: AccountStats {
                    solved_count: solved,
                    ranking: 1,
                },
                last_synced: "2024-07-28T10:00:00Z".to_string(),
            }],
            is_verified: true,
        }
    }

    fn payment(tx: &str, user: &str, course: &str) -> Payment {
        Payment {
            transaction_id: tx.to_string(),
            user_id: user.to_string(),
            course_id: course.to_string(),
            amount: 10.0,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_by_email_is_case_insensitive() {
        let store = InMemoryStore::seeded().unwrap();
        let user = store.find_by_email("ALEX@EduFlux.ai").await.unwrap();
        assert_eq!(user.unwrap().id, "student01");
        assert!(store.find_by_email("nobody@x.io").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email_in_any_case() {
        let store = InMemoryStore::new();
        store.create(student("a", "ana@x.io", 0)).await.unwrap();
        let err = store.create(student("b", "ANA@x.io", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_mutate_unknown_user_returns_none() {
        let store = InMemoryStore::new();
        let result = store.mutate("ghost", UserPatch::verified()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_courses_applies_all_filters() {
        let store = InMemoryStore::seeded().unwrap();
        let all = store.list_courses(&CourseFilters::default()).await.unwrap();
        assert_eq!(all.len(), 6);

        let free = store
            .list_courses(&CourseFilters {
                price: Some(PriceClass::Free),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, "c6");

        let react = store
            .list_courses(&CourseFilters {
                search: Some("react".to_string()),
                tag: Some("Frontend".to_string()),
                price: Some(PriceClass::Paid),
            })
            .await
            .unwrap();
        assert_eq!(react.len(), 1);
        assert_eq!(react[0].id, "c3");
    }

    #[tokio::test]
    async fn test_list_tags_is_distinct_in_first_seen_order() {
        let store = InMemoryStore::seeded().unwrap();
        let tags = store.list_tags().await.unwrap();
        assert_eq!(tags[0], "Java");
        assert_eq!(tags.last().unwrap(), "Beginner");
        let mut deduped = tags.clone();
        deduped.dedup();
        assert_eq!(tags.len(), deduped.len());
    }

    #[tokio::test]
    async fn test_add_course_is_listed_first() {
        let store = InMemoryStore::seeded().unwrap();
        let course = store
            .add_course(NewCourse {
                title: "Rust in Production".to_string(),
                description: "Ship it".to_string(),
                instructor: "Ferris".to_string(),
                price: 0.0,
                tags: vec!["Rust".to_string()],
                kind: CourseType::Free,
            })
            .await
            .unwrap();
        assert!(course.id.starts_with("c7_"));
        let all = store.list_courses(&CourseFilters::default()).await.unwrap();
        assert_eq!(all[0].id, course.id);
        assert!(store.course_by_id(&course.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_students_only_with_stable_ties() {
        let store = InMemoryStore::new();
        store.create(student("first", "first@x.io", 10)).await.unwrap();
        store.create(student("top", "top@x.io", 50)).await.unwrap();
        store.create(student("second", "second@x.io", 10)).await.unwrap();
        let mut admin = student("admin", "admin@x.io", 999);
        admin.role = Role::Admin;
        store.create(admin).await.unwrap();

        let board = store.leaderboard().await.unwrap();
        let ids: Vec<&str> = board.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["top", "first", "second"]);
        let ranks: Vec<u32> = board.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_record_enrollment_dedupes_courses_but_not_transactions() {
        let store = InMemoryStore::new();
        store.create(student("u1", "u1@x.io", 0)).await.unwrap();

        store
            .record_enrollment(&payment("tx-a", "u1", "c1"))
            .await
            .unwrap();
        let user = store
            .record_enrollment(&payment("tx-b", "u1", "c1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.enrolled_course_ids, vec!["c1".to_string()]);
        assert_eq!(store.transactions_for_user("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_enrollment_for_unknown_user_writes_nothing() {
        let store = InMemoryStore::new();
        let result = store
            .record_enrollment(&payment("tx", "ghost", "c1"))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(store.transactions_for_user("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_enrollments_keep_every_transaction() {
        let store = Arc::new(InMemoryStore::new());
        store.create(student("u1", "u1@x.io", 0)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .record_enrollment(&payment(&format!("tx{i}"), "u1", "c2"))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let user = store.find_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.enrolled_course_ids, vec!["c2".to_string()]);
        assert_eq!(store.transactions_for_user("u1").await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_transactions_are_newest_first() {
        let store = InMemoryStore::seeded().unwrap();
        let txs = store.transactions_for_user("student01").await.unwrap();
        let ids: Vec<&str> = txs.iter().map(|t| t.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["tx2", "tx1"]);
    }
}
