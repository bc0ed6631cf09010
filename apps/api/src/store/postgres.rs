//! PostgreSQL-backed store. Enabled when `DATABASE_URL` is set.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::models::course::{
    Course, CourseDownload, CourseFilters, CourseModule, CourseType, DsaProblem,
    LeaderboardEntry, NewCourse, PriceClass, ProblemCategory, Resource,
};
use crate::models::payment::Payment;
use crate::models::user::{ExternalAccount, Role, User, UserPatch};
use crate::store::seed::seed_data;
use crate::store::{rank_students, CatalogStore, PaymentLedger, StoreError, UserStore};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, enrolled_course_ids, external_accounts, is_verified";
const COURSE_COLUMNS: &str =
    "id, title, description, instructor, price, tags, image_url, kind, modules, downloads";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Loads the demo data into a database that has no users yet.
    pub async fn seed_if_empty(&self) -> Result<()> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        if users > 0 {
            return Ok(());
        }

        let seed = seed_data()?;
        let mut tx = self.pool.begin().await?;

        for user in &seed.users {
            sqlx::query(
                r#"
                INSERT INTO users
                    (id, name, email, password_hash, role, enrolled_course_ids, external_accounts, is_verified)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.enrolled_course_ids)
            .bind(Json(&user.external_accounts))
            .bind(user.is_verified)
            .execute(&mut *tx)
            .await?;
        }

        for course in &seed.courses {
            sqlx::query(
                r#"
                INSERT INTO courses
                    (id, title, description, instructor, price, tags, image_url, kind, modules, downloads)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&course.id)
            .bind(&course.title)
            .bind(&course.description)
            .bind(&course.instructor)
            .bind(course.price)
            .bind(&course.tags)
            .bind(&course.image_url)
            .bind(course.kind.as_str())
            .bind(Json(&course.modules))
            .bind(Json(&course.downloads))
            .execute(&mut *tx)
            .await?;
        }

        for resource in &seed.resources {
            sqlx::query(
                "INSERT INTO resources (id, kind, title, description, url, category) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&resource.id)
            .bind(enum_to_text(&resource.kind))
            .bind(&resource.title)
            .bind(&resource.description)
            .bind(&resource.url)
            .bind(&resource.category)
            .execute(&mut *tx)
            .await?;
        }

        for category in &seed.problems {
            for problem in &category.problems {
                sqlx::query(
                    "INSERT INTO dsa_problems (id, category, title, difficulty, url, platform) VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(&problem.id)
                .bind(&category.category)
                .bind(&problem.title)
                .bind(enum_to_text(&problem.difficulty))
                .bind(&problem.url)
                .bind(enum_to_text(&problem.platform))
                .execute(&mut *tx)
                .await?;
            }
        }

        for payment in &seed.transactions {
            insert_transaction(&mut tx, payment).await?;
        }

        tx.commit().await?;
        info!(
            "Seeded database with {} users and {} courses",
            seed.users.len(),
            seed.courses.len()
        );
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Row types
// ────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    enrolled_course_ids: Vec<String>,
    external_accounts: Json<Vec<ExternalAccount>>,
    is_verified: bool,
}

impl UserRow {
    fn to_domain(self) -> Result<User, StoreError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown role '{}'", self.role)))?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            enrolled_course_ids: self.enrolled_course_ids,
            external_accounts: self.external_accounts.0,
            is_verified: self.is_verified,
        })
    }
}

#[derive(FromRow)]
struct CourseRow {
    id: String,
    title: String,
    description: String,
    instructor: String,
    price: f64,
    tags: Vec<String>,
    image_url: String,
    kind: String,
    modules: Json<Vec<CourseModule>>,
    downloads: Json<Vec<CourseDownload>>,
}

impl CourseRow {
    fn to_domain(self) -> Result<Course, StoreError> {
        Ok(Course {
            kind: enum_from_text::<CourseType>("course kind", self.kind)?,
            id: self.id,
            title: self.title,
            description: self.description,
            instructor: self.instructor,
            price: self.price,
            tags: self.tags,
            image_url: self.image_url,
            modules: self.modules.0,
            downloads: self.downloads.0,
        })
    }
}

#[derive(FromRow)]
struct ResourceRow {
    id: String,
    kind: String,
    title: String,
    description: String,
    url: String,
    category: String,
}

#[derive(FromRow)]
struct ProblemRow {
    id: String,
    category: String,
    title: String,
    difficulty: String,
    url: String,
    platform: String,
}

#[derive(FromRow)]
struct TransactionRow {
    transaction_id: String,
    user_id: String,
    course_id: String,
    amount: f64,
    created_at: DateTime<Utc>,
}

fn enum_from_text<T: DeserializeOwned>(field: &str, value: String) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(value.clone()))
        .map_err(|_| StoreError::Corrupt(format!("unexpected {field} '{value}'")))
}

fn enum_to_text<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payment: &Payment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transactions (transaction_id, user_id, course_id, amount, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&payment.transaction_id)
    .bind(&payment.user_id)
    .bind(&payment.course_id)
    .bind(payment.amount)
    .bind(payment.timestamp)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Trait implementations
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRow::to_domain).transpose()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRow::to_domain).transpose()
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users
                (id, name, email, password_hash, role, enrolled_course_ids, external_accounts, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.enrolled_course_ids)
        .bind(Json(&user.external_accounts))
        .bind(user.is_verified)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                user.email
            )));
        }
        Ok(user)
    }

    async fn mutate(&self, id: &str, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut user = row.to_domain()?;
        user.apply(patch);

        sqlx::query(
            "UPDATE users SET name = $2, external_accounts = $3, is_verified = $4 WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(Json(&user.external_accounts))
        .bind(user.is_verified)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(user))
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_courses(&self, filters: &CourseFilters) -> Result<Vec<Course>, StoreError> {
        let search = filters.search.as_deref().filter(|s| !s.is_empty());
        let tag = filters.tag.as_deref().filter(|s| !s.is_empty());
        let kind = match filters.price.unwrap_or_default() {
            PriceClass::All => None,
            PriceClass::Free => Some(CourseType::Free.as_str()),
            PriceClass::Paid => Some(CourseType::Paid.as_str()),
        };

        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            r#"
            SELECT {COURSE_COLUMNS} FROM courses
            WHERE ($1::text IS NULL
                   OR strpos(lower(title), lower($1)) > 0
                   OR strpos(lower(description), lower($1)) > 0)
              AND ($2::text IS NULL OR $2 = ANY(tags))
              AND ($3::text IS NULL OR kind = $3)
            ORDER BY added_at DESC NULLS LAST, seq ASC
            "#
        ))
        .bind(search)
        .bind(tag)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CourseRow::to_domain).collect()
    }

    async fn course_by_id(&self, id: &str) -> Result<Option<Course>, StoreError> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CourseRow::to_domain).transpose()
    }

    async fn list_tags(&self) -> Result<Vec<String>, StoreError> {
        let courses = self.list_courses(&CourseFilters::default()).await?;
        let mut tags: Vec<String> = Vec::new();
        for tag in courses.into_iter().flat_map(|c| c.tags) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    async fn add_course(&self, new: NewCourse) -> Result<Course, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.pool)
            .await?;
        let course = Course {
            id: format!("c{}_{}", count + 1, Utc::now().timestamp_millis()),
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

        sqlx::query(
            r#"
            INSERT INTO courses
                (id, title, description, instructor, price, tags, image_url, kind, modules, downloads, added_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now())
            "#,
        )
        .bind(&course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.instructor)
        .bind(course.price)
        .bind(&course.tags)
        .bind(&course.image_url)
        .bind(course.kind.as_str())
        .bind(Json(&course.modules))
        .bind(Json(&course.downloads))
        .execute(&self.pool)
        .await?;

        Ok(course)
    }

    async fn list_resources(&self) -> Result<Vec<Resource>, StoreError> {
        let rows = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, kind, title, description, url, category FROM resources ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| -> Result<Resource, StoreError> {
                Ok(Resource {
                    kind: enum_from_text("resource type", r.kind)?,
                    id: r.id,
                    title: r.title,
                    description: r.description,
                    url: r.url,
                    category: r.category,
                })
            })
            .collect()
    }

    async fn list_problems(&self) -> Result<Vec<ProblemCategory>, StoreError> {
        let rows = sqlx::query_as::<_, ProblemRow>(
            "SELECT id, category, title, difficulty, url, platform FROM dsa_problems ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut categories: Vec<ProblemCategory> = Vec::new();
        for row in rows {
            let problem = DsaProblem {
                difficulty: enum_from_text("difficulty", row.difficulty)?,
                platform: enum_from_text("platform", row.platform)?,
                id: row.id,
                title: row.title,
                url: row.url,
            };
            match categories.iter_mut().find(|c| c.category == row.category) {
                Some(category) => category.problems.push(problem),
                None => categories.push(ProblemCategory {
                    category: row.category,
                    problems: vec![problem],
                }),
            }
        }
        Ok(categories)
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = 'student' ORDER BY seq"
        ))
        .fetch_all(&self.pool)
        .await?;
        let users = rows
            .into_iter()
            .map(UserRow::to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rank_students(users.iter()))
    }
}

#[async_trait]
impl PaymentLedger for PgStore {
    async fn record_enrollment(&self, payment: &Payment) -> Result<Option<User>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent enrollments for the same user.
        let exists = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(&payment.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        insert_transaction(&mut tx, payment).await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET enrolled_course_ids = CASE
                WHEN $2 = ANY(enrolled_course_ids) THEN enrolled_course_ids
                ELSE array_append(enrolled_course_ids, $2)
            END
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&payment.user_id)
        .bind(&payment.course_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.to_domain().map(Some)
    }

    async fn transactions_for_user(&self, user_id: &str) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT transaction_id, user_id, course_id, amount, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Payment {
                transaction_id: r.transaction_id,
                user_id: r.user_id,
                course_id: r.course_id,
                amount: r.amount,
                timestamp: r.created_at,
            })
            .collect())
    }
}
