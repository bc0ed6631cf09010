//! Demo data every fresh store starts with: one admin, one student with
//! linked practice accounts, the course catalog, reading resources, a small
//! problem set and the student's two purchases.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::auth::password::hash_password;
use crate::models::course::{
    Course, CourseDownload, CourseModule, CourseType, Difficulty, DsaProblem, ModuleStatus,
    ProblemCategory, Resource, ResourceType,
};
use crate::models::payment::Payment;
use crate::models::user::{AccountStats, ExternalAccount, Platform, Role, User};

pub struct SeedData {
    pub users: Vec<User>,
    pub courses: Vec<Course>,
    pub resources: Vec<Resource>,
    pub problems: Vec<ProblemCategory>,
    pub transactions: Vec<Payment>,
}

pub fn seed_data() -> Result<SeedData> {
    Ok(SeedData {
        users: seed_users()?,
        courses: seed_courses(),
        resources: seed_resources(),
        problems: seed_problems(),
        transactions: seed_transactions()?,
    })
}

fn seed_users() -> Result<Vec<User>> {
    let admin = User {
        id: "admin01".to_string(),
        name: "Admin User".to_string(),
        email: "admin@eduflux.ai".to_string(),
        password_hash: hash_password("admin")?,
        role: Role::Admin,
        enrolled_course_ids: vec![],
        external_accounts: vec![],
        is_verified: true,
    };

    let student = User {
        id: "student01".to_string(),
        name: "Alex Johnson".to_string(),
        email: "alex@eduflux.ai".to_string(),
        password_hash: hash_password("alex")?,
        role: Role::Student,
        enrolled_course_ids: vec!["c1".to_string(), "c3".to_string()],
        external_accounts: vec![
            ExternalAccount {
                platform: Platform::LeetCode,
                username: "alex_j".to_string(),
                profile_url: "#".to_string(),
                stats: AccountStats {
                    solved_count: 150,
                    ranking: 10250,
                },
                last_synced: "2024-07-28T10:00:00Z".to_string(),
            },
            ExternalAccount {
                platform: Platform::HackerRank,
                username: "alex_j_hr".to_string(),
                profile_url: "#".to_string(),
                stats: AccountStats {
                    solved_count: 85,
                    ranking: 5120,
                },
                last_synced: "2024-07-27T18:30:00Z".to_string(),
            },
        ],
        is_verified: true,
    };

    Ok(vec![admin, student])
}

#[allow(clippy::too_many_arguments)]
fn course(
    id: &str,
    title: &str,
    description: &str,
    instructor: &str,
    price: f64,
    tags: &[&str],
    image_seed: &str,
    modules: Vec<CourseModule>,
    downloads: Vec<CourseDownload>,
) -> Course {
    Course {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        instructor: instructor.to_string(),
        price,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image_url: format!("https://picsum.photos/seed/{image_seed}/600/400"),
        kind: if price > 0.0 {
            CourseType::Paid
        } else {
            CourseType::Free
        },
        modules,
        downloads,
    }
}

fn module(title: &str, status: ModuleStatus) -> CourseModule {
    CourseModule {
        title: title.to_string(),
        status,
    }
}

fn download(title: &str, kind: &str) -> CourseDownload {
    CourseDownload {
        title: title.to_string(),
        kind: kind.to_string(),
        url: "#".to_string(),
    }
}

fn seed_courses() -> Vec<Course> {
    vec![
        course(
            "c1",
            "Java Full-Stack Mastery",
            "Become a complete Java developer. From Spring Boot to React, this course covers it all.",
            "Dr. Evelyn Reed",
            49.99,
            &["Java", "Spring Boot", "Full-Stack"],
            "java",
            vec![
                module("1. Introduction", ModuleStatus::Completed),
                module("2. Spring Boot Basics", ModuleStatus::InProgress),
                module("3. RESTful APIs", ModuleStatus::NotStarted),
            ],
            vec![
                download("Lecture_Slides.pdf", "pdf"),
                download("Code_Snippets.zip", "zip"),
            ],
        ),
        course(
            "c2",
            "AI & Machine Learning Deep Dive",
            "Explore the world of AI with Python, TensorFlow, and PyTorch. Build real-world models.",
            "Prof. Kenji Tanaka",
            79.99,
            &["AI", "Machine Learning", "Python"],
            "ai",
            vec![],
            vec![],
        ),
        course(
            "c3",
            "Modern Frontend with React & Tailwind",
            "Create beautiful, responsive user interfaces with React, TypeScript, and Tailwind CSS.",
            "Maria Garcia",
            39.99,
            &["React", "Frontend", "Tailwind CSS"],
            "react",
            vec![
                module("1. Introduction to React", ModuleStatus::Completed),
                module("2. Hooks Deep Dive", ModuleStatus::InProgress),
            ],
            vec![download("React_Cheatsheet.pdf", "pdf")],
        ),
        course(
            "c4",
            "Cloud Native with Docker & Kubernetes",
            "Learn to deploy and manage scalable applications using containerization and orchestration.",
            "David Chen",
            59.99,
            &["Cloud", "DevOps", "Kubernetes"],
            "cloud",
            vec![],
            vec![],
        ),
        course(
            "c5",
            "Data Science & Big Data Analytics",
            "Master data analysis, visualization, and big data technologies like Spark and Hadoop.",
            "Dr. Aisha Khan",
            69.99,
            &["Data Science", "Big Data", "Analytics"],
            "datascience",
            vec![],
            vec![],
        ),
        course(
            "c6",
            "Introduction to Data Structures",
            "A beginner-friendly introduction to fundamental data structures like arrays, linked lists, and trees.",
            "Community Contribution",
            0.0,
            &["DSA", "Beginner"],
            "dsa",
            vec![],
            vec![],
        ),
    ]
}

fn resource(id: &str, kind: ResourceType, title: &str, description: &str, category: &str) -> Resource {
    Resource {
        id: id.to_string(),
        kind,
        title: title.to_string(),
        description: description.to_string(),
        url: "#".to_string(),
        category: category.to_string(),
    }
}

fn seed_resources() -> Vec<Resource> {
    vec![
        resource(
            "r1",
            ResourceType::Youtube,
            "Spring Boot Tutorial for Beginners",
            "A complete 4-hour course on Spring Boot.",
            "Java",
        ),
        resource(
            "r2",
            ResourceType::Book,
            "Clean Code by Robert C. Martin",
            "A handbook of agile software craftsmanship.",
            "Software Design",
        ),
        resource(
            "r3",
            ResourceType::Article,
            "Understanding React Hooks",
            "A deep dive into useState and useEffect.",
            "React",
        ),
        resource(
            "r4",
            ResourceType::Link,
            "GeeksforGeeks DSA Problems",
            "Practice data structures and algorithms.",
            "DSA",
        ),
    ]
}

fn problem(id: &str, title: &str, difficulty: Difficulty, platform: Platform) -> DsaProblem {
    DsaProblem {
        id: id.to_string(),
        title: title.to_string(),
        difficulty,
        url: "#".to_string(),
        platform,
    }
}

fn seed_problems() -> Vec<ProblemCategory> {
    vec![
        ProblemCategory {
            category: "Arrays".to_string(),
            problems: vec![
                problem("dsa1", "Two Sum", Difficulty::Easy, Platform::LeetCode),
                problem(
                    "dsa2",
                    "Container With Most Water",
                    Difficulty::Medium,
                    Platform::LeetCode,
                ),
            ],
        },
        ProblemCategory {
            category: "Linked Lists".to_string(),
            problems: vec![
                problem(
                    "dsa3",
                    "Reverse a Linked List",
                    Difficulty::Easy,
                    Platform::HackerRank,
                ),
                problem(
                    "dsa4",
                    "Merge K Sorted Lists",
                    Difficulty::Hard,
                    Platform::LeetCode,
                ),
            ],
        },
    ]
}

fn seed_transactions() -> Result<Vec<Payment>> {
    Ok(vec![
        Payment {
            transaction_id: "tx1".to_string(),
            user_id: "student01".to_string(),
            course_id: "c1".to_string(),
            amount: 49.99,
            timestamp: "2024-07-20T10:00:00Z".parse::<DateTime<Utc>>()?,
        },
        Payment {
            transaction_id: "tx2".to_string(),
            user_id: "student01".to_string(),
            course_id: "c3".to_string(),
            amount: 39.99,
            timestamp: "2024-07-25T15:30:00Z".parse::<DateTime<Utc>>()?,
        },
    ])
}
