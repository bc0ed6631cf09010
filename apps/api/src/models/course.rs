use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    Free,
    Paid,
}

impl CourseType {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseType::Free => "free",
            CourseType::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModuleStatus {
    Completed,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Not Started")]
    NotStarted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    pub title: String,
    pub status: ModuleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDownload {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub price: f64,
    pub tags: Vec<String>,
    pub image_url: String,
    #[serde(rename = "type")]
    pub kind: CourseType,
    pub modules: Vec<CourseModule>,
    pub downloads: Vec<CourseDownload>,
}

impl Course {
    pub fn matches(&self, filters: &CourseFilters) -> bool {
        if let Some(term) = filters.search.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !self.title.to_lowercase().contains(&term)
                && !self.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        if let Some(tag) = filters.tag.as_deref().filter(|t| !t.is_empty()) {
            if !self.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        match filters.price.unwrap_or_default() {
            PriceClass::All => true,
            PriceClass::Free => self.kind == CourseType::Free,
            PriceClass::Paid => self.kind == CourseType::Paid,
        }
    }
}

/// Fields an admin supplies when adding a course.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub price: f64,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: CourseType,
}

impl NewCourse {
    /// The cover image is keyed on the first word of the title.
    pub fn image_url(&self) -> String {
        let seed = self.title.split_whitespace().next().unwrap_or("course");
        format!("https://picsum.photos/seed/{seed}/600/400")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceClass {
    #[default]
    All,
    Free,
    Paid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseFilters {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub price: Option<PriceClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Youtube,
    Book,
    Article,
    Pdf,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub title: String,
    pub description: String,
    pub url: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsaProblem {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub url: String,
    pub platform: crate::models::user::Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemCategory {
    pub category: String,
    pub problems: Vec<DsaProblem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub total_solved: u64,
    pub rank: u32,
}
