use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Schema-constrained outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadmapResourceKind {
    #[serde(alias = "youtube")]
    Video,
    Book,
    Article,
    Documentation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapResource {
    #[serde(rename = "type")]
    pub kind: RoadmapResourceKind,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub title: String,
    pub description: String,
    pub resources: Vec<RoadmapResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRoadmap {
    pub topic: String,
    pub steps: Vec<RoadmapStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerPath {
    pub name: String,
    pub description: String,
    pub learning_plan: Vec<String>,
    pub certifications: Vec<String>,
    pub job_portals: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerQuizAnswers {
    pub interests: String,
    pub activities: String,
    pub learning_style: String,
    pub goal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub dates: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationEntry {
    pub degree: String,
    pub school: String,
    pub dates: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeData {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Free-text and grounded outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub apply_link: String,
}

/// A citation with a guaranteed non-empty `uri`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendsReport {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSearchResult {
    pub jobs: Vec<JobPosting>,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}
