//! Prompt templates for the AI gateway. One builder per operation.

use crate::gateway::models::{CareerQuizAnswers, ResumeData};

/// System persona for every tutoring conversation.
pub const TUTOR_PERSONA: &str = "You are EduFluxAI's Smart Tutor. You are a helpful and friendly \
    AI assistant for students learning about technology. Keep your answers concise and \
    encouraging. You can answer questions related to courses, topics, or concepts.";

pub fn roadmap(topic: &str) -> String {
    format!(
        "Generate a detailed learning roadmap for: \"{topic}\". Structure it with steps, each \
         having a title, description, and diverse resources (videos, books, articles, \
         documentation)."
    )
}

pub fn career_path(answers: &CareerQuizAnswers) -> String {
    format!(
        "Based on these quiz answers, recommend a tech career path with a plan.\n\
         Interests: {}\nActivities: {}\nStyle: {}\nGoal: {}",
        answers.interests, answers.activities, answers.learning_style, answers.goal
    )
}

pub fn resume(data: &ResumeData) -> String {
    let data = serde_json::to_string(data).unwrap_or_default();
    format!(
        "Act as a pro resume writer. Generate a Markdown resume for a tech role based on this \
         data: {data}. Use action verbs and quantify achievements."
    )
}

pub fn future_trends(career: &str) -> String {
    format!(
        "As a tech analyst, predict key trends, tech, and skills for a \"{career}\" in the next \
         5 years. Use Google Search. Format as Markdown."
    )
}

pub fn dsa_hint(problem_title: &str) -> String {
    format!(
        "I need a high-level hint for the DSA problem: \"{problem_title}\". Don't give the \
         solution, just the core concept or data structure. Keep it to 2-3 sentences."
    )
}

pub fn job_search(role: &str, skills: &str) -> String {
    format!(
        "As a tech career assistant, use Google Search to find 3-5 recent job postings for a \
         \"{role}\" with skills in \"{skills}\". Return ONLY a raw JSON array of objects with \
         keys: \"jobTitle\", \"company\", \"location\", \"description\" (1-2 sentences), and \
         \"applyLink\"."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_career_prompt_lists_every_answer() {
        let prompt = career_path(&CareerQuizAnswers {
            interests: "data".to_string(),
            activities: "puzzles".to_string(),
            learning_style: "hands-on".to_string(),
            goal: "remote work".to_string(),
        });
        for needle in ["Interests: data", "Activities: puzzles", "Style: hands-on", "Goal: remote work"] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn test_resume_prompt_embeds_data_as_json() {
        let prompt = resume(&ResumeData {
            name: "Ana".to_string(),
            email: "ana@x.io".to_string(),
            phone: String::new(),
            summary: String::new(),
            experience: vec![],
            education: vec![],
            skills: "Rust".to_string(),
        });
        assert!(prompt.contains("\"name\":\"Ana\""));
        assert!(prompt.contains("\"skills\":\"Rust\""));
    }

    #[test]
    fn test_job_prompt_names_every_key() {
        let prompt = job_search("Backend Engineer", "Rust, Postgres");
        for key in ["jobTitle", "company", "location", "description", "applyLink"] {
            assert!(prompt.contains(key));
        }
    }
}
