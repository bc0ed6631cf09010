//! Response schemas sent to the model, and the structural checks applied to
//! what comes back.
//!
//! Deserialization already rejects missing fields and unknown enum labels;
//! `Validate` adds the checks serde cannot express (blank strings, empty
//! lists).

use serde_json::{json, Value};

use crate::gateway::models::{CareerPath, LearningRoadmap};

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("`{field}` is blank"))
    } else {
        Ok(())
    }
}

impl Validate for LearningRoadmap {
    fn validate(&self) -> Result<(), String> {
        non_blank("topic", &self.topic)?;
        if self.steps.is_empty() {
            return Err("roadmap has no steps".to_string());
        }
        for (i, step) in self.steps.iter().enumerate() {
            non_blank(&format!("steps[{i}].title"), &step.title)?;
            for (j, resource) in step.resources.iter().enumerate() {
                non_blank(&format!("steps[{i}].resources[{j}].title"), &resource.title)?;
            }
        }
        Ok(())
    }
}

impl Validate for CareerPath {
    fn validate(&self) -> Result<(), String> {
        non_blank("name", &self.name)?;
        non_blank("description", &self.description)?;
        if self.learning_plan.is_empty() {
            return Err("career path has no learning plan".to_string());
        }
        Ok(())
    }
}

pub fn roadmap_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "topic": { "type": "STRING" },
            "steps": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "resources": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "type": {
                                        "type": "STRING",
                                        "enum": ["video", "book", "article", "documentation"]
                                    },
                                    "title": { "type": "STRING" },
                                    "url": { "type": "STRING" }
                                },
                                "required": ["type", "title", "url"]
                            }
                        }
                    },
                    "required": ["title", "description", "resources"]
                }
            }
        },
        "required": ["topic", "steps"]
    })
}

pub fn career_path_schema() -> Value {
    let string_list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "name": { "type": "STRING" },
            "description": { "type": "STRING" },
            "learningPlan": string_list,
            "certifications": string_list,
            "jobPortals": string_list
        },
        "required": ["name", "description", "learningPlan", "certifications", "jobPortals"]
    })
}
