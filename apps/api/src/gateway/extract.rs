//! Pulling structured data out of free-text model output.

use crate::gateway::models::GroundingSource;
use crate::llm_client::GroundingChunk;

/// Returns the span from the first `[` to the last `]`, inclusive. Models
/// wrap the array in commentary, so only this span is ever parsed.
pub fn embedded_json_array(text: &str) -> Result<&str, String> {
    let text = text.trim();
    let start = text
        .find('[')
        .ok_or_else(|| "response has no opening bracket".to_string())?;
    let end = text
        .rfind(']')
        .ok_or_else(|| "response has no closing bracket".to_string())?;
    if end < start {
        return Err("closing bracket precedes opening bracket".to_string());
    }
    Ok(&text[start..=end])
}

/// Drops chunks without a link; a missing or blank title falls back to the link.
pub fn grounding_sources(chunks: Vec<GroundingChunk>) -> Vec<GroundingSource> {
    chunks
        .into_iter()
        .filter_map(|chunk| {
            let uri = chunk.uri.filter(|u| !u.trim().is_empty())?;
            let title = chunk
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| uri.clone());
            Some(GroundingSource { uri, title })
        })
        .collect()
}
