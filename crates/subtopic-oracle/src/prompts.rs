//! Prompt templates for the oracle.
//!
//! The wording asks for machine-checkable answers: a JSON array of strings
//! for enumeration and a bare integer for selection.

/// Ask for an exhaustive, covering list of subtopics of `topic`.
pub fn enumerate_prompt(topic: &str) -> String {
    format!(
        r#"What are the subtopics of topic "{topic}" that together cover the entire range of the topic area? Return nothing but the list of subtopics formatted as json array: ["subtopic1", "subtopic2", ...]"#
    )
}

/// Ask which numbered candidate most likely contains `keyword`.
pub fn select_prompt(keyword: &str, candidates: &[String]) -> String {
    format!(
        r#"Which of the following topics {} is most likely to contain the keyword "{keyword}"? Return only the number without description."#,
        candidate_listing(candidates)
    )
}

/// Ask a second backend to pull a topic list out of a malformed answer.
pub fn repair_prompt(answer: &str) -> String {
    format!(
        r#"Extract the topic list from the following text. Return nothing but the list in the format ["topic1", "topic2", ...]: {answer}"#
    )
}

/// Render candidates as `{0 : "a", 1 : "b"}`.
fn candidate_listing(candidates: &[String]) -> String {
    let entries: Vec<String> = candidates
        .iter()
        .enumerate()
        .map(|(i, name)| format!(r#"{i} : "{name}""#))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_prompt() {
        let prompt = enumerate_prompt("quantum mechanics");
        assert!(prompt.contains(r#"topic "quantum mechanics""#));
        assert!(prompt.contains("json array"));
    }

    #[test]
    fn test_select_prompt_numbers_candidates() {
        let candidates = vec!["optics".to_string(), "quantum mechanics".to_string()];
        let prompt = select_prompt("quantum entanglement", &candidates);
        assert!(prompt.contains(r#"{0 : "optics", 1 : "quantum mechanics"}"#));
        assert!(prompt.contains(r#"keyword "quantum entanglement""#));
        assert!(prompt.ends_with("Return only the number without description."));
    }

    #[test]
    fn test_repair_prompt_embeds_answer() {
        let prompt = repair_prompt("Sure! optics, acoustics");
        assert!(prompt.ends_with(": Sure! optics, acoustics"));
    }
}
