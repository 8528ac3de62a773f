//! Multi-query expansion: ask the chat model for alternative phrasings of
//! the user's question before searching.

use std::collections::HashSet;
use std::sync::Arc;

use grimoire_core::traits::ChatModel;

pub struct QueryExpander {
    model: Arc<dyn ChatModel>,
    count: usize,
}

impl QueryExpander {
    /// `count` is the number of rewrites requested; zero disables
    /// expansion entirely.
    pub fn new(model: Arc<dyn ChatModel>, count: usize) -> Self {
        Self { model, count }
    }

    /// Request alternative phrasings. A failed call or an unusable reply
    /// degrades to an empty list; the caller then searches the original
    /// question alone.
    pub async fn rewrites(&self, question: &str) -> Vec<String> {
        if self.count == 0 {
            return Vec::new();
        }
        let prompt = format!(
            "You help players search a tabletop rulebook. Rewrite the question below into {} \
             alternative phrasings that cover different facets of it. Reply with one phrasing \
             per line, with no numbering and no commentary.\n\nQuestion: {question}",
            self.count
        );
        match self.model.complete(&prompt, &[]).await {
            Ok(reply) => {
                let rewrites = parse_rewrites(&reply, question, self.count);
                if rewrites.is_empty() {
                    tracing::warn!("query expansion produced no usable rewrites");
                }
                rewrites
            }
            Err(e) => {
                tracing::warn!("query expansion failed; using the original question alone: {e}");
                Vec::new()
            }
        }
    }
}

/// Extract up to `limit` rewrites from a model reply: one per line,
/// bullets/numbering stripped, blanks and near-empty lines dropped,
/// deduplicated case-insensitively against each other and the original.
pub fn parse_rewrites(reply: &str, original: &str, limit: usize) -> Vec<String> {
    let original_lower = original.trim().to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for line in reply.lines() {
        let line = strip_bullet(line);
        if line.chars().count() < 8 {
            continue;
        }
        let lower = line.to_lowercase();
        if lower == original_lower || !seen.insert(lower) {
            continue;
        }
        out.push(line.to_string());
        if out.len() == limit {
            break;
        }
    }
    out
}

/// Remove a leading `- `, `* `, or `3.` / `3)` list marker.
fn strip_bullet(line: &str) -> &str {
    let rest = line.trim().trim_start_matches(['-', '*', '•']).trim_start();
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &rest[digits..];
        if let Some(stripped) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            return stripped.trim_start();
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_numbering_and_bullets() {
        let reply = "1. How does fire damage interact with resistance?\n- What spells deal fire damage?\n* Which abilities reduce fire damage?";
        let rewrites = parse_rewrites(reply, "fire damage rules", 5);
        assert_eq!(
            rewrites,
            vec![
                "How does fire damage interact with resistance?",
                "What spells deal fire damage?",
                "Which abilities reduce fire damage?",
            ]
        );
    }

    #[test]
    fn drops_blank_and_junk_lines() {
        let reply = "Sure!\n\nWhat are the rules for mounted combat?\nOk?";
        let rewrites = parse_rewrites(reply, "mounted combat", 5);
        assert_eq!(rewrites, vec!["What are the rules for mounted combat?"]);
    }

    #[test]
    fn dedups_against_the_original_and_itself() {
        let reply = "Mounted combat rules\nmounted combat rules\nHow do mounts act in combat?";
        let rewrites = parse_rewrites(reply, "Mounted Combat Rules", 5);
        assert_eq!(rewrites, vec!["How do mounts act in combat?"]);
    }

    #[test]
    fn respects_the_limit() {
        let reply = "first alternative phrasing\nsecond alternative phrasing\nthird alternative phrasing";
        let rewrites = parse_rewrites(reply, "q", 2);
        assert_eq!(rewrites.len(), 2);
    }

    #[test]
    fn keeps_questions_that_start_with_dice_notation() {
        let rewrites = parse_rewrites("2d6 falling damage per 10 feet?", "falling", 5);
        assert_eq!(rewrites, vec!["2d6 falling damage per 10 feet?"]);
    }
}
