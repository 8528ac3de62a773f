//! The question-answering oracle: multi-query retrieval feeding the
//! answer-synthesis model, with conversation history threaded through an
//! injected session store.

use anyhow::Result;
use std::sync::Arc;

use grimoire_core::traits::{ChatModel, SessionStore};
use grimoire_core::types::{RankedFragment, Turn};
use grimoire_ingest::FragmentStore;

use crate::engine::RetrievalEngine;
use crate::expand::QueryExpander;

pub struct RulesOracle {
    engine: RetrievalEngine,
    expander: QueryExpander,
    chat: Arc<dyn ChatModel>,
    sessions: Arc<dyn SessionStore>,
    store: FragmentStore,
}

impl RulesOracle {
    pub fn new(
        engine: RetrievalEngine,
        expander: QueryExpander,
        chat: Arc<dyn ChatModel>,
        sessions: Arc<dyn SessionStore>,
        store: FragmentStore,
    ) -> Self {
        Self { engine, expander, chat, sessions, store }
    }

    /// Multi-query retrieval resolved to full fragments.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RankedFragment>> {
        let rewrites = self.expander.rewrites(question).await;
        if !rewrites.is_empty() {
            tracing::debug!(rewrites = rewrites.len(), "query expanded");
        }
        let hits = self.engine.retrieve(question, &rewrites).await?;
        let mut fragments = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.store.get(&hit.id) {
                Some(fragment) => {
                    fragments.push(RankedFragment { fragment: fragment.clone(), score: hit.score });
                }
                None => tracing::warn!(id = %hit.id, "indexed fragment missing from store"),
            }
        }
        Ok(fragments)
    }

    /// Answer one question within a session. A failed model call is an
    /// error for this query only; the session history is left untouched so
    /// the next question starts clean.
    pub async fn ask(&self, question: &str, session_id: &str) -> Result<String> {
        let retrieved = self.retrieve(question).await?;
        if retrieved.is_empty() {
            tracing::info!("no fragments retrieved; answering with empty context");
        }
        let context = retrieved
            .iter()
            .map(|r| r.fragment.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let prompt = answer_prompt(&context, question);
        let history = self.sessions.history(session_id);
        let answer = self.chat.complete(&prompt, &history).await?;
        self.sessions.append(session_id, Turn::user(question));
        self.sessions.append(session_id, Turn::assistant(answer.clone()));
        Ok(answer)
    }
}

fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an experienced and helpful Dungeon Master for the 5th edition rules.\n\n\
         INSTRUCTIONS:\n\
         1. Use the CONTEXT below as the absolute source of truth.\n\
         2. If the context does not cover the question, say you do not know rather than inventing a ruling.\n\
         3. When an answer requires a calculation (damage, to-hit), explain the formula.\n\
         4. Quote rule and spell names exactly as the context spells them.\n\n\
         CONTEXT:\n{context}\n\n\
         PLAYER QUESTION:\n{question}\n\n\
         ANSWER:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_context_and_question() {
        let prompt = answer_prompt("Fireball deals 8d6 fire damage", "how much damage?");
        assert!(prompt.contains("CONTEXT:\nFireball deals 8d6 fire damage"));
        assert!(prompt.contains("PLAYER QUESTION:\nhow much damage?"));
        assert!(prompt.ends_with("ANSWER:"));
    }
}
