//! Story generation from accumulated transcripts
//!
//! Builds the prompt from every transcript recorded so far for a
//! (room, chapter) pair, runs it through chat completions, and relays the
//! result to Bubble. The relay is awaited: a dropped story would otherwise
//! vanish silently, since nothing is persisted locally.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::ledger::ConversationLedger;
use crate::llm::{ChatMessage, CompletionClient};
use crate::relay::BackendRelay;
use crate::transcript::TranscriptRequest;

/// Model used for story generation.
pub const STORY_MODEL: &str = "gpt-4o-mini";

const STORY_SYSTEM_PROMPT: &str = r#"You are Narra's Writing Assistant, specialized in preserving authentic storytelling voices.

Your Primary Task:
Transform spoken transcripts into polished first-person narratives while strictly maintaining the storyteller's unique voice, tone, and facts.

Core Guidelines:
1. Voice Preservation
- Maintain the storyteller's vocabulary choices and speech patterns
- Keep their unique expressions and way of describing things
- Preserve emotional tone and perspective

2. Content Accuracy
- Use ONLY facts and details mentioned in the original transcript
- Never add fictional elements or embellishments
- Remove only clear verbal fillers (um, uh, like) and repetitions

3. Structure Enhancement
- Organize content chronologically or logically
- Break into readable paragraphs
- Add minimal punctuation for clarity

4. Title Creation
- Create a concise, relevant title (max 50 characters)
- Capture the story's essence using the storyteller's own key phrases
- Place at the beginning of the piece

Format Requirements:
--------
[Title]
[Story]
--------

Word Count Rule:
Final story must be shorter than the original transcript's word count

Critical Don'ts:
- No new facts or creative additions
- No alteration of the storyteller's perspective
- No formal or academic tone unless present in original

Focus on being invisible - your role is to clarify and organize while keeping the storyteller's voice completely authentic. Write the story from the storyteller's perspective and do not include bot messages. Stick to the transcripts provided and give only the story contents, nothing else."#;

/// Turns accumulated transcripts into stories.
#[derive(Clone)]
pub struct StoryGenerator {
    ledger: Arc<ConversationLedger>,
    client: CompletionClient,
    relay: BackendRelay,
}

impl StoryGenerator {
    pub fn new(ledger: Arc<ConversationLedger>, client: CompletionClient, relay: BackendRelay) -> Self {
        Self {
            ledger,
            client,
            relay,
        }
    }

    /// Generate a story for the request's (room, chapter).
    ///
    /// Appends the new transcript to the ledger first, so calling twice with
    /// the same key feeds both transcripts into the second prompt. Not
    /// idempotent by design.
    pub async fn generate(&self, request: &TranscriptRequest) -> Result<String> {
        let key = (request.user_room_id.clone(), request.chapter_id);
        let turns = self
            .ledger
            .append_and_snapshot(key, &request.transcript, request.account_id, &request.timestamp)
            .await;

        info!(
            room = %request.user_room_id,
            chapter = request.chapter_id,
            turns = turns.len(),
            "Generating story"
        );

        let messages = vec![
            ChatMessage::system(STORY_SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(request.chapter_id, &turns)),
        ];

        let story = self
            .client
            .complete(STORY_MODEL, messages)
            .await
            .context("Story generation failed")?;

        self.relay
            .post_story(&story)
            .await
            .context("Failed to relay story to backend")?;

        Ok(story)
    }
}

/// Assemble the user message from all accumulated turns, in arrival order.
pub(crate) fn build_user_prompt(chapter_id: i64, turns: &[String]) -> String {
    let mut prompt = format!("Create a summary from this data:\nChapter {}:\n", chapter_id);
    for turn in turns {
        prompt.push_str(turn);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_all_turns_in_order() {
        let turns = vec![
            "User said: I went to the market".to_string(),
            "User said: and bought apples".to_string(),
        ];
        let prompt = build_user_prompt(1, &turns);

        let market = prompt.find("I went to the market").unwrap();
        let apples = prompt.find("and bought apples").unwrap();
        assert!(market < apples);
    }

    #[test]
    fn test_prompt_names_chapter() {
        let prompt = build_user_prompt(4, &["User said: hi".to_string()]);
        assert!(prompt.contains("Chapter 4:"));
    }

    #[test]
    fn test_system_prompt_carries_core_rules() {
        assert!(STORY_SYSTEM_PROMPT.contains("max 50 characters"));
        assert!(STORY_SYSTEM_PROMPT.contains("shorter than the original transcript"));
    }
}
