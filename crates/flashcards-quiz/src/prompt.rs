//! Prompt construction for quiz turns.
//!
//! Pure functions: the same notes, ids and history always produce the same
//! prompt text.

use flashcards_core::types::{Message, Note};

use crate::error::QuizError;

/// System instruction sent with every quiz turn.
pub const SYSTEM_PROMPT: &str = "You are a focused quiz assistant that helps users study from their notes. Your task is to ask one thoughtful, non-multiple-choice question based on provided notes. After a user answers, you must clearly say if the answer is correct or not, explain why if it's incorrect, and provide the correct answer. Then, allow the user to ask follow-up questions *only* about that specific topic.

If the user asks anything unrelated to the current question or topic, politely decline to answer. Do not reveal the correct answer or provide hints. Instead, remind the user to answer the original question or ask a follow-up related to the topic at hand.

Never respond with metadata, formatting, or explain who you are. Just give direct, human-like responses.";

/// Opening-question instructions. Followed by the notes block.
const INITIAL_QUIZ_PROMPT: &str = "Based on the following study notes, generate one open-ended, thought-provoking question that tests the user's understanding. The question should not be multiple choice. Keep it focused and relevant.";

/// Continuation instructions. Followed by the notes block and the transcript.
const CONVERSATION_PROMPT: &str = "Continue the quiz conversation. Use the notes and the conversation so far to guide your response.

If the last user answer is correct, acknowledge it simply and briefly.

If the answer is incorrect, clearly explain why it's wrong, then provide the correct answer.

If the user asks something unrelated to the current question or topic, do NOT give the correct answer or any hints. Instead, respond that you only answer questions about the current topic and ask the user to answer the original question or stay on topic.";

/// Keep the notes whose id was requested, in store order.
pub fn filter_notes<'a>(notes: &'a [Note], note_ids: &[i64]) -> Vec<&'a Note> {
    notes.iter().filter(|n| note_ids.contains(&n.id)).collect()
}

/// Render notes as `Note <n>: <content>` lines, numbered from 1 by position.
pub fn render_notes(notes: &[&Note]) -> String {
    notes
        .iter()
        .enumerate()
        .map(|(i, note)| format!("Note {}: {}\n", i + 1, note.content))
        .collect()
}

/// Render the transcript as `<Role>: <content>` lines.
pub fn render_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}\n", m.role.label(), m.content))
        .collect()
}

/// Build the prompt for one quiz turn.
///
/// An empty history selects the opening-question template; otherwise the
/// continuation template is used with the rendered transcript.
pub fn build_prompt(
    notes: &[Note],
    note_ids: &[i64],
    messages: &[Message],
) -> Result<String, QuizError> {
    let selected = filter_notes(notes, note_ids);
    if selected.is_empty() {
        return Err(QuizError::NoValidNotes);
    }

    let notes_block = render_notes(&selected);
    let prompt = if messages.is_empty() {
        format!("{INITIAL_QUIZ_PROMPT}\n\nNotes:\n{notes_block}")
    } else {
        let history = render_history(messages);
        format!("{CONVERSATION_PROMPT}\n\nNotes:\n{notes_block}\n\nConversation:\n{history}")
    };
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(id: i64, content: &str) -> Note {
        let now = Utc::now();
        Note {
            id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn store() -> Vec<Note> {
        vec![
            note(9, "Photosynthesis converts light to chemical energy"),
            note(4, "Mitochondria produce ATP"),
            note(2, "Osmosis moves water across membranes"),
        ]
    }

    #[test]
    fn test_notes_block_numbers_by_position() {
        let notes = store();
        let prompt = build_prompt(&notes, &[2, 9], &[]).unwrap();
        assert!(prompt.ends_with(
            "Notes:\nNote 1: Photosynthesis converts light to chemical energy\nNote 2: Osmosis moves water across membranes\n"
        ));
        assert!(!prompt.contains("Mitochondria"));
    }

    #[test]
    fn test_disjoint_ids_fail() {
        let notes = store();
        let err = build_prompt(&notes, &[100, 200], &[]).unwrap_err();
        assert!(matches!(err, QuizError::NoValidNotes));

        let err = build_prompt(&notes, &[], &[]).unwrap_err();
        assert!(matches!(err, QuizError::NoValidNotes));
    }

    #[test]
    fn test_initial_template_for_empty_history() {
        let prompt = build_prompt(&store(), &[4], &[]).unwrap();
        assert!(prompt.starts_with("Based on the following study notes"));
        assert!(!prompt.contains("Conversation:"));
        assert!(prompt.contains("Note 1: Mitochondria produce ATP\n"));
    }

    #[test]
    fn test_continuation_template_renders_history_in_order() {
        let history = vec![
            Message::assistant("What do mitochondria produce?"),
            Message::user("ATP"),
        ];
        let prompt = build_prompt(&store(), &[4], &history).unwrap();
        assert!(prompt.starts_with("Continue the quiz conversation."));
        assert!(prompt.ends_with(
            "Notes:\nNote 1: Mitochondria produce ATP\n\n\nConversation:\nAssistant: What do mitochondria produce?\nUser: ATP\n"
        ));
    }

    #[test]
    fn test_placeholder_text_in_notes_is_not_expanded() {
        let notes = vec![note(1, "literal {conversation} marker")];
        let history = vec![Message::user("hi")];
        let prompt = build_prompt(&notes, &[1], &history).unwrap();
        assert!(prompt.contains("Note 1: literal {conversation} marker\n"));
        assert!(prompt.ends_with("Conversation:\nUser: hi\n"));
    }

    #[test]
    fn test_build_prompt_is_deterministic() {
        let notes = store();
        let history = vec![Message::assistant("Q?"), Message::user("A")];
        let a = build_prompt(&notes, &[2, 4], &history).unwrap();
        let b = build_prompt(&notes, &[2, 4], &history).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_history_empty() {
        assert_eq!(render_history(&[]), "");
    }
}
