//! Prompt assembly.
//!
//! Builds the single text prompt sent to the generation model: a fixed
//! instruction header, a context block made of the retrieved chunks (each
//! prefixed with its source identifier, in retrieval order, separated by a
//! blank line), the literal question, and an `Answer:` cue.
//!
//! The context block is bounded by a character budget. Chunks are added
//! whole while they fit. If the first chunk alone is over budget, its
//! `[Source: ..]` label is kept intact and only its text is cut to fit; when
//! even the label does not fit, the context block stays empty. Chunks that do
//! not fit are left out of the prompt entirely.

use crate::models::ScoredChunk;

/// Instruction header establishing persona and answering policy.
pub const INSTRUCTIONS: &str = "You are a medical assistant. Use the context below to answer the question.
If the answer is supported by the context, provide a clear answer. If context is incomplete, provide
a best-effort response and mark uncertainty. Never refuse; always attempt to answer using provided context.";

const SEPARATOR: &str = "\n\n";

/// Chars reserved for a `[Source: ..]` label on top of the chunk size when
/// validating a context budget.
pub const SOURCE_LABEL_RESERVE: usize = 200;

/// An assembled prompt and how much of the retrieval result it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub text: String,
    /// Number of leading retrieved chunks included in the context block.
    pub used: usize,
    /// Chars of the first chunk's text kept when it had to be cut to fit.
    pub truncated: Option<usize>,
}

fn source_label(source: &str) -> String {
    format!("[Source: {}]\n", source)
}

/// Assemble the prompt for `question` from the retrieved chunks.
///
/// `max_context_chars` bounds the context block, measured in chars.
pub fn assemble_prompt(
    question: &str,
    retrieved: &[ScoredChunk],
    max_context_chars: usize,
) -> AssembledPrompt {
    let mut context = String::new();
    let mut context_chars = 0usize;
    let mut used = 0usize;
    let mut truncated = None;

    for sc in retrieved {
        let label = source_label(&sc.chunk.metadata.source);
        let sep_chars = if used == 0 { 0 } else { SEPARATOR.len() };
        let label_chars = label.chars().count();
        let piece_chars = label_chars + sc.chunk.text.chars().count();

        if context_chars + sep_chars + piece_chars > max_context_chars {
            if used == 0 && label_chars < max_context_chars {
                let keep = max_context_chars - label_chars;
                context.push_str(&label);
                context.extend(sc.chunk.text.chars().take(keep));
                used = 1;
                truncated = Some(keep);
            }
            break;
        }

        if used > 0 {
            context.push_str(SEPARATOR);
        }
        context.push_str(&label);
        context.push_str(&sc.chunk.text);
        context_chars += sep_chars + piece_chars;
        used += 1;
    }

    let text = format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        INSTRUCTIONS, context, question
    );

    AssembledPrompt {
        text,
        used,
        truncated,
    }
}
