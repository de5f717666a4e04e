//! `medrag ask`: answer one question from the command line.

use anyhow::Result;
use medrag_core::models::Answer;

use crate::context::QueryContext;

const PREVIEW_CHARS: usize = 240;

/// Answer `question` and print the result to stdout.
pub async fn run_ask(ctx: &QueryContext, question: &str, json: bool) -> Result<()> {
    let pipeline = ctx.pipeline()?;
    let answer = pipeline.answer(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", render_answer(&answer));
    }
    Ok(())
}

/// Human-readable rendering: the answer, then numbered sources with a preview.
pub fn render_answer(answer: &Answer) -> String {
    let mut out = String::new();
    out.push_str("Answer:\n");
    out.push_str(answer.result.trim_end());
    out.push_str("\n\nSources:\n");
    if answer.source_documents.is_empty() {
        out.push_str("  (none)\n");
    }
    for (i, doc) in answer.source_documents.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} [{}]\n",
            i + 1,
            doc.metadata.source,
            doc.metadata.specialty.trim()
        ));
        out.push_str(&format!("     {}\n", preview(&doc.text)));
    }
    out
}

fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medrag_core::models::{ChunkMetadata, SourceDocument};

    #[test]
    fn test_render_numbers_sources() {
        let answer = Answer {
            result: "Antihistamines.\n".to_string(),
            source_documents: vec![SourceDocument {
                text: "[Specialty: Allergy] [Description: x]\nSUBJECTIVE: sneezing".to_string(),
                metadata: ChunkMetadata {
                    source: "Allergic Rhinitis".to_string(),
                    specialty: " Allergy / Immunology".to_string(),
                    description: "x".to_string(),
                },
            }],
            sources: vec!["Allergic Rhinitis".to_string()],
        };
        let text = render_answer(&answer);
        assert!(text.starts_with("Answer:\nAntihistamines.\n\nSources:\n"));
        assert!(text.contains("  1. Allergic Rhinitis [Allergy / Immunology]"));
        assert!(text.contains("[Description: x] SUBJECTIVE: sneezing"));
    }

    #[test]
    fn test_render_without_sources() {
        let answer = Answer {
            result: "I don't know.".to_string(),
            source_documents: vec![],
            sources: vec![],
        };
        assert!(render_answer(&answer).contains("(none)"));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(PREVIEW_CHARS + 10);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }
}
