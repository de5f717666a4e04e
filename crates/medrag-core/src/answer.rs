//! Response packaging: generated text + retrieved chunks → [`Answer`].

use crate::generate::GeneratedText;
use crate::models::{Answer, ScoredChunk, SourceDocument};

/// Combine the generated text with the chunks that were placed in the prompt.
pub fn package_answer(generated: GeneratedText, used: &[ScoredChunk]) -> Answer {
    let source_documents: Vec<SourceDocument> = used
        .iter()
        .map(|sc| SourceDocument {
            text: sc.chunk.text.clone(),
            metadata: sc.chunk.metadata.clone(),
        })
        .collect();
    let sources = source_documents
        .iter()
        .map(|d| d.metadata.source.clone())
        .collect();

    Answer {
        result: generated.text,
        source_documents,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ChunkMetadata};

    fn scored(source: &str, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                document_index: 0,
                chunk_index: 0,
                start: 0,
                text: text.to_string(),
                hash: String::new(),
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    specialty: "Gastroenterology".to_string(),
                    description: "GERD follow-up.".to_string(),
                },
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_sources_follow_document_order() {
        let used = vec![scored("b", "second"), scored("a", "first")];
        let answer = package_answer(GeneratedText::new("PPIs."), &used);
        assert_eq!(answer.result, "PPIs.");
        assert_eq!(answer.sources, vec!["b", "a"]);
        assert_eq!(answer.source_documents[1].text, "first");
        assert_eq!(answer.source_documents[0].metadata.specialty, "Gastroenterology");
    }

    #[test]
    fn test_json_contract() {
        let answer = package_answer(GeneratedText::new("ok"), &[scored("Gallstones", "t")]);
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["result"], "ok");
        assert_eq!(json["sources"][0], "Gallstones");
        assert_eq!(json["source_documents"][0]["text"], "t");
        assert_eq!(json["source_documents"][0]["metadata"]["source"], "Gallstones");
        assert_eq!(
            json["source_documents"][0]["metadata"]["description"],
            "GERD follow-up."
        );
    }

    #[test]
    fn test_no_sources() {
        let answer = package_answer(GeneratedText::new("unsure"), &[]);
        assert!(answer.sources.is_empty());
        assert!(answer.source_documents.is_empty());
    }
}
