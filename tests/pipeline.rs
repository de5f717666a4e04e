use anyhow::Result;
use async_trait::async_trait;
use medrag::context::QueryContext;
use medrag::dataset::read_records;
use medrag::index_store::{load_index, write_index, IndexError, IndexManifest, FORMAT_VERSION};
use medrag::indexer::build_index;
use medrag::progress::NoProgress;
use medrag_core::chunk::{chunk_document, ChunkingParams};
use medrag_core::embedding::{Embedder, HashEmbedder};
use medrag_core::generate::{GeneratedText, Generator};
use medrag_core::index::VectorIndex;
use medrag_core::models::{ChunkMetadata, Document};
use medrag_core::pipeline::{RagPipeline, RetrievalParams};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Echoes a fixed answer and remembers the last prompt.
struct StubGenerator {
    last_prompt: Mutex<Option<String>>,
}

impl StubGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            last_prompt: Mutex::new(None),
        })
    }

    fn last_prompt(&self) -> String {
        self.last_prompt.lock().unwrap().clone().unwrap_or_default()
    }
}

#[async_trait]
impl Generator for StubGenerator {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedText> {
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        Ok(GeneratedText::new("stub answer"))
    }
}

const DATASET: &str = "\
,description,medical_specialty,sample_name,transcription
0,Allergy follow-up,Allergy / Immunology,Allergic Rhinitis,\"Patient reports sneezing, itchy eyes and nasal congestion every spring.\"
1,Bypass consult,Bariatrics,Ghost Record,
2,Echo study,Cardiovascular / Pulmonary,2-D Echocardiogram,\"Left atrial enlargement with mitral regurgitation. Ejection fraction 70%.\"
3,Knee pain,Orthopedic,Knee Arthroscopy,\"Chronic knee pain treated with arthroscopy and physical therapy.\"
";

fn manifest_for(index: &VectorIndex, params: &ChunkingParams, documents: usize) -> IndexManifest {
    IndexManifest {
        format_version: FORMAT_VERSION,
        embedding_model: index.model().to_string(),
        embedding_dims: index.dims(),
        chunk_max_chars: params.max_chars(),
        chunk_overlap_chars: params.overlap_chars(),
        documents,
        chunks: index.len(),
        records_skipped: 0,
        built_at: chrono::Utc::now().to_rfc3339(),
    }
}

async fn build_dataset_index(dir: &Path, embedder: &HashEmbedder) -> VectorIndex {
    let records = read_records(DATASET.as_bytes()).unwrap();
    let params = ChunkingParams::new(2000, 200).unwrap();
    let built = build_index(&records, &params, embedder, 64, &NoProgress)
        .await
        .unwrap();
    assert_eq!(built.skipped, vec![1]);
    write_index(dir, &built.index, &manifest_for(&built.index, &params, built.documents))
        .await
        .unwrap();
    built.index
}

#[tokio::test]
async fn test_tiny_index_ranks_matching_chunk_first() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashEmbedder::new(384).unwrap());
    let params = ChunkingParams::new(8, 2).unwrap();
    let doc = Document {
        index: 0,
        text: "AAAA BBBB CCCC".to_string(),
        metadata: ChunkMetadata {
            source: "tiny".to_string(),
            specialty: "Test".to_string(),
            description: "Tiny".to_string(),
        },
    };

    let mut index = VectorIndex::new(HashEmbedder::MODEL_NAME, 384);
    for chunk in chunk_document(&doc, &params) {
        let vector = embedder.embed_text(&chunk.text);
        index.insert(chunk, vector).unwrap();
    }
    assert_eq!(index.len(), 2);
    write_index(dir.path(), &index, &manifest_for(&index, &params, 1))
        .await
        .unwrap();

    let generator = StubGenerator::new();
    let ctx = QueryContext::open(
        dir.path(),
        embedder,
        generator.clone(),
        RetrievalParams::default(),
    )
    .await
    .unwrap();
    assert!(ctx.is_ready());

    let answer = ctx.pipeline().unwrap().answer("AAAA").await.unwrap();
    assert_eq!(answer.result, "stub answer");
    assert!(answer.source_documents[0].text.contains("AAAA"));
    assert_eq!(answer.sources[0], "tiny");
    assert!(generator.last_prompt().contains("Question: AAAA"));
}

#[tokio::test]
async fn test_empty_index_answers_without_sources() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashEmbedder::new(64).unwrap());
    let params = ChunkingParams::new(2000, 200).unwrap();
    let index = VectorIndex::new(HashEmbedder::MODEL_NAME, 64);
    write_index(dir.path(), &index, &manifest_for(&index, &params, 0))
        .await
        .unwrap();

    let loaded = load_index(dir.path(), embedder.as_ref()).await.unwrap();
    let generator = StubGenerator::new();
    let pipeline = RagPipeline::new(
        loaded,
        embedder,
        generator.clone(),
        RetrievalParams::default(),
    )
    .unwrap();

    assert!(pipeline.retrieve("anything").await.unwrap().is_empty());
    let answer = pipeline.answer("What is asthma?").await.unwrap();
    assert!(answer.source_documents.is_empty());
    assert!(answer.sources.is_empty());
    assert!(generator.last_prompt().contains("Context:\n\n\nQuestion: What is asthma?"));
}

#[tokio::test]
async fn test_empty_transcription_never_reaches_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = HashEmbedder::new(128).unwrap();
    build_dataset_index(dir.path(), &embedder).await;

    let loaded = load_index(dir.path(), &embedder).await.unwrap();
    assert_eq!(loaded.len(), 3);
    assert!(loaded
        .entries()
        .iter()
        .all(|e| e.chunk.metadata.source != "Ghost Record"));
}

#[tokio::test]
async fn test_dataset_question_cites_relevant_sample() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashEmbedder::new(384).unwrap());
    build_dataset_index(dir.path(), &embedder).await;

    let ctx = QueryContext::open(
        dir.path(),
        embedder,
        StubGenerator::new(),
        RetrievalParams {
            top_k: 2,
            max_context_chars: 24_000,
        },
    )
    .await
    .unwrap();

    let answer = ctx
        .pipeline()
        .unwrap()
        .answer("knee pain arthroscopy physical therapy")
        .await
        .unwrap();
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(answer.sources[0], "Knee Arthroscopy");
    assert!(answer.source_documents[0]
        .text
        .starts_with("[Specialty: Orthopedic] [Description: Knee pain]"));
}

#[tokio::test]
async fn test_missing_index_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("vectorstore");
    let ctx = QueryContext::open(
        &missing,
        Arc::new(HashEmbedder::new(32).unwrap()),
        StubGenerator::new(),
        RetrievalParams::default(),
    )
    .await
    .unwrap();

    assert!(!ctx.is_ready());
    match ctx.pipeline() {
        Err(IndexError::NotFound { path }) => assert_eq!(path, missing),
        _ => panic!("expected NotFound"),
    }
}

#[tokio::test]
async fn test_embedder_mismatch_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    build_dataset_index(dir.path(), &HashEmbedder::new(128).unwrap()).await;

    let result = QueryContext::open(
        dir.path(),
        Arc::new(HashEmbedder::new(256).unwrap()),
        StubGenerator::new(),
        RetrievalParams::default(),
    )
    .await;
    let err = match result {
        Ok(_) => panic!("expected mismatch"),
        Err(e) => e,
    };
    assert!(matches!(
        err.downcast_ref::<IndexError>(),
        Some(IndexError::EmbeddingMismatch { .. })
    ));
}

#[tokio::test]
async fn test_reindex_replaces_previous_index() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = HashEmbedder::new(128).unwrap();
    build_dataset_index(dir.path(), &embedder).await;

    let params = ChunkingParams::new(2000, 200).unwrap();
    let only = read_records(
        "transcription,medical_specialty,description,sample_name\nMigraine with aura.,Neurology,Headache,Migraine\n"
            .as_bytes(),
    )
    .unwrap();
    let built = build_index(&only, &params, &embedder, 64, &NoProgress)
        .await
        .unwrap();
    write_index(dir.path(), &built.index, &manifest_for(&built.index, &params, 1))
        .await
        .unwrap();

    let loaded = load_index(dir.path(), &embedder).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.entries()[0].chunk.metadata.source, "Migraine");
}

#[tokio::test]
async fn test_generator_failure_propagates() {
    struct Down;

    #[async_trait]
    impl Generator for Down {
        fn model_name(&self) -> &str {
            "down"
        }
        async fn generate(&self, _prompt: &str) -> Result<GeneratedText> {
            anyhow::bail!("503 Service Unavailable")
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HashEmbedder::new(128).unwrap());
    build_dataset_index(dir.path(), &embedder).await;
    let ctx = QueryContext::open(dir.path(), embedder, Arc::new(Down), RetrievalParams::default())
        .await
        .unwrap();

    let err = ctx.pipeline().unwrap().answer("asthma").await.unwrap_err();
    assert!(err.to_string().contains("503"));
    assert_eq!(ctx.pipeline().unwrap().generator_model(), "down");
}

#[test]
fn test_hash_embedder_reports_its_model() {
    let e = HashEmbedder::new(16).unwrap();
    assert_eq!(e.model_name(), HashEmbedder::MODEL_NAME);
    assert_eq!(e.dims(), 16);
}
