//! The ingestion orchestrator (C6): `start_crawl`/`start_upload`/
//! `cancel`/`get_progress`, driving discovery -> crawl -> chunk&store ->
//! code-extract -> finalize with cancellation and progress reporting
//! (spec §4.6).

use std::sync::Arc;

use archon_chunker::{chunk_text, split_sections, ChunkerConfig};
use archon_crawler::{crawl, detect_strategy, CrawlResult, Fetcher, MediaType, RobotsCache, Strategy};
use archon_db::model::{CodeExample, Source};
use archon_db::{sources as db_sources, DbPool};
use archon_protocol::{SourceId, SubjectId, Timestamp};
use archon_providers::{ChatMessage, ChatOptions, ProviderGateway};
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::code_extract::extract_fenced_code;
use crate::error::IngestError;
use crate::progress::{Phase, Progress, ProgressId, ProgressSnapshot, TerminalStatus};
use crate::request::{CrawlRequest, UploadRequest};

const DEFAULT_MAX_PIPELINES: usize = 4;
const DEFAULT_MAX_EMBEDDING_BATCHES: usize = 8;
const CANCEL_CHECK_EVERY_N_CHUNKS: u64 = 10;
const CANCEL_CHECK_EVERY_N_EXTRACTIONS: u64 = 10;

struct FetchedDoc {
    url: String,
    markdown: String,
}

pub struct Orchestrator {
    pool: DbPool,
    gateway: Arc<ProviderGateway>,
    fetcher: Arc<Fetcher>,
    robots: Arc<RobotsCache>,
    progress: Arc<DashMap<ProgressId, Arc<Progress>>>,
    cancellations: Arc<DashMap<ProgressId, CancellationToken>>,
    pipeline_semaphore: Arc<Semaphore>,
    embedding_semaphore: Arc<Semaphore>,
    embedding_dimension: i32,
    embedding_model: String,
}

impl Orchestrator {
    pub fn new(pool: DbPool, gateway: Arc<ProviderGateway>, embedding_model: impl Into<String>, embedding_dimension: i32) -> Self {
        Self {
            pool,
            gateway,
            fetcher: Arc::new(Fetcher::new()),
            robots: Arc::new(RobotsCache::new(reqwest::Client::new())),
            progress: Arc::new(DashMap::new()),
            cancellations: Arc::new(DashMap::new()),
            pipeline_semaphore: Arc::new(Semaphore::new(DEFAULT_MAX_PIPELINES)),
            embedding_semaphore: Arc::new(Semaphore::new(DEFAULT_MAX_EMBEDDING_BATCHES)),
            embedding_dimension,
            embedding_model: embedding_model.into(),
        }
    }

    pub fn get_progress(&self, id: ProgressId) -> Result<ProgressSnapshot, IngestError> {
        self.progress
            .get(&id)
            .map(|p| p.snapshot())
            .ok_or_else(|| IngestError::ProgressNotFound(id.to_string()))
    }

    /// Cooperative: flips the cancellation token; the pipeline observes
    /// it at its next checkpoint. A cancel arriving after the pipeline
    /// already reached `Finalize` is a no-op (spec §8 boundary case).
    pub fn cancel(&self, id: ProgressId) -> Result<(), IngestError> {
        let progress = self
            .progress
            .get(&id)
            .ok_or_else(|| IngestError::ProgressNotFound(id.to_string()))?;
        if progress.is_terminal() {
            return Ok(());
        }
        if let Some(token) = self.cancellations.get(&id) {
            token.cancel();
        }
        Ok(())
    }

    pub fn start_crawl(&self, request: CrawlRequest, subject: SubjectId) -> Result<ProgressId, IngestError> {
        if request.url.trim().is_empty() {
            return Err(IngestError::InvalidRequest("url must not be empty".to_string()));
        }
        if request.project_id.is_none() && request.is_project_private {
            return Err(IngestError::InvalidRequest(
                "is_project_private requires a project_id".to_string(),
            ));
        }

        let progress_id = ProgressId::new();
        let progress = Arc::new(Progress::new(progress_id, chrono::Utc::now()));
        self.progress.insert(progress_id, progress.clone());
        let token = CancellationToken::new();
        self.cancellations.insert(progress_id, token.clone());

        let pool = self.pool.clone();
        let gateway = self.gateway.clone();
        let fetcher = self.fetcher.clone();
        let robots = self.robots.clone();
        let embedding_semaphore = self.embedding_semaphore.clone();
        let pipeline_semaphore = self.pipeline_semaphore.clone();
        let dimension = self.embedding_dimension;
        let model = self.embedding_model.clone();

        tokio::spawn(async move {
            let _permit = pipeline_semaphore.acquire().await.expect("semaphore never closed");
            run_crawl_pipeline(
                pool, gateway, fetcher, robots, embedding_semaphore, progress, token, request, subject, &model, dimension,
            )
            .await;
        });

        Ok(progress_id)
    }

    /// The caller reads `file_bytes` into memory before invoking this
    /// (spec §4.6: "so the caller's transport can close"), so this takes
    /// ownership of already-buffered content.
    pub fn start_upload(
        &self,
        request: UploadRequest,
        file_bytes: Vec<u8>,
        subject: SubjectId,
    ) -> Result<ProgressId, IngestError> {
        if request.project_id.is_none() && request.is_project_private {
            return Err(IngestError::InvalidRequest(
                "is_project_private requires a project_id".to_string(),
            ));
        }
        let text = String::from_utf8(file_bytes)
            .map_err(|_| IngestError::InvalidRequest("upload body is not valid utf-8".to_string()))?;

        let progress_id = ProgressId::new();
        let progress = Arc::new(Progress::new(progress_id, chrono::Utc::now()));
        self.progress.insert(progress_id, progress.clone());
        let token = CancellationToken::new();
        self.cancellations.insert(progress_id, token.clone());

        let pool = self.pool.clone();
        let gateway = self.gateway.clone();
        let embedding_semaphore = self.embedding_semaphore.clone();
        let pipeline_semaphore = self.pipeline_semaphore.clone();
        let dimension = self.embedding_dimension;
        let model = self.embedding_model.clone();

        tokio::spawn(async move {
            let _permit = pipeline_semaphore.acquire().await.expect("semaphore never closed");
            run_upload_pipeline(
                pool, gateway, embedding_semaphore, progress, token, request, text, subject, &model, dimension,
            )
            .await;
        });

        Ok(progress_id)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_crawl_pipeline(
    pool: DbPool,
    gateway: Arc<ProviderGateway>,
    fetcher: Arc<Fetcher>,
    robots: Arc<RobotsCache>,
    embedding_semaphore: Arc<Semaphore>,
    progress: Arc<Progress>,
    token: CancellationToken,
    request: CrawlRequest,
    subject: SubjectId,
    model: &str,
    dimension: i32,
) {
    let now = chrono::Utc::now;

    // --- Phase 1: discovery (non-fatal on failure). ---
    progress.set_phase(Phase::Discovery, now());
    let strategy = detect_strategy(&fetcher, &request.url).await;
    progress.log(format!("discovery strategy: {strategy:?}"), now());

    // --- Phase 2: crawl. ---
    progress.set_phase(Phase::Crawl, now());
    let mut docs = Vec::new();
    match strategy {
        Strategy::Sitemap(urls) => {
            let total = urls.len().max(1);
            for (i, url) in urls.into_iter().enumerate() {
                match fetcher.fetch(&url).await {
                    Ok(page) if page.media_type == MediaType::Html => {
                        let body = String::from_utf8_lossy(&page.body).into_owned();
                        let (markdown, _links) = archon_crawler::html::to_markdown(&body);
                        if markdown.is_empty() {
                            progress.with_counters(|c| c.pages_failed += 1, now());
                        } else {
                            progress.with_counters(|c| c.pages_fetched += 1, now());
                            docs.push(FetchedDoc { url, markdown });
                        }
                    }
                    Ok(page) => match archon_crawler::extract_text(page.media_type, &page.body) {
                        Ok(markdown) if !markdown.is_empty() => {
                            progress.with_counters(|c| c.pages_fetched += 1, now());
                            docs.push(FetchedDoc { url, markdown });
                        }
                        Ok(_) => progress.with_counters(|c| c.pages_failed += 1, now()),
                        Err(e) => {
                            progress.log(format!("extraction failed for {url}: {e}"), now());
                            progress.with_counters(|c| c.pages_failed += 1, now());
                        }
                    },
                    Err(e) => {
                        progress.log(format!("fetch failed for {url}: {e}"), now());
                        progress.with_counters(|c| c.pages_failed += 1, now());
                    }
                }
                progress.set_phase_fraction((i + 1) as f64 / total as f64, now());
                if token.is_cancelled() {
                    break;
                }
            }
        }
        Strategy::LlmsTxt { source_url, body } => {
            let sections = split_sections(&body);
            let total = sections.len().max(1);
            for (i, section) in sections.into_iter().enumerate() {
                let url = format!("{source_url}#{}", section.title);
                progress.with_counters(|c| c.pages_fetched += 1, now());
                docs.push(FetchedDoc { url, markdown: section.body });
                progress.set_phase_fraction((i + 1) as f64 / total as f64, now());
                if token.is_cancelled() {
                    break;
                }
            }
        }
        Strategy::Recursive => {
            let mut stream = crawl(fetcher.clone(), robots.clone(), request.url.clone(), request.max_depth);
            while let Some(result) = stream.next().await {
                if token.is_cancelled() {
                    break;
                }
                match result {
                    Ok(CrawlResult { url, markdown, .. }) => {
                        if markdown.is_empty() {
                            progress.with_counters(|c| c.pages_failed += 1, now());
                            continue;
                        }
                        progress.with_counters(|c| c.pages_fetched += 1, now());
                        docs.push(FetchedDoc { url, markdown });
                    }
                    Err(e) => {
                        progress.log(format!("crawl error: {e}"), now());
                        progress.with_counters(|c| c.pages_failed += 1, now());
                    }
                }
            }
        }
    }

    if docs.is_empty() {
        progress.log("no pages were successfully fetched; aborting with no writes".to_string(), now());
        progress.finish(TerminalStatus::Failed, Some(IngestError::EmptyResult.to_string()), now());
        return;
    }

    if token.is_cancelled() {
        progress.finish(TerminalStatus::Cancelled, None, now());
        return;
    }

    // Source is only created once we know we have content to write
    // (spec §4.6: empty-result performs no writes).
    let source_id = SourceId::new();
    let source = Source {
        id: source_id,
        display_name: request.url.clone(),
        origin: request.url.clone(),
        knowledge_type: request.knowledge_type,
        tags: request.tags.clone(),
        extract_code_examples: request.extract_code_examples,
        project_id: request.project_id,
        is_project_private: request.is_project_private && !request.send_to_kb,
        promoted_at: None,
        promoted_by: None,
        created_at: Timestamp::now(),
        updated_at: Timestamp::now(),
    };
    if let Err(e) = db_sources::put_source(&pool, &source).await {
        progress.finish(TerminalStatus::Failed, Some(e.to_string()), now());
        return;
    }

    run_chunk_store_extract_finalize(
        pool, gateway, embedding_semaphore, progress, token, docs, source_id, request.extract_code_examples,
        request.send_to_kb, request.is_project_private, subject, model, dimension,
    )
    .await;
}

#[allow(clippy::too_many_arguments)]
async fn run_upload_pipeline(
    pool: DbPool,
    gateway: Arc<ProviderGateway>,
    embedding_semaphore: Arc<Semaphore>,
    progress: Arc<Progress>,
    token: CancellationToken,
    request: UploadRequest,
    text: String,
    subject: SubjectId,
    model: &str,
    dimension: i32,
) {
    let now = chrono::Utc::now;
    progress.set_phase(Phase::Discovery, now());
    progress.set_phase(Phase::Crawl, now());
    progress.with_counters(|c| c.pages_fetched += 1, now());
    let docs = vec![FetchedDoc {
        url: request.display_name.clone(),
        markdown: text,
    }];

    let source_id = SourceId::new();
    let source = Source {
        id: source_id,
        display_name: request.display_name.clone(),
        origin: request.display_name.clone(),
        knowledge_type: request.knowledge_type,
        tags: request.tags.clone(),
        extract_code_examples: request.extract_code_examples,
        project_id: request.project_id,
        is_project_private: request.is_project_private && !request.send_to_kb,
        promoted_at: None,
        promoted_by: None,
        created_at: Timestamp::now(),
        updated_at: Timestamp::now(),
    };
    if let Err(e) = db_sources::put_source(&pool, &source).await {
        progress.finish(TerminalStatus::Failed, Some(e.to_string()), now());
        return;
    }

    run_chunk_store_extract_finalize(
        pool, gateway, embedding_semaphore, progress, token, docs, source_id, request.extract_code_examples,
        request.send_to_kb, request.is_project_private, subject, model, dimension,
    )
    .await;
}

#[allow(clippy::too_many_arguments)]
async fn run_chunk_store_extract_finalize(
    pool: DbPool,
    gateway: Arc<ProviderGateway>,
    embedding_semaphore: Arc<Semaphore>,
    progress: Arc<Progress>,
    token: CancellationToken,
    docs: Vec<FetchedDoc>,
    source_id: SourceId,
    extract_code_examples: bool,
    send_to_kb: bool,
    is_project_private: bool,
    subject: SubjectId,
    model: &str,
    dimension: i32,
) {
    let now = chrono::Utc::now;

    // --- Phase 3: chunk & store. ---
    progress.set_phase(Phase::ChunkAndStore, now());
    let chunk_config = ChunkerConfig::crawl();
    let total_docs = docs.len().max(1);
    let mut chunks_since_cancel_check: u64 = 0;
    let mut cancelled = false;

    for (doc_index, doc) in docs.iter().enumerate() {
        if token.is_cancelled() {
            cancelled = true;
            break;
        }
        let chunks = chunk_text(&doc.markdown, &chunk_config);
        let inserts: Vec<db_sources::PageInsert> = chunks
            .iter()
            .map(|c| db_sources::PageInsert {
                source_id,
                url: doc.url.clone(),
                chunk_number: c.chunk_number,
                content: c.content.clone(),
                metadata: serde_json::from_value(serde_json::json!({
                    "token_count": c.token_count,
                    "start_position": c.start_position,
                    "end_position": c.end_position,
                }))
                .unwrap_or_default(),
            })
            .collect();

        let results = match db_sources::insert_pages(&pool, inserts).await {
            Ok(r) => r,
            Err(e) => {
                progress.log(format!("store failed for {}: {e}", doc.url), now());
                continue;
            }
        };

        for (chunk, result) in chunks.iter().zip(results.iter()) {
            progress.with_counters(|c| {
                c.chunks_stored += 1;
                c.total_words += chunk.content.split_whitespace().count() as u64;
            }, now());

            if result.re_embed {
                let _permit = embedding_semaphore.acquire().await.expect("semaphore never closed");
                match gateway.embed_one(&chunk.content).await {
                    Ok(vector) => {
                        if let Err(e) =
                            archon_db::sources::put_page_embedding(&pool, result.page_id, model, dimension, &vector)
                                .await
                        {
                            progress.log(format!("embed store failed: {e}"), now());
                        }
                    }
                    Err(e) => progress.log(format!("embed failed: {e}"), now()),
                }
            }

            chunks_since_cancel_check += 1;
            if chunks_since_cancel_check >= CANCEL_CHECK_EVERY_N_CHUNKS {
                chunks_since_cancel_check = 0;
                if token.is_cancelled() {
                    cancelled = true;
                    break;
                }
            }
        }
        progress.set_phase_fraction((doc_index + 1) as f64 / total_docs as f64, now());
        if cancelled {
            break;
        }
    }

    if cancelled {
        progress.finish(TerminalStatus::Cancelled, None, now());
        return;
    }

    let chunks_stored = progress.snapshot().counters.chunks_stored;

    // --- Phase 4: code extraction (only if requested and something was stored). ---
    progress.set_phase(Phase::CodeExtraction, now());
    if extract_code_examples && chunks_stored > 0 {
        let mut extractions_since_check: u64 = 0;
        'docs: for doc in &docs {
            let blocks = extract_fenced_code(&doc.markdown);
            for block in blocks {
                if token.is_cancelled() {
                    cancelled = true;
                    break 'docs;
                }
                let summary = match gateway
                    .chat(
                        &[ChatMessage {
                            role: "user".to_string(),
                            content: format!(
                                "Summarize what this {} code example does in one sentence:\n\n{}",
                                block.language.as_deref().unwrap_or("code"),
                                block.content
                            ),
                        }],
                        &ChatOptions {
                            model: "gpt-4o-mini".to_string(),
                            temperature: Some(0.0),
                            max_tokens: Some(80),
                        },
                    )
                    .await
                {
                    Ok(completion) => completion.content,
                    Err(e) => {
                        progress.log(format!("summary generation failed: {e}"), now());
                        continue;
                    }
                };

                let example_id = archon_protocol::EmbeddingId::new();
                let example = CodeExample {
                    id: example_id,
                    source_id,
                    language: block.language.clone(),
                    content: block.content.clone(),
                    summary: summary.clone(),
                };
                if let Err(e) = db_sources::put_code_example(&pool, &example).await {
                    progress.log(format!("code example store failed: {e}"), now());
                    continue;
                }

                let _permit = embedding_semaphore.acquire().await.expect("semaphore never closed");
                match gateway.embed_one(&summary).await {
                    Ok(vector) => {
                        if let Err(e) = db_sources::put_code_example_embedding(
                            &pool,
                            example_id.as_uuid(),
                            model,
                            dimension,
                            db_sources::CodeEmbeddingKind::Summary,
                            &vector,
                        )
                        .await
                        {
                            progress.log(format!("code example embed store failed: {e}"), now());
                        }
                    }
                    Err(e) => progress.log(format!("code example embed failed: {e}"), now()),
                }
                match gateway.embed_one(&block.content).await {
                    Ok(vector) => {
                        if let Err(e) = db_sources::put_code_example_embedding(
                            &pool,
                            example_id.as_uuid(),
                            model,
                            dimension,
                            db_sources::CodeEmbeddingKind::Content,
                            &vector,
                        )
                        .await
                        {
                            progress.log(format!("code example content embed store failed: {e}"), now());
                        }
                    }
                    Err(e) => progress.log(format!("code example content embed failed: {e}"), now()),
                }

                progress.with_counters(|c| c.code_examples += 1, now());
                extractions_since_check += 1;
                if extractions_since_check >= CANCEL_CHECK_EVERY_N_EXTRACTIONS {
                    extractions_since_check = 0;
                    if token.is_cancelled() {
                        cancelled = true;
                        break 'docs;
                    }
                }
            }
        }
    }

    if cancelled {
        progress.finish(TerminalStatus::Cancelled, None, now());
        return;
    }

    // --- Phase 5: finalize. ---
    progress.set_phase(Phase::Finalize, now());
    let finalize_result = finalize_source(&pool, source_id, send_to_kb, is_project_private, subject).await;
    if let Err(e) = finalize_result {
        progress.finish(TerminalStatus::Failed, Some(e.to_string()), now());
        return;
    }
    progress.set_phase_fraction(1.0, now());
    progress.finish(TerminalStatus::Completed, None, now());
}

async fn finalize_source(
    pool: &DbPool,
    source_id: SourceId,
    send_to_kb: bool,
    is_project_private: bool,
    subject: SubjectId,
) -> Result<(), IngestError> {
    let mut source = db_sources::get_source(pool, source_id).await?;
    if send_to_kb {
        source.promoted_at = Some(Timestamp::now());
        source.promoted_by = Some(subject);
        source.is_project_private = false;
    } else if is_project_private {
        source.is_project_private = true;
    }
    source.updated_at = Timestamp::now();
    db_sources::put_source(pool, &source).await?;
    Ok(())
}
