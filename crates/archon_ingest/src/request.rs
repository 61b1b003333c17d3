//! Request shapes for the two entry points into the pipeline
//! (spec §4.6: `start_crawl`/`start_upload`).

use std::collections::BTreeSet;

use archon_db::model::KnowledgeType;
use archon_protocol::{ProjectId, SubjectId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlRequest {
    pub url: String,
    pub knowledge_type: KnowledgeType,
    pub tags: BTreeSet<String>,
    pub max_depth: u32,
    pub extract_code_examples: bool,
    pub project_id: Option<ProjectId>,
    pub is_project_private: bool,
    pub send_to_kb: bool,
}

impl Default for CrawlRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            knowledge_type: KnowledgeType::Technical,
            tags: BTreeSet::new(),
            max_depth: 1,
            extract_code_examples: false,
            project_id: None,
            is_project_private: false,
            send_to_kb: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadRequest {
    pub display_name: String,
    pub knowledge_type: KnowledgeType,
    pub tags: BTreeSet<String>,
    pub extract_code_examples: bool,
    pub project_id: Option<ProjectId>,
    pub is_project_private: bool,
    pub send_to_kb: bool,
}

impl Default for UploadRequest {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            knowledge_type: KnowledgeType::Technical,
            tags: BTreeSet::new(),
            extract_code_examples: false,
            project_id: None,
            is_project_private: false,
            send_to_kb: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IngestSubject(pub SubjectId);
