pub mod admin;
pub mod auth;
pub mod documents;
pub mod health;
pub mod knowledge;
pub mod knowledge_links;
pub mod mcp_sessions;
pub mod projects;
pub mod reports;
pub mod sprints;
pub mod tasks;
