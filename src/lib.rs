//! Feeling Indicator — scores the romantic connection in a chat page.
//!
//! Page scripts upload document snapshots, the scraper turns them into
//! messages, the coordinator sends a transcript to an OpenAI-compatible
//! analyzer, and popups follow along over a websocket.

pub mod config;
pub mod dom;
pub mod frame;
pub mod llm;
pub mod presenter;
pub mod routes;
pub mod scraper;
pub mod services;
pub mod state;
