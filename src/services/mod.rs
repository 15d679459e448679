//! Coordinator services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! `analysis` owns the session state machine and talks to the outside
//! world only through the `settings`, `pages` and LLM seams, so route
//! handlers stay focused on protocol translation.

pub mod analysis;
pub mod pages;
pub mod prompt;
pub mod settings;
