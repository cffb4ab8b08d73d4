//! Cross-module tests for ranking and session behaviour.

mod rag_ranking;
mod session;
