//! Browser agent: conversational task collection with an out-of-process
//! browser worker.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod session;
pub mod task;
