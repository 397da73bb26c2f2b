//! Objects Module
//!
//! The object request pipeline and its transport-neutral response type.

mod pipeline;
mod response;

pub use pipeline::{ObjectPipeline, DEFAULT_CONTENT_TYPE};
pub use response::{CacheStatus, ObjectResponse};
