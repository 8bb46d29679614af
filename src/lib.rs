//! Content view pipeline for generated blog posts: split the reference
//! appendix off the body, reformat for mobile, extract citations, prepare
//! clipboard text, and fetch content by id.

pub mod batch;
pub mod content;
pub mod pipeline;
pub mod settings;
pub mod source;
pub mod view;
