pub mod resume;

pub use resume::{ResumeStorage, StoredResume};
