//! Job descriptors and the reloadable job list
//!
//! - [`JobDescriptor`] - one fetch target (URL, optional body/headers/name)
//! - [`JobSource`] - anything that can produce the ordered job list for a cycle
//! - [`FileJobSource`] - JSON file on disk, re-read every cycle

mod descriptor;
mod source;

pub use descriptor::{HeadersMap, JobDescriptor, MIN_NAME_CHARS, RequestBody, url_digest};
pub use source::{FileJobSource, JobSource, JobSourceError};
