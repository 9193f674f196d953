//! Batch protocol: multipart `$batch` requests, response parsing and the
//! adaptive chunk-size ceiling

pub mod builder;
pub mod ceiling;
pub mod parser;

pub use builder::{BatchBuilder, BatchRequest, PartMethod, RequestPart};
pub use ceiling::BatchCeiling;
pub use parser::{BatchResponse, BatchResponseItem, BatchResponseParser, PartResult};
