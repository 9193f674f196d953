//! Multi-request operations sent through the `$batch` endpoint

pub mod batch;

pub use batch::{
    BatchBuilder, BatchCeiling, BatchRequest, BatchResponse, BatchResponseItem, BatchResponseParser,
    PartResult, RequestPart,
};
