//! OData collection responses and the paginated fetch engine

pub mod paging;
pub mod result;

pub use paging::{PageState, PagedResult, fetch_all, fetch_page, process_with_pages};
pub use result::QueryResponse;
