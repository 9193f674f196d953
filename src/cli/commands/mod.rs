pub mod fetch;
pub mod resolve;
pub mod token;

pub use fetch::{FetchCommands, fetch_command};
pub use resolve::{ResolveCommands, resolve_command};
pub use token::{TokenCommands, token_command};
