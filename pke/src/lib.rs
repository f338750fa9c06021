pub mod cancel;
pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use cancel::CancellationToken;
pub use config::{EncodingMode, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use filters::ExtensionFilter;
pub use results::{FileHits, SearchHit, SearchOutcome, SearchSummary};
pub use search::{run, spawn, stream, SearchEvent, SearchHandle, SearchRequest};
