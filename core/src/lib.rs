pub mod aggregate;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod model;
pub mod session;
pub mod snippet;
pub mod store;

pub use aggregate::{Aggregate, AggregationController, NoPacing, Pacer, SessionReport, SleepPacer};
pub use config::{CountPolicy, SearchConfig};
pub use error::{VaultError, VaultResult};
pub use export::{Exporter, extract_query_context, preview};
pub use fetch::{
    HttpTransport, PageFetcher, PageResult, PageSource, PageStatus, RawResponse, SearchTransport,
};
pub use model::{ExportRow, Hit, MatchedLine, SearchQuery};
pub use session::{SearchOutcome, search, search_with};
pub use snippet::{BoundaryMarkers, SnippetParser};
pub use store::HitStore;
