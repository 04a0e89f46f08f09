pub mod answer;
pub mod ingest;
pub mod notify;
pub mod search;
pub mod tagging;

pub use answer::{AnswerRequest, AnswerService};
pub use ingest::{IngestOutcome, IngestService};
pub use notify::{ImportReportItem, NotifyService};
pub use search::SearchService;
pub use tagging::TaggingService;
