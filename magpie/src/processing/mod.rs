pub mod chunker;
pub mod pipeline;

pub use chunker::Chunker;
pub use pipeline::EmbedPipeline;
