pub mod documents;
pub mod sections;
pub mod sessions;
pub mod tokens;

pub use documents::DocumentRepository;
pub use sections::SectionRepository;
pub use sessions::SessionRepository;
pub use tokens::TokenRepository;
