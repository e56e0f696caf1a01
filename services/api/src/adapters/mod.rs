pub mod completion_llm;
pub mod db;
pub mod pdf;

pub use completion_llm::OpenAiCompletionAdapter;
pub use db::DbAdapter;
pub use pdf::PdfExtractAdapter;
