pub mod documents;
pub mod reporting;
pub mod screening;

pub use documents::DocumentBlob;
