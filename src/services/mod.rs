pub mod index_service;
pub mod link_service;
pub mod page_store;

pub use index_service::IndexBuilder;
pub use link_service::LinkRewriter;
pub use page_store::{FileStore, PageStore};
