// Library interface for the newsbot client
// This allows tests and other front-ends to import modules

pub mod api;
pub mod envelope;
pub mod error;
pub mod models;
pub mod navigation;
pub mod pages;
pub mod session;
pub mod storage;
pub mod transport;

pub use error::ApiError;
pub use session::{Session, SessionStore};
pub use transport::ApiClient;
