//! Local credentials file store
mod document;
mod file;

pub use document::{ACCESS_KEY_ID, CredentialsDocument, SECRET_ACCESS_KEY};
pub use file::CredentialsFile;
