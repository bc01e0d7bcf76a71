pub mod credentials;
pub mod database;

pub use credentials::CredentialStore;
