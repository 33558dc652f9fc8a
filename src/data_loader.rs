pub mod data_loader;
pub mod database_loader;

pub use data_loader::DataLoader;
pub use database_loader::DatabaseLoader;
