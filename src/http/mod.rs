pub mod deck;
pub mod error;
pub mod server;
