pub mod deck;
pub mod id;
pub mod mixtape;
pub mod resolve;
pub mod tracklist;
