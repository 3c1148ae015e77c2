use crate::cli::run;

pub mod cli;
mod config;
pub mod domain;
pub mod http;
mod public_endpoint;
pub mod storage;

fn main() {
    run();
}
