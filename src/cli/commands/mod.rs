pub mod blast;
pub mod config;
pub mod remote;
pub mod search;
