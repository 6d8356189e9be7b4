pub mod config;
pub mod filter;
pub mod inspect;
pub mod solve;
pub mod util;
