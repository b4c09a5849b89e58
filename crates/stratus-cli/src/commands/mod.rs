pub mod config;
pub mod pool;
pub mod range;
pub mod select;
pub mod wait;
