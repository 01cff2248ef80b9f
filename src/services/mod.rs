pub mod brand;
pub mod fetcher;
pub mod generator;
pub mod ideas;
pub mod openai;
pub mod persist;
pub mod provider;
pub mod rate_limiter;
pub mod render;
pub mod replicate;
pub mod storage;
