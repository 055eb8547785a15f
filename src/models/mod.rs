pub mod cache;
pub mod lead;
