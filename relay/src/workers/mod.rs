pub mod base;
pub mod consumer;
pub mod producer;
