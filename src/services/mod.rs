// src/services/mod.rs

pub mod analytics;
pub mod delivery;
pub mod import;
pub mod scoring;
