// src/models/mod.rs

pub mod analytics;
pub mod exam;
pub mod question;
pub mod result;
pub mod user;
