pub mod analytics;
pub mod db;
pub mod scoring;
pub mod settings;
pub mod validation;
