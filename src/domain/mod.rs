//! Pure bridge logic: sample and message types, encoding, distance, commands
//! and settings. Nothing in here performs I/O apart from the settings file.

pub mod commands;
pub mod encoder;
pub mod geo;
pub mod models;
pub mod settings;
