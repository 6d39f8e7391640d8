//! Sensormesh Core - Domain models, error taxonomy, and configuration
//!
//! This crate holds the in-memory representation of a sensor network
//! (registry, observations, infrastructure layers, prediction meshes) and the
//! fixed-width feature tables the encoders produce from it.

pub mod config;
pub mod error;
pub mod models;
pub mod stats;

pub use error::{Result, SensormeshError};
