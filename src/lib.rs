//! Taskdeck library
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod imaging;
pub mod service;
pub mod terminal;
pub mod types;
pub mod web;
