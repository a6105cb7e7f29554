//! Command handlers

pub mod album;
pub mod bean;
pub mod config;
pub mod shelf;
pub mod status;
pub mod transfer;
