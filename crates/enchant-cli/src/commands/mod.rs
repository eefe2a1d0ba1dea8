//! Command handlers

pub mod catalog;
pub mod config;
pub mod enchantment;
pub mod status;
pub mod transfer;
