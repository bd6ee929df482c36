//! Core types for gitmeter

pub mod entity;
pub mod page;
pub mod runner;
pub mod usage;
