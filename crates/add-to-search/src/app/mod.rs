//! Application layer: parsing, planning, and applying merges.

pub mod apply;
pub mod commands;
pub mod dedup;
pub mod document;
pub mod merge;
pub mod pending;
pub mod planner;
pub mod selection;
pub mod settings;
