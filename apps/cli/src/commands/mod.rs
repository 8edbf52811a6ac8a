//! Command implementations for the tuneline CLI.

pub mod finetune;
pub mod prepare;
pub mod report;
pub mod runs;
pub mod status;
