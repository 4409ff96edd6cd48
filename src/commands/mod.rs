//! Command implementations for the asl-extras CLI

pub mod install;
