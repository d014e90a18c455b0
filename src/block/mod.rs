//! Raw block input

pub mod reader;
