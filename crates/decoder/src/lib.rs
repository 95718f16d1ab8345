// HAProxy HTTP log decoder.

// Decoding core
pub mod parser;

// Driver
pub mod conf;
pub mod runtime;
