//! Runtime — driver boot and the stdin-to-stdout decode loop.

pub mod boot;
pub mod run;
