//! CLI command implementations

pub mod init;
pub mod pattern;
pub mod preview;
pub mod run;
pub mod submit;
pub mod validate;
