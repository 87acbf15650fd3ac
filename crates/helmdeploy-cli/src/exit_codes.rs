//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - goal completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Configuration error - invalid project configuration, settings or arguments
pub const CONFIG_ERROR: i32 = 2;

/// Publish error - the chart repository or registry rejected the chart
pub const PUBLISH_ERROR: i32 = 3;

/// Helm error - a helm invocation failed or timed out
pub const HELM_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
