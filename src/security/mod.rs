//! Security Module
//!
//! - Shell command safety gate (blocked-pattern rules)
//! - File operation permission grants

pub mod command_gate;
pub mod permissions;

pub use command_gate::{block_rules, find_blocking_rule, is_blocked, BlockRule};
pub use permissions::{
    FileOperation, GrantScope, PermissionError, PermissionGrant, PermissionKey, PermissionStorage,
    PermissionStore, SledPermissionStorage,
};
