//! Type-Safe Wrappers Module
//!
//! ## 模块列表
//! - `file_size`: 文件大小类型安全包装 (base-10 parsing)
//! - `attempt`: 尝试次数守卫

pub mod attempt;
pub mod file_size;

pub use attempt::{AttemptError, AttemptGuard};
pub use file_size::{FileSize, SizeParseError, MIN_TARGET_BYTES};

// ============================================================================
// Property-Based Tests
// ============================================================================
