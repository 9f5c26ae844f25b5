//! FileSize Type-Safe Wrapper
//!
//! 目标文件大小的类型安全包装。Parsing follows base-10 units ("8MB" is
//! 8,000,000 bytes); the `iB` suffixes select base-2.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Smallest target size accepted from the user.
pub const MIN_TARGET_BYTES: u64 = 1000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("Size is empty")]
    Empty,

    #[error("Invalid size number: {0:?}")]
    InvalidNumber(String),

    #[error("Unknown size unit: {0:?}")]
    UnknownUnit(String),

    #[error("Size must be at least {MIN_TARGET_BYTES} bytes (got {0})")]
    TooSmall(u64),
}

// ============================================================================
// FileSize Newtype
// ============================================================================

/// 文件大小（字节）
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::FileSize;
///
/// let size: FileSize = "8MB".parse().unwrap();
/// assert_eq!(size.bytes(), 8_000_000);
/// assert_eq!(size.display(), "8.00 MB");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSize(u64);

impl FileSize {
    pub const ZERO: FileSize = FileSize(0);

    pub const KB: u64 = 1000;
    pub const MB: u64 = 1000 * 1000;
    pub const GB: u64 = 1000 * 1000 * 1000;
    pub const TB: u64 = 1000 * 1000 * 1000 * 1000;

    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// Size in bits, as used by the bitrate arithmetic.
    #[inline]
    pub fn bits(&self) -> f64 {
        self.0 as f64 * 8.0
    }

    /// 解析用户输入的大小: "8MB", "8 MB", "16.5mb", "750000", "1.5GiB"
    ///
    /// Rejects anything below [`MIN_TARGET_BYTES`].
    pub fn parse(input: &str) -> Result<Self, SizeParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SizeParseError::Empty);
        }

        let split_at = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split_at);

        let value: f64 = number
            .parse()
            .map_err(|_| SizeParseError::InvalidNumber(number.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(SizeParseError::InvalidNumber(number.to_string()));
        }

        let multiplier = unit_multiplier(unit.trim())?;
        let bytes = (value * multiplier as f64).round() as u64;
        if bytes < MIN_TARGET_BYTES {
            return Err(SizeParseError::TooSmall(bytes));
        }
        Ok(Self(bytes))
    }

    /// 格式化显示（自动选择单位, base-10）
    pub fn display(&self) -> String {
        if self.0 >= Self::GB {
            format!("{:.2} GB", self.0 as f64 / Self::GB as f64)
        } else if self.0 >= Self::MB {
            format!("{:.2} MB", self.0 as f64 / Self::MB as f64)
        } else if self.0 >= Self::KB {
            format!("{:.2} KB", self.0 as f64 / Self::KB as f64)
        } else {
            format!("{} B", self.0)
        }
    }
}

fn unit_multiplier(unit: &str) -> Result<u64, SizeParseError> {
    let lower = unit.to_ascii_lowercase();
    let multiplier = match lower.as_str() {
        "" | "b" => 1,
        "k" | "kb" => FileSize::KB,
        "m" | "mb" => FileSize::MB,
        "g" | "gb" => FileSize::GB,
        "t" | "tb" => FileSize::TB,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        "tib" => 1 << 40,
        _ => return Err(SizeParseError::UnknownUnit(unit.to_string())),
    };
    Ok(multiplier)
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({} = {})", self.0, self.display())
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for FileSize {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Default for FileSize {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        Self::new(bytes)
    }
}

impl From<FileSize> for u64 {
    fn from(size: FileSize) -> Self {
        size.0
    }
}

// ============================================================================
// Tests
// ============================================================================
