//! AttemptGuard - 尝试次数守卫
//!
//! Bounds the re-encode loop of a single job.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptError {
    pub current: u32,
    pub max: u32,
    pub context: String,
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attempt limit exceeded: {}/{} in {}",
            self.current, self.max, self.context
        )
    }
}

impl std::error::Error for AttemptError {}

#[derive(Debug, Clone)]
pub struct AttemptGuard {
    current: u32,
    max: u32,
    context: String,
}

impl AttemptGuard {
    pub fn new(max: u32, context: &str) -> Self {
        Self {
            current: 0,
            max,
            context: context.to_string(),
        }
    }

    /// Claims the next attempt; 1-based on success.
    pub fn increment(&mut self) -> Result<u32, AttemptError> {
        self.current += 1;
        if self.current > self.max {
            Err(AttemptError {
                current: self.current,
                max: self.max,
                context: self.context.clone(),
            })
        } else {
            Ok(self.current)
        }
    }

    #[inline]
    pub fn max(&self) -> u32 {
        self.max
    }
}
