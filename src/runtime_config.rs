//! # Runtime Configuration
//!
//! Environment-driven settings for the `may` coroutine runtime.
//!
//! ### `RESTDEF_STACK_SIZE`
//!
//! Stack size for connection coroutines, in decimal (`65536`) or hex
//! (`0x10000`). Handlers run on the connection coroutine, so entity methods
//! with deep call chains need a larger stack. Default: `0x10000` (64 KB).
//!
//! ```rust
//! use restdef::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.stack_size > 0);
//! ```

use std::env;

/// Default coroutine stack size (64 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load from `RESTDEF_STACK_SIZE`; unparsable or zero values use the default.
    pub fn from_env() -> Self {
        let stack_size = env::var("RESTDEF_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { stack_size }
    }

    /// Apply to the global `may` configuration.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    let parsed = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    };
    parsed.filter(|size| *size > 0)
}
