pub mod client_rate_limit;
pub mod http;

use std::{num::NonZeroU32, time::Duration};

use crate::error::{Error, ModelResult};
use error_stack::report;
use serde::de::DeserializeOwned;

/// Outbound request quota for an upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitWindow {
    PerSecond(NonZeroU32),
    PerMinute(NonZeroU32),
    Custom { period: Duration },
}

impl RateLimitWindow {
    /// - `<n>s` → PerSecond(n)
    /// - `<n>m` → PerMinute(n)
    /// - `<n>h` → one request every n hours
    /// - `<n>d` → one request every n days
    pub fn from_string(s: &str) -> Option<Self> {
        let s = s.trim();
        let unit = s.chars().last()?;
        let number: u32 = s[..s.len() - unit.len_utf8()].parse().ok()?;
        let nonzero = NonZeroU32::new(number)?;

        match unit {
            's' => Some(RateLimitWindow::PerSecond(nonzero)),
            'm' => Some(RateLimitWindow::PerMinute(nonzero)),
            'h' => Some(RateLimitWindow::Custom {
                period: Duration::from_secs(u64::from(number) * 3600),
            }),
            'd' => Some(RateLimitWindow::Custom {
                period: Duration::from_secs(u64::from(number) * 86400),
            }),
            _ => None,
        }
    }
}

/// Limits applied to untrusted JSON request bodies before deserializing.
#[derive(Debug, Clone, Copy)]
pub struct JsonBodyLimits {
    pub max_body_size: usize,
    pub max_depth: usize,
}

impl Default for JsonBodyLimits {
    fn default() -> Self {
        Self {
            max_body_size: 16 * 1024,
            max_depth: 8,
        }
    }
}

impl JsonBodyLimits {
    pub fn parse<T: DeserializeOwned>(&self, data: &[u8]) -> ModelResult<T> {
        if data.len() > self.max_body_size {
            return Err(report!(Error::TooLargeRequestBody(format!(
                "{} bytes (max: {})",
                data.len(),
                self.max_body_size
            ))));
        }

        json_depth(data, self.max_depth)?;

        serde_json::from_slice(data)
            .map_err(|e| report!(Error::SerdeDeserialize(format!("JSON parsing error: {e}"))))
    }
}

/// Scans bracket nesting without building a value, failing as soon as
/// `max_depth` is exceeded.
fn json_depth(data: &[u8], max_depth: usize) -> ModelResult<usize> {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (position, &byte) in data.iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
                if deepest > max_depth {
                    return Err(report!(Error::SerdeDeserialize(format!(
                        "JSON depth limit exceeded at position {position}: max {max_depth}"
                    ))));
                }
            }
            b'}' | b']' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    report!(Error::SerdeDeserialize(format!(
                        "Unmatched closing bracket at position {position}"
                    )))
                })?;
            }
            _ => {}
        }
    }

    if in_string {
        return Err(report!(Error::SerdeDeserialize(
            "Unterminated string literal".to_string()
        )));
    }
    if depth != 0 {
        return Err(report!(Error::SerdeDeserialize(format!(
            "{depth} unmatched opening brackets"
        ))));
    }

    Ok(deepest)
}
