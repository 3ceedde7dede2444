//! Per-repository approval policy, read from the `.lgtm` file.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LgtmError;

pub const DEFAULT_APPROVALS: u32 = 2;
pub const DEFAULT_PATTERN: &str = "(?i)LGTM";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub approvals: u32,
    pub pattern: String,
    pub self_approval_off: bool,
    pub ignore_maintainers_file: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            approvals: DEFAULT_APPROVALS,
            pattern: DEFAULT_PATTERN.to_string(),
            self_approval_off: false,
            ignore_maintainers_file: false,
        }
    }
}

/// Keys as they appear in the file; anything missing falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    approvals: Option<i64>,
    pattern: Option<String>,
    self_approval_off: Option<bool>,
    ignore_maintainers_file: Option<bool>,
}

impl Policy {
    /// Build the service-wide default policy from configured values.
    pub fn with_defaults(approvals: u32, pattern: &str) -> Self {
        Self {
            approvals: approvals.max(1),
            pattern: pattern.to_string(),
            ..Self::default()
        }
    }

    /// Parse `.lgtm` contents on top of `defaults`.
    ///
    /// Empty contents yield the defaults unchanged. Contents that are not
    /// valid TOML, or carry wrongly typed keys, are a configuration error.
    pub fn parse(data: &[u8], defaults: &Policy) -> Result<Policy, LgtmError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| LgtmError::ConfigError(format!("Error parsing .lgtm file. {}", e)))?;

        if text.trim().is_empty() {
            return Ok(defaults.clone());
        }

        let file: PolicyFile = toml::from_str(text)
            .map_err(|e| LgtmError::ConfigError(format!("Error parsing .lgtm file. {}", e)))?;

        let approvals = match file.approvals {
            None => defaults.approvals,
            Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
            Some(n) => {
                warn!(
                    "Ignoring approvals = {} in .lgtm file, using default of {}",
                    n, defaults.approvals
                );
                defaults.approvals
            }
        };

        let pattern = match file.pattern {
            None => defaults.pattern.clone(),
            Some(p) if !p.trim().is_empty() => p,
            Some(_) => {
                warn!(
                    "Ignoring empty pattern in .lgtm file, using default of {:?}",
                    defaults.pattern
                );
                defaults.pattern.clone()
            }
        };

        Ok(Policy {
            approvals,
            pattern,
            self_approval_off: file.self_approval_off.unwrap_or(defaults.self_approval_off),
            ignore_maintainers_file: file
                .ignore_maintainers_file
                .unwrap_or(defaults.ignore_maintainers_file),
        })
    }
}
