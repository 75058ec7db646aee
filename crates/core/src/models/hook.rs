use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle point at which a hook fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    PreExec,
    PostExec,
    OnSuccess,
    OnFailure,
    OnRetry,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::PreExec => "pre_exec",
            HookType::PostExec => "post_exec",
            HookType::OnSuccess => "on_success",
            HookType::OnFailure => "on_failure",
            HookType::OnRetry => "on_retry",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the executor does when a hook returns an error or times out.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum HookErrorPolicy {
    /// Log and continue with the next hook.
    Ignore,
    /// Invoke the hook once more; propagate if it fails again.
    Retry,
    /// Stop running hooks and return the error.
    #[default]
    Fail,
}

/// Unrecognized names fall back to `Fail`.
impl std::str::FromStr for HookErrorPolicy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "ignore" => HookErrorPolicy::Ignore,
            "retry" => HookErrorPolicy::Retry,
            _ => HookErrorPolicy::Fail,
        })
    }
}

impl From<String> for HookErrorPolicy {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(policy) => policy,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse_defaults_to_fail() {
        assert_eq!("IGNORE".parse::<HookErrorPolicy>(), Ok(HookErrorPolicy::Ignore));
        assert_eq!("retry".parse::<HookErrorPolicy>(), Ok(HookErrorPolicy::Retry));
        assert_eq!("explode".parse::<HookErrorPolicy>(), Ok(HookErrorPolicy::Fail));
    }

    #[test]
    fn test_policy_deserialize_falls_back_to_fail() {
        let policy: HookErrorPolicy = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(policy, HookErrorPolicy::Ignore);
        let policy: HookErrorPolicy = serde_json::from_str("\"explode\"").unwrap();
        assert_eq!(policy, HookErrorPolicy::Fail);
        assert_eq!(
            serde_json::to_string(&HookErrorPolicy::Retry).unwrap(),
            "\"retry\""
        );
    }

    #[test]
    fn test_hook_type_display() {
        assert_eq!(HookType::OnRetry.to_string(), "on_retry");
    }
}
