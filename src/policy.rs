//! Access Policy Module
//!
//! Static per-bucket operation permissions, loaded once at startup.

use std::collections::HashMap;
use std::str::FromStr;

use axum::http::Method;
use tracing::warn;

// == Permission ==
/// Operation class a bucket is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    All,
    None,
}

impl Permission {
    /// Returns whether this permission admits `operation`.
    pub fn allows(self, operation: Operation) -> bool {
        match (self, operation) {
            (Permission::All, _) => true,
            (Permission::Read, Operation::Read) => true,
            (Permission::Write, Operation::Write) => true,
            _ => false,
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Permission::Read),
            "write" => Ok(Permission::Write),
            "all" => Ok(Permission::All),
            "none" => Ok(Permission::None),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

// == Operation ==
/// Operation class of an HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    /// Anything else; only `all` admits it
    Other,
}

impl Operation {
    pub fn from_method(method: &Method) -> Self {
        if method == Method::GET || method == Method::HEAD {
            Operation::Read
        } else if method == Method::PUT || method == Method::DELETE {
            Operation::Write
        } else {
            Operation::Other
        }
    }
}

// == Access Policy ==
/// Bucket name to permission lookup.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    buckets: HashMap<String, Permission>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant, replacing any previous permission for `bucket`.
    pub fn with_bucket(mut self, bucket: impl Into<String>, permission: Permission) -> Self {
        self.buckets.insert(bucket.into(), permission);
        self
    }

    // == Parse ==
    /// Parses `bucket:permission` pairs separated by commas.
    ///
    /// Malformed pairs are skipped with a warning.
    pub fn parse(list: &str) -> Self {
        let mut policy = Self::new();

        for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let parsed = item
                .split_once(':')
                .filter(|(bucket, _)| !bucket.trim().is_empty())
                .ok_or_else(|| "expected bucket:permission".to_string())
                .and_then(|(bucket, permission)| Ok((bucket.trim(), permission.parse::<Permission>()?)));

            match parsed {
                Ok((bucket, permission)) => {
                    policy.buckets.insert(bucket.to_string(), permission);
                }
                Err(reason) => warn!(item, reason = %reason, "ignoring bucket policy entry"),
            }
        }

        policy
    }

    pub fn permission(&self, bucket: &str) -> Option<Permission> {
        self.buckets.get(bucket).copied()
    }

    // == Is Allowed ==
    /// Unconfigured buckets allow nothing.
    pub fn is_allowed(&self, bucket: &str, method: &Method) -> bool {
        self.permission(bucket)
            .is_some_and(|permission| permission.allows(Operation::from_method(method)))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
