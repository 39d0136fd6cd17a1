//! Error types and error codes for dbpriv
//!
//! This module defines:
//! - `PrivError`: Application-specific error enum
//! - `ErrorKind`: Coarse classification used by callers to decide on retries and overrides
//! - `ErrorCode`: Structured error codes for responses

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivError {
    #[error("bk_biz_id is empty")]
    BkBizIdIsEmpty,

    #[error("account id should not be empty")]
    AccountIdNull,

    #[error("database name should not be empty")]
    DbNameNull,

    #[error("no privilege was given")]
    PrivNull,

    #[error("account rule id should not be empty")]
    AccountRuleIdNull,

    #[error("only one database is allowed")]
    OnlyOneDatabaseAllowed,

    #[error("invalid cluster type: {0}")]
    InvalidClusterType(String),

    #[error("account not existed")]
    AccountNotExisted,

    #[error("account rule existed")]
    AccountRuleExisted,

    #[error("account rule not existed")]
    AccountRuleNotExisted,

    #[error("can not grant {privileges} privileges in {cluster_type}")]
    DisallowedPrivileges {
        cluster_type: String,
        privileges: String,
    },

    #[error("account rule precheck failed:\n{message}")]
    PreflightFailed { allow_force: bool, message: String },
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed request field
    Validation,
    /// Duplicate scope, exact collision, or overlap advisory
    Conflict,
    /// Account or rule missing
    NotFound,
    /// Privilege token not allowed for the engine type
    Policy,
}

impl PrivError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrivError::BkBizIdIsEmpty
            | PrivError::AccountIdNull
            | PrivError::DbNameNull
            | PrivError::PrivNull
            | PrivError::AccountRuleIdNull
            | PrivError::OnlyOneDatabaseAllowed
            | PrivError::InvalidClusterType(_) => ErrorKind::Validation,
            PrivError::AccountRuleExisted | PrivError::PreflightFailed { .. } => {
                ErrorKind::Conflict
            }
            PrivError::AccountNotExisted | PrivError::AccountRuleNotExisted => ErrorKind::NotFound,
            PrivError::DisallowedPrivileges { .. } => ErrorKind::Policy,
        }
    }

    /// Whether an operator may force the rejected request through.
    ///
    /// Only a failed preflight can carry the permission.
    pub fn allows_force(&self) -> bool {
        matches!(
            self,
            PrivError::PreflightFailed {
                allow_force: true,
                ..
            }
        )
    }

    pub fn code(&self) -> ErrorCode<'static> {
        match self {
            PrivError::BkBizIdIsEmpty => BK_BIZ_ID_IS_EMPTY,
            PrivError::AccountIdNull => ACCOUNT_ID_NULL,
            PrivError::DbNameNull => DB_NAME_NULL,
            PrivError::PrivNull => PRIV_NULL,
            PrivError::AccountRuleIdNull => ACCOUNT_RULE_ID_NULL,
            PrivError::OnlyOneDatabaseAllowed => ONLY_ONE_DATABASE_ALLOWED,
            PrivError::InvalidClusterType(_) => CLUSTER_TYPE_INVALID,
            PrivError::AccountNotExisted => ACCOUNT_NOT_EXISTED,
            PrivError::AccountRuleExisted => ACCOUNT_RULE_EXISTED,
            PrivError::AccountRuleNotExisted => ACCOUNT_RULE_NOT_EXISTED,
            PrivError::DisallowedPrivileges { .. } => PRIV_NOT_ALLOWED,
            PrivError::PreflightFailed { .. } => ACCOUNT_RULE_PRECHECK_FAILED,
        }
    }
}

/// Whether an `anyhow` error wraps a force-overridable preflight failure
pub fn allows_force(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PrivError>()
        .is_some_and(PrivError::allows_force)
}

/// Error code structure for responses
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

// Parameter validation errors
pub const BK_BIZ_ID_IS_EMPTY: ErrorCode<'static> = ErrorCode {
    code: 51001,
    message: "bk_biz_id is empty",
};

pub const CLUSTER_TYPE_INVALID: ErrorCode<'static> = ErrorCode {
    code: 51002,
    message: "cluster type invalid",
};

pub const ACCOUNT_ID_NULL: ErrorCode<'static> = ErrorCode {
    code: 51003,
    message: "account id should not be empty",
};

pub const DB_NAME_NULL: ErrorCode<'static> = ErrorCode {
    code: 51004,
    message: "database name should not be empty",
};

pub const PRIV_NULL: ErrorCode<'static> = ErrorCode {
    code: 51005,
    message: "no privilege was given",
};

pub const ACCOUNT_RULE_ID_NULL: ErrorCode<'static> = ErrorCode {
    code: 51006,
    message: "account rule id should not be empty",
};

pub const ONLY_ONE_DATABASE_ALLOWED: ErrorCode<'static> = ErrorCode {
    code: 51007,
    message: "only one database is allowed",
};

// Existence errors
pub const ACCOUNT_NOT_EXISTED: ErrorCode<'static> = ErrorCode {
    code: 52001,
    message: "account not existed",
};

pub const ACCOUNT_RULE_EXISTED: ErrorCode<'static> = ErrorCode {
    code: 52002,
    message: "account rule existed",
};

pub const ACCOUNT_RULE_NOT_EXISTED: ErrorCode<'static> = ErrorCode {
    code: 52003,
    message: "account rule not existed",
};

pub const ACCOUNT_RULE_PRECHECK_FAILED: ErrorCode<'static> = ErrorCode {
    code: 52004,
    message: "account rule precheck failed",
};

// Policy errors
pub const PRIV_NOT_ALLOWED: ErrorCode<'static> = ErrorCode {
    code: 53001,
    message: "privilege not allowed for cluster type",
};
