//! `SeaORM` entity definitions

pub mod prelude;

pub mod account_rules;
pub mod accounts;
pub mod priv_logs;
