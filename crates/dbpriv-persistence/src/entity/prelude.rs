//! `SeaORM` entity prelude

pub use super::account_rules::Entity as AccountRules;
pub use super::accounts::Entity as Accounts;
pub use super::priv_logs::Entity as PrivLogs;
