//! Utility functions for dbpriv

use crate::error::PrivError;

/// Split a database-name field into individual scopes.
///
/// Names may be separated by whitespace, commas or semicolons. Order is kept
/// and duplicates are preserved so that callers can report them.
///
/// # Examples
///
/// ```
/// use dbpriv_common::split_dbnames;
///
/// let dbs = split_dbnames("db1, db2\ndb%").unwrap();
/// assert_eq!(dbs, vec!["db1", "db2", "db%"]);
/// assert!(split_dbnames(" , ").is_err());
/// ```
pub fn split_dbnames(input: &str) -> Result<Vec<String>, PrivError> {
    let dbs: Vec<String> = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if dbs.is_empty() {
        return Err(PrivError::DbNameNull);
    }
    Ok(dbs)
}
