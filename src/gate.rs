//! Read-only enforcement for generated statements.
//!
//! The check is a textual prefix test, not a SQL parser: a statement is
//! allowed when, trimmed and upper-cased, it starts with `SELECT`. It does
//! not look past the prefix, so `SELECT 1; DROP TABLE t` passes here and
//! relies on the driver refusing chained statements.

/// Message shown when a statement is refused.
pub const BLOCKED_MESSAGE: &str = "ACTION BLOCKED! Only SELECT queries are permitted.";

/// Outcome of [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked,
}

impl Verdict {
    pub fn is_allowed(self) -> bool {
        self == Verdict::Allowed
    }
}

/// Classify a cleaned statement.
pub fn check(statement: &str) -> Verdict {
    if statement.trim().to_uppercase().starts_with("SELECT") {
        Verdict::Allowed
    } else {
        Verdict::Blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_allowed() {
        assert_eq!(check("SELECT id FROM users"), Verdict::Allowed);
        assert_eq!(check("  select * from t  "), Verdict::Allowed);
        assert_eq!(check("\nSeLeCt 1"), Verdict::Allowed);
    }

    #[test]
    fn test_writes_blocked() {
        for sql in [
            "DELETE FROM users;",
            "insert into t values (1)",
            "UPDATE t SET a = 1",
            "DROP TABLE users",
            "CREATE TABLE x (id int)",
            "WITH x AS (SELECT 1) SELECT * FROM x",
            "-- SELECT\nDELETE FROM t",
            "",
            "   ",
        ] {
            assert_eq!(check(sql), Verdict::Blocked, "{sql:?}");
        }
    }

    #[test]
    fn test_prefix_only() {
        // Known limitation: a trailing statement after a SELECT is not inspected.
        assert!(check("SELECT 1; DELETE FROM users").is_allowed());
        assert!(check("SELECTED_ROWS").is_allowed());
    }
}
