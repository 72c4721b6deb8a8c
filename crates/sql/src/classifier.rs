//! Statement classification
//!
//! Routing is decided from the raw text before any tokenizing: reads go to
//! the execute endpoint, writes to the mutation parser, schema changes to the
//! batched DDL path, and a handful of custom commands get special handling.

/// How a statement is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Read,
    Write,
    SchemaChange,
    Custom,
}

/// Classify a statement. Rules are checked in order and the first match wins,
/// so e.g. "CREATE TABLE" resolves as a schema change before the write
/// heuristic could see it.
///
/// The DATABASE/TABLE/INDEX and INSERT/UPDATE/REPLACE/DELETE checks are
/// case-sensitive substring matches, not token-bound: a quoted identifier
/// containing one of these words will match. This is preserved behavior.
pub fn classify(sql: &str) -> QueryKind {
    let upper = sql.to_uppercase();
    if upper.starts_with("SHOW DDL") {
        return QueryKind::Custom;
    }
    if upper.starts_with("START TRANSACTION") {
        return QueryKind::Custom;
    }
    if upper.starts_with("SHOW INDEX") {
        return QueryKind::Custom;
    }

    if sql
        .split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("SELECT"))
    {
        return QueryKind::Read;
    }

    for keyword in ["DATABASE", "TABLE", "INDEX"] {
        if sql.contains(keyword) {
            return QueryKind::SchemaChange;
        }
    }

    for keyword in ["INSERT", "UPDATE", "REPLACE", "DELETE"] {
        if sql.contains(keyword) {
            return QueryKind::Write;
        }
    }

    QueryKind::Read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_prefixes_win_regardless_of_trailing_content() {
        assert_eq!(classify("SHOW DDL"), QueryKind::Custom);
        assert_eq!(classify("show ddl my_table"), QueryKind::Custom);
        assert_eq!(classify("SHOW DDL WHERE INSERT TABLE"), QueryKind::Custom);
        assert_eq!(classify("START TRANSACTION"), QueryKind::Custom);
        assert_eq!(classify("start transaction readonly"), QueryKind::Custom);
        assert_eq!(classify("SHOW INDEX FROM users"), QueryKind::Custom);
    }

    #[test]
    fn test_select_is_read() {
        assert_eq!(classify("SELECT * FROM users"), QueryKind::Read);
        assert_eq!(classify("  select 1"), QueryKind::Read);
    }

    #[test]
    fn test_schema_change_beats_write() {
        // "CREATE TABLE users (...)" must resolve via the schema-change rule
        // even though an INSERT-ish word could appear later in the text.
        assert_eq!(classify("CREATE TABLE users (id INT64)"), QueryKind::SchemaChange);
        assert_eq!(classify("DROP INDEX idx_users"), QueryKind::SchemaChange);
        assert_eq!(classify("CREATE DATABASE test"), QueryKind::SchemaChange);
    }

    #[test]
    fn test_writes() {
        assert_eq!(classify("INSERT INTO t (a) VALUES (@a)"), QueryKind::Write);
        assert_eq!(classify("UPDATE t SET a = @a"), QueryKind::Write);
        assert_eq!(classify("DELETE FROM t WHERE a = @a"), QueryKind::Write);
        assert_eq!(classify("REPLACE INTO t (a) VALUES (@a)"), QueryKind::Write);
    }

    #[test]
    fn test_substring_matching_is_case_sensitive() {
        // Lowercase method words fall through to the default.
        assert_eq!(classify("insert into t (a) values (@a)"), QueryKind::Read);
    }

    #[test]
    fn test_default_is_read() {
        assert_eq!(classify("WITH cte AS (x) something"), QueryKind::Read);
        assert_eq!(classify(""), QueryKind::Read);
    }
}
