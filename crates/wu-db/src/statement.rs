//! Prepared statements with `:NAME` placeholders.
//!
//! MySQL only understands positional `?` markers, so the SQL is split into
//! text and parameter segments when prepared. Values are looked up by name
//! at execution time, which lets one name appear more than once.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use sqlx::mysql::MySqlArguments;
use sqlx::Arguments as _;

use crate::pool::DbError;

/// SQLSTATE reported when a statement has not failed.
pub const SUCCESS_CODE: &str = "00000";

/// Token replaced with the generated `:IN_n` list by [`Statement::with_in_list`].
pub const IN_LIST_TOKEN: &str = "[[PARAMS]]";

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

impl SqlValue {
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Int(_) => "int",
            SqlValue::Str(_) => "str",
            SqlValue::Bool(_) => "bool",
            SqlValue::Bytes(_) => "lob",
            SqlValue::Null => "null",
        }
    }

    /// The value written as a MySQL literal. Only used for diagnostics.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Str(s) => {
                format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            SqlValue::Bool(b) => u8::from(*b).to_string(),
            SqlValue::Bytes(b) => format!("X'{}'", hex::encode(b)),
            SqlValue::Null => "NULL".to_string(),
        }
    }

    fn add_to(&self, args: &mut MySqlArguments) -> Result<(), sqlx::error::BoxDynError> {
        match self {
            SqlValue::Int(n) => args.add(*n),
            SqlValue::Str(s) => args.add(s.clone()),
            SqlValue::Bool(b) => args.add(*b),
            SqlValue::Bytes(b) => args.add(b.clone()),
            SqlValue::Null => args.add(None::<i64>),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Str(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Str(value)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(value: &[u8]) -> Self {
        SqlValue::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq)]
struct DriverError {
    code: String,
    message: String,
}

/// One placeholder as seen in [`StatementDebug`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDebug {
    pub name: String,
    /// Zero based position among the placeholders.
    pub position: usize,
    /// Bound value type, or `None` if nothing is bound yet.
    pub kind: Option<&'static str>,
}

/// Diagnostics for a statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementDebug {
    /// SQL as written, with named placeholders.
    pub raw: String,
    /// SQL with bound values substituted in. Unbound placeholders are left
    /// as `:NAME`.
    pub sent: String,
    pub params: Vec<ParamDebug>,
    /// SQLSTATE of the last execution, `00000` if it succeeded or never ran.
    pub code: String,
    pub msg: String,
}

#[derive(Debug)]
pub struct Statement {
    raw: String,
    segments: Vec<Segment>,
    sql: String,
    values: HashMap<String, SqlValue>,
    error: Mutex<Option<DriverError>>,
}

impl Statement {
    /// Parse `sql`, collecting its named placeholders.
    pub fn parse(sql: &str) -> Result<Self, DbError> {
        if sql.trim().is_empty() {
            return Err(DbError::EmptySql);
        }

        let segments = split_placeholders(sql);
        let sql_text = segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => t.as_str(),
                Segment::Param(_) => "?",
            })
            .collect();

        Ok(Self {
            raw: sql.to_string(),
            segments,
            sql: sql_text,
            values: HashMap::new(),
            error: Mutex::new(None),
        })
    }

    /// Replace [`IN_LIST_TOKEN`] in `sql` with `:IN_0, :IN_1, ...` and bind
    /// each value in order. An empty list becomes `NULL` so `IN (...)`
    /// matches nothing instead of being a syntax error.
    pub fn with_in_list<V, I>(sql: &str, values: I) -> Result<Self, DbError>
    where
        V: Into<SqlValue>,
        I: IntoIterator<Item = V>,
    {
        let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        let list = if values.is_empty() {
            "NULL".to_string()
        } else {
            (0..values.len())
                .map(|i| format!(":IN_{}", i))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut stmt = Self::parse(&sql.replace(IN_LIST_TOKEN, &list))?;
        for (i, value) in values.into_iter().enumerate() {
            stmt.bind(&format!("IN_{}", i), value);
        }
        Ok(stmt)
    }

    /// The SQL as it was written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The SQL sent to the server, with `?` markers.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in the order they occur.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.values.contains_key(name.trim_start_matches(':'))
    }

    /// Bind a value. `name` is given without the leading colon, though one
    /// is tolerated.
    pub fn bind(&mut self, name: &str, value: impl Into<SqlValue>) -> &mut Self {
        self.values
            .insert(name.trim_start_matches(':').to_string(), value.into());
        self
    }

    pub fn bind_int(&mut self, name: &str, value: i64) -> &mut Self {
        self.bind(name, SqlValue::Int(value))
    }

    pub fn bind_str(&mut self, name: &str, value: &str) -> &mut Self {
        self.bind(name, value)
    }

    pub fn bind_bool(&mut self, name: &str, value: bool) -> &mut Self {
        self.bind(name, SqlValue::Bool(value))
    }

    pub fn bind_bytes(&mut self, name: &str, value: &[u8]) -> &mut Self {
        self.bind(name, value)
    }

    pub fn bind_null(&mut self, name: &str) -> &mut Self {
        self.bind(name, SqlValue::Null)
    }

    /// `true` unless the last execution failed.
    pub fn is_ok(&self) -> bool {
        self.lock_error().is_none()
    }

    /// Positional arguments in placeholder order.
    pub(crate) fn arguments(&self) -> Result<MySqlArguments, DbError> {
        let mut args = MySqlArguments::default();
        for name in self.placeholders() {
            let value = self
                .values
                .get(name)
                .ok_or_else(|| DbError::UnboundParameter(name.to_string()))?;
            value
                .add_to(&mut args)
                .map_err(|e| DbError::Query(format!("Failed to bind :{}: {}", name, e)))?;
        }
        Ok(args)
    }

    /// SQL with bound values written in as literals.
    pub fn sent(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Text(t) => t.clone(),
                Segment::Param(name) => self
                    .values
                    .get(name)
                    .map_or_else(|| format!(":{}", name), SqlValue::to_literal),
            })
            .collect()
    }

    pub fn debug_info(&self) -> StatementDebug {
        let params = self
            .placeholders()
            .enumerate()
            .map(|(position, name)| ParamDebug {
                name: name.to_string(),
                position,
                kind: self.values.get(name).map(SqlValue::kind),
            })
            .collect();

        let (code, msg) = match &*self.lock_error() {
            Some(e) => (e.code.clone(), e.message.clone()),
            None => (SUCCESS_CODE.to_string(), String::new()),
        };

        StatementDebug {
            raw: self.raw.clone(),
            sent: self.sent(),
            params,
            code,
            msg,
        }
    }

    pub(crate) fn set_error(&self, code: &str, message: &str) {
        *self.lock_error() = Some(DriverError {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    pub(crate) fn clear_error(&self) {
        *self.lock_error() = None;
    }

    fn lock_error(&self) -> std::sync::MutexGuard<'_, Option<DriverError>> {
        self.error.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Split SQL into text and `:NAME` segments. Quoted strings, backquoted
/// identifiers and `::` are passed through untouched.
fn split_placeholders(sql: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            text.push(c);
            if c == '\\' && q != '`' {
                if let Some(escaped) = chars.next() {
                    text.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                text.push(c);
            }
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                text.push_str("::");
            }
            ':' => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    text.push(':');
                } else {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Param(name));
                }
            }
            _ => text.push(c),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sql_rejected() {
        assert!(matches!(Statement::parse("   \n"), Err(DbError::EmptySql)));
    }

    #[test]
    fn test_placeholders_become_positional() {
        let stmt = Statement::parse(
            "SELECT * FROM `users` WHERE `id` = :ID AND `name` = :NAME OR `alt_id` = :ID",
        )
        .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT * FROM `users` WHERE `id` = ? AND `name` = ? OR `alt_id` = ?"
        );
        assert_eq!(stmt.placeholders().collect::<Vec<_>>(), vec!["ID", "NAME", "ID"]);
    }

    #[test]
    fn test_quoted_text_and_casts_are_ignored() {
        let stmt = Statement::parse(
            "SELECT ':NOPE', \"a:b\", `col:x`, '10:30', 'it\\'s :X', x::int FROM t WHERE y = :Y",
        )
        .unwrap();
        assert_eq!(stmt.placeholders().collect::<Vec<_>>(), vec!["Y"]);
        assert!(stmt.sql().contains("':NOPE'"));
        assert!(stmt.sql().contains("x::int"));
        assert!(stmt.sql().ends_with("y = ?"));
    }

    #[test]
    fn test_bare_colon_kept() {
        let stmt = Statement::parse("SELECT 'a' : 1").unwrap();
        assert_eq!(stmt.sql(), "SELECT 'a' : 1");
        assert_eq!(stmt.placeholders().count(), 0);
    }

    #[test]
    fn test_unbound_parameter() {
        let mut stmt = Statement::parse("UPDATE t SET a = :A WHERE id = :ID").unwrap();
        stmt.bind_str("A", "x");
        match stmt.arguments() {
            Err(DbError::UnboundParameter(name)) => assert_eq!(name, "ID"),
            other => panic!("expected unbound ID, got {:?}", other.map(|_| ())),
        }
        stmt.bind_int(":ID", 4);
        assert!(stmt.is_bound("ID"));
        assert!(stmt.arguments().is_ok());
    }

    #[test]
    fn test_sent_interpolates_values() {
        let mut stmt = Statement::parse(
            "INSERT INTO n (s, b, k, o, m) VALUES (:S, :B, :K, :O, :M)",
        )
        .unwrap();
        stmt.bind_str("S", "O'Brien")
            .bind_bool("B", true)
            .bind_bytes("K", &[0xde, 0xad])
            .bind_null("O");
        assert_eq!(
            stmt.sent(),
            "INSERT INTO n (s, b, k, o, m) VALUES ('O\\'Brien', 1, X'dead', NULL, :M)"
        );
    }

    #[test]
    fn test_in_list() {
        let stmt = Statement::with_in_list(
            "SELECT name FROM t WHERE id IN ([[PARAMS]]) AND live = 1",
            vec![3_i64, 5, 8],
        )
        .unwrap();
        assert_eq!(
            stmt.raw(),
            "SELECT name FROM t WHERE id IN (:IN_0, :IN_1, :IN_2) AND live = 1"
        );
        assert_eq!(stmt.sent(), "SELECT name FROM t WHERE id IN (3, 5, 8) AND live = 1");
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let stmt = Statement::with_in_list("DELETE FROM t WHERE id IN ([[PARAMS]])", Vec::<i64>::new())
            .unwrap();
        assert_eq!(stmt.sql(), "DELETE FROM t WHERE id IN (NULL)");
    }

    #[test]
    fn test_debug_info_reports_error() {
        let mut stmt = Statement::parse("SELECT * FROM t WHERE id = :ID").unwrap();
        stmt.bind_int("ID", 9);
        let info = stmt.debug_info();
        assert_eq!(info.code, SUCCESS_CODE);
        assert_eq!(
            info.params,
            vec![ParamDebug { name: "ID".into(), position: 0, kind: Some("int") }]
        );
        assert!(stmt.is_ok());

        stmt.set_error("42S02", "Table 'db.t' doesn't exist");
        let info = stmt.debug_info();
        assert_eq!(info.code, "42S02");
        assert_eq!(info.sent, "SELECT * FROM t WHERE id = 9");
        assert!(!stmt.is_ok());

        stmt.clear_error();
        assert!(stmt.is_ok());
    }

    #[test]
    fn test_option_values() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Str("x".into()));
    }
}
