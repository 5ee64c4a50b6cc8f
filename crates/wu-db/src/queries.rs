use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{ExecOutcome, NonceRecord};
use crate::pool::{DbError, EnhancedDb, DEFAULT_INT_PARAM};

// ============================================================
// Nonce table
// ============================================================

static TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").unwrap());

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn check_table_name(table: &str) -> Result<&str, DbError> {
    if TABLE_NAME_RE.is_match(table) {
        Ok(table)
    } else {
        Err(DbError::InvalidTable(table.to_string()))
    }
}

/// Make sure `table` exists and can be read.
pub async fn probe_nonce_table(db: &EnhancedDb, table: &str) -> Result<(), DbError> {
    let table = check_table_name(table)?;
    db.prep_bind_exec(
        &format!("SELECT `nonce_id` FROM `{}` LIMIT 0, 1", table),
        None,
        DEFAULT_INT_PARAM,
    )
    .await?;
    Ok(())
}

/// Store a nonce and return its id. A repeated nonce is reported as
/// [`DbError::Duplicate`].
pub async fn insert_nonce(
    db: &EnhancedDb,
    table: &str,
    nonce: &[u8],
    single_use: bool,
) -> Result<u64, DbError> {
    let table = check_table_name(table)?;
    let mut stmt = db.prepare(&format!(
        "INSERT INTO `{}` (`nonce_str`, `nonce_single`) VALUES (:NONCE, :SINGLE)",
        table
    ))?;
    stmt.bind_bytes("NONCE", nonce).bind_bool("SINGLE", single_use);

    let id = inserted_id(table, db.execute(&stmt).await)?;
    debug!(table = %table, id, single_use, "Stored nonce");
    Ok(id)
}

/// Exactly one row must have been written. SQLSTATE 23000 (unique key
/// violation) becomes [`DbError::Duplicate`].
fn inserted_id(table: &str, result: Result<ExecOutcome, DbError>) -> Result<u64, DbError> {
    let outcome = result.map_err(|e| match e {
        DbError::Statement { code, message, .. } if code == "23000" => {
            DbError::Duplicate(message)
        }
        other => other,
    })?;

    if outcome.rows_affected != 1 {
        return Err(DbError::Query(format!(
            "Could not insert new entry into nonce table `{}` ({} rows affected)",
            table, outcome.rows_affected
        )));
    }
    Ok(outcome.last_insert_id)
}

pub async fn get_nonce(
    db: &EnhancedDb,
    table: &str,
    id: u64,
) -> Result<Option<NonceRecord>, DbError> {
    let table = check_table_name(table)?;
    let stmt = db.prep_bind(
        &format!(
            "SELECT `nonce_id` AS `id`,
                    `nonce_str` AS `nonce`,
                    `nonce_single` AS `single_use`,
                    `nonce_created` AS `created`
             FROM   `{}`
             WHERE  `nonce_id` = :ID",
            table
        ),
        id_param(id)?,
        DEFAULT_INT_PARAM,
    )?;
    db.fetch_optional_as::<NonceRecord>(&stmt).await
}

/// Delete a nonce, returning the number of rows removed.
pub async fn delete_nonce(db: &EnhancedDb, table: &str, id: u64) -> Result<u64, DbError> {
    let table = check_table_name(table)?;
    let outcome = db
        .prep_bind_exec(
            &format!("DELETE FROM `{}` WHERE `nonce_id` = :ID", table),
            Some(id_param(id)?),
            DEFAULT_INT_PARAM,
        )
        .await?;
    debug!(table = %table, id, rows = outcome.rows_affected, "Deleted nonce");
    Ok(outcome.rows_affected)
}

pub async fn create_nonce_table(db: &EnhancedDb, table: &str) -> Result<(), DbError> {
    let table = check_table_name(table)?;
    db.prep_bind_exec(&create_nonce_table_sql(table), None, DEFAULT_INT_PARAM)
        .await?;
    debug!(table = %table, "Ensured nonce table exists");
    Ok(())
}

fn create_nonce_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (
            `nonce_id`      INT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
            `nonce_str`     BINARY(24)   NOT NULL UNIQUE,
            `nonce_single`  TINYINT(1)   NOT NULL DEFAULT 1,
            `nonce_created` TIMESTAMP    NOT NULL DEFAULT CURRENT_TIMESTAMP
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        table
    )
}

fn id_param(id: u64) -> Result<i64, DbError> {
    i64::try_from(id).map_err(|_| DbError::NotFound(format!("Nonce with id {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Statement;

    #[test]
    fn test_table_name_validation() {
        assert_eq!(check_table_name("nonce_list").unwrap(), "nonce_list");
        assert!(check_table_name("").is_err());
        assert!(check_table_name("nonce`; DROP TABLE users; --").is_err());
        assert!(check_table_name("a.b").is_err());
        assert!(check_table_name(&"n".repeat(65)).is_err());
    }

    #[test]
    fn test_create_sql_has_no_placeholders() {
        let stmt = Statement::parse(&create_nonce_table_sql("nonce_list")).unwrap();
        assert_eq!(stmt.placeholders().count(), 0);
        assert!(stmt.sql().contains("`nonce_list`"));
        assert!(stmt.sql().contains("BINARY(24)"));
    }

    #[test]
    fn test_id_param_range() {
        assert_eq!(id_param(42).unwrap(), 42);
        assert!(id_param(u64::MAX).is_err());
    }

    fn statement_error(code: &str) -> DbError {
        DbError::Statement {
            code: code.to_string(),
            message: "Duplicate entry 'x' for key 'nonce_str'".to_string(),
            sent: "INSERT INTO `nonce_list` ...".to_string(),
        }
    }

    #[test]
    fn test_inserted_id() {
        let outcome = ExecOutcome {
            rows_affected: 1,
            last_insert_id: 17,
        };
        assert_eq!(inserted_id("nonce_list", Ok(outcome)).unwrap(), 17);
    }

    #[test]
    fn test_unique_violation_is_duplicate() {
        let err = inserted_id("nonce_list", Err(statement_error("23000"))).unwrap_err();
        assert!(matches!(err, DbError::Duplicate(ref m) if m.contains("nonce_str")));
    }

    #[test]
    fn test_other_statement_errors_pass_through() {
        let err = inserted_id("nonce_list", Err(statement_error("42S02"))).unwrap_err();
        assert!(matches!(err, DbError::Statement { ref code, .. } if code == "42S02"));
    }

    #[test]
    fn test_no_row_written() {
        let err = inserted_id("nonce_list", Ok(ExecOutcome::default())).unwrap_err();
        match err {
            DbError::Query(msg) => {
                assert!(msg.contains("`nonce_list`"));
                assert!(msg.contains("0 rows affected"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
