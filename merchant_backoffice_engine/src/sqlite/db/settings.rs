use sqlx::SqliteConnection;

use crate::{db_types::Setting, traits::SettingsError};

const SETTING_COLUMNS: &str = "key, value, value_type, description, updated_by";

pub async fn fetch_setting(key: &str, conn: &mut SqliteConnection) -> Result<Option<Setting>, SettingsError> {
    let setting = sqlx::query_as::<_, Setting>(&format!("SELECT {SETTING_COLUMNS} FROM settings WHERE key = ?"))
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(setting)
}

pub async fn update_setting(
    key: &str,
    value: &str,
    updated_by: &str,
    conn: &mut SqliteConnection,
) -> Result<Setting, SettingsError> {
    sqlx::query_as::<_, Setting>(&format!(
        r#"UPDATE settings SET value = ?, updated_by = ?, updated_at = CURRENT_TIMESTAMP
           WHERE key = ?
           RETURNING {SETTING_COLUMNS}"#
    ))
    .bind(value)
    .bind(updated_by)
    .bind(key)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))
}

/// Inserts missing entries only; existing values are never overwritten.
pub async fn seed_settings(defaults: &[Setting], conn: &mut SqliteConnection) -> Result<usize, SettingsError> {
    let mut seeded = 0usize;
    for setting in defaults {
        let result = sqlx::query(
            r#"INSERT OR IGNORE INTO settings (key, value, value_type, description, updated_by)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&setting.key)
        .bind(&setting.value)
        .bind(setting.value_type)
        .bind(&setting.description)
        .bind(&setting.updated_by)
        .execute(&mut *conn)
        .await?;
        seeded += result.rows_affected() as usize;
    }
    Ok(seeded)
}
