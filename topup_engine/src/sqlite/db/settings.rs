use sqlx::SqliteConnection;

use crate::db_types::SiteSetting;

pub async fn fetch_settings(conn: &mut SqliteConnection) -> Result<Vec<SiteSetting>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM site_settings ORDER BY setting_key").fetch_all(conn).await
}

pub async fn upsert_setting(key: &str, value: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO site_settings (setting_key, setting_value) VALUES ($1, $2)
            ON CONFLICT (setting_key) DO UPDATE SET
                setting_value = excluded.setting_value,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_setting(key: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM site_settings WHERE setting_key = $1").bind(key).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
