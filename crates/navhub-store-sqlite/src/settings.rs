//! The singleton `GlobalSettings` row (`id = 1`).
//!
//! `layout`, `config` and `theme` are opaque JSON documents owned by the
//! frontend; they are stored as text and parsed on read.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_SEARCH_ENGINE: &str = "Google";

const SETTINGS_ID: i64 = 1;

/// A settings write. Absent documents keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    pub layout: Option<Value>,
    pub config: Option<Value>,
    pub theme: Option<Value>,
    pub search_engine: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub layout: Value,
    pub config: Value,
    pub theme: Value,
    pub search_engine: String,
    pub bing_cache_mode: String,
}

/// Insert the settings row or merge `update` into it.
///
/// On insert, absent documents are stored as `{}` and the search engine
/// defaults to [`DEFAULT_SEARCH_ENGINE`].
pub(crate) fn upsert_settings(
    conn: &Connection,
    update: &SettingsUpdate,
    now: &str,
) -> Result<()> {
    conn.execute(
        r#"INSERT INTO "GlobalSettings"(
             "id", "layout", "config", "theme", "searchEngine", "updatedAt"
           ) VALUES (?1, ?2, ?3, ?4, COALESCE(?5, ?6), ?7)
           ON CONFLICT("id") DO UPDATE SET
             "layout" = COALESCE(?8, "layout"),
             "config" = COALESCE(?9, "config"),
             "theme" = COALESCE(?10, "theme"),
             "searchEngine" = COALESCE(?5, "searchEngine"),
             "updatedAt" = ?7"#,
        params![
            SETTINGS_ID,
            json_or_empty(update.layout.as_ref())?,
            json_or_empty(update.config.as_ref())?,
            json_or_empty(update.theme.as_ref())?,
            update.search_engine,
            DEFAULT_SEARCH_ENGINE,
            now,
            json_opt(update.layout.as_ref())?,
            json_opt(update.config.as_ref())?,
            json_opt(update.theme.as_ref())?,
        ],
    )
    .context("failed to upsert settings")?;
    Ok(())
}

pub(crate) fn load_settings(conn: &Connection) -> Result<Option<Settings>> {
    let raw = conn
        .query_row(
            r#"SELECT "layout", "config", "theme", "searchEngine", "bingCacheMode"
               FROM "GlobalSettings" WHERE "id" = ?1"#,
            params![SETTINGS_ID],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .context("failed to load settings")?;

    let Some((layout, config, theme, search_engine, bing_cache_mode)) = raw else {
        return Ok(None);
    };

    Ok(Some(Settings {
        layout: parse_document("layout", &layout)?,
        config: parse_document("config", &config)?,
        theme: parse_document("theme", &theme)?,
        search_engine,
        bing_cache_mode,
    }))
}

fn parse_document(name: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .with_context(|| format!("stored settings {name} is not valid JSON"))
}

fn json_or_empty(value: Option<&Value>) -> Result<String> {
    Ok(json_opt(value)?.unwrap_or_else(|| "{}".to_string()))
}

fn json_opt(value: Option<&Value>) -> Result<Option<String>> {
    value
        .map(|value| serde_json::to_string(value).context("failed to serialize settings"))
        .transpose()
}
