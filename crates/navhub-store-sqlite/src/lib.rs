//! `SQLite` persistence for navhub, including the self-healing schema engine.
//!
//! Request paths call [`gate::SchemaGate::ensure_schema`] (or
//! [`ensure_database_schema`]) before using a [`SiteStore`]. Every ordering
//! value the store persists goes through [`navhub_core::normalize_site_order`].

pub mod config;
pub mod error;
pub mod gate;
pub mod inspect;
pub mod reconcile;
pub mod repair;
pub mod settings;
pub mod target;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use navhub_core::{
    normalize_order_i64, normalize_site_order, SiteOrderUpdate, SitePatch, ValidSite,
    DEFAULT_CATEGORY_COLOR,
};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use ulid::Ulid;

pub use config::DatabaseConfig;
pub use error::{SchemaError, SchemaNotReady};
pub use gate::{ensure_database_schema, Migrate, MigrationReport, SchemaGate, SqliteMigrator};
pub use inspect::{ObservedSchema, SchemaInspector};
pub use reconcile::{reconcile, ReconcileReport};
pub use repair::{repair_known_corruptions, RepairReport};
pub use settings::{Settings, SettingsUpdate, DEFAULT_SEARCH_ENGINE};
pub use target::{TargetSchema, NAVHUB_SCHEMA};

pub(crate) const BUSY_TIMEOUT_MS: u64 = 5000;

const SITE_COLUMNS: &str = r#""id", "name", "url", "desc", "category", "color", "icon",
    "iconType", "customIconUrl", "titleFont", "descFont", "titleColor", "descColor",
    "titleSize", "descSize", "isHidden", "order", "createdAt", "updatedAt""#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub desc: Option<String>,
    pub category: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub icon_type: Option<String>,
    pub custom_icon_url: Option<String>,
    pub title_font: Option<String>,
    pub desc_font: Option<String>,
    pub title_color: Option<String>,
    pub desc_color: Option<String>,
    pub title_size: Option<i64>,
    pub desc_size: Option<i64>,
    pub is_hidden: bool,
    pub order: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub is_hidden: bool,
    pub order: i32,
}

/// A site entry of an exported backup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportedSite {
    pub id: String,
    pub name: String,
    pub url: String,
    pub desc: Option<String>,
    pub category: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub icon_type: Option<String>,
    pub custom_icon_url: Option<String>,
    pub order: Value,
}

/// Backup payload accepted by [`SiteStore::import_snapshot`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportPayload {
    pub sites: Vec<ImportedSite>,
    pub categories: Vec<String>,
    pub category_colors: BTreeMap<String, String>,
    pub layout: Option<Value>,
    pub config: Option<Value>,
    pub theme: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub settings_written: bool,
    pub categories_upserted: usize,
    pub sites_upserted: usize,
    pub sites_skipped: usize,
}

pub struct SiteStore {
    conn: Connection,
}

impl SiteStore {
    /// Open the navhub database and configure runtime pragmas.
    ///
    /// Does not touch the schema; run the schema gate first.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .context("failed to configure sqlite pragmas")?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
            .context("failed to configure sqlite busy timeout")?;

        Ok(Self { conn })
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a validated site, creating its category when missing.
    ///
    /// # Errors
    /// Returns an error when the insert fails, e.g. on a duplicate id.
    pub fn create_site(&mut self, site: &ValidSite) -> Result<SiteRecord> {
        self.ensure_category_best_effort(&site.category);

        let id = site.id.clone().unwrap_or_else(|| Ulid::new().to_string());
        let now = now_rfc3339()?;

        self.conn
            .execute(
                r#"INSERT INTO "Site"(
                    "id", "name", "url", "desc", "category", "color", "icon",
                    "iconType", "customIconUrl", "titleFont", "descFont", "titleColor", "descColor",
                    "titleSize", "descSize", "isHidden", "order", "createdAt", "updatedAt"
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                    ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?18
                )"#,
                params![
                    id,
                    site.name,
                    site.url,
                    site.desc,
                    site.category,
                    site.color,
                    site.icon,
                    site.icon_type,
                    site.custom_icon_url,
                    site.title_font,
                    site.desc_font,
                    site.title_color,
                    site.desc_color,
                    site.title_size,
                    site.desc_size,
                    site.is_hidden,
                    site.order,
                    now,
                ],
            )
            .with_context(|| format!("failed to insert site {id}"))?;

        self.get_site(&id)?
            .ok_or_else(|| anyhow!("site {id} vanished after insert"))
    }

    /// Apply a partial edit to one site.
    ///
    /// Fields absent from `patch` keep their stored value. A new category is
    /// created when missing.
    ///
    /// # Errors
    /// Returns an error when the site does not exist or the update fails.
    pub fn update_site(&mut self, patch: &SitePatch) -> Result<SiteRecord> {
        if let Some(category) = patch.category.as_deref() {
            self.ensure_category_best_effort(category);
        }

        let changed = self
            .conn
            .execute(
                r#"UPDATE "Site" SET
                     "name" = COALESCE(?1, "name"),
                     "url" = COALESCE(?2, "url"),
                     "desc" = COALESCE(?3, "desc"),
                     "category" = COALESCE(?4, "category"),
                     "color" = COALESCE(?5, "color"),
                     "icon" = COALESCE(?6, "icon"),
                     "iconType" = COALESCE(?7, "iconType"),
                     "customIconUrl" = COALESCE(?8, "customIconUrl"),
                     "titleFont" = COALESCE(?9, "titleFont"),
                     "descFont" = COALESCE(?10, "descFont"),
                     "titleColor" = COALESCE(?11, "titleColor"),
                     "descColor" = COALESCE(?12, "descColor"),
                     "titleSize" = COALESCE(?13, "titleSize"),
                     "descSize" = COALESCE(?14, "descSize"),
                     "order" = COALESCE(?15, "order"),
                     "isHidden" = COALESCE(?16, "isHidden"),
                     "updatedAt" = ?17
                   WHERE "id" = ?18"#,
                params![
                    patch.name,
                    patch.url,
                    patch.desc,
                    patch.category,
                    patch.color,
                    patch.icon,
                    patch.icon_type,
                    patch.custom_icon_url,
                    patch.title_font,
                    patch.desc_font,
                    patch.title_color,
                    patch.desc_color,
                    patch.title_size,
                    patch.desc_size,
                    patch.order,
                    patch.is_hidden,
                    now_rfc3339()?,
                    patch.id,
                ],
            )
            .with_context(|| format!("failed to update site {}", patch.id))?;
        if changed == 0 {
            return Err(anyhow!("site not found: {}", patch.id));
        }

        self.get_site(&patch.id)?
            .ok_or_else(|| anyhow!("site {} vanished after update", patch.id))
    }

    /// Apply a drag-and-drop reorder batch, one row at a time.
    ///
    /// Entries without an id are skipped. Returns the number of updated sites.
    ///
    /// # Errors
    /// Returns an error when an entry references an unknown site or an update fails;
    /// entries before it stay applied.
    pub fn reorder_sites(&mut self, updates: &[SiteOrderUpdate]) -> Result<usize> {
        let mut updated = 0;

        for update in updates {
            let id = update.id.trim();
            if id.is_empty() {
                continue;
            }
            if let Some(category) = update.category.as_deref() {
                self.ensure_category_best_effort(category);
            }

            let changed = self
                .conn
                .execute(
                    r#"UPDATE "Site"
                       SET "order" = ?1,
                           "category" = COALESCE(?2, "category"),
                           "isHidden" = COALESCE(?3, "isHidden"),
                           "updatedAt" = ?4
                       WHERE "id" = ?5"#,
                    params![
                        normalize_site_order(&update.order, 0),
                        update.category,
                        update.is_hidden,
                        now_rfc3339()?,
                        id,
                    ],
                )
                .with_context(|| format!("failed to reorder site {id}"))?;
            if changed == 0 {
                return Err(anyhow!("site not found: {id}"));
            }
            updated += changed;
        }

        Ok(updated)
    }

    /// # Errors
    /// Returns an error when the lookup fails or the row cannot be decoded.
    pub fn get_site(&self, id: &str) -> Result<Option<SiteRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT {SITE_COLUMNS} FROM "Site" WHERE "id" = ?1"#
        ))?;
        stmt.query_row(params![id], site_from_row)
            .optional()
            .with_context(|| format!("failed to load site {id}"))
    }

    /// All sites in display order.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read or decoded.
    pub fn list_sites(&self) -> Result<Vec<SiteRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT {SITE_COLUMNS} FROM "Site" ORDER BY "order" ASC, "id" ASC"#
        ))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list sites")?;
        Ok(sites)
    }

    /// # Errors
    /// Returns an error when the delete fails.
    pub fn delete_site(&mut self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute(r#"DELETE FROM "Site" WHERE "id" = ?1"#, params![id])
            .with_context(|| format!("failed to delete site {id}"))?;
        Ok(deleted > 0)
    }

    /// Create the category if no category has this name yet.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn ensure_category(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        insert_category_if_missing(&self.conn, name, 0, DEFAULT_CATEGORY_COLOR)
    }

    fn ensure_category_best_effort(&mut self, name: &str) {
        if let Err(err) = self.ensure_category(name) {
            tracing::warn!(category = name, error = %err, "failed to ensure category");
        }
    }

    /// All categories in display order.
    ///
    /// When the table is empty but sites exist, categories are derived from
    /// the sites in first-seen order and written back best-effort.
    ///
    /// # Errors
    /// Returns an error when rows cannot be read.
    pub fn list_categories(&mut self) -> Result<Vec<CategoryRecord>> {
        let categories = self.load_categories()?;
        if !categories.is_empty() {
            return Ok(categories);
        }

        let mut seen = BTreeSet::new();
        let mut derived = Vec::new();
        for site in self.list_sites()? {
            if site.category.is_empty() || !seen.insert(site.category.clone()) {
                continue;
            }
            derived.push(CategoryRecord {
                id: site.category.clone(),
                name: site.category,
                color: Some(DEFAULT_CATEGORY_COLOR.to_string()),
                is_hidden: false,
                order: position_order(derived.len()),
            });
        }

        for category in &derived {
            if let Err(err) = insert_category_if_missing(
                &self.conn,
                &category.name,
                category.order,
                DEFAULT_CATEGORY_COLOR,
            ) {
                tracing::warn!(
                    category = %category.name,
                    error = %err,
                    "failed to write back derived category"
                );
            }
        }

        Ok(derived)
    }

    fn load_categories(&self) -> Result<Vec<CategoryRecord>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT "id", "name", "color", "isHidden", "order"
               FROM "Category" ORDER BY "order" ASC, "name" ASC"#,
        )?;
        let categories = stmt
            .query_map([], |row| {
                Ok(CategoryRecord {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    color: row.get("color")?,
                    is_hidden: row.get("isHidden")?,
                    order: normalize_order_i64(row.get("order")?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to list categories")?;
        Ok(categories)
    }

    /// Write the global settings; documents absent from `update` are kept.
    ///
    /// # Errors
    /// Returns an error when the settings cannot be serialized or written.
    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<Settings> {
        settings::upsert_settings(&self.conn, update, &now_rfc3339()?)?;
        settings::load_settings(&self.conn)?
            .ok_or_else(|| anyhow!("settings vanished after write"))
    }

    /// The global settings with their JSON documents parsed, if ever written.
    ///
    /// # Errors
    /// Returns an error when the row cannot be read or a document is not valid JSON.
    pub fn load_settings(&self) -> Result<Option<Settings>> {
        settings::load_settings(&self.conn)
    }

    /// Merge a backup into the database inside one transaction.
    ///
    /// Settings are upserted, categories are upserted by name with the
    /// position of their first occurrence as order, and sites are upserted by
    /// id with normalized order.
    ///
    /// # Errors
    /// Returns an error when any write fails; nothing is applied in that case.
    pub fn import_snapshot(&mut self, payload: &ImportPayload) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        let now = now_rfc3339()?;
        let tx = self
            .conn
            .transaction()
            .context("failed to start import transaction")?;

        let settings = SettingsUpdate {
            layout: payload.layout.clone(),
            config: payload.config.clone(),
            theme: payload.theme.clone(),
            search_engine: None,
        };
        settings::upsert_settings(&tx, &settings, &now)?;
        summary.settings_written = true;

        let mut seen = BTreeSet::new();
        for (index, name) in payload.categories.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let color = payload
                .category_colors
                .get(name)
                .map_or(DEFAULT_CATEGORY_COLOR, String::as_str);
            tx.execute(
                r#"INSERT INTO "Category"("id", "name", "color", "isHidden", "order", "updatedAt")
                   VALUES (?1, ?2, ?3, false, ?4, ?5)
                   ON CONFLICT("name") DO UPDATE SET
                     "order" = excluded."order",
                     "color" = excluded."color",
                     "updatedAt" = excluded."updatedAt""#,
                params![
                    Ulid::new().to_string(),
                    name,
                    color,
                    position_order(index),
                    now
                ],
            )
            .with_context(|| format!("failed to upsert category {name}"))?;
            summary.categories_upserted += 1;
        }

        for site in &payload.sites {
            if site.id.trim().is_empty() {
                tracing::warn!(name = %site.name, "skipping imported site without id");
                summary.sites_skipped += 1;
                continue;
            }
            tx.execute(
                r#"INSERT INTO "Site"(
                     "id", "name", "url", "desc", "category", "color", "icon",
                     "iconType", "customIconUrl", "order", "createdAt", "updatedAt"
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                   ON CONFLICT("id") DO UPDATE SET
                     "name" = excluded."name",
                     "url" = excluded."url",
                     "desc" = excluded."desc",
                     "category" = excluded."category",
                     "color" = excluded."color",
                     "icon" = excluded."icon",
                     "iconType" = excluded."iconType",
                     "customIconUrl" = excluded."customIconUrl",
                     "order" = excluded."order",
                     "updatedAt" = excluded."updatedAt""#,
                params![
                    site.id,
                    site.name,
                    site.url,
                    site.desc,
                    site.category,
                    site.color,
                    site.icon,
                    site.icon_type,
                    site.custom_icon_url,
                    normalize_site_order(&site.order, 0),
                    now,
                ],
            )
            .with_context(|| format!("failed to upsert site {}", site.id))?;
            summary.sites_upserted += 1;
        }

        tx.commit().context("failed to commit import transaction")?;
        Ok(summary)
    }
}

fn position_order(index: usize) -> i32 {
    normalize_order_i64(i64::try_from(index).unwrap_or(i64::MAX))
}

fn insert_category_if_missing(
    conn: &Connection,
    name: &str,
    order: i32,
    color: &str,
) -> Result<()> {
    conn.execute(
        r#"INSERT INTO "Category"("id", "name", "color", "isHidden", "order", "updatedAt")
           VALUES (?1, ?2, ?3, false, ?4, ?5)
           ON CONFLICT("name") DO NOTHING"#,
        params![Ulid::new().to_string(), name, color, order, now_rfc3339()?],
    )
    .with_context(|| format!("failed to ensure category {name}"))?;
    Ok(())
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        url: row.get("url")?,
        desc: row.get("desc")?,
        category: row.get("category")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        icon_type: row.get("iconType")?,
        custom_icon_url: row.get("customIconUrl")?,
        title_font: row.get("titleFont")?,
        desc_font: row.get("descFont")?,
        title_color: row.get("titleColor")?,
        desc_color: row.get("descColor")?,
        title_size: row.get("titleSize")?,
        desc_size: row.get("descSize")?,
        is_hidden: row.get("isHidden")?,
        order: normalize_order_i64(row.get("order")?),
        created_at: datetime_text(row, "createdAt")?,
        updated_at: datetime_text(row, "updatedAt")?,
    })
}

/// Older writers stored `DATETIME` columns as epoch integers, newer ones as text.
fn datetime_text(row: &Row<'_>, column: &str) -> rusqlite::Result<String> {
    Ok(match row.get_ref(column)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(text) | ValueRef::Blob(text) => {
            String::from_utf8_lossy(text).into_owned()
        }
    })
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .context("failed to format RFC3339 timestamp")
}

#[cfg(test)]
mod tests {
    use navhub_core::{NewSite, SiteUpdate};
    use serde_json::json;

    use super::*;

    fn migrated_store() -> Result<SiteStore> {
        let store = SiteStore::open(Path::new(":memory:"))?;
        reconcile(store.connection(), &NAVHUB_SCHEMA)?;
        Ok(store)
    }

    fn new_site(name: &str, category: &str, order: Value) -> Result<ValidSite> {
        let input = NewSite {
            name: name.to_string(),
            url: format!("{}.example.com", name.to_lowercase()),
            category: category.to_string(),
            order,
            ..NewSite::default()
        };
        Ok(input.validate()?)
    }

    fn site_names(store: &SiteStore) -> Result<Vec<String>> {
        Ok(store
            .list_sites()?
            .into_iter()
            .map(|site| site.name)
            .collect())
    }

    #[test]
    fn create_site_normalizes_order_and_ensures_category() -> Result<()> {
        let mut store = migrated_store()?;

        let site = new_site("Docs", "Rust", json!(1_700_000_000_000_i64))?;
        let site = store.create_site(&site)?;

        assert_eq!(site.order, 1_700_000_000);
        assert_eq!(site.url, "https://docs.example.com");
        assert_eq!(site.created_at, site.updated_at);
        let categories = store.list_categories()?;
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Rust");
        assert_eq!(
            categories[0].color.as_deref(),
            Some(DEFAULT_CATEGORY_COLOR)
        );
        Ok(())
    }

    #[test]
    fn duplicate_site_id_is_rejected() -> Result<()> {
        let mut store = migrated_store()?;
        let mut site = new_site("Docs", "Rust", json!(1))?;
        site.id = Some("fixed".to_string());

        store.create_site(&site)?;
        assert!(store.create_site(&site).is_err());
        Ok(())
    }

    #[test]
    fn update_site_changes_only_provided_fields() -> Result<()> {
        let mut store = migrated_store()?;
        let mut site = new_site("Docs", "Rust", json!(4))?;
        site.desc = Some("API docs".to_string());
        site.title_size = Some(14);
        let created = store.create_site(&site)?;

        let patch = SiteUpdate {
            id: created.id.clone(),
            name: Some("Docs.rs".to_string()),
            url: Some("docs.rs".to_string()),
            category: Some("Reference".to_string()),
            is_hidden: Some(true),
            ..SiteUpdate::default()
        }
        .validate()?;
        let updated = store.update_site(&patch)?;

        assert_eq!(updated.name, "Docs.rs");
        assert_eq!(updated.url, "https://docs.rs");
        assert_eq!(updated.category, "Reference");
        assert!(updated.is_hidden);
        assert_eq!(updated.desc.as_deref(), Some("API docs"));
        assert_eq!(updated.title_size, Some(14));
        assert_eq!(updated.order, 4);
        assert_eq!(updated.created_at, created.created_at);

        let categories = store.list_categories()?;
        assert!(categories.iter().any(|category| category.name == "Reference"));
        Ok(())
    }

    #[test]
    fn update_site_normalizes_millisecond_order() -> Result<()> {
        let mut store = migrated_store()?;
        let created = store.create_site(&new_site("Docs", "Rust", json!(1))?)?;

        let patch = SiteUpdate {
            id: created.id.clone(),
            order: Some(json!(1_800_000_000_000_i64)),
            ..SiteUpdate::default()
        }
        .validate()?;
        let updated = store.update_site(&patch)?;

        assert_eq!(updated.order, 1_800_000_000);
        assert_eq!(updated.name, "Docs");
        Ok(())
    }

    #[test]
    fn update_of_unknown_site_fails() -> Result<()> {
        let mut store = migrated_store()?;
        let patch = SiteUpdate {
            id: "missing".to_string(),
            ..SiteUpdate::default()
        }
        .validate()?;

        assert!(store.update_site(&patch).is_err());
        Ok(())
    }

    #[test]
    fn reorder_updates_order_and_keeps_unspecified_fields() -> Result<()> {
        let mut store = migrated_store()?;
        let a = store.create_site(&new_site("A", "One", json!(0))?)?;
        let b = store.create_site(&new_site("B", "One", json!(1))?)?;

        let updated = store.reorder_sites(&[
            SiteOrderUpdate {
                id: b.id.clone(),
                order: json!(0),
                ..SiteOrderUpdate::default()
            },
            SiteOrderUpdate {
                id: a.id.clone(),
                order: json!(1_800_000_000_000_i64),
                category: Some("Two".to_string()),
                is_hidden: Some(true),
            },
            SiteOrderUpdate {
                id: String::new(),
                order: json!(5),
                ..SiteOrderUpdate::default()
            },
        ])?;
        assert_eq!(updated, 2);

        assert_eq!(site_names(&store)?, ["B", "A"]);
        let sites = store.list_sites()?;
        assert_eq!(sites[0].category, "One");
        assert!(!sites[0].is_hidden);
        assert_eq!(sites[1].order, 1_800_000_000);
        assert_eq!(sites[1].category, "Two");
        assert!(sites[1].is_hidden);
        Ok(())
    }

    #[test]
    fn reorder_of_unknown_site_fails() -> Result<()> {
        let mut store = migrated_store()?;
        let result = store.reorder_sites(&[SiteOrderUpdate {
            id: "missing".to_string(),
            order: json!(1),
            ..SiteOrderUpdate::default()
        }]);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn delete_site_reports_whether_a_row_was_removed() -> Result<()> {
        let mut store = migrated_store()?;
        let site = store.create_site(&new_site("Docs", "Rust", json!(0))?)?;

        assert!(store.delete_site(&site.id)?);
        assert!(!store.delete_site(&site.id)?);
        assert!(store.get_site(&site.id)?.is_none());
        Ok(())
    }

    #[test]
    fn categories_are_derived_from_sites_when_table_is_empty() -> Result<()> {
        let mut store = migrated_store()?;
        store.create_site(&new_site("A", "Work", json!(0))?)?;
        store.create_site(&new_site("B", "Play", json!(1))?)?;
        store.create_site(&new_site("C", "Work", json!(2))?)?;
        store
            .connection()
            .execute(r#"DELETE FROM "Category""#, [])?;

        let derived = store.list_categories()?;
        let names = derived
            .iter()
            .map(|category| category.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["Work", "Play"]);
        assert_eq!(derived[1].order, 1);

        let persisted = store.list_categories()?;
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].name, "Work");
        Ok(())
    }

    #[test]
    fn settings_round_trip_and_keep_omitted_documents() -> Result<()> {
        let mut store = migrated_store()?;
        assert_eq!(store.load_settings()?, None);

        let first = store.update_settings(&SettingsUpdate {
            layout: Some(json!({ "bgType": "bing" })),
            theme: Some(json!({ "mode": "dark" })),
            ..SettingsUpdate::default()
        })?;
        assert_eq!(first.search_engine, DEFAULT_SEARCH_ENGINE);
        assert_eq!(first.config, json!({}));

        store.update_settings(&SettingsUpdate {
            config: Some(json!({ "privateMode": true })),
            search_engine: Some("Bing".to_string()),
            ..SettingsUpdate::default()
        })?;

        let loaded = store
            .load_settings()?
            .ok_or_else(|| anyhow!("missing settings"))?;
        assert_eq!(loaded.layout, json!({ "bgType": "bing" }));
        assert_eq!(loaded.theme, json!({ "mode": "dark" }));
        assert_eq!(loaded.config, json!({ "privateMode": true }));
        assert_eq!(loaded.search_engine, "Bing");
        Ok(())
    }

    #[test]
    fn import_upserts_and_normalizes_orders() -> Result<()> {
        let mut store = migrated_store()?;
        let existing = store.create_site(&new_site("Old", "Work", json!(9))?)?;

        let payload: ImportPayload = serde_json::from_value(json!({
            "categories": ["Play", "Work"],
            "categoryColors": { "Play": "#FF0000" },
            "layout": { "bgType": "bing" },
            "sites": [
                { "id": existing.id.clone(), "name": "Renamed",
                  "url": "https://old.example.com", "category": "Work",
                  "order": 1_700_000_000_000_i64 },
                { "id": "fresh", "name": "Fresh", "url": "https://fresh.example.com",
                  "category": "Play", "order": "3" },
                { "name": "No id", "url": "https://x.example.com", "category": "Play" }
            ]
        }))?;

        let summary = store.import_snapshot(&payload)?;
        assert_eq!(
            summary,
            ImportSummary {
                settings_written: true,
                categories_upserted: 2,
                sites_upserted: 2,
                sites_skipped: 1,
            }
        );

        let renamed = store
            .get_site(&existing.id)?
            .ok_or_else(|| anyhow!("missing site"))?;
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(renamed.order, 1_700_000_000);
        assert_eq!(store.get_site("fresh")?.map(|site| site.order), Some(3));

        let categories = store.list_categories()?;
        assert_eq!(categories[0].name, "Play");
        assert_eq!(categories[0].color.as_deref(), Some("#FF0000"));
        assert_eq!(categories[1].name, "Work");
        assert_eq!(categories[1].order, 1);

        let settings = store
            .load_settings()?
            .ok_or_else(|| anyhow!("missing settings"))?;
        assert_eq!(settings.layout, json!({ "bgType": "bing" }));
        assert_eq!(settings.theme, json!({}));
        assert_eq!(settings.search_engine, DEFAULT_SEARCH_ENGINE);
        Ok(())
    }

    #[test]
    fn import_orders_repeated_category_by_first_position() -> Result<()> {
        let mut store = migrated_store()?;
        let payload = ImportPayload {
            categories: vec![
                "Work".to_string(),
                "Play".to_string(),
                "Work".to_string(),
            ],
            ..ImportPayload::default()
        };

        let summary = store.import_snapshot(&payload)?;
        assert_eq!(summary.categories_upserted, 2);

        let categories = store.list_categories()?;
        let orders = categories
            .iter()
            .map(|category| (category.name.as_str(), category.order))
            .collect::<Vec<_>>();
        assert_eq!(orders, [("Work", 0), ("Play", 1)]);
        Ok(())
    }

    #[test]
    fn import_keeps_existing_settings_that_are_not_in_the_payload() -> Result<()> {
        let mut store = migrated_store()?;
        store.update_settings(&SettingsUpdate {
            search_engine: Some("DuckDuckGo".to_string()),
            ..SettingsUpdate::default()
        })?;
        store.import_snapshot(&ImportPayload {
            theme: Some(json!({ "mode": "dark" })),
            ..ImportPayload::default()
        })?;
        store.import_snapshot(&ImportPayload {
            layout: Some(json!({ "columns": 6 })),
            ..ImportPayload::default()
        })?;

        let settings = store
            .load_settings()?
            .ok_or_else(|| anyhow!("missing settings"))?;
        assert_eq!(settings.theme, json!({ "mode": "dark" }));
        assert_eq!(settings.layout, json!({ "columns": 6 }));
        assert_eq!(settings.search_engine, "DuckDuckGo");
        Ok(())
    }

    #[test]
    fn legacy_integer_timestamps_are_readable() -> Result<()> {
        let store = migrated_store()?;
        store.connection().execute(
            r#"INSERT INTO "Site"(
                 "id", "name", "url", "category", "order", "createdAt", "updatedAt"
               ) VALUES (
                 'legacy', 'Legacy', 'https://legacy.example.com', 'Old', 0,
                 1700000000000, 1700000000000
               )"#,
            [],
        )?;

        let site = store
            .get_site("legacy")?
            .ok_or_else(|| anyhow!("missing site"))?;
        assert_eq!(site.created_at, "1700000000000");
        Ok(())
    }
}
