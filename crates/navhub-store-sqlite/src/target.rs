//! The schema the application code expects.
//!
//! This is the only place schema evolution is declared. Tables are listed
//! in dependency order. `columns` lists every column that has been added
//! since a table's first release, with the DDL used to add it to an older
//! database; columns present since the first release only appear in
//! `create_sql`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ddl: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub create_sql: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub create_sql: &'static str,
    pub columns: &'static [ColumnSpec],
    pub indexes: &'static [IndexSpec],
}

/// An ordering column that must hold values in the `i32` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderColumn {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSchema {
    pub tables: &'static [TableSpec],
    pub order_columns: &'static [OrderColumn],
}

impl TargetSchema {
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&'static TableSpec> {
        self.tables.iter().find(|table| table.name == name)
    }
}

const fn column(name: &'static str, ddl: &'static str) -> ColumnSpec {
    ColumnSpec { name, ddl }
}

const SITE_TABLE: TableSpec = TableSpec {
    name: "Site",
    create_sql: r#"
CREATE TABLE IF NOT EXISTS "Site" (
  "id" TEXT NOT NULL PRIMARY KEY,
  "name" TEXT NOT NULL,
  "url" TEXT NOT NULL,
  "desc" TEXT,
  "category" TEXT NOT NULL,
  "color" TEXT,
  "icon" TEXT,
  "iconType" TEXT,
  "customIconUrl" TEXT,
  "titleFont" TEXT,
  "descFont" TEXT,
  "titleColor" TEXT,
  "descColor" TEXT,
  "titleSize" INTEGER,
  "descSize" INTEGER,
  "isHidden" BOOLEAN NOT NULL DEFAULT false,
  "order" INTEGER NOT NULL DEFAULT 0,
  "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
  "updatedAt" DATETIME NOT NULL
);
"#,
    columns: &[
        column("titleFont", "TEXT"),
        column("descFont", "TEXT"),
        column("titleColor", "TEXT"),
        column("descColor", "TEXT"),
        column("titleSize", "INTEGER"),
        column("descSize", "INTEGER"),
        column("isHidden", "BOOLEAN NOT NULL DEFAULT false"),
    ],
    indexes: &[],
};

const CATEGORY_TABLE: TableSpec = TableSpec {
    name: "Category",
    create_sql: r#"
CREATE TABLE IF NOT EXISTS "Category" (
  "id" TEXT NOT NULL PRIMARY KEY,
  "name" TEXT NOT NULL,
  "color" TEXT,
  "isHidden" BOOLEAN NOT NULL DEFAULT false,
  "order" INTEGER NOT NULL DEFAULT 0,
  "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
  "updatedAt" DATETIME NOT NULL
);
"#,
    columns: &[
        column("color", "TEXT"),
        column("isHidden", "BOOLEAN NOT NULL DEFAULT false"),
        column("order", "INTEGER NOT NULL DEFAULT 0"),
        column("createdAt", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"),
        column("updatedAt", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    ],
    // Upserts by name rely on this index; very old databases lack it.
    indexes: &[IndexSpec {
        name: "Category_name_key",
        create_sql: r#"CREATE UNIQUE INDEX IF NOT EXISTS "Category_name_key" ON "Category"("name");"#,
    }],
};

const USER_TABLE: TableSpec = TableSpec {
    name: "User",
    create_sql: r#"
CREATE TABLE IF NOT EXISTS "User" (
  "username" TEXT NOT NULL PRIMARY KEY,
  "passwordHash" TEXT NOT NULL,
  "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
  "updatedAt" DATETIME NOT NULL
);
"#,
    columns: &[],
    indexes: &[],
};

const GLOBAL_SETTINGS_TABLE: TableSpec = TableSpec {
    name: "GlobalSettings",
    create_sql: r#"
CREATE TABLE IF NOT EXISTS "GlobalSettings" (
  "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT DEFAULT 1,
  "layout" TEXT NOT NULL,
  "config" TEXT NOT NULL,
  "theme" TEXT NOT NULL,
  "searchEngine" TEXT NOT NULL DEFAULT 'Google',
  "bingCacheMode" TEXT NOT NULL DEFAULT 'keep-all',
  "updatedAt" DATETIME NOT NULL
);
"#,
    columns: &[
        column("searchEngine", "TEXT NOT NULL DEFAULT 'Google'"),
        column("bingCacheMode", "TEXT NOT NULL DEFAULT 'keep-all'"),
        column("updatedAt", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    ],
    indexes: &[],
};

const WALLPAPER_TABLE: TableSpec = TableSpec {
    name: "Wallpaper",
    create_sql: r#"
CREATE TABLE IF NOT EXISTS "Wallpaper" (
  "id" TEXT NOT NULL PRIMARY KEY,
  "url" TEXT NOT NULL,
  "type" TEXT NOT NULL,
  "filename" TEXT NOT NULL,
  "size" INTEGER,
  "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    columns: &[
        column("size", "INTEGER"),
        column("createdAt", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    ],
    indexes: &[],
};

const CUSTOM_FONT_TABLE: TableSpec = TableSpec {
    name: "CustomFont",
    create_sql: r#"
CREATE TABLE IF NOT EXISTS "CustomFont" (
  "id" TEXT NOT NULL PRIMARY KEY,
  "name" TEXT NOT NULL,
  "family" TEXT NOT NULL,
  "url" TEXT NOT NULL,
  "provider" TEXT NOT NULL DEFAULT 'google',
  "createdAt" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    columns: &[
        column("provider", "TEXT NOT NULL DEFAULT 'google'"),
        column("createdAt", "DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"),
    ],
    indexes: &[],
};

pub static NAVHUB_SCHEMA: TargetSchema = TargetSchema {
    tables: &[
        SITE_TABLE,
        CATEGORY_TABLE,
        USER_TABLE,
        GLOBAL_SETTINGS_TABLE,
        WALLPAPER_TABLE,
        CUSTOM_FONT_TABLE,
    ],
    order_columns: &[OrderColumn {
        table: "Site",
        column: "order",
    }],
};
