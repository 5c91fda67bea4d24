use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::order::normalize_site_order;
use crate::CoreError;

pub const DEFAULT_CATEGORY_COLOR: &str = "#6366F1";

/// Validate a user-entered site URL.
///
/// Absolute URLs are kept exactly as typed. A scheme-less host such as
/// `google.com` is retried with an `https://` prefix.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if Url::parse(trimmed).is_ok() {
        return Some(trimmed.to_string());
    }

    let prefixed = format!("https://{trimmed}");
    Url::parse(&prefixed).ok().map(|_| prefixed)
}

/// A site as submitted by a client, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSite {
    pub id: Option<String>,
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
    pub order: Value,
    pub is_hidden: Option<bool>,
}

/// A site that passed validation; `order` is already in `i32` range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidSite {
    pub id: Option<String>,
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
    pub order: i32,
    pub is_hidden: bool,
}

impl NewSite {
    /// Check required fields and normalize the URL and ordering value.
    ///
    /// # Errors
    /// Returns [`CoreError::Validation`] naming every missing or invalid field
    /// among `name`, `category` and `url`.
    pub fn validate(&self) -> Result<ValidSite, CoreError> {
        let name = self.name.trim();
        let category = self.category.trim();
        let url = normalize_url(&self.url);

        let mut invalid = Vec::new();
        if name.is_empty() {
            invalid.push("name");
        }
        if category.is_empty() {
            invalid.push("category");
        }
        if url.is_none() {
            invalid.push("url");
        }

        let Some(url) = url else {
            return Err(missing_fields(&invalid));
        };
        if !invalid.is_empty() {
            return Err(missing_fields(&invalid));
        }

        Ok(ValidSite {
            id: self.id.clone().filter(|id| !id.trim().is_empty()),
            name: name.to_string(),
            url,
            desc: self.desc.clone(),
            category: category.to_string(),
            color: self.color.clone(),
            icon: self.icon.clone(),
            icon_type: self.icon_type.clone(),
            custom_icon_url: self.custom_icon_url.clone(),
            title_font: self.title_font.clone(),
            desc_font: self.desc_font.clone(),
            title_color: self.title_color.clone(),
            desc_color: self.desc_color.clone(),
            title_size: self.title_size,
            desc_size: self.desc_size,
            order: normalize_site_order(&self.order, 0),
            is_hidden: self.is_hidden.unwrap_or(false),
        })
    }
}

fn missing_fields(fields: &[&str]) -> CoreError {
    CoreError::Validation(format!("missing or invalid site fields: {}", fields.join(", ")))
}

/// A partial edit of one existing site. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteUpdate {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub desc: Option<String>,
    pub category: Option<String>,
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
    pub order: Option<Value>,
    pub is_hidden: Option<bool>,
}

/// A [`SiteUpdate`] whose id, URL and ordering value have been checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SitePatch {
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub desc: Option<String>,
    pub category: Option<String>,
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
    pub order: Option<i32>,
    pub is_hidden: Option<bool>,
}

impl SiteUpdate {
    /// # Errors
    /// Returns [`CoreError::Validation`] when the id is blank, a provided URL
    /// does not parse, or a provided name or category is blank.
    pub fn validate(&self) -> Result<SitePatch, CoreError> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(CoreError::Validation("missing site id".to_string()));
        }

        let url = match self.url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(normalize_url(raw).ok_or_else(|| {
                CoreError::Validation(format!("invalid site url: {raw}"))
            })?),
        };

        let name = non_blank(self.name.as_deref(), "name")?;
        let category = non_blank(self.category.as_deref(), "category")?;

        Ok(SitePatch {
            id: id.to_string(),
            name,
            url,
            desc: self.desc.clone(),
            category,
            color: self.color.clone(),
            icon: self.icon.clone(),
            icon_type: self.icon_type.clone(),
            custom_icon_url: self.custom_icon_url.clone(),
            title_font: self.title_font.clone(),
            desc_font: self.desc_font.clone(),
            title_color: self.title_color.clone(),
            desc_color: self.desc_color.clone(),
            title_size: self.title_size,
            desc_size: self.desc_size,
            order: self
                .order
                .as_ref()
                .map(|order| normalize_site_order(order, 0)),
            is_hidden: self.is_hidden,
        })
    }
}

fn non_blank(value: Option<&str>, field: &str) -> Result<Option<String>, CoreError> {
    match value.map(str::trim) {
        None => Ok(None),
        Some("") => Err(missing_fields(&[field])),
        Some(trimmed) => Ok(Some(trimmed.to_string())),
    }
}

/// One entry of a drag-and-drop reorder batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteOrderUpdate {
    pub id: String,
    pub order: Value,
    pub category: Option<String>,
    pub is_hidden: Option<bool>,
}
