//! Domain rules for the navhub start page that do not touch storage.

pub mod order;
pub mod site;

pub use order::{
    normalize_order, normalize_order_i64, normalize_site_order, SITE_ORDER_INT32_MAX,
    SITE_ORDER_INT32_MIN, SITE_ORDER_MS_THRESHOLD,
};
pub use site::{
    normalize_url, NewSite, SiteOrderUpdate, SitePatch, SiteUpdate, ValidSite,
    DEFAULT_CATEGORY_COLOR,
};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),
}
