//! Store-wide settings edited in the admin and shown on the storefront.
//!
//! Settings are stored one row per key as JSON values, so adding a setting
//! never needs a migration.

use serde::{Deserialize, Serialize};

pub const STORE_NAME: &str = "store_name";
pub const TAGLINE: &str = "tagline";
pub const CONTACT_WHATSAPP: &str = "contact_whatsapp";
pub const LOGO_URL: &str = "logo_url";

const DEFAULT_STORE_NAME: &str = "Partitur";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub store_name: String,
    pub tagline: Option<String>,
    /// Normalised `628…` number, rendered as a wa.me link by the front end.
    pub contact_whatsapp: Option<String>,
    pub logo_url: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            tagline: None,
            contact_whatsapp: None,
            logo_url: None,
        }
    }
}

impl StoreSettings {
    /// Build settings from stored `(key, value)` rows.
    ///
    /// Unknown keys are ignored and non-string values count as unset.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let text = value
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from);
            match key.as_str() {
                STORE_NAME => {
                    if let Some(name) = text {
                        settings.store_name = name;
                    }
                }
                TAGLINE => settings.tagline = text,
                CONTACT_WHATSAPP => settings.contact_whatsapp = text,
                LOGO_URL => settings.logo_url = text,
                _ => {}
            }
        }
        settings
    }

    /// Rows to store, one per key.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, serde_json::Value)> {
        let opt = |v: &Option<String>| {
            v.as_ref()
                .map_or(serde_json::Value::Null, |s| serde_json::Value::String(s.clone()))
        };
        vec![
            (STORE_NAME, serde_json::Value::String(self.store_name.clone())),
            (TAGLINE, opt(&self.tagline)),
            (CONTACT_WHATSAPP, opt(&self.contact_whatsapp)),
            (LOGO_URL, opt(&self.logo_url)),
        ]
    }
}
