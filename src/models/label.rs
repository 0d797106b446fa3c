//! Series label model.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::errors::AppError;

pub const DEFAULT_LABEL_COLOR: &str = "#e6e6e6";

static NAME_AND_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)(#(?:[a-f\d]{3}){1,2})$").expect("valid regex"));

fn default_color() -> String {
    DEFAULT_LABEL_COLOR.to_string()
}

/// A label available in a meeting series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_default_label: bool,
}

impl Label {
    /// Builds a label from a request. A name of the form `name#rrggbb` carries
    /// its own color when no explicit color is given.
    pub fn from_request(request: UpsertLabelRequest) -> Result<Self, AppError> {
        let (name, color) = match request.color {
            Some(color) => (request.name, color),
            None => match separate_name_and_color(&request.name) {
                Some((name, color)) => (name, color),
                None => (request.name, default_color()),
            },
        };

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Label name is required".to_string()));
        }
        if !color::is_valid_hex_color_string(&color) {
            return Err(AppError::Validation(
                "Label color must be a valid hex code".to_string(),
            ));
        }

        Ok(Self {
            id: request.id.unwrap_or_default(),
            name,
            color,
            is_disabled: request.is_disabled,
            is_default_label: request.is_default_label,
        })
    }

    pub fn has_dark_background(&self) -> bool {
        color::is_dark_color(&self.color)
    }
}

/// Splits `name#color` into its parts, `None` when there is no color suffix.
pub fn separate_name_and_color(value: &str) -> Option<(String, String)> {
    let caps = NAME_AND_COLOR.captures(value)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Request body for creating or updating a label.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLabelRequest {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_default_label: bool,
}
