use serde::{Deserialize, Serialize};

use super::de;

/// Категория билетов; неизменна на всё время жизни движка.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "de::string_or_number")]
    pub value: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Поиск категории по ключу в упорядоченном списке.
pub fn find<'a>(categories: &'a [Category], value: &str) -> Option<&'a Category> {
    categories.iter().find(|c| c.value == value)
}
