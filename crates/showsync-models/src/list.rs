use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct List {
    pub list_id: String,
    pub name: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ListItemType {
    Show,
    Season,
    Episode,
}

impl ListItemType {
    pub fn code(self) -> i32 {
        match self {
            ListItemType::Show => 1,
            ListItemType::Season => 2,
            ListItemType::Episode => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ListItemType::Show),
            2 => Some(ListItemType::Season),
            3 => Some(ListItemType::Episode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListItem {
    pub item_id: String,
    pub list_id: String,
    pub item_type: ListItemType,
    pub item_ref_id: String,
}

impl ListItem {
    pub fn new(list_id: &str, item_type: ListItemType, item_ref_id: &str) -> Self {
        Self {
            item_id: Self::build_id(list_id, item_type, item_ref_id),
            list_id: list_id.to_string(),
            item_type,
            item_ref_id: item_ref_id.to_string(),
        }
    }

    /// Item ids are derived so the same reference in the same list always
    /// maps to the same row on every device.
    pub fn build_id(list_id: &str, item_type: ListItemType, item_ref_id: &str) -> String {
        format!("{}-{}-{}", item_ref_id, item_type.code(), list_id)
    }
}
