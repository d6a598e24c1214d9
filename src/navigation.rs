//! Navigation entries and their visibility

use serde::{Deserialize, Serialize};

use crate::permissions::Permission;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavItem {
    pub id: String,
    pub name: String,
    pub href: String,
    pub icon: String,
    pub order_index: u32,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permission: Option<Permission>,
}

impl NavItem {
    fn new(id: &str, name: &str, href: &str, icon: &str, order_index: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            href: href.to_string(),
            icon: icon.to_string(),
            order_index,
            is_active: true,
            required_permission: None,
        }
    }

    fn requires(mut self, permission: Permission) -> Self {
        self.required_permission = Some(permission);
        self
    }
}

/// Changes to one navigation entry; unset fields are kept
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavItemPatch {
    pub name: Option<String>,
    pub href: Option<String>,
    pub icon: Option<String>,
    pub order_index: Option<u32>,
    pub is_active: Option<bool>,
    pub required_permission: Option<Option<Permission>>,
}

/// The application's fixed menu
pub fn default_navigation() -> Vec<NavItem> {
    vec![
        NavItem::new("1", "Dashboard", "/", "Home", 1),
        NavItem::new("2", "Events", "/events", "Calendar", 2),
        NavItem::new("3", "Work Logs", "/work-logs", "FileText", 3),
        NavItem::new("4", "Team", "/team", "Users", 4).requires(Permission::ViewTeam),
        NavItem::new("5", "Settings", "/settings", "Settings", 5).requires(Permission::ManageConfig),
    ]
}

/// Keep the entries the user may see, in their original order
pub fn filter_navigation<F>(items: &[NavItem], has_permission: F) -> Vec<NavItem>
where
    F: Fn(Permission) -> bool,
{
    items
        .iter()
        .filter(|item| item.required_permission.map_or(true, &has_permission))
        .cloned()
        .collect()
}

/// Navigation list held by the application
#[derive(Debug, Clone)]
pub struct Navigation {
    items: Vec<NavItem>,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            items: default_navigation(),
        }
    }
}

impl Navigation {
    pub fn new(items: Vec<NavItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[NavItem] {
        &self.items
    }

    /// Entries visible under `has_permission`
    pub fn visible<F>(&self, has_permission: F) -> Vec<NavItem>
    where
        F: Fn(Permission) -> bool,
    {
        filter_navigation(&self.items, has_permission)
    }

    /// Apply `patch` to the entry with `id`; returns false when there is none
    pub fn update_item(&mut self, id: &str, patch: NavItemPatch) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        if let Some(name) = patch.name {
            item.name = name;
        }
        if let Some(href) = patch.href {
            item.href = href;
        }
        if let Some(icon) = patch.icon {
            item.icon = icon;
        }
        if let Some(order_index) = patch.order_index {
            item.order_index = order_index;
        }
        if let Some(is_active) = patch.is_active {
            item.is_active = is_active;
        }
        if let Some(required) = patch.required_permission {
            item.required_permission = required;
        }
        true
    }
}
