//! Roles and the permissions they grant
//!
//! The role stored on a user's profile maps to a fixed permission set. A set
//! containing [`Permission::ViewAll`] satisfies every check.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::auth::AuthClient;
use crate::data::{tables, DataClient, Query};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewAll,
    EditAll,
    DeleteAll,
    ManageUsers,
    ViewTeam,
    ManageConfig,
    EditOwn,
    CreateEvents,
    AssignTasks,
    ViewOwn,
    CreateWorkLogs,
}

impl Permission {
    pub const ALL: [Permission; 11] = [
        Permission::ViewAll,
        Permission::EditAll,
        Permission::DeleteAll,
        Permission::ManageUsers,
        Permission::ViewTeam,
        Permission::ManageConfig,
        Permission::EditOwn,
        Permission::CreateEvents,
        Permission::AssignTasks,
        Permission::ViewOwn,
        Permission::CreateWorkLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewAll => "view_all",
            Permission::EditAll => "edit_all",
            Permission::DeleteAll => "delete_all",
            Permission::ManageUsers => "manage_users",
            Permission::ViewTeam => "view_team",
            Permission::ManageConfig => "manage_config",
            Permission::EditOwn => "edit_own",
            Permission::CreateEvents => "create_events",
            Permission::AssignTasks => "assign_tasks",
            Permission::ViewOwn => "view_own",
            Permission::CreateWorkLogs => "create_work_logs",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown permission: {}", s)))
    }
}

/// The three canonical roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    /// Fixed permissions granted by the role
    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Admin => &[ViewAll, EditAll, DeleteAll, ManageUsers, ViewTeam, ManageConfig],
            Role::Manager => &[ViewAll, EditOwn, CreateEvents, ViewTeam, AssignTasks],
            Role::Member => &[ViewOwn, EditOwn, CreateWorkLogs],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "member" => Ok(Role::Member),
            other => Err(Error::validation(format!("Unknown role: {}", other))),
        }
    }
}

/// A set of granted permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new<I: IntoIterator<Item = Permission>>(permissions: I) -> Self {
        Self(permissions.into_iter().collect())
    }

    /// Permissions for a stored role name; unrecognized names only get `view_own`
    pub fn for_role_name(role: &str) -> Self {
        match role.parse::<Role>() {
            Ok(role) => Self::for_role(role),
            Err(_) => Self::new([Permission::ViewOwn]),
        }
    }

    pub fn for_role(role: Role) -> Self {
        Self::new(role.permissions().iter().copied())
    }

    /// Whether `permission` is granted, directly or through `view_all`
    pub fn has(&self, permission: Permission) -> bool {
        self.0.contains(&permission) || self.0.contains(&Permission::ViewAll)
    }

    /// Same check for a permission given by name
    pub fn has_named(&self, permission: &str) -> bool {
        match permission.parse::<Permission>() {
            Ok(p) => self.has(p),
            Err(_) => self.0.contains(&Permission::ViewAll),
        }
    }

    /// Fail with a displayable message unless `permission` is granted
    pub fn require(&self, permission: Permission, message: &str) -> Result<()> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(Error::permission_denied(message))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl Default for PermissionSet {
    /// What a user holds before the profile role has been read
    fn default() -> Self {
        Self::new([Permission::ViewOwn, Permission::EditOwn])
    }
}

/// Reads the signed-in user's role and answers permission checks.
///
/// Each instance reads the profile on its own; nothing is shared or cached
/// between resolvers. A failed read keeps the previous state and is not
/// retried until [`PermissionResolver::refetch`] is called.
pub struct PermissionResolver {
    data: Arc<dyn DataClient>,
    auth: Arc<dyn AuthClient>,
    role: Option<Role>,
    permissions: PermissionSet,
    loading: bool,
}

impl PermissionResolver {
    pub fn new(data: Arc<dyn DataClient>, auth: Arc<dyn AuthClient>) -> Self {
        Self {
            data,
            auth,
            role: Some(Role::Member),
            permissions: PermissionSet::default(),
            loading: true,
        }
    }

    /// Read the current user's profile role
    pub async fn fetch(&mut self) -> Result<()> {
        let result = self.load().await;
        self.loading = false;
        if let Err(e) = &result {
            error!(error = %e, "Error fetching profile role");
        }
        result
    }

    /// Read the role again, e.g. after a failed fetch or a role change
    pub async fn refetch(&mut self) -> Result<()> {
        self.fetch().await
    }

    async fn load(&mut self) -> Result<()> {
        let user = match self.auth.get_user().await? {
            Some(user) => user,
            None => {
                debug!("no signed-in user, keeping default permissions");
                return Ok(());
            }
        };

        let row = self
            .data
            .select_one(Query::table(tables::PROFILES).select("role").eq("id", &user.id))
            .await?
            .ok_or_else(|| Error::not_found("Profile not found"))?;

        let role_name = row.get("role").and_then(Value::as_str).unwrap_or_default();
        self.role = role_name.parse().ok();
        self.permissions = PermissionSet::for_role_name(role_name);
        debug!(user_id = %user.id, role = role_name, "resolved permissions");
        Ok(())
    }

    /// The resolved role; `None` when the profile holds an unrecognized role
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.has(permission)
    }
}
