use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::data::{from_rows, tables, value_text, DataClient, Filter, Query, Row};
use crate::error::{Error, Result};
use crate::loader::select_in;
use crate::models::{Profile, TaskStatus, TeamMember};
use crate::permissions::{Permission, PermissionSet, Role};

/// Team members with their task counters
pub struct TeamStore {
    data: Arc<dyn DataClient>,
    members: Vec<TeamMember>,
    loading: bool,
}

impl TeamStore {
    pub fn new(data: Arc<dyn DataClient>) -> Self {
        Self {
            data,
            members: Vec::new(),
            loading: true,
        }
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Read every profile, oldest first, with assigned and completed task counts
    pub async fn fetch(&mut self, permissions: &PermissionSet) -> Result<()> {
        permissions.require(
            Permission::ViewTeam,
            "You don't have permission to view the team page.",
        )?;
        let result = self.load().await;
        self.loading = false;
        match result {
            Ok(members) => {
                self.members = members;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Error fetching team members");
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Vec<TeamMember>> {
        let profiles: Vec<Profile> = from_rows(
            self.data
                .select(Query::table(tables::PROFILES).order("created_at", true))
                .await?,
        )?;
        if profiles.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        let query = Query::table(tables::TASKS).select("assigned_to,status");
        let tasks = select_in(self.data.as_ref(), query, "assigned_to", &ids).await?;

        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for task in &tasks {
            let Some(assignee) = task.get("assigned_to").filter(|v| !v.is_null()) else {
                continue;
            };
            let entry = counts.entry(value_text(assignee)).or_default();
            entry.0 += 1;
            if task.get("status").and_then(Value::as_str) == Some(TaskStatus::Completed.as_str()) {
                entry.1 += 1;
            }
        }

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let (tasks_assigned, tasks_completed) = counts.get(&profile.id).copied().unwrap_or_default();
                TeamMember {
                    profile,
                    tasks_assigned,
                    tasks_completed,
                }
            })
            .collect())
    }

    /// Give `member_id` a new role, then reload the team
    pub async fn update_member_role(
        &mut self,
        permissions: &PermissionSet,
        member_id: &str,
        role: Role,
    ) -> Result<()> {
        permissions.require(
            Permission::ManageUsers,
            "You do not have permission to update member roles",
        )?;

        let mut patch = Row::new();
        patch.insert("role".into(), json!(role));
        let updated = self
            .data
            .update(tables::PROFILES, patch, vec![Filter::eq("id", member_id)])
            .await?;
        if updated.is_empty() {
            return Err(Error::not_found("Team member not found"));
        }
        info!(member_id, role = %role, "member role updated");

        self.fetch(permissions).await
    }
}
