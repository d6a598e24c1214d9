use std::sync::Arc;

use tracing::{error, warn};

use super::is_blank;
use crate::data::{from_row, from_rows, tables, to_row, DataClient, Query};
use crate::error::{Error, Result};
use crate::models::{Idea, NewIdea};

/// Ideas collected for one event
pub struct IdeaStore {
    data: Arc<dyn DataClient>,
    event_id: String,
    ideas: Vec<Idea>,
    loading: bool,
}

impl IdeaStore {
    pub fn new(data: Arc<dyn DataClient>, event_id: &str) -> Self {
        Self {
            data,
            event_id: event_id.to_string(),
            ideas: Vec::new(),
            loading: true,
        }
    }

    pub fn ideas(&self) -> &[Idea] {
        &self.ideas
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub async fn fetch(&mut self) -> Result<()> {
        let result = self
            .data
            .select(
                Query::table(tables::IDEAS)
                    .eq("event_id", &self.event_id)
                    .order("created_at", false),
            )
            .await
            .and_then(from_rows::<Idea>);
        self.loading = false;
        match result {
            Ok(ideas) => {
                self.ideas = ideas;
                Ok(())
            }
            Err(e) => {
                error!(event_id = %self.event_id, error = %e, "Error fetching ideas");
                Err(e)
            }
        }
    }

    pub async fn refetch(&mut self) -> Result<()> {
        self.fetch().await
    }

    /// Record an idea from `person_name`; both fields are required
    pub async fn add_idea(&mut self, person_name: &str, idea_text: &str) -> Result<Idea> {
        if is_blank(person_name) || is_blank(idea_text) {
            return Err(Error::validation("Both name and idea are required"));
        }
        let idea = NewIdea {
            event_id: self.event_id.clone(),
            person_name: person_name.trim().to_string(),
            idea_text: idea_text.trim().to_string(),
        };

        let created: Idea = from_row(self.data.insert(tables::IDEAS, to_row(&idea)?).await?)?;
        if let Err(e) = self.fetch().await {
            warn!(error = %e, "idea list not refreshed");
        }
        Ok(created)
    }
}
