use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::registry::{CollectionRegistry, RegistryError};
use crate::model::{Identity, PathIdentifierMap};
use crate::store::memory::{MemoryCollection, Record};
use crate::store::traits::CollectionError;

pub const PROJECTS: &str = "projects";
pub const WIDGETS: &str = "widgets";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Record for Project {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_ids(&self) -> PathIdentifierMap {
        PathIdentifierMap::new()
    }

    fn from_body(
        id: Uuid,
        requestor: &Identity,
        _parent_ids: PathIdentifierMap,
        body: &[u8],
    ) -> Result<Self, CollectionError> {
        let body: ProjectBody = serde_json::from_slice(body)?;
        Ok(Project {
            id,
            name: body.name,
            description: body.description,
            created_by: requestor.user_id.clone(),
            created_at: Utc::now(),
        })
    }

    fn apply_edit(&mut self, body: &[u8]) -> Result<(), CollectionError> {
        let body: ProjectBody = serde_json::from_slice(body)?;
        self.name = body.name;
        self.description = body.description;
        Ok(())
    }
}

/// A widget always belongs to a project: `/projects/<id>/widgets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub color: String,
    pub price: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct WidgetBody {
    pub name: String,
    pub color: String,
    pub price: f64,
}

impl Record for Widget {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_ids(&self) -> PathIdentifierMap {
        [(PROJECTS.to_string(), self.project_id)]
            .into_iter()
            .collect()
    }

    fn from_body(
        id: Uuid,
        requestor: &Identity,
        parent_ids: PathIdentifierMap,
        body: &[u8],
    ) -> Result<Self, CollectionError> {
        let project_id = *parent_ids.get(PROJECTS).ok_or_else(|| {
            CollectionError::Rejected("widgets must be created under a project".to_string())
        })?;
        let body: WidgetBody = serde_json::from_slice(body)?;
        if body.price < 0.0 {
            return Err(CollectionError::Rejected(format!(
                "price must not be negative ({})",
                body.price
            )));
        }

        Ok(Widget {
            id,
            project_id,
            name: body.name,
            color: body.color,
            price: body.price,
            created_by: requestor.user_id.clone(),
            created_at: Utc::now(),
        })
    }

    fn apply_edit(&mut self, body: &[u8]) -> Result<(), CollectionError> {
        let body: WidgetBody = serde_json::from_slice(body)?;
        self.name = body.name;
        self.color = body.color;
        self.price = body.price;
        Ok(())
    }
}

/// The demo collections, kept as handles so data can be loaded after registration.
#[derive(Clone)]
pub struct DemoCollections {
    pub projects: Arc<MemoryCollection<Project>>,
    pub widgets: Arc<MemoryCollection<Widget>>,
}

impl DemoCollections {
    pub fn new() -> Self {
        Self {
            projects: Arc::new(MemoryCollection::new(PROJECTS)),
            widgets: Arc::new(MemoryCollection::new(WIDGETS).with_ancestors([PROJECTS])),
        }
    }

    pub fn register(&self, registry: &mut CollectionRegistry) -> Result<(), RegistryError> {
        registry.register_shared(self.projects.clone())?;
        registry.register_shared(self.widgets.clone())?;
        Ok(())
    }
}

impl Default for DemoCollections {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a small catalogue for demonstration
pub fn load_seed_data(collections: &DemoCollections) {
    let now = Utc::now();
    let system = "system".to_string();

    let catalogue = [
        (
            "Garden",
            Some("Outdoor fittings"),
            vec![("Hose reel", "green", 24.99), ("Trowel", "silver", 7.5)],
        ),
        (
            "Workshop",
            None,
            vec![
                ("Vice", "blue", 89.0),
                ("Clamp", "orange", 12.0),
                ("Mallet", "brown", 15.25),
            ],
        ),
    ];

    for (name, description, widgets) in catalogue {
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_by: system.clone(),
            created_at: now,
        };

        for (widget_name, color, price) in widgets {
            collections.widgets.insert(Widget {
                id: Uuid::new_v4(),
                project_id: project.id,
                name: widget_name.to_string(),
                color: color.to_string(),
                price,
                created_by: system.clone(),
                created_at: now,
            });
        }
        collections.projects.insert(project);
    }

    log::info!(
        "Seeded {} projects and {} widgets",
        collections.projects.len(),
        collections.widgets.len()
    );
}
