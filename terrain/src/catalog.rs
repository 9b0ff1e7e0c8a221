//! Project and profile storage.
//!
//! Profile construction only depends on the [ProjectSource] and
//! [ProfileSink] traits; [MemoryCatalog] is an in-process
//! implementation of both.

use crate::{profile::ProfileSummary, Profile, TerrainError};
use chrono::{DateTime, Utc};
use contour::{synth::Generator, ContourError, Isoline};
use dashmap::DashMap;
use geo::geometry::{Coord, Polygon, Rect};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Area of interest covered by an isoline dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub bbox: Polygon<f64>,
    pub created_at: DateTime<Utc>,
}

/// A profile bundled with its project and the project's isolines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub project: Project,

    /// Ordered by level.
    pub isolines: Vec<Isoline>,

    pub profile: Profile,
}

/// Looks up projects by id.
pub trait ProjectSource: Send + Sync {
    fn project(&self, id: Uuid) -> Option<Project>;
}

/// Stores finished profiles.
///
/// A profile header and its points are written as one unit; a failed
/// write must leave nothing behind.
pub trait ProfileSink: Send + Sync {
    fn persist(&self, profile: &Profile) -> Result<(), TerrainError>;
}

/// Default area seeded for demo projects.
pub fn demo_bbox() -> Rect<f64> {
    Rect::new(Coord { x: -0.1, y: -0.1 }, Coord { x: 0.1, y: 0.1 })
}

struct ProjectRecord {
    project: Project,
    isolines: Vec<Isoline>,
}

#[derive(Default)]
pub struct MemoryCatalog {
    /// Each project is stored together with its isolines.
    projects: DashMap<Uuid, Arc<ProjectRecord>>,

    profiles: DashMap<Uuid, Arc<Profile>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a project covering `isolines`.
    ///
    /// The project's bbox is the isolines' combined envelope.
    pub fn create_project(
        &self,
        owner_id: Uuid,
        name: &str,
        isolines: Vec<Isoline>,
    ) -> Result<Project, TerrainError> {
        let bbox = isolines
            .iter()
            .filter_map(Isoline::envelope)
            .reduce(merge)
            .ok_or(ContourError::NoCoverage)?;
        Ok(self.insert(owner_id, name, bbox, isolines))
    }

    /// Registers a project backed by isolines synthesized over `bbox`.
    ///
    /// As with [create_project](Self::create_project), the project's
    /// bbox is the envelope of what was generated.
    pub fn seed_project(
        &self,
        owner_id: Uuid,
        name: &str,
        generator: &Generator,
        bbox: Rect<f64>,
    ) -> Result<Project, TerrainError> {
        let isolines = generator.generate(bbox)?;
        self.create_project(owner_id, name, isolines)
    }

    /// Projects belonging to `owner_id`, oldest first.
    pub fn projects(&self, owner_id: Uuid) -> Vec<Project> {
        let mut projects: Vec<Project> = self
            .projects
            .iter()
            .filter(|record| record.project.owner_id == owner_id)
            .map(|record| record.project.clone())
            .collect();
        projects.sort_by_key(|project| project.created_at);
        projects
    }

    /// Snapshot of every project's isolines.
    pub fn contours(&self) -> Vec<Isoline> {
        self.projects
            .iter()
            .flat_map(|record| record.isolines.clone())
            .collect()
    }

    pub fn project_contours(&self, id: Uuid) -> Option<Vec<Isoline>> {
        self.projects.get(&id).map(|record| record.isolines.clone())
    }

    pub fn profile(&self, project_id: Uuid, id: Uuid) -> Option<Profile> {
        self.profiles
            .get(&id)
            .filter(|profile| profile.project_id == project_id)
            .map(|profile| Profile::clone(&profile))
    }

    /// Everything needed to render one profile of `owner_id`'s
    /// project.
    pub fn report(&self, owner_id: Uuid, project_id: Uuid, profile_id: Uuid) -> Option<ProfileReport> {
        let record = self
            .projects
            .get(&project_id)
            .filter(|record| record.project.owner_id == owner_id)
            .map(|record| Arc::clone(&record))?;
        let profile = self.profile(project_id, profile_id)?;
        let mut isolines = record.isolines.clone();
        isolines.sort_by(|a, b| a.level.total_cmp(&b.level));
        Some(ProfileReport {
            project: record.project.clone(),
            isolines,
            profile,
        })
    }

    /// Summaries of a project's profiles, oldest first.
    pub fn profiles(&self, project_id: Uuid) -> Vec<ProfileSummary> {
        let mut summaries: Vec<ProfileSummary> = self
            .profiles
            .iter()
            .filter(|profile| profile.project_id == project_id)
            .map(|profile| profile.summary())
            .collect();
        summaries.sort_by_key(|summary| summary.created_at);
        summaries
    }
}

/// Private API.
impl MemoryCatalog {
    fn insert(&self, owner_id: Uuid, name: &str, bbox: Rect<f64>, isolines: Vec<Isoline>) -> Project {
        let project = Project {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_owned(),
            bbox: bbox.to_polygon(),
            created_at: Utc::now(),
        };
        info!(
            "created project {} ({}), isolines: {}",
            project.id,
            project.name,
            isolines.len()
        );
        self.projects.insert(
            project.id,
            Arc::new(ProjectRecord {
                project: project.clone(),
                isolines,
            }),
        );
        project
    }
}

impl ProjectSource for MemoryCatalog {
    fn project(&self, id: Uuid) -> Option<Project> {
        self.projects.get(&id).map(|record| record.project.clone())
    }
}

impl ProfileSink for MemoryCatalog {
    fn persist(&self, profile: &Profile) -> Result<(), TerrainError> {
        self.profiles.insert(profile.id, Arc::new(profile.clone()));
        Ok(())
    }
}

fn merge(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}
