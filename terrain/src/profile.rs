use crate::{
    catalog::{ProfileSink, ProjectSource},
    config::ProfileConfig,
    crossing::{crossing_distances, decluster, enforce_min_gap, flag_samples},
    elevation::{resolver_from_config, ElevationResolver},
    interp::Pchip,
    math::{linspace, to_geographic, to_planar, Chord},
    smooth::SavitzkyGolay,
    InvalidArgument, TerrainError,
};
use chrono::{DateTime, Utc};
use contour::SpatialIndex;
use geo::geometry::Coord;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};
use uuid::Uuid;

/// A persisted elevation profile between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,

    pub project_id: Uuid,

    /// Geographic start `(lon, lat)`.
    pub start: Coord<f64>,

    /// Geographic end `(lon, lat)`.
    pub end: Coord<f64>,

    /// Planar distance from `start` to `end` in meters.
    pub length_m: f64,

    pub created_at: DateTime<Utc>,

    /// Evenly spaced samples from `start` (distance 0) to `end`
    /// (distance `length_m`).
    pub points: Vec<ProfilePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub seq: usize,

    /// Meters from the profile start.
    pub distance_m: f64,

    pub elevation_m: f64,

    /// Set when the path crosses an isoline at this sample.
    pub on_isoline: bool,
}

/// Listing view of a [Profile], without its points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub start: Coord<f64>,
    pub end: Coord<f64>,
    pub length_m: f64,
    pub created_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            start: profile.start,
            end: profile.end,
            length_m: profile.length_m,
            created_at: profile.created_at,
        }
    }
}

/// Profile construction stages, in execution order.
///
/// `Done` and `Error` are terminal; any stage may end in `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Validating,
    Sampling,
    Resolving,
    Interpolating,
    Smoothing,
    Detecting,
    Persisting,
    Done,
    Error,
}

impl Stage {
    const ALL: [Self; 9] = [
        Self::Validating,
        Self::Sampling,
        Self::Resolving,
        Self::Interpolating,
        Self::Smoothing,
        Self::Detecting,
        Self::Persisting,
        Self::Done,
        Self::Error,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Last stage entered by a build, readable from other threads.
///
/// Holds `None` until the build starts.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU8>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Option<Stage> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            n => Stage::ALL.get(usize::from(n) - 1).copied(),
        }
    }

    fn set(&self, stage: Stage) {
        #[allow(clippy::cast_possible_truncation)]
        self.0.store(stage as u8 + 1, Ordering::SeqCst);
    }
}

/// Externally controlled cancellation flag.
///
/// Checked before each [Stage]; a cancelled build never reaches the
/// profile sink.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared, long lived profile machinery.
///
/// One `Profiler` serves any number of concurrent builds.
pub struct Profiler {
    config: ProfileConfig,

    /// Isolines backing both elevation and crossing detection.
    index: Arc<SpatialIndex>,

    resolver: Arc<dyn ElevationResolver>,

    smoother: SavitzkyGolay,

    /// Bounded pool for the elevation fan-out.
    pool: rayon::ThreadPool,

    projects: Arc<dyn ProjectSource>,

    sink: Arc<dyn ProfileSink>,
}

impl Profiler {
    pub fn new(
        config: ProfileConfig,
        index: Arc<SpatialIndex>,
        projects: Arc<dyn ProjectSource>,
        sink: Arc<dyn ProfileSink>,
    ) -> Result<Self, TerrainError> {
        config.validate()?;
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let workers = cores * config.workers_per_core.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("resolver-{i}"))
            .build()?;
        let resolver = resolver_from_config(&config.resolver, Arc::clone(&index));
        debug!(
            "profiler; isolines: {}, workers: {}, resolver: {:?}",
            index.len(),
            workers,
            config.resolver.kind
        );
        Ok(Self {
            config,
            index,
            resolver,
            smoother: SavitzkyGolay::new(),
            pool,
            projects,
            sink,
        })
    }

    /// Replaces the configured elevation resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ElevationResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<SpatialIndex> {
        &self.index
    }
}

impl Profile {
    pub fn builder() -> ProfileBuilder {
        ProfileBuilder::default()
    }

    /// Iterates `(distance_m, elevation_m)` pairs.
    pub fn series(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().map(|p| (p.distance_m, p.elevation_m))
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary::from(self)
    }

    /// Samples where the path crosses an isoline, in path order.
    pub fn main_points(&self) -> impl Iterator<Item = &ProfilePoint> + '_ {
        self.points.iter().filter(|p| p.on_isoline)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    project: Option<Uuid>,

    /// Geographic `(lon, lat)`.
    start: Option<Coord<f64>>,

    /// Geographic `(lon, lat)`.
    end: Option<Coord<f64>>,

    /// Raw sampling step override (meters).
    step_size_m: Option<f64>,

    cancel: Option<CancelToken>,

    progress: Option<Progress>,
}

/// A raw sample along the planar chord.
#[derive(Debug, Clone, Copy)]
struct Sample {
    distance: f64,
    geographic: Coord<f64>,
}

impl ProfileBuilder {
    #[must_use]
    pub fn project(mut self, id: Uuid) -> Self {
        self.project = Some(id);
        self
    }

    #[must_use]
    pub fn start(mut self, coord: Coord<f64>) -> Self {
        self.start = Some(coord);
        self
    }

    #[must_use]
    pub fn end(mut self, coord: Coord<f64>) -> Self {
        self.end = Some(coord);
        self
    }

    #[must_use]
    pub fn step_size(mut self, meters: f64) -> Self {
        self.step_size_m = Some(meters);
        self
    }

    #[must_use]
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Builds and persists a profile.
    ///
    /// On failure the build ends in [Stage::Error] and the error is
    /// logged with the stage it failed in.
    pub fn build(&self, profiler: &Profiler) -> Result<Profile, TerrainError> {
        let mut stage = Stage::Validating;
        match self.run(profiler, &mut stage) {
            Ok(profile) => {
                self.mark(Stage::Done);
                debug!("profile {}; stage: {:?}", profile.id, Stage::Done);
                Ok(profile)
            }
            Err(err) => {
                warn!("profile; failed in {stage:?}: {err}");
                self.mark(Stage::Error);
                Err(err)
            }
        }
    }
}

/// Private API.
impl ProfileBuilder {
    fn run(&self, profiler: &Profiler, stage: &mut Stage) -> Result<Profile, TerrainError> {
        let config = &profiler.config;
        let mut timings: Vec<(Stage, Duration)> = Vec::with_capacity(8);

        // Validating
        let now = self.enter(Stage::Validating, stage)?;
        let project_id = self
            .project
            .ok_or(InvalidArgument::MissingParameter("project"))?;
        let start = self.start.ok_or(InvalidArgument::MissingParameter("start"))?;
        let end = self.end.ok_or(InvalidArgument::MissingParameter("end"))?;
        if ![start.x, start.y, end.x, end.y].iter().all(|v| v.is_finite()) {
            return Err(InvalidArgument::NonFinite.into());
        }
        let step_m = self.step_size_m.unwrap_or(config.sampling_step_m);
        if !(step_m.is_finite() && step_m > 0.0) {
            return Err(InvalidArgument::NonPositiveStep.into());
        }
        let separation = end - start;
        if separation.x.hypot(separation.y) < config.min_separation_deg {
            return Err(InvalidArgument::TooClose.into());
        }
        profiler
            .projects
            .project(project_id)
            .ok_or(TerrainError::ProjectNotFound(project_id))?;
        let chord = Chord::new(to_planar(start), to_planar(end));
        let length_m = chord.length();
        if length_m < step_m {
            return Err(InvalidArgument::TooShort {
                distance_m: length_m,
                step_m,
            }
            .into());
        }
        timings.push((Stage::Validating, now.elapsed()));

        // Sampling
        let now = self.enter(Stage::Sampling, stage)?;
        let samples: Vec<Sample> = linspace(0.0, length_m, sample_count(length_m, step_m, config))
            .map(|distance| Sample {
                distance,
                geographic: to_geographic(chord.point_at(distance)),
            })
            .collect();
        timings.push((Stage::Sampling, now.elapsed()));

        // Resolving
        let now = self.enter(Stage::Resolving, stage)?;
        let mut elevations = Vec::with_capacity(samples.len());
        profiler.pool.install(|| {
            samples
                .par_iter()
                .map(|sample| profiler.resolver.resolve(sample.geographic))
                .collect_into_vec(&mut elevations);
        });
        timings.push((Stage::Resolving, now.elapsed()));

        // Interpolating
        let now = self.enter(Stage::Interpolating, stage)?;
        let pchip = Pchip::new(samples.iter().map(|s| s.distance).collect(), elevations)?;
        let distances: Vec<f64> = linspace(0.0, length_m, config.output_samples).collect();
        let dense: Vec<f64> = distances.iter().map(|&d| pchip.interpolate(d)).collect();
        timings.push((Stage::Interpolating, now.elapsed()));

        // Smoothing
        let now = self.enter(Stage::Smoothing, stage)?;
        let smoothed =
            profiler
                .smoother
                .smooth(&dense, config.smoothing.window, config.smoothing.order)?;
        timings.push((Stage::Smoothing, now.elapsed()));

        // Detecting
        let now = self.enter(Stage::Detecting, stage)?;
        let crossings = crossing_distances(
            &profiler.index,
            start,
            end,
            &chord,
            config.crossing.envelope_pad_deg,
        );
        let accepted = decluster(&crossings, config.crossing.cluster_radius_m);
        let flags = enforce_min_gap(
            &distances,
            &flag_samples(&accepted, length_m, distances.len()),
            config.crossing.min_gap_m,
        );
        timings.push((Stage::Detecting, now.elapsed()));

        // Persisting
        let now = self.enter(Stage::Persisting, stage)?;
        let points = distances
            .into_iter()
            .zip(smoothed)
            .zip(flags)
            .enumerate()
            .map(|(seq, ((distance_m, elevation_m), on_isoline))| ProfilePoint {
                seq,
                distance_m,
                elevation_m,
                on_isoline,
            })
            .collect();
        let profile = Profile {
            id: Uuid::new_v4(),
            project_id,
            start,
            end,
            length_m,
            created_at: Utc::now(),
            points,
        };
        profiler.sink.persist(&profile)?;
        timings.push((Stage::Persisting, now.elapsed()));

        debug!(
            "profile; len: {}, raw: {}, crossings: {}/{}, exec: {:?}",
            profile.points.len(),
            samples.len(),
            accepted.len(),
            crossings.len(),
            timings
        );
        info!(
            "persisted profile {} for project {}, length {:.1} m",
            profile.id, project_id, length_m
        );
        Ok(profile)
    }

    /// Moves to `next`. Fails if cancelled, otherwise starts timing
    /// `next`.
    fn enter(&self, next: Stage, current: &mut Stage) -> Result<std::time::Instant, TerrainError> {
        *current = next;
        self.mark(next);
        if self.cancel.as_ref().map_or(false, CancelToken::is_cancelled) {
            debug!("profile; cancelled before {next:?}");
            return Err(TerrainError::Cancelled(next));
        }
        debug!("profile; stage: {next:?}");
        Ok(std::time::Instant::now())
    }

    fn mark(&self, stage: Stage) {
        if let Some(progress) = &self.progress {
            progress.set(stage);
        }
    }
}

/// Raw sample count, `ceil(length / step)` clamped to the configured
/// bounds.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn sample_count(length_m: f64, step_m: f64, config: &ProfileConfig) -> usize {
    let min = config.min_samples.max(2);
    let max = config.max_samples.max(min);
    ((length_m / step_m).ceil().min(max as f64) as usize).clamp(min, max)
}
