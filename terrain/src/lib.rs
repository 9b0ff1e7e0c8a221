//! Terrain elevation profiles from isoline data.
//!
//! A [Profile] is built between two geographic points by sampling the
//! straight Web Mercator chord, resolving each sample's elevation
//! from an isoline [SpatialIndex](contour::SpatialIndex), fitting a
//! monotone cubic through the samples, smoothing the dense result and
//! flagging where the path crosses an isoline.

pub mod catalog;
mod config;
pub mod crossing;
pub mod elevation;
mod error;
pub mod interp;
pub mod math;
mod profile;
pub mod smooth;

pub use crate::{
    catalog::{MemoryCatalog, ProfileReport, ProfileSink, Project, ProjectSource},
    config::{CrossingConfig, ProfileConfig, ResolverConfig, ResolverKind, SmoothingConfig},
    elevation::{resolver_from_config, ElevationResolver},
    error::{InvalidArgument, TerrainError},
    profile::{
        CancelToken, Profile, ProfileBuilder, ProfilePoint, ProfileSummary, Profiler, Progress,
        Stage,
    },
};
