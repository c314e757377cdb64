pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod model;

pub use config::{Environment, EnvironmentConfig, MessageScripts, PipelineCatalog};
pub use error::ConfigError;
pub use geometry::{
    EdgeSegment, LayoutMeasure, NodeGeometry, NodeRect, PercentLayout, Point, Viewport,
    boundary_point, compute_node_geometry, edge_endpoints, route_edges,
};
pub use graph::{RenderEdge, StageGraph, StagePatch};
pub use model::*;
