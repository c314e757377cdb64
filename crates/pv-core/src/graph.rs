//! Stage graph model: the live, mutable stage map of one environment.
//!
//! The graph owns fresh copies of the configuration's stage templates and
//! applies partial updates (`StagePatch`) to them. The configuration itself
//! is shared read-only, so `reset_all` can always restore the initial state.

use crate::config::{Environment, EnvironmentConfig};
use crate::model::{DetailValue, Stage, StageName, StageStatus};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{DfsEvent, depth_first_search};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A partial update merged into one stage.
///
/// Applied in field order: status, log replacement, log appends, metric
/// replacement, metric merges.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StagePatch {
    pub status: Option<StageStatus>,
    pub logs: Option<Vec<String>>,
    pub append_logs: SmallVec<[String; 2]>,
    pub metrics: Option<BTreeMap<String, DetailValue>>,
    pub merge_metrics: SmallVec<[(String, DetailValue); 3]>,
}

impl StagePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn replace_logs<I, S>(mut self, logs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logs = Some(logs.into_iter().map(Into::into).collect());
        self
    }

    pub fn append_log(mut self, line: impl Into<String>) -> Self {
        self.append_logs.push(line.into());
        self
    }

    pub fn replace_metrics(mut self, metrics: BTreeMap<String, DetailValue>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metric(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.merge_metrics.push((key.into(), value.into()));
        self
    }

    fn apply_to(&self, stage: &mut Stage) {
        if let Some(status) = self.status {
            stage.status = status;
        }
        if let Some(logs) = &self.logs {
            stage.details.logs = logs.clone();
        }
        stage
            .details
            .logs
            .extend(self.append_logs.iter().cloned());
        if let Some(metrics) = &self.metrics {
            stage.details.metrics = metrics.clone();
        }
        for (key, value) in &self.merge_metrics {
            stage.details.metrics.insert(key.clone(), value.clone());
        }
    }
}

/// A render edge with its feedback classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub from: StageName,
    pub to: StageName,
    /// Closes a loop back toward the start of the pipeline; drawn dashed.
    pub feedback: bool,
}

/// Live stage state of one environment.
#[derive(Debug, Clone)]
pub struct StageGraph {
    config: Arc<EnvironmentConfig>,
    stages: BTreeMap<StageName, Stage>,
    edges: Vec<RenderEdge>,
}

impl StageGraph {
    pub fn new(config: Arc<EnvironmentConfig>) -> Self {
        let edges = classify_edges(&config);
        let stages = config.stages.clone();
        Self {
            config,
            stages,
            edges,
        }
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    pub fn config(&self) -> &Arc<EnvironmentConfig> {
        &self.config
    }

    /// A stage of this environment, or `None` when the environment does not
    /// include that stage kind.
    pub fn get(&self, name: StageName) -> Option<&Stage> {
        self.stages.get(&name)
    }

    pub fn contains(&self, name: StageName) -> bool {
        self.stages.contains_key(&name)
    }

    /// Stages in canonical (declaration) order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }

    pub fn order(&self) -> &[StageName] {
        &self.config.order
    }

    pub fn edges(&self) -> &[RenderEdge] {
        &self.edges
    }

    /// Whether this stage starts a feedback loop (drawn with a dashed border).
    pub fn is_feedback_source(&self, name: StageName) -> bool {
        self.edges.iter().any(|e| e.feedback && e.from == name)
    }

    /// Restore every stage to a fresh copy of its template.
    pub fn reset_all(&mut self) {
        self.stages = self.config.stages.clone();
    }

    /// Merge `patch` into the named stage. Returns `false` (and changes
    /// nothing) when the stage is absent.
    pub fn apply_patch(&mut self, name: StageName, patch: &StagePatch) -> bool {
        match self.stages.get_mut(&name) {
            Some(stage) => {
                patch.apply_to(stage);
                true
            }
            None => {
                log::trace!("{}: patch for absent stage {name} ignored", self.environment());
                false
            }
        }
    }

    /// True when every stage matches its configuration template.
    pub fn is_pristine(&self) -> bool {
        self.stages == self.config.stages
    }
}

/// Mark the back edges of a depth-first walk rooted at the first executed
/// stage. Only rendering uses this; execution order is never derived from
/// the edges.
fn classify_edges(config: &EnvironmentConfig) -> Vec<RenderEdge> {
    let mut topology: DiGraphMap<StageName, ()> = DiGraphMap::new();
    for &name in config.stages.keys() {
        topology.add_node(name);
    }
    for &(from, to) in &config.connections {
        topology.add_edge(from, to, ());
    }

    let mut back_edges = HashSet::new();
    let starts = config
        .order
        .iter()
        .chain(config.stages.keys())
        .copied()
        .filter(|name| topology.contains_node(*name));
    depth_first_search(&topology, starts, |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back_edges.insert((u, v));
        }
    });

    config
        .connections
        .iter()
        .map(|&(from, to)| RenderEdge {
            from,
            to,
            feedback: back_edges.contains(&(from, to)),
        })
        .collect()
}
