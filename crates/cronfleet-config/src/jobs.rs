//! Job definitions.
//!
//! Each `*.yml` / `*.yaml` file in the job directory defines one job. The file
//! stem is the job id.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cronfleet_protocols::{JobSchedule, LaunchRequest};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::loader::ConfigLoader;

/// Job file contents as written on disk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JobSource {
    cron: String,
    cluster: String,
    task_definition: String,
    #[serde(default)]
    launch_type: Option<String>,
    #[serde(default)]
    network_configuration: serde_json::Value,
    #[serde(default)]
    overrides: serde_json::Value,
}

/// A periodically recurring container job.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    pub id: String,
    pub schedule: JobSchedule,
    pub cluster: String,
    /// Task template family; the latest revision is launched.
    pub task_definition: String,
    pub launch_type: Option<String>,
    pub network_configuration: serde_json::Value,
    pub overrides: serde_json::Value,
}

impl JobDefinition {
    /// Parse one job from already expanded YAML.
    pub fn from_yaml(id: &str, content: &str) -> Result<Self, ConfigError> {
        let source: JobSource = serde_yml::from_str(content).map_err(|e| ConfigError::Parse {
            path: id.to_string(),
            source: e,
        })?;
        Self::from_source(id, source)
    }

    fn from_source(id: &str, source: JobSource) -> Result<Self, ConfigError> {
        let schedule = JobSchedule::parse(&source.cron).map_err(|e| ConfigError::Schedule {
            job: id.to_string(),
            source: e,
        })?;

        if source.cluster.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.Cluster", id),
                message: "cluster cannot be empty".to_string(),
            });
        }
        if source.task_definition.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.TaskDefinition", id),
                message: "task definition family cannot be empty".to_string(),
            });
        }

        Ok(Self {
            id: id.to_string(),
            schedule,
            cluster: source.cluster,
            task_definition: source.task_definition,
            launch_type: source.launch_type.filter(|t| !t.is_empty()),
            network_configuration: source.network_configuration,
            overrides: source.overrides,
        })
    }

    /// Launch parameters for a resolved template revision.
    pub fn launch_request(&self, revision: &str) -> LaunchRequest {
        LaunchRequest {
            cluster: self.cluster.clone(),
            revision: revision.to_string(),
            launch_type: self.launch_type.clone(),
            network_configuration: self.network_configuration.clone(),
            overrides: self.overrides.clone(),
        }
    }
}

/// All loaded jobs, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct JobSet {
    jobs: BTreeMap<String, Arc<JobDefinition>>,
}

impl JobSet {
    /// Build a set, rejecting duplicate ids.
    pub fn new(definitions: impl IntoIterator<Item = JobDefinition>) -> Result<Self, ConfigError> {
        let mut jobs = BTreeMap::new();
        for job in definitions {
            if jobs.contains_key(&job.id) {
                return Err(ConfigError::DuplicateJob(job.id));
            }
            jobs.insert(job.id.clone(), Arc::new(job));
        }
        Ok(Self { jobs })
    }

    /// Load every job file of a directory.
    ///
    /// Subdirectories and other extensions are ignored. An empty result is an
    /// error, as is a stem shared by a `.yml` and a `.yaml` file.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::NotFound(dir.display().to_string()));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_job_file(path))
            .collect();
        files.sort();

        let mut definitions = Vec::with_capacity(files.len());
        for path in &files {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = ConfigLoader::read_expanded(path)?;
            let source: JobSource =
                serde_yml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.display().to_string(),
                    source: e,
                })?;
            definitions.push(JobDefinition::from_source(id, source)?);
        }

        if definitions.is_empty() {
            return Err(ConfigError::NoJobs(dir.display().to_string()));
        }
        Self::new(definitions)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<JobDefinition>> {
        self.jobs.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<JobDefinition>> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn is_job_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}
