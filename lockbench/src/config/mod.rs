//! Experiment configuration loading and management.
//!
//! One YAML file describes the whole sweep: the sampling grid, the constants
//! shared by every taskset, and the list of experiments.
//!
//! The expected YAML structure is:
//! ```yaml
//! sweep:
//!   samples: 200
//!   mcsl_min: 5
//!   mcsl_max: 1000
//!   mcsl_step: 5
//!   seed: 1
//!   cluster_size: 1
//! taskset:
//!   period_ls: [1, 2, 4, 5, 8]
//!   period_nls: [10, 20, 25, 40, 50, 100, 125, 200, 250, 500, 1000]
//!   cs_len_ls: { min: 1, max: 15 }
//!   max_requests_ls: 2
//!   resources_ls: 3
//! experiments:
//!   - name: experiment_1
//!     cpu_count: 8
//!     utilization: 4.8
//!     task_count: 24
//!     ls_task_count: 4
//!     group: { size: 3, topology: wide }
//!     max_requests: 1
//!     resources_nls: 12
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::critical_section::{DurationRange, RequestMode};
use crate::group::GroupTopology;
use crate::schedulability::cluster_count;
use crate::synthesis::{GlobalLockDerivation, SubsetProfile, SynthesisParams};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct ExperimentConfigFile {
    sweep: SweepConfig,
    taskset: TasksetConfig,
    #[serde(default)]
    experiments: Vec<ExperimentEntry>,
}

/// Per-experiment fields as they appear in the YAML file.
#[derive(Debug, Deserialize)]
struct ExperimentEntry {
    name: String,
    cpu_count: usize,
    utilization: f64,
    task_count: usize,
    #[serde(default)]
    ls_task_count: usize,
    ls_utilization: Option<f64>,
    group: GroupEntry,
    max_requests: usize,
    resources_nls: usize,
    resources_ls: Option<usize>,
    #[serde(default)]
    asymmetric: bool,
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    size: usize,
    topology: GroupTopology,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Sampling grid shared by every experiment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SweepConfig {
    /// Tasksets drawn per mcsl point.
    pub samples: usize,
    /// Lower end of the NLS critical-section range, and first mcsl point.
    pub mcsl_min: u64,
    /// Last mcsl point (inclusive).
    pub mcsl_max: u64,
    pub mcsl_step: u64,
    /// Base seed every sample seed is derived from.
    #[serde(default)]
    pub seed: u64,
    /// Processors per cluster.
    #[serde(default = "default_cluster_size")]
    pub cluster_size: usize,
}

fn default_cluster_size() -> usize {
    1
}

impl SweepConfig {
    /// The mcsl values visited, in increasing order.
    pub fn mcsl_points(&self) -> impl Iterator<Item = u64> {
        let step = self.mcsl_step.max(1) as usize;
        (self.mcsl_min..=self.mcsl_max).step_by(step)
    }
}

/// Constants shared by every synthesized taskset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TasksetConfig {
    /// LS period catalog (ms).
    pub period_ls: Vec<u64>,
    /// NLS period catalog (ms).
    pub period_nls: Vec<u64>,
    /// LS critical-section length range (µs).
    pub cs_len_ls: DurationRange,
    pub max_requests_ls: usize,
    /// Default LS resource-pool size.
    pub resources_ls: usize,
}

/// One experiment of the sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub name: String,
    pub cpu_count: usize,
    pub utilization: f64,
    pub task_count: usize,
    pub ls_task_count: usize,
    /// Explicit LS utilization; proportional to the task split when `None`.
    pub ls_utilization: Option<f64>,
    pub group_size: usize,
    pub topology: GroupTopology,
    /// NLS request budget upper bound.
    pub max_requests: usize,
    pub resources_nls: usize,
    /// Overrides [`TasksetConfig::resources_ls`].
    pub resources_ls: Option<usize>,
    pub mode: RequestMode,
}

impl ExperimentConfig {
    /// Utilization carried by the LS subset.
    pub fn ls_utilization(&self) -> f64 {
        match self.ls_utilization {
            Some(u) => u,
            None if self.task_count == 0 => 0.0,
            None => self.utilization * self.ls_task_count as f64 / self.task_count as f64,
        }
    }

    /// Synthesis parameters for one mcsl point.
    ///
    /// NLS critical sections are drawn from `nls_durations`.
    pub fn synthesis_params(
        &self,
        taskset: &TasksetConfig,
        nls_durations: DurationRange,
    ) -> SynthesisParams {
        SynthesisParams {
            task_count: self.task_count,
            ls_task_count: self.ls_task_count,
            utilization: self.utilization,
            ls_utilization: self.ls_utilization(),
            cpu_count: self.cpu_count,
            group_size: self.group_size,
            topology: self.topology,
            mode: self.mode,
            global_lock: GlobalLockDerivation::CopyOfFineGrained,
            ls: SubsetProfile {
                periods_ms: taskset.period_ls.clone(),
                durations: taskset.cs_len_ls,
                max_requests: taskset.max_requests_ls,
                resources: self.resources_ls.unwrap_or(taskset.resources_ls),
            },
            nls: SubsetProfile {
                periods_ms: taskset.period_nls.clone(),
                durations: nls_durations,
                max_requests: self.max_requests,
                resources: self.resources_nls,
            },
        }
    }
}

// ── ExperimentConfigManager ───────────────────────────────────────────────────

/// Loads and manages the experiment configuration from a YAML file.
#[derive(Debug, Default)]
pub struct ExperimentConfigManager {
    sweep: Option<SweepConfig>,
    taskset: Option<TasksetConfig>,
    /// Experiments in file order.
    experiments: Vec<ExperimentConfig>,
}

impl ExperimentConfigManager {
    /// Creates a new, empty `ExperimentConfigManager`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces any previously loaded configuration.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is
    /// structurally invalid, or the sweep grid is unusable.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading experiment configuration from: {}", path.display());

        // Reset state before (re-)loading
        self.sweep = None;
        self.taskset = None;
        self.experiments.clear();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: ExperimentConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        validate_sweep(&file.sweep)
            .with_context(|| format!("Invalid sweep block in {}", path.display()))?;
        file.taskset
            .cs_len_ls
            .validate()
            .with_context(|| format!("Invalid taskset block in {}", path.display()))?;

        let mut experiments = Vec::with_capacity(file.experiments.len());
        for entry in file.experiments {
            if experiments
                .iter()
                .any(|e: &ExperimentConfig| e.name == entry.name)
            {
                bail!("Duplicate experiment name: {}", entry.name);
            }
            cluster_count(entry.cpu_count, file.sweep.cluster_size)
                .with_context(|| format!("Experiment {}", entry.name))?;

            let experiment = ExperimentConfig {
                name: entry.name,
                cpu_count: entry.cpu_count,
                utilization: entry.utilization,
                task_count: entry.task_count,
                ls_task_count: entry.ls_task_count,
                ls_utilization: entry.ls_utilization,
                group_size: entry.group.size,
                topology: entry.group.topology,
                max_requests: entry.max_requests,
                resources_nls: entry.resources_nls,
                resources_ls: entry.resources_ls,
                mode: if entry.asymmetric {
                    RequestMode::Asymmetric
                } else {
                    RequestMode::Symmetric
                },
            };

            debug!(
                "  Experiment: {} | CPUs: {} | U: {:.2} | tasks: {} ({} LS) | group: {} {}",
                experiment.name,
                experiment.cpu_count,
                experiment.utilization,
                experiment.task_count,
                experiment.ls_task_count,
                experiment.group_size,
                experiment.topology,
            );
            experiments.push(experiment);
        }

        if experiments.is_empty() {
            warn!("No experiments found in configuration file");
        }

        info!(
            "Successfully loaded {} experiment(s), {} mcsl point(s) × {} sample(s)",
            experiments.len(),
            file.sweep.mcsl_points().count(),
            file.sweep.samples,
        );

        self.sweep = Some(file.sweep);
        self.taskset = Some(file.taskset);
        self.experiments = experiments;
        Ok(())
    }

    /// Returns the experiment named `name`, if loaded.
    pub fn get_experiment(&self, name: &str) -> Option<&ExperimentConfig> {
        self.experiments.iter().find(|e| e.name == name)
    }

    /// All experiments in file order.
    pub fn get_all_experiments(&self) -> &[ExperimentConfig] {
        &self.experiments
    }

    pub fn sweep(&self) -> Option<&SweepConfig> {
        self.sweep.as_ref()
    }

    pub fn taskset(&self) -> Option<&TasksetConfig> {
        self.taskset.as_ref()
    }

    /// Returns `true` after a successful call to [`load_from_file`](Self::load_from_file).
    pub fn is_loaded(&self) -> bool {
        self.sweep.is_some() && self.taskset.is_some()
    }
}

fn validate_sweep(sweep: &SweepConfig) -> Result<()> {
    if sweep.samples == 0 {
        bail!("samples must be at least 1");
    }
    if sweep.mcsl_step == 0 {
        bail!("mcsl_step must be at least 1");
    }
    if sweep.cluster_size == 0 {
        bail!("cluster_size must be at least 1");
    }
    DurationRange::new(sweep.mcsl_min, sweep.mcsl_max)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use crate::synthesis::ConfigurationError;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const HEADER: &str = r#"
sweep:
  samples: 10
  mcsl_min: 5
  mcsl_max: 25
  mcsl_step: 10
  seed: 7
taskset:
  period_ls: [1, 2, 4, 5, 8]
  period_nls: [10, 20, 25, 40, 50, 100, 125, 200, 250, 500, 1000]
  cs_len_ls: { min: 1, max: 15 }
  max_requests_ls: 2
  resources_ls: 3
"#;

    fn load(yaml: &str) -> Result<ExperimentConfigManager> {
        let f = yaml_tempfile(yaml);
        let mut mgr = ExperimentConfigManager::new();
        mgr.load_from_file(f.path())?;
        Ok(mgr)
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_configuration() {
        let yaml = format!(
            "{HEADER}{}",
            r#"
experiments:
  - name: experiment_1
    cpu_count: 8
    utilization: 4.8
    task_count: 24
    ls_task_count: 4
    group: { size: 3, topology: wide }
    max_requests: 1
    resources_nls: 12
  - name: experiment_5
    cpu_count: 4
    utilization: 1.6
    task_count: 8
    ls_task_count: 2
    ls_utilization: 0.2
    group: { size: 4, topology: wide_2 }
    max_requests: 10
    resources_nls: 8
    resources_ls: 4
    asymmetric: true
"#
        );
        let mgr = load(&yaml).unwrap();

        assert!(mgr.is_loaded());
        assert_eq!(mgr.get_all_experiments().len(), 2);

        let sweep = mgr.sweep().unwrap();
        assert_eq!(sweep.cluster_size, 1); // default
        assert_eq!(sweep.mcsl_points().collect::<Vec<_>>(), vec![5, 15, 25]);

        let e1 = mgr.get_experiment("experiment_1").unwrap();
        assert_eq!(e1.topology, GroupTopology::Wide);
        assert_eq!(e1.mode, RequestMode::Symmetric);
        assert!((e1.ls_utilization() - 0.8).abs() < 1e-9);

        let e5 = mgr.get_experiment("experiment_5").unwrap();
        assert_eq!(e5.topology, GroupTopology::Mixed);
        assert_eq!(e5.mode, RequestMode::Asymmetric);
        assert_eq!(e5.ls_utilization(), 0.2);

        let params = e5.synthesis_params(mgr.taskset().unwrap(), DurationRange { min: 5, max: 15 });
        assert_eq!(params.ls.resources, 4);
        assert_eq!(params.nls.resources, 8);
        assert_eq!(params.nls.durations, DurationRange { min: 5, max: 15 });
        assert_eq!(params.ls.max_requests, 2);
        assert_eq!(params.nls.max_requests, 10);
    }

    #[test]
    fn flat_topology_accepts_legacy_none() {
        let yaml = format!(
            "{HEADER}{}",
            r#"
experiments:
  - name: experiment_2
    cpu_count: 4
    utilization: 2.4
    task_count: 12
    group: { size: 1, topology: none }
    max_requests: 3
    resources_nls: 12
"#
        );
        let mgr = load(&yaml).unwrap();
        let e = mgr.get_experiment("experiment_2").unwrap();
        assert_eq!(e.topology, GroupTopology::Flat);
        assert_eq!(e.ls_task_count, 0);
        assert_eq!(e.ls_utilization(), 0.0);
    }

    #[test]
    fn no_experiments_is_accepted() {
        let mgr = load(HEADER).unwrap();
        assert!(mgr.is_loaded());
        assert!(mgr.get_all_experiments().is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let entry = r#"
  - name: twice
    cpu_count: 2
    utilization: 1.0
    task_count: 4
    group: { size: 1, topology: flat }
    max_requests: 1
    resources_nls: 2
"#;
        let yaml = format!("{HEADER}experiments:{entry}{entry}");
        assert!(load(&yaml).is_err());
    }

    #[test]
    fn cluster_size_must_divide_cpu_count() {
        let yaml = r#"
sweep: { samples: 1, mcsl_min: 1, mcsl_max: 2, mcsl_step: 1, cluster_size: 3 }
taskset:
  period_ls: [1]
  period_nls: [10]
  cs_len_ls: { min: 1, max: 2 }
  max_requests_ls: 1
  resources_ls: 1
experiments:
  - name: bad
    cpu_count: 4
    utilization: 1.0
    task_count: 4
    group: { size: 1, topology: flat }
    max_requests: 1
    resources_nls: 2
"#;
        let err = load(yaml).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::ClusterSizeNotDivisible {
                cpus: 4,
                cluster_size: 3
            })
        );
    }

    #[test]
    fn unusable_sweep_grid_is_rejected() {
        let yaml = HEADER.replace("mcsl_step: 10", "mcsl_step: 0");
        assert!(load(&yaml).is_err());
        let yaml = HEADER.replace("mcsl_min: 5", "mcsl_min: 50");
        assert!(load(&yaml).is_err());
    }

    #[test]
    fn unknown_topology_fails_to_parse() {
        let yaml = format!(
            "{HEADER}{}",
            r#"
experiments:
  - name: x
    cpu_count: 4
    utilization: 1.0
    task_count: 4
    group: { size: 3, topology: spiral }
    max_requests: 1
    resources_nls: 3
"#
        );
        assert!(load(&yaml).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let mut mgr = ExperimentConfigManager::new();
        let result = mgr.load_from_file(Path::new("/nonexistent/path/experiments.yaml"));
        assert!(result.is_err());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        let mut mgr = ExperimentConfigManager::new();
        assert!(mgr.load_from_file(f.path()).is_err());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn failed_reload_clears_previous_configuration() {
        let good = yaml_tempfile(HEADER);
        let bad = yaml_tempfile("sweep: 3\n");
        let mut mgr = ExperimentConfigManager::new();
        mgr.load_from_file(good.path()).unwrap();
        assert!(mgr.is_loaded());
        assert!(mgr.load_from_file(bad.path()).is_err());
        assert!(!mgr.is_loaded(), "old configuration must be gone");
    }
}
