//! Evaluation of a trained network on a dataset, summarised as one table row
//! per metric.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{read_yaml, EvalConfig, NetworkConfig};
use crate::error::{HeatNnError, Result};
use crate::metrics::MetricTracker;
use crate::solver::PoissonNetwork;

/// Layout of an evaluation run file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRunConfig {
    /// Network to evaluate; `casename` names the output directory
    pub network: NetworkConfig,
    /// Dataset name → directory; only the first entry is evaluated
    pub datasets: serde_yaml::Mapping,
    /// Evaluation domain
    pub eval: EvalConfig,
}

/// One row of the metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub nn_name: String,
    pub nn_type: String,
    pub rf_global: usize,
    pub nbranches: usize,
    pub depth: usize,
    pub ks: usize,
    pub ds_name: String,
    pub ds_type: String,
    pub test_res: usize,
    pub train_res: usize,
    pub metric_name: String,
    pub value: f64,
}

impl EvalRunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<EvalRunConfig> {
        read_yaml(path)
    }

    pub fn casename(&self) -> Result<&str> {
        self.network
            .casename
            .as_deref()
            .ok_or_else(|| HeatNnError::Config("network.casename is required for evaluation".into()))
    }

    /// `(name, directory)` of the dataset to evaluate.
    pub fn first_dataset(&self) -> Result<(String, PathBuf)> {
        let (key, value) = self
            .datasets
            .iter()
            .next()
            .ok_or_else(|| HeatNnError::Config("`datasets` is empty".into()))?;
        match (key.as_str(), value.as_str()) {
            (Some(name), Some(dir)) => Ok((name.to_string(), PathBuf::from(dir))),
            _ => Err(HeatNnError::Config("datasets must map names to directory paths".into())),
        }
    }

    /// The network section with the run's evaluation domain attached.
    pub fn network_config(&self) -> NetworkConfig {
        let mut cfg = self.network.clone();
        cfg.eval = Some(self.eval.clone());
        cfg
    }
}

/// Second `/`-separated component of the case name, or the whole name.
pub fn nn_name(casename: &str) -> &str {
    casename.split('/').nth(1).unwrap_or(casename)
}

/// Dataset family: the part of the name before the first `_`.
pub fn ds_type(ds_name: &str) -> &str {
    ds_name.split('_').next().unwrap_or(ds_name)
}

/// Builds the table rows of an evaluated network.
pub fn metric_rows(run: &EvalRunConfig, solver: &PoissonNetwork, ds_name: &str, tracker: &MetricTracker) -> Result<Vec<MetricRow>> {
    let casename = run.casename()?;
    let model = &solver.model;
    run.network
        .metrics
        .iter()
        .map(|metric| {
            let value = tracker
                .average(metric.name())
                .ok_or_else(|| HeatNnError::Config(format!("metric {metric} was not tracked")))?;
            Ok(MetricRow {
                nn_name: nn_name(casename).to_string(),
                nn_type: model.kind().to_string(),
                rf_global: model.rf_global_x(),
                nbranches: model.n_scales(),
                depth: model.depths().iter().sum(),
                ks: model.kernel_sizes().first().copied().unwrap_or(0),
                ds_name: ds_name.to_string(),
                ds_type: ds_type(ds_name).to_string(),
                test_res: run.eval.domain.nnx,
                train_res: run.network.globals.nnx,
                metric_name: metric.name().to_string(),
                value,
            })
        })
        .collect()
}

pub fn write_rows<P: AsRef<Path>>(path: P, rows: &[MetricRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .map_err(|e| HeatNnError::io(format!("writing {}", path.as_ref().display()), e))
}

/// Evaluates the network of `run` on its first dataset and writes
/// `<casename>/<filename>.csv`. Returns the rows written.
pub fn run_evaluation(run: &EvalRunConfig, filename: &str, archs_dir: Option<&Path>) -> Result<Vec<MetricRow>> {
    let case_root = PathBuf::from(run.casename()?);
    std::fs::create_dir_all(&case_root)
        .map_err(|e| HeatNnError::io(format!("creating {}", case_root.display()), e))?;

    let (ds_name, ds_dir) = run.first_dataset()?;
    let solver = PoissonNetwork::new(&run.network_config(), archs_dir)?;
    let case_dir = case_root.join(&ds_name);
    let tracker = solver.evaluate(&ds_dir, &case_dir, true, true)?;

    let summary = std::fs::File::create(case_dir.join("metrics.json"))
        .map_err(|e| HeatNnError::io(format!("creating {}", case_dir.join("metrics.json").display()), e))?;
    serde_json::to_writer_pretty(summary, &tracker)?;

    let rows = metric_rows(run, &solver, &ds_name, &tracker)?;
    let out = case_root.join(format!("{filename}.csv"));
    write_rows(&out, &rows)?;
    info!(path = %out.display(), rows = rows.len(), "metrics table written");
    Ok(rows)
}
