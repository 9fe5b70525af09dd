//! Neural-network solver of the Poisson problem.
//!
//! The network maps a normalised rhs to a normalised potential:
//!
//! ```text
//! input     = rhs · ratio · scaling_factor
//! potential = res_scale / scaling_factor · model(input)
//! res_scale = nnx_nn² / nnx²
//! ```
//!
//! where `nnx_nn` is the resolution the network was trained on. An optional
//! stationary refinement polishes the prediction afterwards.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::{validate_domain, DomainConfig, NetworkConfig};
use crate::data::{write_npy, Batch, PoissonDataset, POTENTIAL_FILE, RHS_FILE};
use crate::domain::{ratio_potrhs, Domain};
use crate::error::{HeatNnError, Result};
use crate::linsystem::Refiner;
use crate::loss::ComposedLoss;
use crate::math::{interpolate, Grid, InterpKind};
use crate::metrics::{electric_field, MetricKind, MetricTracker};
use crate::network::{Checkpoint, Model};
use crate::plot::{plot_comparison, plot_field};

/// Index of the metric reported by [`PoissonNetwork::evaluate_opti`].
const OPTI_METRIC: usize = 2;

pub struct PoissonNetwork {
    cfg: NetworkConfig,
    pub domain: Domain,
    pub model: Model,
    /// Resolution the network was trained on
    pub nnx_nn: usize,
    pub alpha: f64,
    pub scaling_factor: f64,
    pub ratio: f64,
    pub res_scale: f64,
    pub interp_kind: InterpKind,
    refiner: Option<Refiner>,
    loss: Option<ComposedLoss>,
}

impl PoissonNetwork {
    /// Builds the architecture, loads the `resume` checkpoint and prepares
    /// refinement. `archs_dir` overrides `$ARCHS_DIR` for database lookups.
    pub fn new(cfg: &NetworkConfig, archs_dir: Option<&Path>) -> Result<PoissonNetwork> {
        let spec = cfg.arch.resolve(archs_dir)?;
        let mut model = spec.build()?;

        let resume = cfg
            .resume
            .as_ref()
            .ok_or_else(|| HeatNnError::Config("`resume` must name a checkpoint to evaluate".into()))?;
        info!(path = %resume.display(), "loading checkpoint");
        let checkpoint = Checkpoint::load_json(resume)?;
        model.load_state_dict(checkpoint.state_dict)?;

        PoissonNetwork::assemble(cfg, model, cfg.globals.nnx)
    }

    /// Wraps an in-memory model; its training resolution is `train_nnx`.
    pub fn from_model(cfg: &NetworkConfig, model: Model) -> Result<PoissonNetwork> {
        let nnx_nn = cfg
            .train_nnx
            .ok_or_else(|| HeatNnError::Config("`train_nnx` is required for an in-memory model".into()))?;
        PoissonNetwork::assemble(cfg, model, nnx_nn)
    }

    fn assemble(cfg: &NetworkConfig, model: Model, nnx_nn: usize) -> Result<PoissonNetwork> {
        validate_domain(cfg.domain())?;
        let loss = cfg.loss.as_ref().map(ComposedLoss::from_config).transpose()?;
        let mut solver = PoissonNetwork {
            cfg: cfg.clone(),
            domain: Domain::new(cfg.domain()),
            model,
            nnx_nn,
            alpha: cfg.alpha(),
            scaling_factor: cfg.scaling_factor(),
            ratio: 0.0,
            res_scale: 0.0,
            interp_kind: cfg.interp_kind(),
            refiner: None,
            loss,
        };
        solver.case_config(cfg.domain())?;
        Ok(solver)
    }

    /// Re-initialises the domain and the quantities derived from it.
    pub fn case_config(&mut self, domain_cfg: &DomainConfig) -> Result<()> {
        validate_domain(domain_cfg)?;
        self.domain = Domain::new(domain_cfg);
        self.ratio = ratio_potrhs(self.alpha, self.domain.lx, self.domain.ly);
        self.res_scale = (self.nnx_nn * self.nnx_nn) as f64 / (self.domain.nnx * self.domain.nnx) as f64;

        self.refiner = match self.cfg.eval.as_ref().and_then(|e| e.iterative_refine.map(|m| (m, e.refine_its))) {
            Some((method, Some(its))) => Some(Refiner::new(&self.domain, method, its)),
            Some((_, None)) => {
                return Err(HeatNnError::Config("`refine_its` is required with `iterative_refine`".into()))
            }
            None => None,
        };

        debug!(
            nnx = self.domain.nnx,
            nny = self.domain.nny,
            ratio = self.ratio,
            res_scale = self.res_scale,
            "case configured"
        );
        Ok(())
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.cfg
    }

    /// Predicts the potential of `rhs`, which must live on the current domain.
    pub fn solve(&self, rhs: &Grid) -> Result<Grid> {
        let shape = self.domain.shape();
        if rhs.shape() != shape {
            return Err(HeatNnError::Shape { expected: shape, got: rhs.shape() });
        }

        let total_timer = Instant::now();
        let model_res = self.model.input_res();
        let resample = model_res != shape;

        let mut transfer = Instant::now();
        let mut input = rhs.scale(self.ratio * self.scaling_factor);
        let mut comm_time = transfer.elapsed();

        let model_timer = Instant::now();
        if resample {
            input = interpolate(&input, model_res, self.interp_kind);
        }
        let mut output = self.model.forward(&input)?;
        if resample {
            output = interpolate(&output, shape, self.interp_kind);
        }
        let model_time = model_timer.elapsed();

        transfer = Instant::now();
        let mut potential = output.scale(self.res_scale / self.scaling_factor);
        comm_time += transfer.elapsed();
        let total_time = total_timer.elapsed();

        if let Some(refiner) = &self.refiner {
            let mut wall_rhs = rhs.clone();
            potential = refiner.refine(&potential, &mut wall_rhs)?;
        }

        if self.domain.benchmark {
            info!(comm_timer = comm_time.as_secs_f64(), "benchmark");
            info!(model_timer = model_time.as_secs_f64(), "benchmark");
            info!(total_timer = total_time.as_secs_f64(), "benchmark");
        }
        Ok(potential)
    }

    /// Solves one case, saving fields and figures under `case_dir`.
    pub fn run_case<P: AsRef<Path>>(&self, case_dir: P, rhs: &Grid, plot: bool, save: bool) -> Result<Grid> {
        let case_dir = case_dir.as_ref();
        create_dir(case_dir)?;
        let potential = self.solve(rhs)?;

        if save {
            let (rows, cols) = potential.shape();
            write_npy(case_dir.join(POTENTIAL_FILE), &[rows, cols], &potential.data)?;
            write_npy(case_dir.join(RHS_FILE), &[rows, cols], &rhs.data)?;
        }
        if plot {
            let fig_dir = case_dir.join("figures");
            plot_field(&potential, fig_dir.join("potential.png"))?;
            plot_field(rhs, fig_dir.join("physical_rhs.png"))?;
            let (ex, ey) = electric_field(&potential, self.domain.dx, self.domain.dy);
            plot_field(&field_norm(&ex, &ey), fig_dir.join("E_norm.png"))?;
        }
        info!(case = %case_dir.display(), "case solved");
        Ok(potential)
    }

    fn metric_kinds(&self) -> Result<&[MetricKind]> {
        if self.cfg.metrics.is_empty() {
            return Err(HeatNnError::Config("no `metrics` configured for evaluation".into()));
        }
        Ok(&self.cfg.metrics)
    }

    fn load_dataset(&self, data_dir: &Path) -> Result<PoissonDataset> {
        let args = &self.cfg.data_loader.args;
        // Inputs are normalised on the domain the network was trained on.
        let train = &self.cfg.globals;
        let ratio = ratio_potrhs(self.alpha, train.xmax - train.xmin, train.ymax - train.ymin);
        let dataset = PoissonDataset::load(data_dir, args.batch_size, args.normalize, ratio, self.scaling_factor)?;
        match dataset.sample_shape() {
            Some(got) if got != self.domain.shape() => Err(HeatNnError::Shape {
                expected: self.domain.shape(),
                got,
            }),
            _ => Ok(dataset),
        }
    }

    /// Physical-unit predictions and targets of one batch.
    fn predict_batch(&self, batch: &Batch) -> Result<(Vec<Grid>, Vec<Grid>)> {
        let outputs = batch
            .data
            .iter()
            .map(|d| Ok(self.model.forward(d)?.scale(self.res_scale / self.scaling_factor)))
            .collect::<Result<Vec<Grid>>>()?;
        let targets = batch.target.iter().map(|t| t.scale(1.0 / self.scaling_factor)).collect();
        Ok((outputs, targets))
    }

    /// Runs the network over the dataset in `data_dir` and tracks the
    /// configured metrics per batch.
    ///
    /// With `plot`, a comparison figure of the first sample of every batch is
    /// written to `case_dir/figures`. With `save_data`, all predictions and
    /// targets are written to `case_dir/output.npy` and `case_dir/target.npy`.
    pub fn evaluate<P, Q>(&self, data_dir: P, case_dir: Q, plot: bool, save_data: bool) -> Result<MetricTracker>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let kinds = self.metric_kinds()?;
        let case_dir = case_dir.as_ref();
        create_dir(case_dir)?;
        let fig_dir = case_dir.join("figures");

        let dataset = self.load_dataset(data_dir.as_ref())?;
        let mut tracker = MetricTracker::new(kinds.iter().map(|k| k.name()));
        let mut saved_outputs = Vec::new();
        let mut saved_targets = Vec::new();
        let mut loss_total = 0.0;

        for (i, batch) in dataset.batches().enumerate() {
            let (outputs, targets) = self.predict_batch(&batch)?;

            for kind in kinds {
                tracker.update(kind.name(), kind.compute(&outputs, &targets, &self.domain), 1);
            }
            if let Some(loss) = &self.loss {
                for ((out, tgt), rhs) in outputs.iter().zip(&targets).zip(&batch.rhs) {
                    loss_total += loss.evaluate(out, tgt, rhs, &self.domain).total;
                }
            }

            if plot {
                if let (Some(out), Some(tgt)) = (outputs.first(), targets.first()) {
                    plot_comparison(out, tgt, fig_dir.join(format!("batch_{i:05}.png")))?;
                    let (ex_o, ey_o) = electric_field(out, self.domain.dx, self.domain.dy);
                    let (ex_t, ey_t) = electric_field(tgt, self.domain.dx, self.domain.dy);
                    plot_comparison(
                        &field_norm(&ex_o, &ey_o),
                        &field_norm(&ex_t, &ey_t),
                        fig_dir.join(format!("batch_Efield_{i:05}.png")),
                    )?;
                }
            }
            if save_data {
                saved_outputs.extend(outputs);
                saved_targets.extend(targets);
            }
            debug!(batch = i, "batch evaluated");
        }

        if save_data {
            save_stack(&case_dir.join("output.npy"), &saved_outputs)?;
            save_stack(&case_dir.join("target.npy"), &saved_targets)?;
        }
        if self.loss.is_some() && !dataset.is_empty() {
            info!(loss = loss_total / dataset.len() as f64, "mean composed loss");
        }
        for (name, value) in tracker.result() {
            info!(metric = %name, value, "evaluation");
        }
        Ok(tracker)
    }

    /// Evaluates on `data_loader.args.data_dir` and returns the average of
    /// the third configured metric.
    pub fn evaluate_opti(&self) -> Result<f64> {
        let data_dir = self
            .cfg
            .data_loader
            .args
            .data_dir
            .as_ref()
            .ok_or_else(|| HeatNnError::Config("`data_loader.args.data_dir` is required".into()))?;
        let kinds = self.metric_kinds()?;
        if kinds.len() <= OPTI_METRIC {
            return Err(HeatNnError::Config(format!(
                "optimisation objective is metric #{} but only {} are configured",
                OPTI_METRIC + 1,
                kinds.len()
            )));
        }

        let dataset = self.load_dataset(data_dir)?;
        let mut tracker = MetricTracker::new(kinds.iter().map(|k| k.name()));
        for batch in dataset.batches() {
            let (outputs, targets) = self.predict_batch(&batch)?;
            for kind in kinds {
                tracker.update(kind.name(), kind.compute(&outputs, &targets, &self.domain), 1);
            }
        }
        tracker
            .average_at(OPTI_METRIC)
            .ok_or_else(|| HeatNnError::Config("objective metric missing from tracker".into()))
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| HeatNnError::io(format!("creating {}", dir.display()), e))
}

fn field_norm(ex: &Grid, ey: &Grid) -> Grid {
    Grid::from_fn(ex.rows, ex.cols, |i, j| ex.get(i, j).hypot(ey.get(i, j)))
}

fn save_stack(path: &Path, fields: &[Grid]) -> Result<()> {
    let (rows, cols) = fields.first().map(|g| g.shape()).unwrap_or((0, 0));
    let data: Vec<f64> = fields.iter().flat_map(|g| g.data.iter().copied()).collect();
    write_npy(path, &[fields.len(), rows, cols], &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CFG: &str = r#"
globals: {nnx: 17, nny: 17, xmin: 0.0, xmax: 0.01, ymin: 0.0, ymax: 0.01}
arch:
  type: MSNet
  args:
    input_res: 17
    scales:
      scale_0: [2, 4, 1]
      scale_1: [1, 4, 1]
data_loader:
  type: PoissonDataLoader
  args: {batch_size: 2, alpha: 0.1, scaling_factor: 1.0e+6}
metrics: [residual, inf_norm, Eresidual]
train_nnx: 17
"#;

    fn cfg() -> NetworkConfig {
        NetworkConfig::from_yaml_str(CFG).unwrap()
    }

    fn model(cfg: &NetworkConfig) -> Model {
        cfg.arch.resolve(None).unwrap().build().unwrap()
    }

    fn gaussian(n: usize) -> Grid {
        Grid::from_fn(n, n, |i, j| {
            let (x, y) = (i as f64 / (n - 1) as f64 - 0.5, j as f64 / (n - 1) as f64 - 0.5);
            1.0e5 * (-(x * x + y * y) / 0.02).exp()
        })
    }

    #[test]
    fn scaling_constants_follow_resolution() {
        let mut cfg = cfg();
        let net = PoissonNetwork::from_model(&cfg, model(&cfg)).unwrap();
        assert_relative_eq!(net.res_scale, 1.0);
        assert_relative_eq!(net.ratio, ratio_potrhs(0.1, 0.01, 0.01));

        let mut finer = cfg.globals.clone();
        finer.nnx = 33;
        finer.nny = 33;
        let mut net = net;
        net.case_config(&finer).unwrap();
        assert_relative_eq!(net.res_scale, 289.0 / 1089.0);

        cfg.train_nnx = None;
        assert!(PoissonNetwork::from_model(&cfg, model(&cfg)).is_err());
    }

    #[test]
    fn solve_resamples_to_model_resolution() {
        let mut cfg = cfg();
        cfg.globals.nnx = 25;
        cfg.globals.nny = 25;
        let net = PoissonNetwork::from_model(&cfg, model(&cfg)).unwrap();
        let potential = net.solve(&gaussian(25)).unwrap();
        assert_eq!(potential.shape(), (25, 25));
        assert!(potential.data.iter().all(|v| v.is_finite()));
        assert!(net.solve(&gaussian(17)).is_err());
    }

    #[test]
    fn refinement_zeroes_the_walls() {
        let yaml = format!("{CFG}eval: {{nnx: 17, nny: 17, xmin: 0.0, xmax: 0.01, ymin: 0.0, ymax: 0.01, iterative_refine: jacobi, refine_its: 3}}\n");
        let cfg = NetworkConfig::from_yaml_str(&yaml).unwrap();
        let net = PoissonNetwork::from_model(&cfg, model(&cfg)).unwrap();
        let potential = net.solve(&gaussian(17)).unwrap();
        for k in 0..17 {
            assert_eq!(potential.get(0, k), 0.0);
            assert_eq!(potential.get(16, k), 0.0);
            assert_eq!(potential.get(k, 0), 0.0);
            assert_eq!(potential.get(k, 16), 0.0);
        }
    }

    #[test]
    fn new_loads_checkpoint_weights() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt_path = dir.path().join("model.json");
        let mut cfg = cfg();
        let trained = model(&cfg);
        let spec = cfg.arch.resolve(None).unwrap();
        Checkpoint::new(spec, trained.clone()).save_json(&ckpt_path).unwrap();

        assert!(PoissonNetwork::new(&cfg, None).is_err());
        cfg.resume = Some(ckpt_path);
        let net = PoissonNetwork::new(&cfg, None).unwrap();
        assert_eq!(net.model, trained);
    }

    #[test]
    fn run_case_and_evaluate_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let rhs: Vec<f64> = (0..3).flat_map(|_| gaussian(17).data).collect();
        write_npy(data_dir.join(RHS_FILE), &[3, 17, 17], &rhs).unwrap();
        write_npy(data_dir.join(POTENTIAL_FILE), &[3, 17, 17], &vec![0.0; 3 * 289]).unwrap();

        let mut cfg = cfg();
        cfg.data_loader.args.data_dir = Some(data_dir.clone());
        let net = PoissonNetwork::from_model(&cfg, model(&cfg)).unwrap();

        let case = dir.path().join("case");
        net.run_case(&case, &gaussian(17), true, true).unwrap();
        assert!(case.join(POTENTIAL_FILE).exists());
        assert!(case.join("figures").join("potential.png").exists());

        let eval_dir = dir.path().join("eval");
        let tracker = net.evaluate(&data_dir, &eval_dir, true, true).unwrap();
        assert_eq!(tracker.stats().len(), 3);
        assert!(eval_dir.join("figures").join("batch_00001.png").exists());
        let saved = crate::data::read_npy(eval_dir.join("output.npy")).unwrap();
        assert_eq!(saved.shape, vec![3, 17, 17]);

        let objective = net.evaluate_opti().unwrap();
        assert_relative_eq!(objective, tracker.average_at(2).unwrap());
    }

    #[test]
    fn degenerate_domains_are_rejected() {
        let mut single_column = cfg();
        single_column.globals.nnx = 1;
        assert!(PoissonNetwork::from_model(&single_column, model(&single_column)).is_err());

        let cfg = cfg();
        let mut net = PoissonNetwork::from_model(&cfg, model(&cfg)).unwrap();
        let mut collapsed = cfg.globals.clone();
        collapsed.nnx = 0;
        assert!(net.case_config(&collapsed).is_err());
        collapsed.nnx = 17;
        collapsed.xmax = collapsed.xmin;
        assert!(net.case_config(&collapsed).is_err());
        assert_eq!(net.domain.shape(), (17, 17));
    }

    #[test]
    fn evaluate_rejects_dataset_of_another_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        write_npy(data_dir.join(RHS_FILE), &[2, 9, 9], &vec![1.0; 2 * 81]).unwrap();
        write_npy(data_dir.join(POTENTIAL_FILE), &[2, 9, 9], &vec![0.0; 2 * 81]).unwrap();

        let mut cfg = cfg();
        cfg.data_loader.args.data_dir = Some(data_dir.clone());
        let net = PoissonNetwork::from_model(&cfg, model(&cfg)).unwrap();

        let err = net.evaluate(&data_dir, dir.path().join("eval"), false, false).unwrap_err();
        assert!(matches!(err, HeatNnError::Shape { expected: (17, 17), got: (9, 9) }));
        assert!(net.evaluate_opti().is_err());
    }
}
