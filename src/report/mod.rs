pub mod eval_run;

pub use eval_run::{ds_type, metric_rows, nn_name, run_evaluation, write_rows, EvalRunConfig, MetricRow};
