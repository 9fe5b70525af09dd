use std::path::{Path, PathBuf};

use heat_nn::config::{require_training_sections, validate_config, Monitor, NetworkConfig, Normalization};
use heat_nn::loss::LossTerm;
use heat_nn::report::EvalRunConfig;
use heat_nn::MetricKind;

fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_train_config_parses_and_validates() {
    let cfg = NetworkConfig::load(config_dir().join("train.yml")).unwrap();
    require_training_sections(&cfg).unwrap();

    assert_eq!((cfg.globals.nnx, cfg.globals.nny), (101, 101));
    assert_eq!(cfg.globals.xmax, 1.0e-2);
    assert_eq!(cfg.arch.name.as_deref(), Some("MSNet5"));
    assert_eq!(cfg.data_loader.args.batch_size, 64);
    assert_eq!(cfg.data_loader.args.normalize, Normalization::Analytical);
    assert_eq!(cfg.scaling_factor(), 1.0e6);

    let optimizer = cfg.optimizer.as_ref().unwrap();
    assert_eq!(optimizer.args.lr, 4.0e-4);
    assert!(optimizer.args.amsgrad);

    let loss = cfg.loss.as_ref().unwrap();
    assert_eq!(
        loss.args.loss_list,
        vec![LossTerm::Inside, LossTerm::DirichletBoundary, LossTerm::Laplacian]
    );
    assert_eq!(loss.args.weight(LossTerm::Laplacian), Some(2.0e-3));

    let trainer = cfg.trainer.as_ref().unwrap();
    assert_eq!(trainer.epochs, 500);
    assert_eq!(trainer.monitor, Monitor::Min("val_loss".into()));
    assert_eq!(trainer.early_stop, Some(200));

    assert_eq!(cfg.metrics.len(), 8);
    assert_eq!(cfg.metrics[2], MetricKind::EResidual);
}

#[test]
fn test_train_config_architecture_resolves() {
    let cfg = NetworkConfig::load(config_dir().join("train.yml")).unwrap();
    let spec = cfg.arch.resolve(Some(&config_dir().join("archs"))).unwrap();
    assert_eq!(spec.args.input_res.dims(), (101, 101));

    let model = spec.build().unwrap();
    assert_eq!(model.n_scales(), 5);
    assert_eq!(model.depths(), vec![3; 5]);
    assert_eq!(model.rf_global_x(), 1 + 3 * 2 * (1 + 2 + 4 + 8 + 16));
}

#[test]
fn test_every_database_entry_builds() {
    let db: serde_yaml::Mapping =
        heat_nn::config::read_yaml(config_dir().join("archs").join("msnets.yml")).unwrap();
    for (name, _) in &db {
        let name = name.as_str().unwrap();
        let arch: heat_nn::config::ArchConfig = serde_yaml::from_str(&format!(
            "db_file: msnets.yml\nname: {name}\nargs:\n  input_res: 33\n"
        ))
        .unwrap();
        let model = arch.resolve(Some(&config_dir().join("archs"))).unwrap().build();
        assert!(model.is_ok(), "{name} failed to build: {:?}", model.err());
    }
}

#[test]
fn test_eval_config_parses() {
    let run = EvalRunConfig::load(config_dir().join("eval.yml")).unwrap();
    assert_eq!(run.casename().unwrap(), "eval/MSNet5/101");
    assert_eq!(run.first_dataset().unwrap().0, "random_8");

    let network = run.network_config();
    validate_config(&network).unwrap();
    assert_eq!(network.domain().nnx, 101);
    assert_eq!(network.train_nnx, Some(101));
    assert!(require_training_sections(&network).is_err());
}
