//! End-to-end optimizer tests
//!
//! Every optimizer is put through the same gauntlet: converge on a toy
//! classification task, round-trip its config through serialize/deserialize,
//! respect per-parameter constraints, and survive a model save/load with
//! weights intact.

use afinar::data::{classification_data, to_categorical};
use afinar::io::{load_model, save_model, ModelFormat, SaveConfig};
use afinar::nn::{
    Activation, CategoricalCrossentropy, Dense, MeanSquaredError, Sequential,
};
use afinar::optim::{
    self, Adadelta, Adagrad, Adam, Adamax, External, Nadam, Optimizer, RMSprop, SGD,
};
use afinar::Error;
use ndarray::{s, Array1, Array2};
use tempfile::tempdir;

const NUM_CLASSES: usize = 2;
const INPUT_DIM: usize = 10;

fn test_data() -> (Array2<f32>, Array2<f32>) {
    let (x, labels) = classification_data(1000, INPUT_DIM, NUM_CLASSES, 0.5, 1337);
    let y = to_categorical(&labels, NUM_CLASSES);
    (x, y)
}

fn classifier(optimizer: impl Optimizer + 'static) -> Sequential {
    let mut model = Sequential::new();
    model.add(Dense::seeded(INPUT_DIM, 10, 101));
    model.add(Activation::relu());
    model.add(Dense::seeded(10, NUM_CLASSES, 102));
    model.add(Activation::softmax());
    model.compile(optimizer, CategoricalCrossentropy);
    model
}

/// The shared gauntlet: convergence, config round-trip, constraints, save/load
fn check_optimizer<O, F>(make_optimizer: F, target: f32)
where
    O: Optimizer + 'static,
    F: Fn() -> O,
{
    let (x, y) = test_data();

    // Convergence on the toy classification task
    let mut model = classifier(make_optimizer());
    let history = model.fit(&x, &y, 3, 16).unwrap();
    let final_accuracy = *history.accuracy.last().unwrap();
    assert!(
        final_accuracy >= target,
        "final accuracy {final_accuracy} below target {target}"
    );

    // serialize -> deserialize -> serialize keeps the config key set
    let config = optim::serialize(model.optimizer().unwrap()).unwrap();
    let rebuilt = optim::deserialize(&config).unwrap();
    let new_config = optim::serialize(rebuilt.as_ref()).unwrap();
    assert_eq!(config.class_name, new_config.class_name);
    assert_eq!(config.sorted_keys(), new_config.sorted_keys());

    // Constraints clamp parameters after a training step
    let mut constrained = Sequential::new();
    constrained.add(
        Dense::seeded(INPUT_DIM, 10, 103)
            .with_kernel_constraint(|w: &Array1<f32>| w.mapv(|v| 0.0 * v + 1.0))
            .with_bias_constraint(|b: &Array1<f32>| b.mapv(|v| 0.0 * v + 2.0)),
    );
    constrained.add(Activation::relu());
    constrained.add(Dense::seeded(10, NUM_CLASSES, 104));
    constrained.add(Activation::softmax());
    constrained.compile(make_optimizer(), CategoricalCrossentropy);

    let xb = x.slice(s![..10, ..]).to_owned();
    let yb = y.slice(s![..10, ..]).to_owned();
    constrained.train_on_batch(&xb, &yb).unwrap();

    let weights = constrained.get_weights();
    assert!(weights[0].iter().all(|&w| w == 1.0), "kernel not clamped to 1");
    assert!(weights[1].iter().all(|&b| b == 2.0), "bias not clamped to 2");

    // Saving: weights must survive a save/load round trip exactly
    let mut regression = Sequential::new();
    regression.add(Dense::seeded(1, 1, 105));
    regression.compile(make_optimizer(), MeanSquaredError);
    regression
        .fit(&Array2::zeros((1, 1)), &Array2::zeros((1, 1)), 1, 1)
        .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    save_model(&regression, &path, &SaveConfig::new(ModelFormat::Json)).unwrap();
    let reloaded = load_model(&path).unwrap();

    assert_eq!(regression.get_weights(), reloaded.get_weights());
}

#[test]
fn test_sgd() {
    check_optimizer(
        || SGD::new(0.01, 0.9).with_nesterov(true),
        0.6,
    );
}

#[test]
fn test_rmsprop() {
    check_optimizer(RMSprop::default, 0.6);
    check_optimizer(|| RMSprop::default().with_decay(1e-3), 0.6);
}

#[test]
fn test_adagrad() {
    check_optimizer(|| Adagrad::new(1.0), 0.6);
    check_optimizer(|| Adagrad::new(1.0).with_decay(1e-3), 0.6);
}

#[test]
fn test_adadelta() {
    check_optimizer(|| Adadelta::new(1.0), 0.4);
    check_optimizer(|| Adadelta::new(1.0).with_decay(1e-3), 0.4);
}

#[test]
fn test_adam() {
    check_optimizer(Adam::default, 0.6);
    check_optimizer(|| Adam::default().with_decay(1e-3), 0.6);
}

#[test]
fn test_adamax() {
    check_optimizer(|| Adamax::new(1.0), 0.6);
    check_optimizer(|| Adamax::new(1.0).with_decay(1e-3), 0.6);
}

#[test]
fn test_nadam() {
    check_optimizer(Nadam::default, 0.6);
}

#[test]
fn test_adam_amsgrad() {
    check_optimizer(|| Adam::default().with_amsgrad(true), 0.6);
    check_optimizer(|| Adam::default().with_amsgrad(true).with_decay(1e-3), 0.6);
}

#[test]
fn test_clipnorm() {
    check_optimizer(|| SGD::new(0.01, 0.9).with_clipnorm(0.5), 0.6);
}

#[test]
fn test_clipvalue() {
    check_optimizer(|| SGD::new(0.01, 0.9).with_clipvalue(0.5), 0.6);
}

#[test]
fn test_no_grad() {
    // A non-differentiable head blocks gradient flow to every trainable
    // parameter; fit must fail rather than silently not train.
    let mut model = Sequential::new();
    model.add(Dense::seeded(3, 10, 106));
    model.add(Activation::argmax());
    model.compile(SGD::new(0.01, 0.0), MeanSquaredError);

    let x = Array2::zeros((10, 3));
    let y = Array2::zeros((10, 1));
    let result = model.fit(&x, &y, 10, 10);
    assert!(matches!(result, Err(Error::NullGradient(_))));
}

#[test]
fn test_external_optimizer() {
    use afinar::constraint::MaxNorm;

    // A wrapped foreign update rule trains a model end to end...
    let mut model = Sequential::new();
    model.add(Dense::seeded(3, NUM_CLASSES, 107).with_kernel_constraint(MaxNorm::new(1.0)));
    model.compile(External::gradient_descent(0.01), MeanSquaredError);

    let (x, labels) = classification_data(5, 3, NUM_CLASSES, 0.5, 99);
    let y = to_categorical(&labels, NUM_CLASSES);
    model.fit(&x, &y, 1, 5).unwrap();

    // ...and the constraint still applies through it
    let kernel = &model.get_weights()[0];
    let norm = kernel.iter().map(|&w| w * w).sum::<f32>().sqrt();
    assert!(norm <= 1.0 + 1e-5);

    // ...but it cannot be introspected or persisted
    let optimizer = model.optimizer().unwrap();
    assert!(matches!(optimizer.config(), Err(Error::Unsupported(_))));
    assert!(matches!(optimizer.weights(), Err(Error::Unsupported(_))));

    let dir = tempdir().unwrap();
    let path = dir.path().join("model.json");
    assert!(matches!(
        save_model(&model, &path, &SaveConfig::default()),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn test_serialized_class_name_is_case_insensitive() {
    let mut config = optim::serialize(&Adam::default()).unwrap();
    config.class_name = config.class_name.to_lowercase();

    let rebuilt = optim::deserialize(&config).unwrap();
    let new_config = optim::serialize(rebuilt.as_ref()).unwrap();
    assert_eq!(config.sorted_keys(), new_config.sorted_keys());
}
