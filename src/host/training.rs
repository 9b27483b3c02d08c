//! `models.Model`: a deterministic stand-in for the recommender the notebook trains.
//!
//! `fit` does no learning. It checks its inputs the way the real model would and returns a `History` with one
//! value per epoch for every tracked key, drawn from the session RNG.

use std::any::Any;
use std::cell::RefCell;

use rand::Rng;

use super::frame::{Frame, frame_of};
use super::registry::ModuleRegistry;
use crate::runtime::Interpreter;
use crate::runtime::errors::{RuntimeError, RuntimeResult};
use crate::runtime::object::{Args, HostObject};
use crate::runtime::value::Value;

/// Keys every fit reports in addition to the configured metrics.
pub const LOSS_KEYS: &[&str] = &["loss", "regularization_loss", "loss_batch"];
pub const VALIDATION_PREFIX: &str = "val_";
const DEFAULT_BATCH_SIZE: i64 = 1024;

#[derive(Debug)]
pub struct Model {
    metrics: Vec<String>,
    fitted: RefCell<bool>,
}

impl Model {
    pub fn new(metrics: Vec<String>) -> RuntimeResult<Self> {
        for (i, name) in metrics.iter().enumerate() {
            if metrics[..i].contains(name) {
                return Err(RuntimeError::value_error(format!("duplicate metric '{name}'")));
            }
            if LOSS_KEYS.contains(&name.as_str()) {
                return Err(RuntimeError::value_error(format!("'{name}' is reserved for the loss")));
            }
        }
        Ok(Self {
            metrics,
            fitted: RefCell::new(false),
        })
    }

    /// History keys for a fit, in report order.
    pub fn history_keys(&self, validated: bool) -> Vec<String> {
        let base: Vec<String> = self
            .metrics
            .iter()
            .cloned()
            .chain(LOSS_KEYS.iter().map(|k| k.to_string()))
            .collect();
        let mut keys = base.clone();
        if validated {
            keys.extend(base.iter().map(|k| format!("{VALIDATION_PREFIX}{k}")));
        }
        keys
    }

    fn fit(&self, interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
        args.check("fit", 1, &["x", "validation_data", "epochs", "batch_size", "verbose"])?;
        let train = require_frame(args.require("fit", 0, "x")?, "x")?;
        let validation = match args.named.get("validation_data").filter(|v| !v.is_none()) {
            Some(v) => Some(require_frame(v, "validation_data")?.num_rows()),
            None => None,
        };
        let epochs = match args.named.get("epochs") {
            Some(v) => v.expect_int("epochs")?,
            None => 1,
        };
        if epochs < 1 {
            return Err(RuntimeError::value_error("epochs must be at least 1"));
        }
        let batch_size = match args.named.get("batch_size") {
            Some(v) => v.expect_int("batch_size")?,
            None => DEFAULT_BATCH_SIZE,
        };
        if batch_size < 1 {
            return Err(RuntimeError::value_error("batch_size must be at least 1"));
        }
        let steps = (train.num_rows() as i64 + batch_size - 1) / batch_size;

        let keys = self.history_keys(validation.is_some());
        let rng = interp.rng();
        let mut history = Vec::with_capacity(keys.len());
        for key in &keys {
            let per_epoch: Vec<Value> = (0..epochs)
                .map(|epoch| Value::Float(simulated(key, epoch, rng.gen_range(0.0..0.02))))
                .collect();
            history.push((key.clone(), Value::list(per_epoch)));
        }
        *self.fitted.borrow_mut() = true;
        tracing::debug!(epochs, steps, keys = keys.len(), "model fit");

        Ok(Value::object(History {
            history: Value::str_dict(history),
            epoch: Value::list((0..epochs).map(Value::Int).collect()),
            params: Value::str_dict([
                ("epochs", Value::Int(epochs)),
                ("steps", Value::Int(steps)),
                ("batch_size", Value::Int(batch_size)),
            ]),
        }))
    }
}

/// Plausible value for `key` at `epoch`: losses fall, scores rise.
fn simulated(key: &str, epoch: i64, jitter: f64) -> f64 {
    let name = key.strip_prefix(VALIDATION_PREFIX).unwrap_or(key);
    let progress = 1.0 - 0.5f64.powi(epoch as i32 + 1);
    match name {
        "regularization_loss" => 0.0,
        "loss" | "loss_batch" => 0.7 - 0.2 * progress + jitter,
        _ => 0.5 + 0.3 * progress - jitter,
    }
}

fn require_frame<'a>(value: &'a Value, what: &str) -> RuntimeResult<&'a Frame> {
    let frame = frame_of(value).ok_or_else(|| {
        RuntimeError::type_error(format!(
            "fit() {what} must be a DataFrame or Dataset, not {}",
            value.type_name()
        ))
    })?;
    if frame.num_rows() == 0 {
        return Err(RuntimeError::value_error(format!("fit() {what} has no rows")));
    }
    Ok(frame)
}

impl HostObject for Model {
    fn type_name(&self) -> &str {
        "Model"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "metrics" => Ok(Value::list(self.metrics.iter().map(Value::str).collect())),
            "fitted" => Ok(Value::Bool(*self.fitted.borrow())),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn call_method(&self, interp: &mut Interpreter, name: &str, args: Args) -> RuntimeResult<Value> {
        match name {
            "fit" => self.fit(interp, args),
            "compile" => {
                args.check("compile", 0, &["optimizer", "run_eagerly"])?;
                Ok(Value::None)
            }
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn repr(&self) -> String {
        format!("<Model metrics={:?}>", self.metrics)
    }
}

/// Result of `Model.fit`. `history` is an ordinary dict that cell code may inspect or edit.
#[derive(Debug)]
pub struct History {
    history: Value,
    epoch: Value,
    params: Value,
}

impl HostObject for History {
    fn type_name(&self) -> &str {
        "History"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_attr(&self, name: &str) -> RuntimeResult<Value> {
        match name {
            "history" => Ok(self.history.clone()),
            "epoch" => Ok(self.epoch.clone()),
            "params" => Ok(self.params.clone()),
            other => Err(RuntimeError::no_attribute(self.type_name(), other)),
        }
    }

    fn repr(&self) -> String {
        "<History>".to_string()
    }
}

fn model_ctor(_interp: &mut Interpreter, args: Args) -> RuntimeResult<Value> {
    args.check("Model", 0, &["metrics"])?;
    let metrics = match args.named.get("metrics") {
        Some(list) => list
            .iterate()?
            .iter()
            .map(|m| m.expect_str("metric name").map(|s| s.to_string()))
            .collect::<RuntimeResult<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(Value::object(Model::new(metrics)?))
}

pub(crate) fn register(registry: &mut ModuleRegistry) {
    registry.register("models", [("Model", Value::native("Model", model_ctor))]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::host::frame::DatasetObject;
    use crate::host::synthetic;

    fn dataset(interp: &mut Interpreter, rows: usize) -> Value {
        let schema = synthetic::schema("movielens-100k").unwrap();
        Value::object(DatasetObject::new(synthetic::generate(interp, schema, rows)))
    }

    fn model(metrics: &[&str]) -> Model {
        Model::new(metrics.iter().map(|m| m.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_history_keys_with_validation() {
        let keys = model(&["auc_1", "binary_accuracy"]).history_keys(true);
        assert_eq!(
            keys,
            vec![
                "auc_1",
                "binary_accuracy",
                "loss",
                "regularization_loss",
                "loss_batch",
                "val_auc_1",
                "val_binary_accuracy",
                "val_loss",
                "val_regularization_loss",
                "val_loss_batch",
            ]
        );
        assert_eq!(model(&["auc_1"]).history_keys(false).len(), 4);
    }

    #[test]
    fn test_fit_reports_one_value_per_epoch() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let train = dataset(&mut interp, 50);
        let valid = dataset(&mut interp, 10);
        let m = model(&["auc_1"]);
        let args = Args::positional(vec![train])
            .with_named("validation_data", valid)
            .with_named("epochs", Value::Int(3));
        let history = m.fit(&mut interp, args).unwrap();
        let dict = interp.get_attr(&history, "history").unwrap();
        assert_eq!(dict.len().unwrap(), 8);
        let loss = interp.get_item(&dict, &Value::str("val_loss")).unwrap();
        assert_eq!(loss.len().unwrap(), 3);
        assert_eq!(interp.get_attr(&history, "epoch").unwrap().repr(), "[0, 1, 2]");
    }

    #[test]
    fn test_fit_rejects_non_frames_and_empty_data() {
        let mut interp = Interpreter::new(&HarnessConfig::default());
        let m = model(&[]);
        let err = m.fit(&mut interp, Args::positional(vec![Value::Int(1)])).unwrap_err();
        assert!(err.message.contains("must be a DataFrame or Dataset"));
        let empty = dataset(&mut interp, 0);
        assert!(m.fit(&mut interp, Args::positional(vec![empty])).is_err());
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        assert!(Model::new(vec!["auc".into(), "auc".into()]).is_err());
        assert!(Model::new(vec!["loss".into()]).is_err());
    }
}
