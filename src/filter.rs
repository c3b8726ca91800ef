//! Keeps the elements of a collection that satisfy an expression.

use std::collections::BTreeMap;

use crate::{
    Selectable,
    error::Error,
    evaluator::{EvalError, Evaluator},
    options::EvaluatorOptions,
    value::Value,
};

/// An [`Evaluator`] applied element-wise. The first evaluation error aborts
/// the whole run.
///
/// ```
/// use bexpr::{EvaluatorOptions, Filter};
/// use std::collections::HashMap;
///
/// let filter =
///     Filter::for_type::<HashMap<String, i64>>("port > 1024", EvaluatorOptions::new()).unwrap();
///
/// let data: Vec<HashMap<String, i64>> = vec![
///     HashMap::from([("port".to_string(), 80)]),
///     HashMap::from([("port".to_string(), 8080)]),
/// ];
/// let kept = filter.execute(&data).unwrap();
/// assert_eq!(kept, vec![HashMap::from([("port".to_string(), 8080)])]);
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    evaluator: Evaluator,
}

impl Filter {
    /// A filter over dynamically shaped elements.
    pub fn new(expression: &str, options: EvaluatorOptions) -> Result<Self, Error> {
        Ok(Filter {
            evaluator: Evaluator::new(expression, options)?,
        })
    }

    /// A filter whose expression is validated against the element type.
    pub fn for_type<T: Selectable + 'static>(
        expression: &str,
        options: EvaluatorOptions,
    ) -> Result<Self, Error> {
        Ok(Filter {
            evaluator: Evaluator::for_type::<T>(expression, options)?,
        })
    }

    pub fn from_evaluator(evaluator: Evaluator) -> Self {
        Filter { evaluator }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Matching elements of a slice or array, in order.
    pub fn execute<T>(&self, data: &[T]) -> Result<Vec<T>, EvalError>
    where
        T: Selectable + Clone + 'static,
    {
        let mut kept = Vec::new();
        for item in data {
            if self.evaluator.evaluate(item)? {
                kept.push(item.clone());
            }
        }
        log::debug!("filter kept {} of {} elements", kept.len(), data.len());
        Ok(kept)
    }

    /// Matching entries of a map, collected into the same map type.
    pub fn execute_map<K, V, M>(&self, data: M) -> Result<M, EvalError>
    where
        V: Selectable + 'static,
        M: IntoIterator<Item = (K, V)> + FromIterator<(K, V)>,
    {
        let mut kept = Vec::new();
        for (key, value) in data {
            if self.evaluator.evaluate(&value)? {
                kept.push((key, value));
            }
        }
        Ok(kept.into_iter().collect())
    }

    /// Filters a dynamic list or map. Anything else cannot be filtered.
    pub fn execute_value(&self, data: &Value) -> Result<Value, EvalError> {
        match data {
            Value::List(items) => {
                let mut kept = Vec::new();
                for item in items {
                    if self.evaluator.evaluate_value(item)? {
                        kept.push(item.clone());
                    }
                }
                Ok(Value::List(kept))
            }
            Value::Map(map) => {
                let mut kept = BTreeMap::new();
                for (key, value) in map {
                    if self.evaluator.evaluate_value(value)? {
                        kept.insert(key.clone(), value.clone());
                    }
                }
                Ok(Value::Map(kept))
            }
            Value::Pairs(pairs) => {
                let mut kept = Vec::new();
                for (key, value) in pairs {
                    if self.evaluator.evaluate_value(value)? {
                        kept.push((key.clone(), value.clone()));
                    }
                }
                Ok(Value::Pairs(kept))
            }
            other => Err(EvalError::NotFilterable { kind: other.kind() }),
        }
    }
}
