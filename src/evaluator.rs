use std::{
    any::{TypeId, type_name},
    borrow::Cow,
    cmp::Ordering,
    fmt,
    sync::Arc,
};

use thiserror::Error;

use crate::{
    Selectable,
    ast::{
        BinaryOperator, CollectionBinding, CollectionOperator, Dump, Expression, MatchOperator,
        Selector, UnaryOperator, expressions::pointer_string,
    },
    coerce::{self, CoerceError, Coerced},
    error::Error,
    matcher::MatcherError,
    options::{EvaluatorOptions, NotFoundPolicy},
    parser,
    pointer::{Pointer, PointerError, Resolved, ValueTransformationHook},
    schema::{FieldConfigurations, TypeDescriptor},
    validate::{
        Limits, ValidatedCollection, ValidatedExpression, ValidatedMatch, ValidatedValue,
        ValidationError, Validator,
    },
    value::{Value, ValueKind},
};

/// Errors that can occur while evaluating a compiled expression.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("error finding value in datum: {0}")]
    Resolve(#[from] PointerError),

    /// A selector continues past a bound scalar.
    #[error("{bound} references a {kind} so {pointer} is invalid")]
    BoundValueNotTraversable {
        bound: String,
        kind: ValueKind,
        pointer: String,
    },

    #[error("{selector} is not a list or a map")]
    NotACollection { selector: String },

    #[error(
        "unable to find suitable primitive comparison function for selector \"{selector}\" of kind {kind}"
    )]
    NoComparison { selector: String, kind: ValueKind },

    #[error("Failed to coerce value \"{raw}\" for selector \"{selector}\": {source}")]
    Coercion {
        raw: String,
        selector: String,
        source: CoerceError,
    },

    #[error("Cannot perform in/contains operations on type {kind} for selector: \"{selector}\"")]
    MembershipUnsupported { kind: ValueKind, selector: String },

    #[error("Cannot perform is empty operations on type {kind} for selector: \"{selector}\"")]
    EmptinessUnsupported { kind: ValueKind, selector: String },

    #[error("Cannot perform match operations on type {kind} for selector: \"{selector}\"")]
    NotMatchable { kind: ValueKind, selector: String },

    #[error("Failed to compile regular expression for selector \"{selector}\": {source}")]
    Regex {
        selector: String,
        source: regex::Error,
    },

    #[error("custom matcher for selector \"{selector}\" failed: {source}")]
    Custom {
        selector: String,
        source: MatcherError,
    },

    #[error("cannot iterate over the custom value at selector \"{selector}\"")]
    CustomCollection { selector: String },

    #[error("match operator \"{operator}\" requires a value")]
    MissingLiteral { operator: MatchOperator },

    #[error("evaluator was compiled for {expected} but was given {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Raised by the error-on-missing policy for absent optional values.
    #[error("value for selector \"{selector}\" is missing")]
    MissingValue { selector: String },

    #[error("cannot filter a value of kind {kind}")]
    NotFilterable { kind: ValueKind },
}

/// A name bound by an enclosing collection expression.
#[derive(Debug, Clone)]
struct Binding<'a> {
    name: &'a str,
    value: Cow<'a, Value>,
}

impl<'a> Binding<'a> {
    fn new(name: &'a str, value: Cow<'a, Value>) -> Self {
        Binding { name, value }
    }
}

/// Evaluation context: the root datum plus a chain of frames, one per
/// collection element being visited. Each frame holds at most an index and
/// a value binding.
#[derive(Debug)]
pub struct EvalContext<'a> {
    root: &'a Value,
    parent: Option<&'a EvalContext<'a>>,
    bindings: [Option<Binding<'a>>; 2],
}

impl<'a> EvalContext<'a> {
    pub fn new(root: &'a Value) -> Self {
        EvalContext {
            root,
            parent: None,
            bindings: [None, None],
        }
    }

    /// A child frame binding `name` to `value`.
    pub fn bind(&'a self, name: &'a str, value: &'a Value) -> EvalContext<'a> {
        EvalContext {
            root: self.root,
            parent: Some(self),
            bindings: [Some(Binding::new(name, Cow::Borrowed(value))), None],
        }
    }

    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// The value bound to `name` by the innermost frame that binds it.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .flatten()
            .find(|binding| binding.name == name)
            .map(|binding| binding.value.as_ref())
            .or_else(|| self.parent.and_then(|parent| parent.lookup(name)))
    }

    /// Number of frames, including the root frame.
    pub fn depth(&self) -> usize {
        1 + self.parent.map_or(0, |parent| parent.depth())
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundType {
    id: TypeId,
    name: &'static str,
}

/// A compiled expression, ready to run against any number of data.
///
/// Compilation parses, validates against the field configurations of the
/// bound type (if any) and caches coerced literals. Evaluation never
/// mutates the evaluator, so one instance can be shared across threads.
///
/// # Examples
///
/// ```
/// use bexpr::{Evaluator, EvaluatorOptions, selectable_record};
///
/// struct Service {
///     name: String,
///     port: u16,
///     tags: Vec<String>,
/// }
///
/// selectable_record! {
///     Service {
///         public "Name" => name,
///         public "Port" => port,
///         public "Tags" => tags,
///     }
/// }
///
/// let eval = Evaluator::for_type::<Service>(
///     "Tags contains prod and Port == 80",
///     EvaluatorOptions::new(),
/// )
/// .unwrap();
///
/// let web = Service {
///     name: "web".to_string(),
///     port: 80,
///     tags: vec!["prod".to_string()],
/// };
/// assert!(eval.evaluate(&web).unwrap());
/// ```
#[derive(Clone)]
pub struct Evaluator {
    source: String,
    ast: Expression,
    expression: ValidatedExpression,
    match_count: usize,
    fields: Option<Arc<FieldConfigurations>>,
    bound_type: Option<BoundType>,
    limits: Limits,
    tag_name: String,
    hook: Option<ValueTransformationHook>,
    policy: NotFoundPolicy,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("source", &self.source)
            .field("match_count", &self.match_count)
            .field("bound_type", &self.bound_type.map(|b| b.name))
            .field("tag_name", &self.tag_name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Evaluator {
    /// Compiles `expression` without a schema. Selectors and operators are
    /// checked against each datum when evaluated.
    pub fn new(expression: &str, options: EvaluatorOptions) -> Result<Self, Error> {
        Self::compile(expression, &options, None, None)
    }

    /// Compiles `expression` against the field configurations of `T`,
    /// fetched from the options' registry.
    pub fn for_type<T: Selectable + 'static>(
        expression: &str,
        options: EvaluatorOptions,
    ) -> Result<Self, Error> {
        let fields = match T::describe().strip_optional() {
            // Dynamic data has no static schema
            TypeDescriptor::Any => None,
            _ => Some(options.registry().get::<T>(options.tag_name())?),
        };
        let bound = BoundType {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        };
        Self::compile(expression, &options, fields, Some(bound))
    }

    /// Compiles `expression` against explicit field configurations.
    pub fn with_fields(
        expression: &str,
        fields: FieldConfigurations,
        options: EvaluatorOptions,
    ) -> Result<Self, Error> {
        Self::compile(expression, &options, Some(Arc::new(fields)), None)
    }

    fn compile(
        source: &str,
        options: &EvaluatorOptions,
        fields: Option<Arc<FieldConfigurations>>,
        bound_type: Option<BoundType>,
    ) -> Result<Self, Error> {
        let policy = options.not_found_policy()?;
        let ast = parser::parse_with_options(source, options.parse_options())?;

        let limits = options.limits();
        let (expression, match_count) = Validator::new(fields.as_deref(), limits).validate(&ast)?;
        log::debug!(
            "compiled {:?} ({} match expressions, schema: {})",
            source,
            match_count,
            fields.is_some()
        );

        Ok(Evaluator {
            source: source.to_string(),
            ast,
            expression,
            match_count,
            fields,
            bound_type,
            limits,
            tag_name: options.tag_name().to_string(),
            hook: options.hook().cloned(),
            policy,
        })
    }

    /// Evaluates against a host datum. A typed evaluator rejects any type
    /// other than the one it was compiled for.
    pub fn evaluate<T: Selectable + 'static>(&self, datum: &T) -> Result<bool, EvalError> {
        if let Some(bound) = self.bound_type
            && bound.id != TypeId::of::<T>()
        {
            return Err(EvalError::TypeMismatch {
                expected: bound.name,
                actual: type_name::<T>(),
            });
        }
        self.evaluate_value(&datum.to_value())
    }

    /// Evaluates against an already converted datum.
    pub fn evaluate_value(&self, datum: &Value) -> Result<bool, EvalError> {
        self.evaluate_in(&EvalContext::new(datum))
    }

    /// Evaluates with names already bound by `ctx`.
    pub fn evaluate_in(&self, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        self.eval(&self.expression, ctx)
    }

    /// Validates the compiled expression against another schema.
    pub fn validate_against(&self, fields: &FieldConfigurations) -> Result<(), ValidationError> {
        Validator::new(Some(fields), self.limits)
            .validate(&self.ast)
            .map(|_| ())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The parsed expression, before validation.
    pub fn expression(&self) -> &Expression {
        &self.ast
    }

    pub fn validated(&self) -> &ValidatedExpression {
        &self.expression
    }

    pub fn fields(&self) -> Option<&FieldConfigurations> {
        self.fields.as_deref()
    }

    pub fn match_count(&self) -> usize {
        self.match_count
    }

    /// Dump of the validated tree, showing implicit `any` rewrites.
    pub fn dump(&self) -> String {
        self.expression.dump_string()
    }

    fn eval(&self, expression: &ValidatedExpression, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        match expression {
            ValidatedExpression::Match(m) => self.eval_match(m, ctx),
            ValidatedExpression::Unary {
                operator: UnaryOperator::Not,
                operand,
            } => Ok(!self.eval(operand, ctx)?),
            ValidatedExpression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.eval(left, ctx)?;
                match operator {
                    BinaryOperator::And if !left => Ok(false),
                    BinaryOperator::Or if left => Ok(true),
                    _ => self.eval(right, ctx),
                }
            }
            ValidatedExpression::Collection(c) => self.eval_collection(c, ctx),
        }
    }

    /// Resolves `selector` in `ctx`. A first segment naming a binding is
    /// resolved from the bound value, anything else from the root.
    fn resolve<'v>(
        &'v self,
        selector: &Selector,
        ctx: &'v EvalContext<'v>,
    ) -> Result<Resolved<'v>, EvalError> {
        let pointer = Pointer::new(&selector.path, &self.tag_name).with_hook(self.hook.as_ref());

        let bound = selector.path.first().and_then(|first| ctx.lookup(first));
        let Some(bound) = bound else {
            return Ok(pointer.get(ctx.root)?);
        };

        if selector.path.len() > 1 && is_scalar(bound) {
            return Err(EvalError::BoundValueNotTraversable {
                bound: pointer_string(&selector.path[..1]),
                kind: bound.kind(),
                pointer: selector.pointer(),
            });
        }
        Ok(pointer.get_from(bound, 1)?)
    }

    /// Like [`Self::resolve`], with the not-found policy applied. `None`
    /// means the default policy decides the result.
    fn target<'v>(
        &'v self,
        selector: &Selector,
        ctx: &'v EvalContext<'v>,
    ) -> Result<Option<Resolved<'v>>, EvalError> {
        let missing = match self.resolve(selector, ctx) {
            Ok(Resolved::Value(value)) if value.is_null() => None,
            Err(EvalError::Resolve(err)) if err.kind.is_not_found() => Some(err),
            other => return other.map(Some),
        };

        match &self.policy {
            NotFoundPolicy::Default => Ok(None),
            NotFoundPolicy::Unknown(value) => Ok(Some(Resolved::Value(Cow::Borrowed(value)))),
            NotFoundPolicy::Error => Err(match missing {
                Some(err) => EvalError::Resolve(err),
                None => EvalError::MissingValue {
                    selector: selector.to_string(),
                },
            }),
        }
    }

    fn eval_match(&self, m: &ValidatedMatch, ctx: &EvalContext<'_>) -> Result<bool, EvalError> {
        let Some(resolved) = self.target(&m.selector, ctx)? else {
            return Ok(m.operator.missing_result());
        };

        match resolved {
            Resolved::Value(value) => self.match_value(m, &value),
            Resolved::Custom { matcher, rest } => {
                let literal = m.value.as_ref().map(|v| {
                    v.converted
                        .clone()
                        .unwrap_or_else(|| Coerced::String(v.raw.clone()))
                });
                matcher
                    .evaluate_match(&m.selector.path[rest..], m.operator, literal.as_ref())
                    .map_err(|source| EvalError::Custom {
                        selector: m.selector.to_string(),
                        source,
                    })
            }
        }
    }

    fn match_value(&self, m: &ValidatedMatch, value: &Value) -> Result<bool, EvalError> {
        let selector = || m.selector.to_string();

        match m.operator {
            MatchOperator::Equal | MatchOperator::NotEqual => {
                let equal = compare(m, value)? == Some(Ordering::Equal);
                Ok(equal == (m.operator == MatchOperator::Equal))
            }
            MatchOperator::Less
            | MatchOperator::LessEqual
            | MatchOperator::Greater
            | MatchOperator::GreaterEqual => {
                if !is_scalar(value) || matches!(value, Value::Bool(_)) {
                    return Err(EvalError::NoComparison {
                        selector: selector(),
                        kind: value.kind(),
                    });
                }
                let Some(ordering) = compare(m, value)? else {
                    return Ok(false);
                };
                Ok(match m.operator {
                    MatchOperator::Less => ordering == Ordering::Less,
                    MatchOperator::LessEqual => ordering != Ordering::Greater,
                    MatchOperator::Greater => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                })
            }
            MatchOperator::In | MatchOperator::NotIn => {
                let found = contains(m, value)?;
                Ok(found == (m.operator == MatchOperator::In))
            }
            MatchOperator::IsEmpty | MatchOperator::IsNotEmpty => {
                let empty = value.is_empty().ok_or_else(|| EvalError::EmptinessUnsupported {
                    kind: value.kind(),
                    selector: selector(),
                })?;
                Ok(empty == (m.operator == MatchOperator::IsEmpty))
            }
            MatchOperator::Matches | MatchOperator::NotMatches => {
                let Value::String(text) = value else {
                    return Err(EvalError::NotMatchable {
                        kind: value.kind(),
                        selector: selector(),
                    });
                };
                let regex = literal(m)?
                    .regex()
                    .map_err(|source| EvalError::Regex {
                        selector: selector(),
                        source,
                    })?;
                Ok(regex.is_match(text) == (m.operator == MatchOperator::Matches))
            }
        }
    }

    fn eval_collection(
        &self,
        c: &ValidatedCollection,
        ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError> {
        let collection = match self.target(&c.selector, ctx)? {
            None => return Ok(c.operator == CollectionOperator::All),
            Some(Resolved::Custom { .. }) => {
                return Err(EvalError::CustomCollection {
                    selector: c.selector.to_string(),
                });
            }
            Some(Resolved::Value(value)) => value,
        };

        match collection.as_ref() {
            Value::List(items) => self.quantify(
                c,
                ctx,
                false,
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (Cow::Owned(Value::Int(i as i64)), item)),
            ),
            Value::Map(map) => self.quantify(
                c,
                ctx,
                true,
                map.iter()
                    .map(|(key, value)| (Cow::Owned(Value::String(key.clone())), value)),
            ),
            Value::Pairs(pairs) => self.quantify(
                c,
                ctx,
                true,
                pairs.iter().map(|(key, value)| (Cow::Borrowed(key), value)),
            ),
            _ => Err(EvalError::NotACollection {
                selector: c.selector.to_string(),
            }),
        }
    }

    /// Runs the inner expression once per element. `any` stops at the first
    /// true element, `all` at the first false one.
    fn quantify<'c, I>(
        &self,
        c: &'c ValidatedCollection,
        ctx: &'c EvalContext<'c>,
        keyed: bool,
        elements: I,
    ) -> Result<bool, EvalError>
    where
        I: Iterator<Item = (Cow<'c, Value>, &'c Value)>,
    {
        let any = c.operator == CollectionOperator::Any;

        for (key, value) in elements {
            let frame = EvalContext {
                root: ctx.root,
                parent: Some(ctx),
                bindings: element_bindings(&c.binding, keyed, key, value),
            };
            if self.eval(&c.inner, &frame)? == any {
                return Ok(any);
            }
        }
        Ok(!any)
    }
}

fn element_bindings<'c>(
    binding: &'c CollectionBinding,
    keyed: bool,
    key: Cow<'c, Value>,
    value: &'c Value,
) -> [Option<Binding<'c>>; 2] {
    match binding {
        CollectionBinding::Default(name) => {
            // Lists bind their elements, maps their keys
            let bound = if keyed { key } else { Cow::Borrowed(value) };
            [Some(Binding::new(name, bound)), None]
        }
        CollectionBinding::Index(name) => [Some(Binding::new(name, key)), None],
        CollectionBinding::Value(name) => [Some(Binding::new(name, Cow::Borrowed(value))), None],
        CollectionBinding::IndexAndValue {
            index,
            value: value_name,
        } => [
            Some(Binding::new(index, key)),
            Some(Binding::new(value_name, Cow::Borrowed(value))),
        ],
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(_)
            | Value::Int(_)
            | Value::Uint(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::String(_)
    )
}

fn literal(m: &ValidatedMatch) -> Result<&ValidatedValue, EvalError> {
    m.value.as_ref().ok_or(EvalError::MissingLiteral {
        operator: m.operator,
    })
}

/// The literal coerced to the kind of `target`, reusing the validated
/// conversion when the kinds agree.
fn coerce_literal<'l>(
    literal: &'l ValidatedValue,
    target: &Value,
) -> Option<Result<Cow<'l, Coerced>, CoerceError>> {
    if let Some(converted) = &literal.converted {
        let same_kind = matches!(
            (converted, target),
            (Coerced::Bool(_), Value::Bool(_))
                | (Coerced::Int(_), Value::Int(_))
                | (Coerced::Uint(_), Value::Uint(_))
                | (Coerced::Float32(_), Value::Float32(_))
                | (Coerced::Float64(_), Value::Float64(_))
                | (Coerced::String(_), Value::String(_))
        );
        if same_kind {
            return Some(Ok(Cow::Borrowed(converted)));
        }
    }
    coerce::coerce_for(target, &literal.raw).map(|result| result.map(Cow::Owned))
}

/// Ordering of `value` relative to `literal`; `None` when incomparable.
fn order(value: &Value, literal: &Coerced) -> Option<Ordering> {
    match (value, literal) {
        (Value::Bool(a), Coerced::Bool(b)) => a.partial_cmp(b),
        (Value::Int(a), Coerced::Int(b)) => a.partial_cmp(b),
        (Value::Uint(a), Coerced::Uint(b)) => a.partial_cmp(b),
        (Value::Float32(a), Coerced::Float32(b)) => a.partial_cmp(b),
        (Value::Float64(a), Coerced::Float64(b)) => a.partial_cmp(b),
        // Decimal literal against an integer value
        (Value::Int(a), Coerced::Float64(b)) => (*a as f64).partial_cmp(b),
        (Value::Uint(a), Coerced::Float64(b)) => (*a as f64).partial_cmp(b),
        (Value::String(a), Coerced::String(b)) => a.as_str().partial_cmp(b.as_str()),
        _ => None,
    }
}

fn compare(m: &ValidatedMatch, value: &Value) -> Result<Option<Ordering>, EvalError> {
    let literal = literal(m)?;
    let coerced = coerce_literal(literal, value)
        .ok_or_else(|| EvalError::NoComparison {
            selector: m.selector.to_string(),
            kind: value.kind(),
        })?
        .map_err(|source| EvalError::Coercion {
            raw: literal.raw.clone(),
            selector: m.selector.to_string(),
            source,
        })?;
    Ok(order(value, &coerced))
}

fn element_equals(literal: &ValidatedValue, element: &Value) -> bool {
    match coerce_literal(literal, element) {
        Some(Ok(coerced)) => order(element, &coerced) == Some(Ordering::Equal),
        // Elements the literal cannot be coerced to never match
        _ => false,
    }
}

fn string_literal(literal: &ValidatedValue) -> &str {
    match &literal.converted {
        Some(Coerced::String(s)) => s,
        _ => &literal.raw,
    }
}

fn contains(m: &ValidatedMatch, value: &Value) -> Result<bool, EvalError> {
    let literal = literal(m)?;
    match value {
        Value::Map(map) => Ok(map.contains_key(string_literal(literal))),
        Value::Pairs(pairs) => Ok(pairs.iter().any(|(key, _)| element_equals(literal, key))),
        Value::List(items) => Ok(items.iter().any(|item| element_equals(literal, item))),
        Value::String(s) => Ok(s.contains(string_literal(literal))),
        other => Err(EvalError::MembershipUnsupported {
            kind: other.kind(),
            selector: m.selector.to_string(),
        }),
    }
}
