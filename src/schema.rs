//! Field configurations: which selectors exist for a host type, which
//! operators they accept and how literals are coerced for them.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use thiserror::Error;

use crate::{
    ast::MatchOperator,
    coerce::{self, CoerceFn},
    value::{Visibility, lookup_tag},
};

/// Tag consulted for field renames and exclusions unless overridden.
pub const DEFAULT_TAG_NAME: &str = "bexpr";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// Static shape of a host type.
#[derive(Debug, Clone)]
pub enum TypeDescriptor {
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float32,
    Float64,
    String,
    List(Box<TypeDescriptor>),
    Map {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Optional(Box<TypeDescriptor>),
    Record(RecordDescriptor),
    /// A type implementing [`crate::CustomMatcher`] with its own schema.
    Custom {
        name: String,
        fields: FieldConfigurations,
    },
    /// Dynamically shaped data, such as JSON.
    Any,
    /// A type expressions cannot look into.
    Opaque(String),
}

impl TypeDescriptor {
    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    /// Looks through any number of `Optional` layers.
    pub fn strip_optional(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Optional(inner) => inner.strip_optional(),
            other => other,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self.strip_optional(),
            TypeDescriptor::Bool
                | TypeDescriptor::Int(_)
                | TypeDescriptor::Uint(_)
                | TypeDescriptor::Float32
                | TypeDescriptor::Float64
                | TypeDescriptor::String
        )
    }

    pub fn type_name(&self) -> String {
        match self {
            TypeDescriptor::Bool => "bool".to_string(),
            TypeDescriptor::Int(width) => format!("i{}", width.bits()),
            TypeDescriptor::Uint(width) => format!("u{}", width.bits()),
            TypeDescriptor::Float32 => "f32".to_string(),
            TypeDescriptor::Float64 => "f64".to_string(),
            TypeDescriptor::String => "String".to_string(),
            TypeDescriptor::List(element) => format!("Vec<{}>", element.type_name()),
            TypeDescriptor::Map { key, value } => {
                format!("Map<{}, {}>", key.type_name(), value.type_name())
            }
            TypeDescriptor::Optional(inner) => format!("Option<{}>", inner.type_name()),
            TypeDescriptor::Record(record) => record.name.clone(),
            TypeDescriptor::Custom { name, .. } | TypeDescriptor::Opaque(name) => name.clone(),
            TypeDescriptor::Any => "Value".to_string(),
        }
    }
}

impl From<RecordDescriptor> for TypeDescriptor {
    fn from(record: RecordDescriptor) -> Self {
        TypeDescriptor::Record(record)
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub visibility: Visibility,
    pub tags: Vec<(String, String)>,
    pub ty: TypeDescriptor,
}

/// Static shape of a struct-like host type.
#[derive(Debug, Clone)]
pub struct RecordDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        RecordDescriptor {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.push(name, Visibility::Public, Vec::new(), ty)
    }

    pub fn tagged_field(
        self,
        name: impl Into<String>,
        tag_name: impl Into<String>,
        tag_value: impl Into<String>,
        ty: TypeDescriptor,
    ) -> Self {
        let tags = vec![(tag_name.into(), tag_value.into())];
        self.push(name, Visibility::Public, tags, ty)
    }

    pub fn private_field(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.push(name, Visibility::Private, Vec::new(), ty)
    }

    pub fn push(
        mut self,
        name: impl Into<String>,
        visibility: Visibility,
        tags: Vec<(String, String)>,
        ty: TypeDescriptor,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            visibility,
            tags,
            ty,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionType {
    #[default]
    None,
    Map,
    List,
}

/// Key of a [`FieldConfigurations`] entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldName {
    Named(String),
    /// Matches any segment that has no exact entry.
    Any,
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        FieldName::Named(name.to_string())
    }
}

impl From<String> for FieldName {
    fn from(name: String) -> Self {
        FieldName::Named(name)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::Named(name) => f.write_str(name),
            FieldName::Any => f.write_str("*"),
        }
    }
}

/// Schema node for one selector path.
#[derive(Debug, Clone, Default)]
pub struct FieldConfiguration {
    /// Declared name of the record field this configuration came from.
    pub struct_field_name: Option<String>,
    pub coerce_fn: Option<CoerceFn>,
    pub supported_operations: BTreeSet<MatchOperator>,
    pub collection_type: CollectionType,
    /// Schema of a collection's keys or positions.
    pub index_configuration: Option<Arc<FieldConfiguration>>,
    /// Schema of a collection's elements.
    pub value_configuration: Option<Arc<FieldConfiguration>>,
    pub sub_fields: FieldConfigurations,
}

impl FieldConfiguration {
    pub fn new(operations: impl IntoIterator<Item = MatchOperator>) -> Self {
        FieldConfiguration {
            supported_operations: operations.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_coerce_fn(mut self, coerce_fn: CoerceFn) -> Self {
        self.coerce_fn = Some(coerce_fn);
        self
    }

    pub fn with_sub_fields(mut self, sub_fields: FieldConfigurations) -> Self {
        self.sub_fields = sub_fields;
        self
    }

    pub fn supports(&self, operator: MatchOperator) -> bool {
        self.supported_operations.contains(&operator)
    }

    /// Configuration of a primitive scalar, or `None` for anything else.
    pub fn primitive(descriptor: &TypeDescriptor) -> Option<Self> {
        let descriptor = descriptor.strip_optional();
        let coerce_fn: CoerceFn = match descriptor {
            TypeDescriptor::Bool => coerce::coerce_bool,
            TypeDescriptor::Int(width) => int_coercion(*width),
            TypeDescriptor::Uint(width) => uint_coercion(*width),
            TypeDescriptor::Float32 => coerce::coerce_float32,
            TypeDescriptor::Float64 => coerce::coerce_float64,
            TypeDescriptor::String => coerce::coerce_string,
            _ => return None,
        };
        let operations = match descriptor {
            TypeDescriptor::Bool => BOOL_OPERATIONS,
            TypeDescriptor::String => STRING_OPERATIONS,
            _ => NUMERIC_OPERATIONS,
        };

        Some(FieldConfiguration::new(operations.iter().copied()).with_coerce_fn(coerce_fn))
    }
}

const BOOL_OPERATIONS: &[MatchOperator] = &[MatchOperator::Equal, MatchOperator::NotEqual];

const NUMERIC_OPERATIONS: &[MatchOperator] = &[
    MatchOperator::Equal,
    MatchOperator::NotEqual,
    MatchOperator::Less,
    MatchOperator::LessEqual,
    MatchOperator::Greater,
    MatchOperator::GreaterEqual,
];

const STRING_OPERATIONS: &[MatchOperator] = &[
    MatchOperator::Equal,
    MatchOperator::NotEqual,
    MatchOperator::In,
    MatchOperator::NotIn,
    MatchOperator::Matches,
    MatchOperator::NotMatches,
    MatchOperator::Less,
    MatchOperator::LessEqual,
    MatchOperator::Greater,
    MatchOperator::GreaterEqual,
];

const EMPTINESS_OPERATIONS: &[MatchOperator] =
    &[MatchOperator::IsEmpty, MatchOperator::IsNotEmpty];

const MEMBERSHIP_OPERATIONS: &[MatchOperator] = &[
    MatchOperator::IsEmpty,
    MatchOperator::IsNotEmpty,
    MatchOperator::In,
    MatchOperator::NotIn,
];

fn int_coercion(width: IntWidth) -> CoerceFn {
    match width {
        IntWidth::W8 => coerce::coerce_int8,
        IntWidth::W16 => coerce::coerce_int16,
        IntWidth::W32 => coerce::coerce_int32,
        IntWidth::W64 => coerce::coerce_int64,
    }
}

fn uint_coercion(width: IntWidth) -> CoerceFn {
    match width {
        IntWidth::W8 => coerce::coerce_uint8,
        IntWidth::W16 => coerce::coerce_uint16,
        IntWidth::W32 => coerce::coerce_uint32,
        IntWidth::W64 => coerce::coerce_uint64,
    }
}

/// Named sub-field configurations, the schema of one level of a datum.
#[derive(Debug, Clone, Default)]
pub struct FieldConfigurations(BTreeMap<FieldName, Arc<FieldConfiguration>>);

impl FieldConfigurations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        name: impl Into<FieldName>,
        configuration: impl Into<Arc<FieldConfiguration>>,
    ) -> Self {
        self.insert(name, configuration);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<FieldName>,
        configuration: impl Into<Arc<FieldConfiguration>>,
    ) {
        self.0.insert(name.into(), configuration.into());
    }

    pub fn get(&self, name: &FieldName) -> Option<&Arc<FieldConfiguration>> {
        self.0.get(name)
    }

    /// Exact name first, then the wildcard entry.
    pub fn lookup(&self, segment: &str) -> Option<&Arc<FieldConfiguration>> {
        self.0
            .get(&FieldName::Named(segment.to_string()))
            .or_else(|| self.0.get(&FieldName::Any))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Arc<FieldConfiguration>)> {
        self.0.iter()
    }

    /// Visits every configuration depth first with its full path. Stops
    /// early and returns false once `visit` does.
    pub fn walk<F>(&self, mut visit: F) -> bool
    where
        F: FnMut(&[FieldName], &FieldConfiguration) -> bool,
    {
        let mut path = Vec::new();
        walk_fields(self, &mut path, &mut visit)
    }
}

fn walk_fields(
    fields: &FieldConfigurations,
    path: &mut Vec<FieldName>,
    visit: &mut dyn FnMut(&[FieldName], &FieldConfiguration) -> bool,
) -> bool {
    for (name, configuration) in fields.iter() {
        path.push(name.clone());
        if !visit(path, configuration) || !walk_fields(&configuration.sub_fields, path, visit) {
            return false;
        }
        path.pop();
    }
    true
}

impl fmt::Display for FieldConfigurations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut result = Ok(());
        self.walk(|path, configuration| {
            let selector: Vec<String> = path.iter().map(ToString::to_string).collect();
            let operations: Vec<&str> = configuration
                .supported_operations
                .iter()
                .map(|op| op.name())
                .collect();
            result = writeln!(
                f,
                "{}: [{}]",
                selector.join("."),
                operations.join(", ")
            );
            result.is_ok()
        });
        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error(
        "Invalid top level type {type_name} - can only use records, maps keyed by strings or custom matchers"
    )]
    InvalidTopLevelType { type_name: String },

    #[error("Cannot generate FieldConfigurations for maps with keys that are not strings ({key})")]
    NonStringMapKey { key: String },
}

/// Generates the schema of a top-level type using the default tag name.
pub fn generate(descriptor: &TypeDescriptor) -> Result<FieldConfigurations, SchemaError> {
    generate_with_tag(descriptor, DEFAULT_TAG_NAME)
}

pub fn generate_with_tag(
    descriptor: &TypeDescriptor,
    tag_name: &str,
) -> Result<FieldConfigurations, SchemaError> {
    match descriptor.strip_optional() {
        TypeDescriptor::Record(record) => generate_record(record, tag_name),
        TypeDescriptor::Map { key, value } => {
            if !matches!(key.strip_optional(), TypeDescriptor::String) {
                return Err(SchemaError::NonStringMapKey {
                    key: key.type_name(),
                });
            }
            let mut fields = FieldConfigurations::new();
            if let Some(configuration) = generate_field(value, tag_name)? {
                fields.insert(FieldName::Any, configuration);
            }
            Ok(fields)
        }
        TypeDescriptor::Custom { fields, .. } => Ok(fields.clone()),
        other => Err(SchemaError::InvalidTopLevelType {
            type_name: other.type_name(),
        }),
    }
}

fn generate_record(
    record: &RecordDescriptor,
    tag_name: &str,
) -> Result<FieldConfigurations, SchemaError> {
    let mut fields = FieldConfigurations::new();

    for field in &record.fields {
        if field.visibility == Visibility::Private {
            continue;
        }

        let tag = lookup_tag(&field.tags, tag_name);
        if tag == Some("-") {
            continue;
        }

        let Some(mut configuration) = generate_field(&field.ty, tag_name)? else {
            continue;
        };
        configuration.struct_field_name = Some(field.name.clone());
        let configuration = Arc::new(configuration);

        let mut aliases: Vec<&str> = tag
            .map(|t| t.split(',').map(str::trim).filter(|a| !a.is_empty()).collect())
            .unwrap_or_default();
        if aliases.is_empty() {
            aliases.push(&field.name);
        }
        for alias in aliases {
            fields.insert(alias, Arc::clone(&configuration));
        }
    }

    Ok(fields)
}

/// Schema of a nested field. Unsupported types yield `None` and are left
/// out of their parent.
fn generate_field(
    descriptor: &TypeDescriptor,
    tag_name: &str,
) -> Result<Option<FieldConfiguration>, SchemaError> {
    if let Some(primitive) = FieldConfiguration::primitive(descriptor) {
        return Ok(Some(primitive));
    }

    let configuration = match descriptor.strip_optional() {
        TypeDescriptor::Map { key, value } => {
            if !matches!(key.strip_optional(), TypeDescriptor::String) {
                // Keys cannot be addressed from a selector
                return Ok(Some(FieldConfiguration::new(
                    EMPTINESS_OPERATIONS.iter().copied(),
                )));
            }

            let value_configuration = generate_field(value, tag_name)?.map(Arc::new);
            let mut sub_fields = FieldConfigurations::new();
            if let Some(value_configuration) = &value_configuration {
                sub_fields.insert(FieldName::Any, Arc::clone(value_configuration));
            }

            FieldConfiguration {
                coerce_fn: Some(coerce::coerce_string),
                collection_type: CollectionType::Map,
                index_configuration: FieldConfiguration::primitive(&TypeDescriptor::String)
                    .map(Arc::new),
                value_configuration,
                sub_fields,
                ..FieldConfiguration::new(MEMBERSHIP_OPERATIONS.iter().copied())
            }
        }
        TypeDescriptor::List(element) => {
            let index_configuration =
                FieldConfiguration::primitive(&TypeDescriptor::Int(IntWidth::W64)).map(Arc::new);

            if let Some(element_configuration) = FieldConfiguration::primitive(element) {
                FieldConfiguration {
                    coerce_fn: element_configuration.coerce_fn,
                    collection_type: CollectionType::List,
                    index_configuration,
                    value_configuration: Some(Arc::new(element_configuration)),
                    ..FieldConfiguration::new(MEMBERSHIP_OPERATIONS.iter().copied())
                }
            } else {
                let element_configuration = generate_field(element, tag_name)?;
                let sub_fields = element_configuration
                    .as_ref()
                    .map(|e| e.sub_fields.clone())
                    .unwrap_or_default();
                FieldConfiguration {
                    collection_type: CollectionType::List,
                    index_configuration,
                    value_configuration: element_configuration.map(Arc::new),
                    sub_fields,
                    ..FieldConfiguration::new(EMPTINESS_OPERATIONS.iter().copied())
                }
            }
        }
        TypeDescriptor::Record(record) => {
            FieldConfiguration::default().with_sub_fields(generate_record(record, tag_name)?)
        }
        TypeDescriptor::Custom { fields, .. } => {
            FieldConfiguration::default().with_sub_fields(fields.clone())
        }
        _ => return Ok(None),
    };

    Ok(Some(configuration))
}
