//! Bridge between host types and the evaluator.
//!
//! A [`Selectable`] type describes its shape statically, which drives schema
//! generation, and converts instances into a [`Value`] for evaluation.

use std::{
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
    sync::Arc,
};

use crate::{
    convert::json_to_value,
    schema::{IntWidth, TypeDescriptor},
    value::Value,
};

pub trait Selectable {
    fn describe() -> TypeDescriptor
    where
        Self: Sized;

    fn to_value(&self) -> Value;
}

macro_rules! impl_selectable_scalar {
    ($($ty:ty => $descriptor:expr, $variant:ident as $cast:ty;)*) => {
        $(
            impl Selectable for $ty {
                fn describe() -> TypeDescriptor {
                    $descriptor
                }

                fn to_value(&self) -> Value {
                    Value::$variant(*self as $cast)
                }
            }
        )*
    };
}

impl_selectable_scalar! {
    i8 => TypeDescriptor::Int(IntWidth::W8), Int as i64;
    i16 => TypeDescriptor::Int(IntWidth::W16), Int as i64;
    i32 => TypeDescriptor::Int(IntWidth::W32), Int as i64;
    i64 => TypeDescriptor::Int(IntWidth::W64), Int as i64;
    isize => TypeDescriptor::Int(IntWidth::W64), Int as i64;
    u8 => TypeDescriptor::Uint(IntWidth::W8), Uint as u64;
    u16 => TypeDescriptor::Uint(IntWidth::W16), Uint as u64;
    u32 => TypeDescriptor::Uint(IntWidth::W32), Uint as u64;
    u64 => TypeDescriptor::Uint(IntWidth::W64), Uint as u64;
    usize => TypeDescriptor::Uint(IntWidth::W64), Uint as u64;
    f32 => TypeDescriptor::Float32, Float32 as f32;
    f64 => TypeDescriptor::Float64, Float64 as f64;
}

impl Selectable for bool {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Selectable for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Selectable for &str {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl<T: Selectable> Selectable for Option<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::optional(T::describe())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: Selectable> Selectable for Box<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }

    fn to_value(&self) -> Value {
        self.as_ref().to_value()
    }
}

impl<T: Selectable> Selectable for Arc<T> {
    fn describe() -> TypeDescriptor {
        T::describe()
    }

    fn to_value(&self) -> Value {
        self.as_ref().to_value()
    }
}

impl<T: Selectable> Selectable for Vec<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::list(T::describe())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Selectable::to_value).collect())
    }
}

impl<T: Selectable, const N: usize> Selectable for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::list(T::describe())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Selectable::to_value).collect())
    }
}

fn map_value<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> Value
where
    K: Selectable + 'a,
    V: Selectable + 'a,
{
    let pairs: Vec<(Value, Value)> = entries.map(|(k, v)| (k.to_value(), v.to_value())).collect();
    if pairs.iter().all(|(k, _)| matches!(k, Value::String(_))) {
        let map = pairs
            .into_iter()
            .filter_map(|(k, v)| match k {
                Value::String(key) => Some((key, v)),
                _ => None,
            })
            .collect();
        Value::Map(map)
    } else {
        Value::Pairs(pairs)
    }
}

impl<K: Selectable, V: Selectable, S: BuildHasher> Selectable for HashMap<K, V, S> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map(K::describe(), V::describe())
    }

    fn to_value(&self) -> Value {
        map_value(self.iter())
    }
}

impl<K: Selectable, V: Selectable> Selectable for BTreeMap<K, V> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::map(K::describe(), V::describe())
    }

    fn to_value(&self) -> Value {
        map_value(self.iter())
    }
}

impl Selectable for Value {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Any
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl Selectable for serde_json::Value {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Any
    }

    fn to_value(&self) -> Value {
        json_to_value(self.clone())
    }
}

#[doc(hidden)]
pub fn describe_field<S, F, G>(_accessor: G) -> TypeDescriptor
where
    F: Selectable,
    G: Fn(&S) -> &F,
{
    F::describe()
}

/// Implements [`Selectable`] for a struct by listing its exposed fields.
///
/// Each entry names the visibility (`public` or `private`), the field name
/// used in expressions and the Rust field it reads, optionally followed by
/// tags.
///
/// ```
/// use bexpr::selectable_record;
///
/// struct Service {
///     name: String,
///     port: u16,
///     tags: Vec<String>,
///     secret: String,
///     internal: bool,
/// }
///
/// selectable_record! {
///     Service {
///         public "Name" => name,
///         public "Port" => port [bexpr = "port,p"],
///         public "Tags" => tags,
///         public "Secret" => secret [bexpr = "-"],
///         private "internal" => internal,
///     }
/// }
/// ```
#[macro_export]
macro_rules! selectable_record {
    (@visibility public) => {
        $crate::value::Visibility::Public
    };
    (@visibility private) => {
        $crate::value::Visibility::Private
    };
    (
        $ty:ident {
            $(
                $vis:ident $name:literal => $field:ident
                $( [ $( $tag:ident = $tag_value:literal ),* $(,)? ] )?
            ),* $(,)?
        }
    ) => {
        impl $crate::Selectable for $ty {
            fn describe() -> $crate::schema::TypeDescriptor {
                let record = $crate::schema::RecordDescriptor::new(stringify!($ty));
                $(
                    let record = record.push(
                        $name,
                        $crate::selectable_record!(@visibility $vis),
                        vec![$($((stringify!($tag).to_string(), $tag_value.to_string())),*)?],
                        $crate::selectable::describe_field(|s: &$ty| &s.$field),
                    );
                )*
                record.into()
            }

            fn to_value(&self) -> $crate::Value {
                let record = $crate::value::Record::new(stringify!($ty));
                $(
                    let record = record.push(
                        $name,
                        $crate::selectable_record!(@visibility $vis),
                        vec![$($((stringify!($tag).to_string(), $tag_value.to_string())),*)?],
                        $crate::Selectable::to_value(&self.$field),
                    );
                )*
                $crate::Value::Record(record)
            }
        }
    };
}
