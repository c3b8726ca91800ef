// tests/common/mod.rs

#![allow(dead_code)]

use bexpr::{Value, selectable_record};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

selectable_record! {
    Point {
        public "X" => x,
        public "Y" => y,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Nested {
    pub map: HashMap<String, String>,
    pub map_of_structs: HashMap<String, Point>,
    pub slice_of_ints: Vec<i32>,
    pub slice_of_structs: Vec<Point>,
}

selectable_record! {
    Nested {
        public "Map" => map,
        public "MapOfStructs" => map_of_structs,
        public "SliceOfInts" => slice_of_ints,
        public "SliceOfStructs" => slice_of_structs,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Top {
    pub int: i32,
    pub uint8: u8,
    pub float: f64,
    pub flag: bool,
    pub string: String,
    pub tags: Vec<String>,
    pub nested: Nested,
    pub optional: Option<String>,
    pub hidden: bool,
    pub renamed: String,
    pub internal: String,
}

selectable_record! {
    Top {
        public "TopInt" => int,
        public "TopUint8" => uint8,
        public "TopFloat" => float,
        public "TopBool" => flag,
        public "TopString" => string,
        public "Tags" => tags,
        public "Nested" => nested,
        public "Optional" => optional,
        public "Hidden" => hidden [bexpr = "-"],
        public "Renamed" => renamed [bexpr = "renamed,alias"],
        private "internal" => internal,
    }
}

pub fn point(x: i32, y: i32) -> Point {
    Point { x, y }
}

pub fn top() -> Top {
    Top {
        int: 5,
        uint8: 7,
        float: 1.5,
        flag: true,
        string: "hello world".to_string(),
        tags: vec!["prod".to_string(), "web".to_string()],
        nested: Nested {
            map: HashMap::from([
                ("key".to_string(), "value".to_string()),
                ("other".to_string(), "thing".to_string()),
            ]),
            map_of_structs: HashMap::from([("a".to_string(), point(1, 2))]),
            slice_of_ints: vec![1, 2, 3],
            slice_of_structs: vec![point(1, 2), point(3, 5)],
        },
        optional: None,
        hidden: true,
        renamed: "r".to_string(),
        internal: "secret".to_string(),
    }
}

/// Builds a string-keyed map value from pairs.
pub fn object(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

pub fn list(values: Vec<Value>) -> Value {
    Value::List(values)
}

pub fn strings(values: &[&str]) -> Value {
    Value::List(values.iter().map(|s| Value::from(*s)).collect())
}
