//! # Expression Syntax Tree
//!
//! Parsed form of a boolean expression such as
//!
//! ```text
//! tags contains prod and port == 80
//! ```
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Selectors, literals and the [`Expression`] tree
//! - **[operators]** - Match, logical and quantifier operators
//! - **[dump]** - Nested-brace pretty printer
//!
//! ## Precedence
//!
//! From tightest to loosest: parentheses, match expressions, `any`/`all`,
//! `not`, `and`, `or`. `and` and `or` are left-associative.
//!
//! ## Selectors
//!
//! ```text
//! foo.bar["key with spaces"].baz
//! "/foo/bar/key~1with~1slashes"
//! ```
//!
//! Both forms produce the same segment list.
//!
//! ## Collections
//!
//! ```text
//! any tags as t { t == "prod" }
//! all ports as _, p { p > 1024 }
//! ```

pub mod dump;
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use dump::Dump;
pub use expressions::{
    CollectionBinding, CollectionExpression, Expression, MatchExpression, MatchValue, Selector,
    SelectorType,
};
pub use operators::{BinaryOperator, CollectionOperator, MatchOperator, UnaryOperator};
pub use tokens::Token;
