use std::fmt::{self, Write};

use super::expressions::{CollectionBinding, Expression, Selector};
use super::operators::{BinaryOperator, CollectionOperator, MatchOperator, UnaryOperator};

/// Indentation used by [`Dump::dump_string`].
pub const DUMP_INDENT: &str = "   ";

/// Renders an expression tree as nested braces for debugging and golden tests.
///
/// ```text
/// And {
///    Equal {
///       Selector: foo.bar
///       Value: "baz"
///    }
///    Is Empty {
///       Selector: list
///    }
/// }
/// ```
pub trait Dump {
    fn dump(&self, w: &mut dyn Write, indent: &str, level: usize) -> fmt::Result;

    fn dump_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.dump(&mut out, DUMP_INDENT, 0);
        out
    }
}

pub(crate) fn dump_match(
    w: &mut dyn Write,
    indent: &str,
    level: usize,
    operator: MatchOperator,
    selector: &Selector,
    raw: Option<&str>,
) -> fmt::Result {
    let local = indent.repeat(level);
    writeln!(w, "{}{} {{", local, operator)?;
    writeln!(w, "{}{}Selector: {}", local, indent, selector)?;
    if let Some(raw) = raw {
        writeln!(w, "{}{}Value: {:?}", local, indent, raw)?;
    }
    writeln!(w, "{}}}", local)
}

pub(crate) fn dump_unary(
    w: &mut dyn Write,
    indent: &str,
    level: usize,
    operator: UnaryOperator,
    operand: &dyn Dump,
) -> fmt::Result {
    let local = indent.repeat(level);
    writeln!(w, "{}{} {{", local, operator)?;
    operand.dump(w, indent, level + 1)?;
    writeln!(w, "{}}}", local)
}

pub(crate) fn dump_binary(
    w: &mut dyn Write,
    indent: &str,
    level: usize,
    operator: BinaryOperator,
    left: &dyn Dump,
    right: &dyn Dump,
) -> fmt::Result {
    let local = indent.repeat(level);
    writeln!(w, "{}{} {{", local, operator)?;
    left.dump(w, indent, level + 1)?;
    right.dump(w, indent, level + 1)?;
    writeln!(w, "{}}}", local)
}

pub(crate) fn dump_collection(
    w: &mut dyn Write,
    indent: &str,
    level: usize,
    operator: CollectionOperator,
    selector: &Selector,
    binding: &CollectionBinding,
    inner: &dyn Dump,
) -> fmt::Result {
    let local = indent.repeat(level);
    writeln!(w, "{}{} {{", local, operator)?;
    writeln!(w, "{}{}Selector: {}", local, indent, selector)?;
    writeln!(w, "{}{}Bind: {}", local, indent, binding)?;
    inner.dump(w, indent, level + 1)?;
    writeln!(w, "{}}}", local)
}

impl Dump for Expression {
    fn dump(&self, w: &mut dyn Write, indent: &str, level: usize) -> fmt::Result {
        match self {
            Expression::Match(m) => dump_match(
                w,
                indent,
                level,
                m.operator,
                &m.selector,
                m.value.as_ref().map(|v| v.raw.as_str()),
            ),
            Expression::Unary { operator, operand } => {
                dump_unary(w, indent, level, *operator, operand.as_ref())
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => dump_binary(w, indent, level, *operator, left.as_ref(), right.as_ref()),
            Expression::Collection(c) => dump_collection(
                w,
                indent,
                level,
                c.operator,
                &c.selector,
                &c.binding,
                c.inner.as_ref(),
            ),
        }
    }
}
