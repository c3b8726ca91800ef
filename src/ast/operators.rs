use std::fmt;

/// Operator of a match expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchOperator {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `in` / `contains`
    In,
    /// `not in` / `not contains`
    NotIn,
    /// `is empty`
    IsEmpty,
    /// `is not empty`
    IsNotEmpty,
    /// `matches`
    Matches,
    /// `not matches`
    NotMatches,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
}

impl MatchOperator {
    pub fn name(self) -> &'static str {
        match self {
            MatchOperator::Equal => "Equal",
            MatchOperator::NotEqual => "Not Equal",
            MatchOperator::In => "In",
            MatchOperator::NotIn => "Not In",
            MatchOperator::IsEmpty => "Is Empty",
            MatchOperator::IsNotEmpty => "Is Not Empty",
            MatchOperator::Matches => "Matches",
            MatchOperator::NotMatches => "Not Matches",
            MatchOperator::Less => "Less Than",
            MatchOperator::LessEqual => "Less Than Or Equal",
            MatchOperator::Greater => "Greater Than",
            MatchOperator::GreaterEqual => "Greater Than Or Equal",
        }
    }

    /// Whether the operator takes a literal operand.
    pub fn requires_value(self) -> bool {
        !matches!(self, MatchOperator::IsEmpty | MatchOperator::IsNotEmpty)
    }

    /// Result used when the selector resolves to nothing and the default
    /// not-found policy is active. Negative operators hold vacuously.
    pub fn missing_result(self) -> bool {
        matches!(
            self,
            MatchOperator::NotEqual
                | MatchOperator::NotIn
                | MatchOperator::IsEmpty
                | MatchOperator::NotMatches
        )
    }
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => f.write_str("Not"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::And => f.write_str("And"),
            BinaryOperator::Or => f.write_str("Or"),
        }
    }
}

/// Quantifier of a collection expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOperator {
    Any,
    All,
}

impl fmt::Display for CollectionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionOperator::Any => f.write_str("Any"),
            CollectionOperator::All => f.write_str("All"),
        }
    }
}
