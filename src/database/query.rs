use super::Document;

/// A borrowed attribute value read from a stored document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Field<'a> {
    Str(&'a str),
    Int(i64),
}

/// An owned comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Str(String),
    Int(i64),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Attribute predicates understood by the storage layer.
///
/// A document lacking the attribute never satisfies a predicate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    Eq(&'static str, Value),
    /// Case-insensitive string equality.
    IExact(&'static str, String),
    /// Case-insensitive substring.
    IContains(&'static str, String),
    Gte(&'static str, i64),
    Lte(&'static str, i64),
}

impl Predicate {
    pub(crate) fn field(&self) -> &'static str {
        match self {
            Predicate::Eq(f, _)
            | Predicate::IExact(f, _)
            | Predicate::IContains(f, _)
            | Predicate::Gte(f, _)
            | Predicate::Lte(f, _) => f,
        }
    }

    fn holds(&self, value: Field<'_>) -> bool {
        match (self, value) {
            (Predicate::Eq(_, Value::Str(want)), Field::Str(have)) => have == want,
            (Predicate::Eq(_, Value::Int(want)), Field::Int(have)) => have == *want,
            (Predicate::IExact(_, want), Field::Str(have)) => {
                have.to_lowercase() == want.to_lowercase()
            }
            (Predicate::IContains(_, want), Field::Str(have)) => {
                have.to_lowercase().contains(&want.to_lowercase())
            }
            (Predicate::Gte(_, bound), Field::Int(have)) => have >= *bound,
            (Predicate::Lte(_, bound), Field::Int(have)) => have <= *bound,
            _ => false,
        }
    }
}

/// Conjunction of predicates with an optional projection and row cap.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Query {
    predicates: Vec<Predicate>,
    only: Option<Vec<&'static str>>,
    limit: Option<usize>,
}

impl Query {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub(crate) fn only(mut self, fields: &[&'static str]) -> Self {
        self.only = Some(fields.to_vec());
        self
    }

    #[must_use]
    pub(crate) fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub(crate) fn projection(&self) -> Option<&[&'static str]> {
        self.only.as_deref()
    }

    pub(crate) fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether any predicate targets `field`.
    #[cfg(test)]
    pub(crate) fn constrains(&self, field: &str) -> bool {
        self.predicates.iter().any(|p| p.field() == field)
    }

    pub(crate) fn matches<D: Document>(&self, doc: &D) -> bool {
        self.predicates
            .iter()
            .all(|p| doc.field(p.field()).is_some_and(|value| p.holds(value)))
    }
}
