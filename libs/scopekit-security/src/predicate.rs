//! Filter algebra shared by scope predicates and caller queries.
//!
//! Both sides of a scoped query are values of the same closed type, so
//! combining them is a structural operation rather than a merge of raw query
//! objects where a caller key could overwrite a scope key.
//!
//! Documents are `serde_json::Value` objects as returned by the record store.
//! Field paths may be dotted (`"meta.owner"`).

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

/// A filter expression over document fields.
///
/// Serializes as a tagged union:
///
/// ```
/// use scopekit_security::Predicate;
///
/// let p = Predicate::eq("company_id", "company_1");
/// let json = serde_json::to_value(&p).unwrap();
/// assert_eq!(json["op"], "eq");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every document.
    All,
    /// `field = value`. An array field matches if any element equals
    /// `value`, as in the store dialect.
    Eq { field: String, value: Value },
    /// `field IN (values)`, with the same array rule as `Eq`.
    In { field: String, values: Vec<Value> },
    /// `field` holds `value`. Evaluates like `Eq`; the variant marks
    /// multi-valued ownership fields.
    Contains { field: String, value: Value },
    /// Conjunction. Empty conjunction matches everything.
    And { predicates: Vec<Predicate> },
    /// Disjunction. Empty disjunction matches nothing.
    Or { predicates: Vec<Predicate> },
}

impl Predicate {
    #[must_use]
    pub fn match_all() -> Self {
        Predicate::All
    }

    /// Predicate that matches no document.
    #[must_use]
    pub fn match_none() -> Self {
        Predicate::Or {
            predicates: Vec::new(),
        }
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn all_of(predicates: Vec<Predicate>) -> Self {
        Predicate::And { predicates }
    }

    #[must_use]
    pub fn any_of(predicates: Vec<Predicate>) -> Self {
        Predicate::Or { predicates }
    }

    /// True if this predicate trivially matches every document.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        match self {
            Predicate::All => true,
            Predicate::And { predicates } => predicates.iter().all(Predicate::is_match_all),
            _ => false,
        }
    }

    /// Conjunction of `self` and `other`, flattening nested `And`s and
    /// dropping `All` operands. Never removes a constraint of either side.
    #[must_use]
    pub fn and(self, other: Predicate) -> Predicate {
        let mut parts = Vec::new();
        for p in [self, other] {
            match p {
                Predicate::All => {}
                Predicate::And { predicates } => {
                    parts.extend(predicates.into_iter().filter(|p| !p.is_match_all()));
                }
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Predicate::All,
            1 => parts.remove(0),
            _ => Predicate::And { predicates: parts },
        }
    }

    /// Evaluate against a document.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq { field, value } | Predicate::Contains { field, value } => {
                lookup(doc, field).is_some_and(|v| holds(v, value))
            }
            Predicate::In { field, values } => {
                lookup(doc, field).is_some_and(|v| values.iter().any(|candidate| holds(v, candidate)))
            }
            Predicate::And { predicates } => predicates.iter().all(|p| p.matches(doc)),
            Predicate::Or { predicates } => predicates.iter().any(|p| p.matches(doc)),
        }
    }

    /// Fields this predicate references, in sorted order.
    #[must_use]
    pub fn referenced_fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::All => {}
            Predicate::Eq { field, .. }
            | Predicate::In { field, .. }
            | Predicate::Contains { field, .. } => {
                out.insert(field.as_str());
            }
            Predicate::And { predicates } | Predicate::Or { predicates } => {
                for p in predicates {
                    p.collect_fields(out);
                }
            }
        }
    }

    /// Render as a document-store filter (`$and`, `$or`, `$in` dialect).
    ///
    /// An array field matches a scalar equality in that dialect, so `Eq` and
    /// `Contains` render alike. A match-nothing predicate renders as an
    /// empty `$in` on `_id`.
    #[must_use]
    pub fn to_document(&self) -> Value {
        match self {
            Predicate::All => json!({}),
            Predicate::Eq { field, value } | Predicate::Contains { field, value } => {
                let mut m = Map::new();
                m.insert(field.clone(), json!({ "$eq": value }));
                Value::Object(m)
            }
            Predicate::In { field, values } => {
                let mut m = Map::new();
                m.insert(field.clone(), json!({ "$in": values }));
                Value::Object(m)
            }
            Predicate::And { predicates } => {
                let parts: Vec<Value> = predicates
                    .iter()
                    .filter(|p| !p.is_match_all())
                    .map(Predicate::to_document)
                    .collect();
                match parts.len() {
                    0 => json!({}),
                    1 => parts.into_iter().next().unwrap_or_else(|| json!({})),
                    _ => json!({ "$and": parts }),
                }
            }
            Predicate::Or { predicates } => {
                if predicates.is_empty() {
                    return json!({ "_id": { "$in": [] } });
                }
                let parts: Vec<Value> = predicates.iter().map(Predicate::to_document).collect();
                json!({ "$or": parts })
            }
        }
    }

    /// Parse a caller filter object written in the document-store dialect.
    ///
    /// Supported: `{field: scalar}`, `{field: {"$eq": v}}`,
    /// `{field: {"$in": [..]}}`, `{"$and": [..]}`, `{"$or": [..]}`.
    /// Multiple keys are conjoined. Anything else is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`FilterParseError`] for non-object filters, malformed operator
    /// operands and unsupported operators.
    pub fn from_document(doc: &Value) -> Result<Predicate, FilterParseError> {
        let Value::Object(map) = doc else {
            return Err(FilterParseError::NotAnObject);
        };

        let mut parts = Vec::with_capacity(map.len());
        for (key, value) in map {
            let part = match key.as_str() {
                "$and" | "$or" => {
                    let Value::Array(items) = value else {
                        return Err(FilterParseError::ExpectedArray {
                            operator: key.clone(),
                        });
                    };
                    let children = items
                        .iter()
                        .map(Predicate::from_document)
                        .collect::<Result<Vec<_>, _>>()?;
                    if key == "$and" {
                        Predicate::all_of(children)
                    } else {
                        Predicate::any_of(children)
                    }
                }
                op if op.starts_with('$') => {
                    return Err(FilterParseError::UnsupportedOperator {
                        operator: op.to_owned(),
                    });
                }
                field => parse_field_condition(field, value)?,
            };
            parts.push(part);
        }

        Ok(match parts.len() {
            0 => Predicate::All,
            1 => parts.remove(0),
            _ => Predicate::all_of(parts),
        })
    }
}

fn parse_field_condition(field: &str, value: &Value) -> Result<Predicate, FilterParseError> {
    let Value::Object(ops) = value else {
        return Ok(Predicate::eq(field, value.clone()));
    };
    if !ops.keys().any(|k| k.starts_with('$')) {
        // Embedded document literal.
        return Ok(Predicate::eq(field, value.clone()));
    }

    let mut parts = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        match op.as_str() {
            "$eq" => parts.push(Predicate::eq(field, operand.clone())),
            "$in" => {
                let Value::Array(values) = operand else {
                    return Err(FilterParseError::ExpectedArray {
                        operator: format!("{field}.$in"),
                    });
                };
                parts.push(Predicate::In {
                    field: field.to_owned(),
                    values: values.clone(),
                });
            }
            other => {
                return Err(FilterParseError::UnsupportedOperator {
                    operator: other.to_owned(),
                });
            }
        }
    }
    Ok(match parts.len() {
        1 => parts.remove(0),
        _ => Predicate::all_of(parts),
    })
}

/// Store-dialect equality: the whole value, or any element of an array.
fn holds(field_value: &Value, want: &Value) -> bool {
    field_value == want
        || matches!(field_value, Value::Array(items) if items.iter().any(|item| item == want))
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |cur, segment| match cur {
        Value::Object(m) => m.get(segment),
        _ => None,
    })
}

/// Errors raised while parsing a caller filter.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("filter must be a JSON object")]
    NotAnObject,

    #[error("operator '{operator}' expects an array operand")]
    ExpectedArray { operator: String },

    #[error("unsupported filter operator '{operator}'")]
    UnsupportedOperator { operator: String },
}
