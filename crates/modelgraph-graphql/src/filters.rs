//! Filter expression language.
//!
//! Clauses have the form `fieldPath[!]=literal`:
//!
//! - `name="Alice"` keeps rows whose name is Alice
//! - `group__name__icontains='dev'` follows the `group` relation
//! - `age!=30` excludes rows whose age is 30
//! - `id__in=[1, 2, 3]`
//!
//! Literals are numbers, quoted strings, `True`/`False`, `None`/`null`,
//! lists, tuples and dicts.

use indexmap::IndexMap;
use modelgraph_storage::{Lookup, OrderBy, Predicate, QuerySpec};
use serde_json::{Map, Number, Value};

use crate::error::GraphQLError;
use crate::naming::storage_field_name;

/// One parsed clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    /// Lookup key with `!` stripped (`group__name__contains`).
    pub key: String,
    /// Field path in storage names (`["group", "name"]`).
    pub field_path: Vec<String>,
    /// Comparison operator, `exact` unless a suffix names another.
    pub lookup: Lookup,
    /// Whether the clause excludes rather than includes.
    pub negated: bool,
    /// Parsed literal.
    pub value: Value,
}

impl FilterExpression {
    /// Converts into a storage predicate.
    #[must_use]
    pub fn to_predicate(&self) -> Predicate {
        Predicate {
            path: self.field_path.clone(),
            lookup: self.lookup,
            value: self.value.clone(),
        }
    }
}

/// Include and exclude clauses keyed on their lookup key.
///
/// Within one side the last clause for a key wins; a key present on both
/// sides applies on both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    /// Clauses every row must satisfy.
    pub include: IndexMap<String, FilterExpression>,
    /// Clauses that together reject a row.
    pub exclude: IndexMap<String, FilterExpression>,
}

impl FilterSet {
    /// Returns `true` when no clause was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Builds the storage query, with `order_by` applied after filtering.
    #[must_use]
    pub fn into_query(self, order_by: Vec<OrderBy>) -> QuerySpec {
        QuerySpec {
            include: self.include.values().map(FilterExpression::to_predicate).collect(),
            exclude: self.exclude.values().map(FilterExpression::to_predicate).collect(),
            order_by,
        }
    }
}

/// Parses filter clauses.
///
/// # Errors
///
/// - `MalformedFilter` when a clause has no `=` or an empty key
/// - `InvalidFilterValue` when the literal cannot be parsed
pub fn parse_filters<S: AsRef<str>>(clauses: &[S]) -> Result<FilterSet, GraphQLError> {
    let mut set = FilterSet::default();
    for clause in clauses {
        let expression = parse_clause(clause.as_ref())?;
        let side = if expression.negated {
            &mut set.exclude
        } else {
            &mut set.include
        };
        side.insert(expression.key.clone(), expression);
    }
    Ok(set)
}

/// Parses ordering keys; a leading `-` sorts descending.
#[must_use]
pub fn parse_order_by<S: AsRef<str>>(keys: &[S]) -> Vec<OrderBy> {
    keys.iter()
        .map(|key| key.as_ref().trim())
        .filter(|key| !key.is_empty())
        .map(|key| match key.strip_prefix('-') {
            Some(rest) => OrderBy::desc(split_path(rest)),
            None => OrderBy::asc(split_path(key.trim_start_matches('+'))),
        })
        .collect()
}

fn split_path(key: &str) -> Vec<String> {
    key.split("__").map(storage_field_name).collect()
}

fn parse_clause(clause: &str) -> Result<FilterExpression, GraphQLError> {
    let malformed = || GraphQLError::MalformedFilter {
        clause: clause.to_string(),
    };

    let (raw_key, raw_value) = clause.split_once('=').ok_or_else(malformed)?;
    let negated = raw_key.contains('!');
    let key = raw_key.replace('!', "").trim().to_string();
    if key.is_empty() {
        return Err(malformed());
    }

    let mut field_path = split_path(&key);
    if field_path.iter().any(String::is_empty) {
        return Err(malformed());
    }
    let mut lookup = Lookup::Exact;
    if field_path.len() > 1
        && let Some(suffix) = field_path.last().and_then(|last| Lookup::from_suffix(last))
    {
        lookup = suffix;
        field_path.pop();
    }

    let value = parse_literal(raw_value).map_err(|reason| GraphQLError::InvalidFilterValue {
        clause: clause.to_string(),
        reason,
    })?;

    Ok(FilterExpression {
        key,
        field_path,
        lookup,
        negated,
        value,
    })
}

/// Deepest accepted nesting of lists, tuples and dicts in one literal.
pub const MAX_LITERAL_DEPTH: usize = 64;

/// Parses one literal.
///
/// # Errors
///
/// Returns a description of the first problem found.
pub fn parse_literal(source: &str) -> Result<Value, String> {
    let mut parser = LiteralParser {
        chars: source.chars().collect(),
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err("empty value".into());
    }
    let value = parser.value()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(format!("unexpected input at offset {}", parser.pos));
    }
    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("unexpected end of value".into()),
            Some('\'' | '"') => self.string().map(Value::String),
            Some(open @ ('[' | '(' | '{')) => {
                if self.depth >= MAX_LITERAL_DEPTH {
                    return Err("literal nested too deeply".into());
                }
                self.depth += 1;
                let nested = match open {
                    '[' => {
                        self.pos += 1;
                        self.sequence(']').map(Value::Array)
                    }
                    '(' => self.tuple(),
                    _ => self.dict(),
                };
                self.depth -= 1;
                nested
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => Err(format!("unexpected character {c:?}")),
        }
    }

    fn word(&mut self) -> Result<Value, String> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(format!("unquoted name {word:?}")),
        }
    }

    fn number(&mut self) -> Result<Value, String> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            let after_exponent =
                self.pos > start && matches!(self.chars[self.pos - 1], 'e' | 'E');
            if c.is_ascii_digit() || c == '.' || c == '_' || matches!(c, 'e' | 'E')
                || (after_exponent && matches!(c, '-' | '+'))
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        if let Ok(int) = text.parse::<u64>() {
            return Ok(Value::Number(int.into()));
        }
        let digits = text.trim_start_matches(['-', '+']);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("integer {text} out of range"));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("invalid number {text:?}"))
    }

    fn string(&mut self) -> Result<String, String> {
        let Some(quote) = self.peek() else {
            return Err("expected string".into());
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err("unterminated string".into());
            };
            self.pos += 1;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err("unterminated string".into());
                    };
                    self.pos += 1;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'u' => out.push(self.unicode_escape()?),
                        '\\' | '\'' | '"' => out.push(escaped),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, String> {
        let end = self.pos + 4;
        if end > self.chars.len() {
            return Err("truncated \\u escape".into());
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| format!("invalid \\u escape {hex:?}"))
    }

    /// Elements up to `close`; trailing comma allowed.
    fn sequence(&mut self, close: char) -> Result<Vec<Value>, String> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err(format!("expected ',' or {close:?}"));
        }
    }

    /// `()` is empty, `(x)` is `x`, `(x,)` and `(x, y)` are lists.
    fn tuple(&mut self) -> Result<Value, String> {
        self.pos += 1;
        self.skip_ws();
        if self.eat(')') {
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(first);
        }
        if !self.eat(',') {
            return Err("expected ',' or ')'".into());
        }
        let mut items = vec![first];
        items.extend(self.sequence(')')?);
        Ok(Value::Array(items))
    }

    /// `{k: v, ...}` is an object; `{a, b}` (a set) becomes a list.
    fn dict(&mut self) -> Result<Value, String> {
        self.pos += 1;
        self.skip_ws();
        if self.eat('}') {
            return Ok(Value::Object(Map::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if !self.eat(':') {
            let mut items = vec![first];
            if self.eat(',') {
                items.extend(self.sequence('}')?);
            } else if !self.eat('}') {
                return Err("expected ',', ':' or '}'".into());
            }
            return Ok(Value::Array(items));
        }

        let mut map = Map::new();
        let mut key = first;
        loop {
            let value = self.value()?;
            map.insert(dict_key(key), value);
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            if !self.eat(',') {
                return Err("expected ',' or '}'".into());
            }
            self.skip_ws();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            key = self.value()?;
            self.skip_ws();
            if !self.eat(':') {
                return Err("expected ':'".into());
            }
        }
    }
}

fn dict_key(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_include_and_exclude() {
        let set = parse_filters(&["a=1", "b!=2"]).unwrap();
        assert_eq!(set.include.len(), 1);
        assert_eq!(set.include["a"].value, json!(1));
        assert_eq!(set.exclude.len(), 1);
        assert_eq!(set.exclude["b"].value, json!(2));
        assert!(set.exclude["b"].negated);
    }

    #[test]
    fn test_missing_equals_is_malformed() {
        let err = parse_filters(&["bad"]).unwrap_err();
        assert!(matches!(err, GraphQLError::MalformedFilter { ref clause } if clause == "bad"));
        assert!(matches!(
            parse_filters(&["!=3"]).unwrap_err(),
            GraphQLError::MalformedFilter { .. }
        ));
    }

    #[test]
    fn test_bad_literal_is_invalid_value() {
        for clause in ["name=Alice", "a=", "a=[1, 2", "a='open", "a=1 2"] {
            let err = parse_filters(&[clause]).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_FILTER_VALUE", "{clause}");
        }
    }

    #[test]
    fn test_value_splits_at_first_equals() {
        let set = parse_filters(&["title='a=b'"]).unwrap();
        assert_eq!(set.include["title"].value, json!("a=b"));
    }

    #[test]
    fn test_lookup_suffix_and_path() {
        let set = parse_filters(&["group__name__icontains='dev'", "groupId__in=(1, 2)"]).unwrap();
        let name = &set.include["group__name__icontains"];
        assert_eq!(name.field_path, ["group", "name"]);
        assert_eq!(name.lookup, Lookup::IContains);

        let ids = &set.include["groupId__in"];
        assert_eq!(ids.field_path, ["group_id"]);
        assert_eq!(ids.lookup, Lookup::In);
        assert_eq!(ids.value, json!([1, 2]));

        let bare = parse_filters(&["in=1"]).unwrap();
        assert_eq!(bare.include["in"].lookup, Lookup::Exact);
    }

    #[test]
    fn test_same_key_both_sides_and_last_wins() {
        let set = parse_filters(&["a=1", "a=2", "a!=3"]).unwrap();
        assert_eq!(set.include["a"].value, json!(2));
        assert_eq!(set.exclude["a"].value, json!(3));

        let query = set.into_query(Vec::new());
        assert_eq!(query.include.len(), 1);
        assert_eq!(query.exclude.len(), 1);
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_literal("42").unwrap(), json!(42));
        assert_eq!(parse_literal("-1.5").unwrap(), json!(-1.5));
        assert_eq!(parse_literal("1e3").unwrap(), json!(1000.0));
        assert_eq!(parse_literal("1_000").unwrap(), json!(1000));
        assert_eq!(parse_literal("\"x\\\"y\"").unwrap(), json!("x\"y"));
        assert_eq!(parse_literal("'caf\\u00e9'").unwrap(), json!("café"));
        assert_eq!(parse_literal("True").unwrap(), json!(true));
        assert_eq!(parse_literal("false").unwrap(), json!(false));
        assert_eq!(parse_literal("None").unwrap(), json!(null));
        assert_eq!(parse_literal("[1, 'a', None,]").unwrap(), json!([1, "a", null]));
        assert_eq!(parse_literal("(7)").unwrap(), json!(7));
        assert_eq!(parse_literal("(7,)").unwrap(), json!([7]));
        assert_eq!(parse_literal("()").unwrap(), json!([]));
        assert_eq!(
            parse_literal("{'a': 1, 2: [True]}").unwrap(),
            json!({"a": 1, "2": [true]})
        );
        assert_eq!(parse_literal("{1, 2}").unwrap(), json!([1, 2]));
        assert!(parse_literal("nan").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        assert!(parse_literal(&nested(MAX_LITERAL_DEPTH)).is_ok());
        assert_eq!(
            parse_literal(&nested(MAX_LITERAL_DEPTH + 1)).unwrap_err(),
            "literal nested too deeply"
        );
        assert!(parse_literal(&"({".repeat(MAX_LITERAL_DEPTH)).is_err());

        let err = parse_filters(&[format!("name={}", "[".repeat(200_000))]).unwrap_err();
        assert!(matches!(
            err,
            GraphQLError::InvalidFilterValue { ref reason, .. } if reason == "literal nested too deeply"
        ));
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(parse_literal("18446744073709551615").unwrap(), json!(u64::MAX));
        assert_eq!(
            parse_literal("99999999999999999999").unwrap_err(),
            "integer 99999999999999999999 out of range"
        );
        assert!(parse_literal("-99999999999999999999").is_err());
        assert_eq!(parse_literal("1e20").unwrap(), json!(1e20));
    }

    #[test]
    fn test_order_by() {
        let order = parse_order_by(&["-name", "group__name", " "]);
        assert_eq!(order.len(), 2);
        assert!(order[0].descending);
        assert_eq!(order[0].path, ["name"]);
        assert!(!order[1].descending);
        assert_eq!(order[1].path, ["group", "name"]);
    }
}
