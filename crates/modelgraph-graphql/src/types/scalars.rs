//! Storage kind to GraphQL scalar mapping.
//!
//! The built-in GraphQL scalars cover most storage kinds; dates, times,
//! decimals and UUIDs get custom scalars that carry their values as strings.

use std::sync::LazyLock;

use async_graphql::Value;
use async_graphql::dynamic::{Scalar, TypeRef};
use modelgraph_storage::StorageKind;

use crate::schema::TypeDescriptor;

/// Name of the custom date scalar (`YYYY-MM-DD`).
pub const DATE_SCALAR: &str = "Date";
/// Name of the custom date-time scalar (ISO 8601).
pub const DATETIME_SCALAR: &str = "DateTime";
/// Name of the custom time scalar (`hh:mm[:ss[.ffffff]]`).
pub const TIME_SCALAR: &str = "Time";
/// Name of the custom decimal scalar.
pub const DECIMAL_SCALAR: &str = "Decimal";
/// Name of the custom UUID scalar.
pub const UUID_SCALAR: &str = "UUID";

/// YYYY-MM-DD
static DATE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$")
        .expect("Invalid date regex")
});

/// hh:mm[:ss[.ffffff]]
static TIME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9](:[0-5][0-9](\.[0-9]+)?)?$")
        .expect("Invalid time regex")
});

/// A date, optionally followed by `T` or a space, a time and a UTC offset.
static DATETIME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])([T ]([01][0-9]|2[0-3]):[0-5][0-9](:[0-5][0-9](\.[0-9]+)?)?(Z|[+-][0-9]{2}:?[0-9]{2})?)?$",
    )
    .expect("Invalid datetime regex")
});

static DECIMAL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$").expect("Invalid decimal regex")
});

/// Canonical hyphenated form, any case.
static UUID_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("Invalid uuid regex")
});

/// A storage kind with no scalar mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No scalar mapping for storage kind {0}")]
pub struct UnmappedScalarKind(pub StorageKind);

/// Maps a storage kind to its scalar type.
///
/// Relations and backend-specific kinds have no scalar form.
///
/// # Errors
///
/// Returns `UnmappedScalarKind` for [`StorageKind::Relation`] and
/// [`StorageKind::Other`].
pub fn map_scalar(kind: &StorageKind) -> Result<TypeDescriptor, UnmappedScalarKind> {
    let name = match kind {
        StorageKind::AutoId | StorageKind::SmallAutoId | StorageKind::BigAutoId => TypeRef::ID,
        StorageKind::Boolean | StorageKind::NullBoolean => TypeRef::BOOLEAN,
        StorageKind::Integer
        | StorageKind::SmallInteger
        | StorageKind::BigInteger
        | StorageKind::PositiveInteger
        | StorageKind::PositiveSmallInteger
        | StorageKind::PositiveBigInteger => TypeRef::INT,
        StorageKind::Float => TypeRef::FLOAT,
        StorageKind::Char
        | StorageKind::Text
        | StorageKind::Email
        | StorageKind::Url
        | StorageKind::Slug
        | StorageKind::IpAddress
        | StorageKind::FilePath => TypeRef::STRING,
        StorageKind::Date => DATE_SCALAR,
        StorageKind::Datetime => DATETIME_SCALAR,
        StorageKind::Time => TIME_SCALAR,
        StorageKind::Decimal => DECIMAL_SCALAR,
        StorageKind::Uuid => UUID_SCALAR,
        StorageKind::Relation | StorageKind::Other(_) => {
            return Err(UnmappedScalarKind(kind.clone()));
        }
    };
    Ok(TypeDescriptor::Scalar(name.to_string()))
}

/// Returns `true` for the scalars GraphQL defines itself.
#[must_use]
pub fn is_builtin_scalar(name: &str) -> bool {
    matches!(
        name,
        TypeRef::ID | TypeRef::INT | TypeRef::FLOAT | TypeRef::STRING | TypeRef::BOOLEAN
    )
}

/// The custom scalars every generated schema registers.
#[must_use]
pub fn custom_scalars() -> Vec<Scalar> {
    vec![
        Scalar::new(DATE_SCALAR)
            .description("A calendar date (YYYY-MM-DD)")
            .validator(|value| as_str(value).is_some_and(is_date)),
        Scalar::new(DATETIME_SCALAR)
            .description("A date and time (ISO 8601)")
            .validator(|value| as_str(value).is_some_and(is_datetime)),
        Scalar::new(TIME_SCALAR)
            .description("A time of day (hh:mm:ss)")
            .validator(|value| as_str(value).is_some_and(is_time)),
        Scalar::new(DECIMAL_SCALAR)
            .description("An arbitrary precision decimal, as a string or number")
            .validator(|value| match value {
                Value::Number(_) => true,
                Value::String(s) => is_decimal(s),
                _ => false,
            }),
        Scalar::new(UUID_SCALAR)
            .description("A UUID in its canonical hyphenated form")
            .validator(|value| as_str(value).is_some_and(is_uuid)),
    ]
}

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn is_date(s: &str) -> bool {
    DATE_REGEX.is_match(s)
}

fn is_time(s: &str) -> bool {
    TIME_REGEX.is_match(s)
}

fn is_datetime(s: &str) -> bool {
    DATETIME_REGEX.is_match(s)
}

fn is_decimal(s: &str) -> bool {
    DECIMAL_REGEX.is_match(s)
}

fn is_uuid(s: &str) -> bool {
    UUID_REGEX.is_match(s)
}
