//! Scalar types of the generated schema.
//!
//! - Built-in: `ID`, `Int`, `Float`, `String`, `Boolean`
//! - Custom: `Date`, `DateTime`, `Time`, `Decimal`, `UUID`

mod scalars;

pub use scalars::{
    DATE_SCALAR, DATETIME_SCALAR, DECIMAL_SCALAR, TIME_SCALAR, UUID_SCALAR, UnmappedScalarKind,
    custom_scalars, is_builtin_scalar, map_scalar,
};
