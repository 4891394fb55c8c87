//! Parameter canonicalization.
//!
//! A parameter object is identified by its key fields only. Fields that
//! resolve to null are left out, so adding an optional field later (default
//! `None`) keeps every existing footprint unchanged. The non-key payload is
//! display metadata and never reaches the encoder.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::EncodeError;
use crate::resolver::{Encodable, Resolver};
use crate::value::{TypePath, Value};

/// Name of the non-key field the [`parameter!`](crate::parameter!) macro adds.
pub const NON_KEY_FIELD: &str = "non_key";

/// Free-form display metadata attached to a parameter object.
pub type NonKey = BTreeMap<String, String>;

/// A record of named key fields plus optional non-key metadata.
pub trait Parameter {
    /// Identity used for the `KeyedObject` frame.
    fn type_path(&self) -> TypePath;

    /// Key fields by name, in any order.
    fn key_fields(&self) -> Vec<(&'static str, &dyn Encodable)>;

    /// Display-only metadata.
    fn non_key(&self) -> Option<&NonKey> {
        None
    }
}

/// Builds the key payload: non-null key fields sorted by name, each as a
/// `[name, value]` pair.
pub fn parameter_key<P: Parameter + ?Sized>(
    param: &P,
    resolver: &mut Resolver,
) -> Result<Value, EncodeError> {
    let mut fields = param.key_fields();
    fields.retain(|(name, _)| *name != NON_KEY_FIELD);
    fields.sort_by_key(|(name, _)| *name);

    let mut pairs = Vec::with_capacity(fields.len());
    for (name, field) in fields {
        let value = resolver.resolve(field)?;
        if value.is_null() {
            continue;
        }
        pairs.push(Value::Sequence(vec![Value::from(name), value]));
    }
    Ok(Value::Sequence(pairs))
}

/// Renders a parameter as right-aligned `name : value` lines, followed by the
/// non-key entries under `--- extra info ---`.
pub struct ParameterDisplay<'a, P: ?Sized>(pub &'a P);

impl<P: Parameter + ?Sized> fmt::Display for ParameterDisplay<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = self.0.key_fields();
        fields.retain(|(name, _)| *name != NON_KEY_FIELD);
        fields.sort_by_key(|(name, _)| *name);

        let mut lines = Vec::new();
        let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        for (name, field) in fields {
            match Resolver::new().resolve(field) {
                Ok(Value::Null) => {}
                Ok(value) => lines.push(format!("{name:>width$} : {value}")),
                Err(e) => lines.push(format!("{name:>width$} : <{e}>")),
            }
        }

        if let Some(non_key) = self.0.non_key() {
            lines.push("--- extra info ---".to_string());
            let width = non_key.keys().map(String::len).max().unwrap_or(0);
            for (key, value) in non_key {
                lines.push(format!("{key:>width$} : {value}"));
            }
        }
        f.write_str(&lines.join("\n"))
    }
}

/// Declares a parameter struct.
///
/// The struct gets its key fields plus a `pub non_key: NonKey` field, and
/// implementations of [`Parameter`], [`KeyProtocol`](crate::KeyProtocol),
/// [`Encodable`] and [`Display`](std::fmt::Display). The type path module
/// defaults to `module_path!()`; pin it with `module = "...";` when the
/// footprint must survive moving the type.
///
/// ```rust
/// use footprint_canonical::{encode, parameter, NonKey};
///
/// parameter! {
///     module = "demo";
///     #[derive(Debug, Clone)]
///     pub struct Grid {
///         pub n: u32,
///         pub spacing: f64,
///     }
/// }
///
/// let mut grid = Grid { n: 8, spacing: 0.5, non_key: NonKey::new() };
/// let before = encode(&grid)?;
/// grid.non_key.insert("note".into(), "coarse".into());
/// assert_eq!(encode(&grid)?, before);
/// # Ok::<(), footprint_canonical::EncodeError>(())
/// ```
#[macro_export]
macro_rules! parameter {
    (
        @impl $module:expr;
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $ty, )*
            /// Display-only metadata, never part of the footprint.
            pub non_key: $crate::NonKey,
        }

        impl $name {
            /// Adds a display-only metadata entry.
            #[allow(dead_code)]
            pub fn with_info(
                mut self,
                key: impl ::std::convert::Into<::std::string::String>,
                value: impl ::std::string::ToString,
            ) -> Self {
                self.non_key.insert(key.into(), value.to_string());
                self
            }
        }

        impl $crate::Parameter for $name {
            fn type_path(&self) -> $crate::TypePath {
                $crate::TypePath::new($module, stringify!($name))
            }

            fn key_fields(&self) -> ::std::vec::Vec<(&'static str, &dyn $crate::Encodable)> {
                ::std::vec![$( (stringify!($field), &self.$field as &dyn $crate::Encodable) ),*]
            }

            fn non_key(&self) -> ::std::option::Option<&$crate::NonKey> {
                ::std::option::Option::Some(&self.non_key)
            }
        }

        impl $crate::KeyProtocol for $name {
            fn type_path(&self) -> $crate::TypePath {
                <Self as $crate::Parameter>::type_path(self)
            }

            fn footprint_key(
                &self,
                resolver: &mut $crate::Resolver,
            ) -> ::std::result::Result<$crate::Value, $crate::EncodeError> {
                $crate::parameter_key(self, resolver)
            }
        }

        impl $crate::Encodable for $name {
            fn as_keyed(&self) -> ::std::option::Option<&dyn $crate::KeyProtocol> {
                ::std::option::Option::Some(self)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&$crate::ParameterDisplay(self), f)
            }
        }
    };
    (
        module = $module:expr;
        $($rest:tt)*
    ) => {
        $crate::parameter!(@impl $module; $($rest)*);
    };
    ($($rest:tt)*) => {
        $crate::parameter!(@impl ::std::module_path!(); $($rest)*);
    };
}
