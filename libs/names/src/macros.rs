//! Macros for defining typed fixture names.

/// Define a typed fixture name with a specific kind.
///
/// This generates a newtype wrapper around ULID with:
/// - A `KIND` constant
/// - `random()` to generate a fresh name
/// - `parse()` to parse from string
/// - `Display`, `FromStr`, `Serialize` and `Deserialize`
///
/// # Example
///
/// ```ignore
/// define_name!(AppName, "app");
///
/// let app = AppName::random();
/// let parsed: AppName = "pat-app-01hv4z3mxnkpqr9hstz7wcld4e".parse()?;
/// ```
#[macro_export]
macro_rules! define_name {
    ($name:ident, $kind:literal) => {
        /// A generated fixture name for this resource kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::Ulid);

        impl $name {
            /// The kind segment for this name type.
            pub const KIND: &'static str = $kind;

            /// Creates a new, unique name.
            #[must_use]
            pub fn random() -> Self {
                Self($crate::Ulid::new())
            }

            /// Creates a name from a raw ULID.
            #[must_use]
            pub const fn from_ulid(ulid: $crate::Ulid) -> Self {
                Self(ulid)
            }

            #[must_use]
            pub const fn ulid(&self) -> $crate::Ulid {
                self.0
            }

            /// Parses a name in the format `pat-{kind}-{ulid}`.
            pub fn parse(s: &str) -> Result<Self, $crate::NameError> {
                if s.is_empty() {
                    return Err($crate::NameError::Empty);
                }

                let rest = s
                    .strip_prefix($crate::MARKER)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .ok_or_else(|| $crate::NameError::MissingMarker(s.to_string()))?;

                let Some((kind, ulid_str)) = rest.rsplit_once('-') else {
                    return Err($crate::NameError::MissingMarker(s.to_string()));
                };

                if kind != Self::KIND {
                    return Err($crate::NameError::InvalidKind {
                        expected: Self::KIND,
                        actual: kind.to_string(),
                    });
                }

                let ulid = ulid_str
                    .to_ascii_uppercase()
                    .parse::<$crate::Ulid>()
                    .map_err(|e| $crate::NameError::InvalidUlid(e.to_string()))?;

                Ok(Self(ulid))
            }

            /// The name as an owned string, for passing to commands.
            #[must_use]
            pub fn as_string(&self) -> String {
                format!(
                    "{}-{}-{}",
                    $crate::MARKER,
                    Self::KIND,
                    self.0.to_string().to_ascii_lowercase()
                )
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.as_string())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::NameError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> String {
                name.as_string()
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.as_string())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}
