use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// The upstream API types these as plain strings. Known values get a variant,
// anything else is kept verbatim so a read-modify-write leaves it untouched.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                    Self::Other(value) => value.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $(stringify!($variant) => Self::$variant,)+
                    _ => Self::Other(value),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from)
            }
        }

        impl JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_string()
            }

            fn json_schema(gen: &mut SchemaGenerator) -> Schema {
                String::json_schema(gen)
            }
        }
    };
}

string_enum! {
    /// Role a machine plays in the cluster.
    MachineRole { Master, Node }
}

string_enum! {
    /// Terminal problems reported on a Cluster, requiring human intervention.
    ClusterStatusError {
        InvalidConfiguration,
        UnsupportedChange,
        CreateError,
        UpdateError,
        DeleteError,
    }
}

string_enum! {
    /// Terminal problems reported on a Machine.
    MachineStatusError {
        InvalidConfiguration,
        UnsupportedChange,
        InsufficientResources,
        CreateError,
        UpdateError,
        DeleteError,
    }
}

string_enum! {
    /// Terminal problems reported on a MachineSet.
    MachineSetStatusError { InvalidConfiguration }
}

impl MachineRole {
    /// Master in either the upstream spelling or lowercase.
    pub fn is_master(&self) -> bool {
        self.as_str().eq_ignore_ascii_case("Master")
    }
}
