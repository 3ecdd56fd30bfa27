//! Declared types of handler parameters.

use std::any::TypeId;
use std::fmt;

/// Identity of a Rust type: its `TypeId` plus a name for messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`app::dto::User` -> `User`)
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Declared type of a formal parameter.
///
/// Scalar variants are primitive-like: they cannot be absent once binding
/// has finished. Everything else may be left empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Optional(Box<ValueType>),
    /// `serde_json::Value`
    Json,
    /// `HashMap<String, String>`
    Map,
    Custom(TypeKey),
}

impl ValueType {
    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    pub fn custom<T: 'static>() -> Self {
        ValueType::Custom(TypeKey::of::<T>())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ValueType::Bool
                | ValueType::Char
                | ValueType::I8
                | ValueType::I16
                | ValueType::I32
                | ValueType::I64
                | ValueType::U8
                | ValueType::U16
                | ValueType::U32
                | ValueType::U64
                | ValueType::F32
                | ValueType::F64
        )
    }

    /// Strips `Optional` wrappers.
    pub fn inner(&self) -> &ValueType {
        match self {
            ValueType::Optional(inner) => inner.inner(),
            other => other,
        }
    }

    /// Key of the Rust type a value of this type is stored as
    pub fn key(&self) -> Option<TypeKey> {
        match self.inner() {
            ValueType::Custom(key) => Some(*key),
            _ => None,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            ValueType::Bool => "bool".to_string(),
            ValueType::Char => "char".to_string(),
            ValueType::I8 => "i8".to_string(),
            ValueType::I16 => "i16".to_string(),
            ValueType::I32 => "i32".to_string(),
            ValueType::I64 => "i64".to_string(),
            ValueType::U8 => "u8".to_string(),
            ValueType::U16 => "u16".to_string(),
            ValueType::U32 => "u32".to_string(),
            ValueType::U64 => "u64".to_string(),
            ValueType::F32 => "f32".to_string(),
            ValueType::F64 => "f64".to_string(),
            ValueType::String => "String".to_string(),
            ValueType::Optional(inner) => format!("Option<{}>", inner.type_name()),
            ValueType::Json => "Value".to_string(),
            ValueType::Map => "HashMap<String, String>".to_string(),
            ValueType::Custom(key) => key.short_name().to_string(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}
