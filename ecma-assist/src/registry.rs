use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Types the completion engine can name without consulting any scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalType {
    Number,
    String,
    Boolean,
    Object,
    Array,
    Error,
    /// The expression's type cannot be narrowed.
    Any,
}

impl CanonicalType {
    pub const ALL: [CanonicalType; 7] = [
        CanonicalType::Number,
        CanonicalType::String,
        CanonicalType::Boolean,
        CanonicalType::Object,
        CanonicalType::Array,
        CanonicalType::Error,
        CanonicalType::Any,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalType::Number => "Number",
            CanonicalType::String => "String",
            CanonicalType::Boolean => "Boolean",
            CanonicalType::Object => "Object",
            CanonicalType::Array => "Array",
            CanonicalType::Error => "Error",
            CanonicalType::Any => "Any",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == name)
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supertype: Option<String>,
}

impl TypeDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualified_name: None,
            summary: None,
            supertype: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read type declarations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid type declaration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("type declaration has an empty name")]
    EmptyName,
}

struct BuiltinType {
    name: &'static str,
    summary: &'static str,
    supertype: Option<&'static str>,
}

const ECMA3_BUILTINS: &[BuiltinType] = &[
    BuiltinType {
        name: "Object",
        summary: "Root of the prototype chain.",
        supertype: None,
    },
    BuiltinType {
        name: "Number",
        summary: "Double-precision numeric value.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "String",
        summary: "Immutable sequence of UTF-16 code units.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "Boolean",
        summary: "The values true and false.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "Array",
        summary: "Ordered list indexed by integers.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "Error",
        summary: "Base type of thrown runtime errors.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "Any",
        summary: "Value whose type cannot be determined statically.",
        supertype: None,
    },
    BuiltinType {
        name: "Function",
        summary: "Callable object.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "Date",
        summary: "Point in time.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "RegExp",
        summary: "Regular expression.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "Math",
        summary: "Mathematical constants and functions.",
        supertype: Some("Object"),
    },
    BuiltinType {
        name: "EvalError",
        summary: "Raised for misuse of the global eval function.",
        supertype: Some("Error"),
    },
    BuiltinType {
        name: "RangeError",
        summary: "Numeric value outside its allowed range.",
        supertype: Some("Error"),
    },
    BuiltinType {
        name: "ReferenceError",
        summary: "Reference to an undeclared variable.",
        supertype: Some("Error"),
    },
    BuiltinType {
        name: "SyntaxError",
        summary: "Source text that failed to parse.",
        supertype: Some("Error"),
    },
    BuiltinType {
        name: "TypeError",
        summary: "Value of an unexpected type.",
        supertype: Some("Error"),
    },
    BuiltinType {
        name: "URIError",
        summary: "Malformed URI passed to a global URI function.",
        supertype: Some("Error"),
    },
];

/// Type declarations addressed by name.
///
/// Build one per session and share it by reference; lookups never fail, an
/// unknown name is simply `None`.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    declarations: HashMap<String, Arc<TypeDeclaration>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the canonical types and the ECMAScript 3
    /// built-in constructors.
    pub fn ecma3() -> Self {
        let mut registry = Self::new();
        for builtin in ECMA3_BUILTINS {
            let mut declaration = TypeDeclaration::new(builtin.name).with_summary(builtin.summary);
            if let Some(supertype) = builtin.supertype {
                declaration = declaration.with_supertype(supertype);
            }
            registry.insert(declaration);
        }
        registry
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<TypeDeclaration>> {
        self.declarations.get(name).cloned()
    }

    pub fn lookup_canonical(&self, canonical: CanonicalType) -> Option<Arc<TypeDeclaration>> {
        self.lookup(canonical.as_str())
    }

    /// Add or replace a declaration.
    pub fn register(&mut self, declaration: TypeDeclaration) -> Result<(), RegistryError> {
        if declaration.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        self.insert(declaration);
        Ok(())
    }

    fn insert(&mut self, declaration: TypeDeclaration) {
        self.declarations
            .insert(declaration.name.clone(), Arc::new(declaration));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.declarations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Read a JSON array of declarations and register each of them. Returns
    /// the number of declarations read. Nothing is registered when any entry
    /// is invalid.
    pub fn extend_from_json<R: Read>(&mut self, reader: R) -> Result<usize, RegistryError> {
        let declarations: Vec<TypeDeclaration> = serde_json::from_reader(reader)?;
        if declarations
            .iter()
            .any(|declaration| declaration.name.trim().is_empty())
        {
            return Err(RegistryError::EmptyName);
        }
        let count = declarations.len();
        for declaration in declarations {
            debug!(name = %declaration.name, "registering type declaration");
            self.insert(declaration);
        }
        Ok(count)
    }

    pub fn load_json_file(&mut self, path: &Path) -> Result<usize, RegistryError> {
        let file = File::open(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.extend_from_json(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip() {
        for canonical in CanonicalType::ALL {
            assert_eq!(CanonicalType::from_name(canonical.as_str()), Some(canonical));
        }
        assert_eq!(CanonicalType::from_name("number"), None);
    }

    #[test]
    fn ecma3_registry_knows_every_canonical_type() {
        let registry = TypeRegistry::ecma3();
        for canonical in CanonicalType::ALL {
            let declaration = registry
                .lookup_canonical(canonical)
                .expect("canonical type registered");
            assert_eq!(declaration.name, canonical.as_str());
        }
        assert_eq!(
            registry
                .lookup("TypeError")
                .and_then(|declaration| declaration.supertype.clone())
                .as_deref(),
            Some("Error")
        );
    }

    #[test]
    fn register_rejects_blank_names() {
        let mut registry = TypeRegistry::new();
        let err = registry
            .register(TypeDeclaration::new("  "))
            .expect_err("blank name rejected");
        assert!(matches!(err, RegistryError::EmptyName));
        assert!(registry.is_empty());
    }

    #[test]
    fn extend_from_json_is_all_or_nothing() {
        let mut registry = TypeRegistry::new();
        let input = r#"[{"name": "Widget"}, {"name": ""}]"#;
        assert!(registry.extend_from_json(input.as_bytes()).is_err());
        assert!(!registry.contains("Widget"));
    }
}
