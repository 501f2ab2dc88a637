// library.rs — Node-type library
//
// Holds the node type definitions a graph refers to by tag: ordered inputs
// and outputs, the body template and type-level defines. Loaded from JSON
// library files before a build and shared read-only afterwards.
//
// Preconditions: library files follow the `{ "types": { ... } }` layout.
// Postconditions: every tag is unique across all loaded files and none is
//   the reserved `external` tag; port names are identifiers, unique per type.
//   A file that fails validation adds no types.
// Failure modes: I/O and JSON errors, duplicate or reserved tags, bad or
//   repeated port names → `LibraryError`.
// Side effects: reads library files from disk (`load_file` only).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph::EXTERNAL_TYPE;
use crate::template::Defines;

// ── Data types ──────────────────────────────────────────────────────────────

/// A named, typed socket on a node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    /// Shading-language type keyword, e.g. `float`, `vec3`.
    #[serde(rename = "type")]
    pub ty: String,
}

impl Port {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// One library entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeTypeDef {
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
    /// Body template, compiled by a `BodyCompiler`.
    #[serde(default)]
    pub body: String,
    /// Type-level defines; node-local defines override these.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defines: Defines,
}

impl NodeTypeDef {
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// The only declared output, if the type has exactly one.
    pub fn sole_output(&self) -> Option<&Port> {
        match self.outputs.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Deserialize)]
struct LibraryFile {
    types: BTreeMap<String, NodeTypeDef>,
}

/// Errors that can occur during library loading.
#[derive(Debug)]
pub enum LibraryError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        file: PathBuf,
        source: serde_json::Error,
    },
    DuplicateType {
        tag: String,
        first: PathBuf,
        second: PathBuf,
    },
    ReservedTag {
        file: PathBuf,
    },
    InvalidPortName {
        tag: String,
        port: String,
        file: PathBuf,
    },
    DuplicatePort {
        tag: String,
        port: String,
        file: PathBuf,
    },
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::IoError { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            LibraryError::ParseError { file, source } => {
                write!(
                    f,
                    "{}:{}:{}: {}",
                    file.display(),
                    source.line(),
                    source.column(),
                    source
                )
            }
            LibraryError::DuplicateType { tag, first, second } => {
                write!(
                    f,
                    "duplicate node type '{}': first defined in {}, redefined in {}",
                    tag,
                    first.display(),
                    second.display()
                )
            }
            LibraryError::ReservedTag { file } => {
                write!(
                    f,
                    "{}: '{}' is reserved for external nodes and cannot be a library type",
                    file.display(),
                    EXTERNAL_TYPE
                )
            }
            LibraryError::InvalidPortName { tag, port, file } => {
                write!(
                    f,
                    "{}: type '{}' has port name {:?}, which is not an identifier",
                    file.display(),
                    tag,
                    port
                )
            }
            LibraryError::DuplicatePort { tag, port, file } => {
                write!(
                    f,
                    "{}: type '{}' declares port '{}' more than once",
                    file.display(),
                    tag,
                    port
                )
            }
        }
    }
}

impl std::error::Error for LibraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LibraryError::IoError { source, .. } => Some(source),
            LibraryError::ParseError { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Library ─────────────────────────────────────────────────────────────────

/// Node type library, keyed by type tag. Each entry remembers the file it
/// came from for duplicate reporting.
#[derive(Debug, Clone, Default)]
pub struct NodeLibrary {
    types: BTreeMap<String, (NodeTypeDef, PathBuf)>,
}

impl NodeLibrary {
    pub fn new() -> Self {
        NodeLibrary {
            types: BTreeMap::new(),
        }
    }

    /// Add one definition. `origin` is only used in error messages.
    pub fn insert(
        &mut self,
        tag: impl Into<String>,
        def: NodeTypeDef,
        origin: &Path,
    ) -> Result<(), LibraryError> {
        let tag = tag.into();
        self.check(&tag, &def, origin)?;
        self.types.insert(tag, (def, origin.to_path_buf()));
        Ok(())
    }

    /// Validate one definition against the library without adding it.
    fn check(&self, tag: &str, def: &NodeTypeDef, origin: &Path) -> Result<(), LibraryError> {
        if tag == EXTERNAL_TYPE {
            return Err(LibraryError::ReservedTag {
                file: origin.to_path_buf(),
            });
        }
        if let Some((_, first)) = self.types.get(tag) {
            return Err(LibraryError::DuplicateType {
                tag: tag.to_string(),
                first: first.clone(),
                second: origin.to_path_buf(),
            });
        }
        // Inputs and outputs share one namespace inside the body.
        let mut seen = BTreeSet::new();
        for port in def.inputs.iter().chain(&def.outputs) {
            if !is_identifier(&port.name) {
                return Err(LibraryError::InvalidPortName {
                    tag: tag.to_string(),
                    port: port.name.clone(),
                    file: origin.to_path_buf(),
                });
            }
            if !seen.insert(port.name.as_str()) {
                return Err(LibraryError::DuplicatePort {
                    tag: tag.to_string(),
                    port: port.name.clone(),
                    file: origin.to_path_buf(),
                });
            }
        }
        Ok(())
    }

    /// Load types from a JSON library file. Returns the number of types found.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, LibraryError> {
        let source = std::fs::read_to_string(path).map_err(|e| LibraryError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.load_str(&source, path)
    }

    /// Load types from JSON text. `origin` names the source in errors.
    pub fn load_str(&mut self, json: &str, origin: &Path) -> Result<usize, LibraryError> {
        let file: LibraryFile =
            serde_json::from_str(json).map_err(|e| LibraryError::ParseError {
                file: origin.to_path_buf(),
                source: e,
            })?;
        let count = file.types.len();
        for (tag, def) in &file.types {
            self.check(tag, def, origin)?;
        }
        for (tag, def) in file.types {
            self.types.insert(tag, (def, origin.to_path_buf()));
        }
        tracing::debug!(file = %origin.display(), count, "loaded node types");
        Ok(count)
    }

    /// Parse a standalone library from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, LibraryError> {
        let mut lib = NodeLibrary::new();
        lib.load_str(json, Path::new("<memory>"))?;
        Ok(lib)
    }

    pub fn lookup(&self, tag: &str) -> Option<&NodeTypeDef> {
        self.types.get(tag).map(|(def, _)| def)
    }

    /// All types, sorted by tag.
    pub fn types(&self) -> impl Iterator<Item = (&str, &NodeTypeDef)> {
        self.types.iter().map(|(tag, (def, _))| (tag.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Canonical JSON form: the library file layout with types sorted by tag
    /// and no whitespace. Independent of how the types were split across files.
    pub fn canonical_json(&self) -> String {
        let types: BTreeMap<&str, &NodeTypeDef> = self.types().collect();
        serde_json::json!({ "types": types }).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LIB: &str = r#"{
        "types": {
            "double": {
                "inputs": [{ "name": "t", "type": "float" }],
                "outputs": [{ "name": "o", "type": "float" }],
                "body": "o = t * 2.0;"
            },
            "mix3": {
                "inputs": [
                    { "name": "a", "type": "vec3" },
                    { "name": "b", "type": "vec3" },
                    { "name": "k", "type": "float" }
                ],
                "outputs": [{ "name": "m", "type": "vec3" }],
                "body": "m = mix(a, b, k * {{GAIN}});",
                "defines": { "GAIN": 1.0 }
            },
            "sink": {
                "inputs": [{ "name": "v", "type": "float" }],
                "body": "gl_FragColor = vec4(v);"
            }
        }
    }"#;

    #[test]
    fn parse_library() {
        let lib = NodeLibrary::from_json_str(LIB).unwrap();
        assert_eq!(lib.len(), 3);

        let double = lib.lookup("double").expect("double not found");
        assert_eq!(double.inputs, vec![Port::new("t", "float")]);
        assert_eq!(double.sole_output().map(|p| p.name.as_str()), Some("o"));
        assert!(double.defines.is_empty());

        let mix3 = lib.lookup("mix3").expect("mix3 not found");
        assert_eq!(mix3.inputs.len(), 3);
        assert_eq!(mix3.input("k").map(|p| p.ty.as_str()), Some("float"));
        assert_eq!(mix3.defines.get("GAIN"), Some(&json!(1.0)));

        let sink = lib.lookup("sink").expect("sink not found");
        assert!(sink.outputs.is_empty());
        assert!(sink.sole_output().is_none());
    }

    #[test]
    fn types_are_sorted_by_tag() {
        let lib = NodeLibrary::from_json_str(LIB).unwrap();
        let tags: Vec<&str> = lib.types().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["double", "mix3", "sink"]);
    }

    #[test]
    fn duplicate_type_error() {
        let mut lib = NodeLibrary::new();
        let src = r#"{ "types": { "foo": { "body": "" } } }"#;
        lib.load_str(src, Path::new("a.json")).unwrap();
        let err = lib.load_str(src, Path::new("b.json")).unwrap_err();

        match &err {
            LibraryError::DuplicateType { tag, first, second } => {
                assert_eq!(tag, "foo");
                assert_eq!(first, Path::new("a.json"));
                assert_eq!(second, Path::new("b.json"));
            }
            _ => panic!("expected DuplicateType error, got: {}", err),
        }
    }

    #[test]
    fn external_tag_is_reserved() {
        let err = NodeLibrary::from_json_str(r#"{ "types": { "external": {} } }"#).unwrap_err();
        assert!(matches!(err, LibraryError::ReservedTag { .. }));
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn malformed_json_reports_position() {
        let err = NodeLibrary::from_json_str("{ \"types\": [").unwrap_err();
        assert!(matches!(err, LibraryError::ParseError { .. }));
        assert!(err.to_string().starts_with("<memory>:1:"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut lib = NodeLibrary::new();
        let err = lib
            .load_file(Path::new("/nonexistent/sgc/library.json"))
            .unwrap_err();
        assert!(matches!(err, LibraryError::IoError { .. }));
    }

    #[test]
    fn canonical_json_ignores_file_split() {
        let whole = NodeLibrary::from_json_str(LIB).unwrap();

        let mut split = NodeLibrary::new();
        split
            .load_str(
                r#"{ "types": { "sink": { "inputs": [{ "name": "v", "type": "float" }],
                     "body": "gl_FragColor = vec4(v);" } } }"#,
                Path::new("b.json"),
            )
            .unwrap();
        let mut rest: serde_json::Value = serde_json::from_str(LIB).unwrap();
        rest["types"].as_object_mut().unwrap().remove("sink");
        split
            .load_str(&rest.to_string(), Path::new("a.json"))
            .unwrap();

        assert_eq!(whole.canonical_json(), split.canonical_json());
    }

    #[test]
    fn repeated_port_name_rejected() {
        let src = r#"{ "types": { "twice": {
            "inputs": [{ "name": "x", "type": "float" }, { "name": "x", "type": "vec2" }],
            "body": "x;"
        } } }"#;
        let err = NodeLibrary::from_json_str(src).unwrap_err();
        match &err {
            LibraryError::DuplicatePort { tag, port, .. } => {
                assert_eq!(tag, "twice");
                assert_eq!(port, "x");
            }
            _ => panic!("expected DuplicatePort error, got: {}", err),
        }

        let src = r#"{ "types": { "echo": {
            "inputs": [{ "name": "v", "type": "float" }],
            "outputs": [{ "name": "v", "type": "float" }]
        } } }"#;
        let err = NodeLibrary::from_json_str(src).unwrap_err();
        assert!(matches!(err, LibraryError::DuplicatePort { .. }));
    }

    #[test]
    fn port_names_must_be_identifiers() {
        for name in ["", "1x", "a-b", "a b"] {
            let src = json!({ "types": { "t": {
                "inputs": [{ "name": name, "type": "float" }],
                "body": "o = t;"
            } } })
            .to_string();
            let err = NodeLibrary::from_json_str(&src).unwrap_err();
            assert!(
                matches!(&err, LibraryError::InvalidPortName { port, .. } if port == name),
                "{name:?} gave {err}"
            );
        }
        assert!(is_identifier("_x9"));
        assert!(is_identifier("xOffset"));
    }

    #[test]
    fn failed_file_adds_nothing() {
        let mut lib = NodeLibrary::new();
        lib.load_str(r#"{ "types": { "m": { "body": "" } } }"#, Path::new("a.json"))
            .unwrap();
        // "a" sorts before "m"; the clash on "m" must not leave "a" behind.
        let err = lib
            .load_str(
                r#"{ "types": { "a": { "body": "" }, "m": { "body": "" } } }"#,
                Path::new("b.json"),
            )
            .unwrap_err();
        assert!(matches!(err, LibraryError::DuplicateType { .. }));
        assert_eq!(lib.len(), 1);
        assert!(lib.lookup("a").is_none());

        let err = lib
            .load_str(
                r#"{ "types": { "b": { "body": "" }, "external": {} } }"#,
                Path::new("c.json"),
            )
            .unwrap_err();
        assert!(matches!(err, LibraryError::ReservedTag { .. }));
        assert_eq!(lib.len(), 1);
    }
}
