//! Unified, versioned schema for the external design tool's file format.
//!
//! Several hand-written mirrors of this format disagree on which fields are
//! required. This module reconciles them into one shape: a field any mirror
//! treats as optional is `Option` here, and every such field is listed in
//! [`DISPUTED_FIELDS`] so validation can report when real documents carry
//! them. Which mirror was right is a question for the format's owners.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SCHEMA_VERSION: u32 = 1;

/// `(node type, field)` pairs whose required-ness the mirrors disagree on.
/// `"*"` matches every node type.
pub const DISPUTED_FIELDS: &[(&str, &str)] = &[
    ("*", "opacity"),
    ("CANVAS", "backgroundColor"),
    ("FRAME", "background"),
    ("FRAME", "backgroundColor"),
    ("FRAME", "size"),
    ("GROUP", "size"),
    ("VECTOR", "strokeWeight"),
    ("RECTANGLE", "cornerRadius"),
    ("RECTANGLE", "strokeWeight"),
    ("TEXT", "style"),
    ("TEXT", "textAlignHorizontal"),
    ("COMPONENT", "size"),
    ("INSTANCE", "size"),
];

/// Node types the schema knows about.
pub const NODE_TYPES: &[&str] = &[
    "DOCUMENT",
    "CANVAS",
    "FRAME",
    "GROUP",
    "VECTOR",
    "RECTANGLE",
    "ELLIPSE",
    "TEXT",
    "COMPONENT",
    "INSTANCE",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchemaColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

fn visible() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
}

/// A design file as returned by the design tool's REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignFile {
    pub name: String,
    pub last_modified: String,
    pub version: String,
    pub document: DocumentNode,
    #[serde(default)]
    pub components: Map<String, Value>,
    #[serde(default)]
    pub styles: Map<String, Value>,
    #[serde(default)]
    pub schema_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNode {
    pub id: String,
    pub name: String,
    #[serde(default = "visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_plugin_data: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub kind: DocumentNodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum DocumentNodeKind {
    Document {
        children: Vec<DocumentNode>,
    },
    Canvas {
        children: Vec<DocumentNode>,
        #[serde(default)]
        background_color: Option<SchemaColor>,
    },
    Frame {
        #[serde(default)]
        children: Vec<DocumentNode>,
        #[serde(default)]
        background: Option<Vec<Value>>,
        #[serde(default)]
        background_color: Option<SchemaColor>,
        #[serde(default)]
        size: Option<Vector>,
    },
    Group {
        #[serde(default)]
        children: Vec<DocumentNode>,
        #[serde(default)]
        size: Option<Vector>,
    },
    Vector {
        #[serde(default)]
        size: Option<Vector>,
        #[serde(default)]
        stroke_weight: Option<f32>,
    },
    Rectangle {
        #[serde(default)]
        size: Option<Vector>,
        #[serde(default)]
        corner_radius: Option<f32>,
        #[serde(default)]
        stroke_weight: Option<f32>,
    },
    Ellipse {
        #[serde(default)]
        size: Option<Vector>,
    },
    Text {
        characters: String,
        #[serde(default)]
        style: Option<Map<String, Value>>,
        #[serde(default)]
        size: Option<Vector>,
    },
    Component {
        #[serde(default)]
        children: Vec<DocumentNode>,
        #[serde(default)]
        size: Option<Vector>,
    },
    Instance {
        component_id: String,
        #[serde(default)]
        size: Option<Vector>,
    },
}

impl DocumentNode {
    pub fn children(&self) -> &[DocumentNode] {
        match &self.kind {
            DocumentNodeKind::Document { children }
            | DocumentNodeKind::Canvas { children, .. }
            | DocumentNodeKind::Frame { children, .. }
            | DocumentNodeKind::Group { children, .. }
            | DocumentNodeKind::Component { children, .. } => children,
            _ => &[],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("design file failed validation with {} error(s)", .0.errors.len())]
    Invalid(ValidationReport),
}

impl DesignFile {
    /// Validate, then decode. Validation errors are returned in full.
    pub fn from_json(input: &str) -> Result<Self, SchemaError> {
        Self::from_value(serde_json::from_str(input)?)
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let report = validate(&value);
        if !report.valid {
            return Err(SchemaError::Invalid(report));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub schema_version: u32,
    pub node_count: usize,
    pub errors: Vec<SchemaIssue>,
    /// `TYPE.field` for every disputed field seen in the document.
    pub disputed_fields: Vec<String>,
}

struct Validator {
    errors: Vec<SchemaIssue>,
    disputed: Vec<String>,
    node_count: usize,
}

impl Validator {
    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(SchemaIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn require_str(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        match obj.get(key) {
            Some(Value::String(_)) => {}
            Some(_) => self.error(&format!("{path}.{key}"), "expected a string"),
            None => self.error(path, format!("missing required field `{key}`")),
        }
    }

    fn node(&mut self, value: &Value, path: &str) {
        let Some(obj) = value.as_object() else {
            self.error(path, "expected a node object");
            return;
        };
        self.node_count += 1;
        self.require_str(obj, "id", path);
        self.require_str(obj, "name", path);

        let Some(tag) = obj.get("type").and_then(Value::as_str) else {
            self.error(path, "missing required field `type`");
            return;
        };
        if !NODE_TYPES.contains(&tag) {
            self.error(&format!("{path}.type"), format!("unknown node type `{tag}`"));
            return;
        }

        for (ty, field) in DISPUTED_FIELDS {
            if (*ty == "*" || *ty == tag) && obj.contains_key(*field) {
                let entry = format!("{tag}.{field}");
                if !self.disputed.contains(&entry) {
                    self.disputed.push(entry);
                }
            }
        }

        match tag {
            "TEXT" => self.require_str(obj, "characters", path),
            "INSTANCE" => self.require_str(obj, "componentId", path),
            _ => {}
        }

        let needs_children = matches!(tag, "DOCUMENT" | "CANVAS");
        match obj.get("children") {
            Some(Value::Array(children)) => {
                for (i, child) in children.iter().enumerate() {
                    self.node(child, &format!("{path}.children[{i}]"));
                }
            }
            Some(_) => self.error(&format!("{path}.children"), "expected an array"),
            None if needs_children => self.error(path, "missing required field `children`"),
            None => {}
        }
    }
}

/// Check a design file against the schema, collecting every problem found.
pub fn validate(value: &Value) -> ValidationReport {
    let mut v = Validator {
        errors: Vec::new(),
        disputed: Vec::new(),
        node_count: 0,
    };

    match value.as_object() {
        None => v.error("$", "expected a design file object"),
        Some(obj) => {
            for key in ["name", "lastModified", "version"] {
                v.require_str(obj, key, "$");
            }
            match obj.get("document") {
                Some(doc) => {
                    if doc.get("type").and_then(Value::as_str) != Some("DOCUMENT") {
                        v.error("$.document.type", "root node must be a DOCUMENT");
                    }
                    v.node(doc, "$.document");
                }
                None => v.error("$", "missing required field `document`"),
            }
            if let Some(version) = obj.get("schemaVersion")
                && !version.is_u64()
            {
                v.error("$.schemaVersion", "expected a non-negative integer");
            }
        }
    }

    // Structural checks passed: the typed decode must agree.
    if v.errors.is_empty()
        && let Err(err) = serde_json::from_value::<DesignFile>(value.clone())
    {
        v.error("$", err.to_string());
    }

    ValidationReport {
        valid: v.errors.is_empty(),
        schema_version: SCHEMA_VERSION,
        node_count: v.node_count,
        errors: v.errors,
        disputed_fields: v.disputed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "name": "Landing",
            "lastModified": "2024-05-01T10:00:00Z",
            "version": "123",
            "schemaVersion": 0,
            "document": {
                "id": "0:0", "name": "Document", "type": "DOCUMENT",
                "children": [{
                    "id": "0:1", "name": "Page 1", "type": "CANVAS",
                    "backgroundColor": {"r": 1, "g": 1, "b": 1, "a": 1},
                    "children": [
                        {"id": "1:2", "name": "Hero", "type": "FRAME", "children": [
                            {"id": "1:3", "name": "Title", "type": "TEXT", "characters": "Hi"}
                        ]}
                    ]
                }]
            }
        })
    }

    #[test]
    fn valid_file_decodes() {
        let report = validate(&sample());
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.node_count, 4);
        assert_eq!(report.disputed_fields, vec!["CANVAS.backgroundColor".to_string()]);

        let file: DesignFile = serde_json::from_value(sample()).unwrap();
        let page = &file.document.children()[0];
        assert_eq!(page.children()[0].name, "Hero");
        assert!(page.visible);
    }

    #[test]
    fn collects_every_error() {
        let mut file = sample();
        file["document"]["children"][0]["children"][0]["children"][0]
            .as_object_mut()
            .unwrap()
            .remove("characters");
        file["document"]["children"][0]["children"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": "9:9", "name": "Blob", "type": "BLOB"}));
        file.as_object_mut().unwrap().remove("version");

        let report = validate(&file);
        assert!(!report.valid);
        let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "$",
                "$.document.children[0].children[0].children[0]",
                "$.document.children[0].children[1].type",
            ]
        );
    }

    #[test]
    fn from_json_returns_report() {
        match DesignFile::from_json(r#"{"name": "x"}"#) {
            Err(SchemaError::Invalid(report)) => assert!(report.errors.len() >= 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
