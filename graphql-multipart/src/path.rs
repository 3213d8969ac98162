//! Dotted paths into the operations payload, as used by the `map` field.
//!
//! `variables.files.0` addresses the first element of the `files` variable;
//! in a batch the first segment selects the operation: `1.variables.file`.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;

use crate::value::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    // A segment made only of ASCII digits is an index.
    fn from(segment: &str) -> Self {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = segment.parse() {
                return PathSegment::Index(index);
            }
        }
        PathSegment::Key(segment.to_string())
    }
}

/// A non-empty sequence of [`PathSegment`]s.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn new(segments: Vec<PathSegment>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join("."))
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let segments = s
            .split('.')
            .map(|segment| {
                if segment.is_empty() {
                    Err(PathError::EmptySegment(s.to_string()))
                } else {
                    Ok(PathSegment::from(segment))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(segments)
    }
}

/// Errors raised while parsing or applying a [`Path`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error(
        "path '{path}' does not point to a valid value: cannot find '{segment}' in {found}"
    )]
    NotFound {
        path: String,
        segment: String,
        found: &'static str,
    },
}

/// Overwrites the slot at `path` inside `root` with `value`.
///
/// Every segment, the last one included, must name a slot that already
/// exists: no container is created and no sequence grows. Index segments
/// address array elements; when they meet an object, the same digits are
/// looked up as a key.
pub fn inject(value: Value, root: &mut Value, path: &Path) -> Result<(), PathError> {
    let mut cursor = root;
    for segment in path.segments() {
        let found = cursor.kind();
        cursor = slot_mut(cursor, segment).ok_or_else(|| PathError::NotFound {
            path: path.to_string(),
            segment: segment.to_string(),
            found,
        })?;
    }
    *cursor = value;
    Ok(())
}

fn slot_mut<'a>(parent: &'a mut Value, segment: &PathSegment) -> Option<&'a mut Value> {
    match (parent, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key.as_str()),
        (Value::Object(map), PathSegment::Index(index)) => map.get_mut(index.to_string().as_str()),
        (Value::Array(list), PathSegment::Index(index)) => list.get_mut(*index),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::upload::Upload;

    fn file(name: &str) -> Value {
        Upload::new(name, None, Bytes::from_static(b"test")).into()
    }

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    #[test]
    fn it_classifies_segments() {
        assert_eq!(
            path("0.variables.files.12").segments(),
            &[
                PathSegment::Index(0),
                PathSegment::Key("variables".to_string()),
                PathSegment::Key("files".to_string()),
                PathSegment::Index(12),
            ]
        );
        assert_eq!(
            path("variables.file1").segments(),
            &[
                PathSegment::Key("variables".to_string()),
                PathSegment::Key("file1".to_string()),
            ]
        );
    }

    #[test]
    fn it_rejects_empty_paths_and_segments() {
        assert_eq!("".parse::<Path>(), Err(PathError::Empty));
        assert_eq!(
            "variables..file".parse::<Path>(),
            Err(PathError::EmptySegment("variables..file".to_string()))
        );
        assert_eq!(Path::new(vec![]), Err(PathError::Empty));
    }

    #[test]
    fn it_displays_the_parsed_text() {
        assert_eq!(path("1.variables.files.0").to_string(), "1.variables.files.0");
    }

    #[test]
    fn it_overwrites_only_the_target_slot() {
        let mut root = Value::from(json!({
            "query": "mutation($file: Upload!) { singleUpload(file: $file) { fileName } }",
            "variables": { "file": null, "other": [1, 2] }
        }));
        let untouched = root.clone();

        inject(file("a.txt"), &mut root, &path("variables.file")).unwrap();

        let variables = root.as_object().unwrap()["variables"].as_object().unwrap();
        assert_eq!(variables["file"].as_upload().unwrap().filename(), "a.txt");
        assert_eq!(
            variables["other"],
            untouched.as_object().unwrap()["variables"].as_object().unwrap()["other"]
        );
        assert_eq!(
            root.as_object().unwrap()["query"],
            untouched.as_object().unwrap()["query"]
        );
    }

    #[test]
    fn it_injects_into_arrays_and_batches() {
        let mut root = Value::from(json!([
            { "variables": { "file": null } },
            { "variables": { "files": [null, null] } }
        ]));

        inject(file("a.txt"), &mut root, &path("0.variables.file")).unwrap();
        inject(file("b.txt"), &mut root, &path("1.variables.files.0")).unwrap();
        inject(file("c.txt"), &mut root, &path("1.variables.files.1")).unwrap();

        let filename = |op: usize, rest: &[PathSegment]| {
            let mut cursor = &root.as_array().unwrap()[op];
            for segment in rest {
                cursor = match (cursor, segment) {
                    (Value::Object(map), PathSegment::Key(key)) => &map[key.as_str()],
                    (Value::Array(list), PathSegment::Index(index)) => &list[*index],
                    _ => panic!("unexpected shape"),
                };
            }
            cursor.as_upload().unwrap().filename().to_string()
        };
        assert_eq!(filename(0, &path("variables.file").0), "a.txt");
        assert_eq!(filename(1, &path("variables.files.0").0), "b.txt");
        assert_eq!(filename(1, &path("variables.files.1").0), "c.txt");
    }

    #[test]
    fn it_places_the_same_file_at_independent_paths() {
        let mut root = Value::from(json!({ "variables": { "a": null, "b": [null] } }));
        let upload = file("a.txt");

        inject(upload.clone(), &mut root, &path("variables.a")).unwrap();
        inject(upload.clone(), &mut root, &path("variables.b.0")).unwrap();

        let variables = root.as_object().unwrap()["variables"].as_object().unwrap();
        assert_eq!(variables["a"], upload);
        assert_eq!(variables["b"], Value::Array(vec![upload]));
    }

    #[test]
    fn it_looks_up_numeric_keys_in_objects() {
        let mut root = Value::from(json!({ "variables": { "input": { "0": null } } }));

        inject(file("a.txt"), &mut root, &path("variables.input.0")).unwrap();

        let input = root.as_object().unwrap()["variables"].as_object().unwrap()["input"]
            .as_object()
            .unwrap();
        assert!(input["0"].as_upload().is_some());
    }

    #[test]
    fn it_fails_on_missing_index() {
        let mut root = Value::from(json!({ "variables": { "files": [null] } }));
        let before = root.clone();

        let err = inject(file("a.txt"), &mut root, &path("variables.files.1")).unwrap_err();

        assert_eq!(
            err,
            PathError::NotFound {
                path: "variables.files.1".to_string(),
                segment: "1".to_string(),
                found: "array",
            }
        );
        assert_eq!(root, before);
    }

    #[test]
    fn it_fails_on_wrong_shape() {
        let mut root = Value::from(json!({ "variables": { "file": null } }));

        let err = inject(file("a.txt"), &mut root, &path("variables.file.name")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "path 'variables.file.name' does not point to a valid value: cannot find 'name' in null"
        );

        let mut batch = Value::from(json!([{ "variables": {} }]));
        let err = inject(file("a.txt"), &mut batch, &path("variables.file")).unwrap_err();
        assert!(matches!(err, PathError::NotFound { found: "array", .. }));
    }

    #[test]
    fn it_does_not_create_missing_keys() {
        let mut root = Value::from(json!({ "variables": {} }));
        assert!(inject(file("a.txt"), &mut root, &path("variables.file")).is_err());
        assert_eq!(root, Value::from(json!({ "variables": {} })));
    }
}
