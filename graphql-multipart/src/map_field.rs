use indexmap::IndexMap;

use crate::error::MultipartRequestError;
use crate::path::Path;

pub(crate) type MapFieldRaw = IndexMap<String, Vec<String>>;

/// The decoded `map` multipart field: for each file part name, every path in
/// `operations` where that file goes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileMap {
    per_file: IndexMap<String, Vec<Path>>,
}

impl FileMap {
    pub fn from_json(map_field: &str) -> Result<Self, MultipartRequestError> {
        let raw: MapFieldRaw =
            serde_json::from_str(map_field).map_err(MultipartRequestError::MalformedMap)?;
        Self::new(raw)
    }

    pub(crate) fn new(map_field: MapFieldRaw) -> Result<Self, MultipartRequestError> {
        let mut per_file = IndexMap::with_capacity(map_field.len());
        for (file, paths) in map_field {
            let paths = paths
                .iter()
                .map(|path| path.parse::<Path>())
                .collect::<Result<Vec<_>, _>>()?;
            per_file.insert(file, paths);
        }
        Ok(Self { per_file })
    }

    /// File part names, in the order they appear in `map`.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.per_file.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Path])> {
        self.per_file
            .iter()
            .map(|(file, paths)| (file.as_str(), paths.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathError;

    #[test]
    fn it_keeps_file_order_and_paths() {
        let map = FileMap::from_json(
            r#"{ "1": ["1.variables.files.0"], "0": ["0.variables.file", "0.variables.copy"] }"#,
        )
        .unwrap();

        assert_eq!(map.files().collect::<Vec<_>>(), vec!["1", "0"]);
        let paths: Vec<(&str, Vec<String>)> = map
            .iter()
            .map(|(file, paths)| (file, paths.iter().map(ToString::to_string).collect()))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("1", vec!["1.variables.files.0".to_string()]),
                (
                    "0",
                    vec!["0.variables.file".to_string(), "0.variables.copy".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn it_rejects_invalid_json() {
        assert!(matches!(
            FileMap::from_json(r#"{ "0": "variables.file" }"#),
            Err(MultipartRequestError::MalformedMap(_))
        ));
        assert!(matches!(
            FileMap::from_json("not json"),
            Err(MultipartRequestError::MalformedMap(_))
        ));
    }

    #[test]
    fn it_rejects_empty_paths() {
        assert!(matches!(
            FileMap::from_json(r#"{ "0": [""] }"#),
            Err(MultipartRequestError::MalformedPath(PathError::Empty))
        ));
    }

    #[test]
    fn an_empty_map_is_valid() {
        assert_eq!(FileMap::from_json("{}").unwrap().files().count(), 0);
    }
}
