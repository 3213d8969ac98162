//! Server and request limits configuration.

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use bytesize::ByteSize;
use displaydoc::Display;
use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4000))
}

fn default_path() -> String {
    "/".to_string()
}

fn default_max_body_bytes() -> ByteSize {
    ByteSize::mb(10)
}

/// Configuration errors.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file {path}: {error}
    CannotReadFile {
        path: String,
        error: std::io::Error,
    },
    /// could not parse configuration: {0}
    InvalidConfiguration(serde_yaml::Error),
    /// invalid server path '{0}', it must start with '/'
    InvalidPath(String),
    /// max_body_bytes must be greater than zero
    ZeroBodyLimit,
}

/// The configuration for the upload server.
///
/// Can be created through `serde::Deserialize` from YAML or JSON, or inline in
/// Rust code with `Configuration::default()`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    pub server: Server,

    /// Limits applied while reading request bodies.
    pub limits: MultipartRequestLimits,
}

/// Configuration for the http server.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Server {
    /// The socket address to listen on; defaults to 127.0.0.1:4000
    #[schemars(with = "String")]
    pub listen: SocketAddr,

    /// The HTTP path answering GraphQL requests; defaults to `/`
    pub path: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Limits for request bodies.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct MultipartRequestLimits {
    /// Maximum size of a request body, multipart forms included; defaults to 10MB
    #[serde(default = "default_max_body_bytes")]
    #[schemars(with = "String")]
    pub max_body_bytes: ByteSize,

    /// Maximum number of file parts in a multipart request
    pub max_files: Option<usize>,

    /// Maximum size of a single file part
    #[schemars(with = "Option<String>")]
    pub max_file_size: Option<ByteSize>,
}

impl Default for MultipartRequestLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            max_files: None,
            max_file_size: None,
        }
    }
}

impl Configuration {
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            ConfigurationError::CannotReadFile {
                path: path.display().to_string(),
                error,
            }
        })?;
        raw.parse()
    }

    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if !self.server.path.starts_with('/') {
            return Err(ConfigurationError::InvalidPath(self.server.path));
        }
        if self.limits.max_body_bytes.as_u64() == 0 {
            return Err(ConfigurationError::ZeroBodyLimit);
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // An empty file means every default.
        if s.trim().is_empty() {
            return Configuration::default().validate();
        }
        serde_yaml::from_str::<Configuration>(s)
            .map_err(ConfigurationError::InvalidConfiguration)?
            .validate()
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings
        .into_generator()
        .into_root_schema_for::<Configuration>()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn it_builds_default_configuration() {
        let configuration: Configuration = "".parse().unwrap();
        assert_eq!(configuration.server.listen, default_listen());
        assert_eq!(configuration.server.path, "/");
        assert_eq!(configuration.limits, MultipartRequestLimits::default());
        assert_eq!(configuration.limits.max_body_bytes, ByteSize::mb(10));
    }

    #[test]
    fn it_parses_yaml() {
        let configuration: Configuration = r#"
server:
  listen: 0.0.0.0:5000
  path: /graphql
limits:
  max_body_bytes: 1024
  max_files: 3
  max_file_size: 512
"#
        .parse()
        .unwrap();

        assert_eq!(configuration.server.listen, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(configuration.server.path, "/graphql");
        assert_eq!(configuration.limits.max_body_bytes, ByteSize::b(1024));
        assert_eq!(configuration.limits.max_files, Some(3));
        assert_eq!(configuration.limits.max_file_size, Some(ByteSize::b(512)));
    }

    #[test]
    fn it_fills_partial_limits_with_defaults() {
        let configuration: Configuration = "limits:\n  max_files: 2\n".parse().unwrap();
        assert_eq!(configuration.limits.max_body_bytes, default_max_body_bytes());
        assert_eq!(configuration.limits.max_files, Some(2));
    }

    #[test]
    fn it_rejects_unknown_fields() {
        let err = "server:\n  port: 4000\n"
            .parse::<Configuration>()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidConfiguration(_)));
    }

    #[test]
    fn it_validates_values() {
        assert!(matches!(
            "server:\n  path: graphql\n".parse::<Configuration>(),
            Err(ConfigurationError::InvalidPath(_))
        ));
        assert!(matches!(
            "limits:\n  max_body_bytes: 0\n".parse::<Configuration>(),
            Err(ConfigurationError::ZeroBodyLimit)
        ));
    }

    #[test]
    fn it_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  path: /upload").unwrap();

        let configuration = Configuration::from_file(file.path()).unwrap();
        assert_eq!(configuration.server.path, "/upload");

        assert!(matches!(
            Configuration::from_file(Path::new("/does/not/exist.yaml")),
            Err(ConfigurationError::CannotReadFile { .. })
        ));
    }

    #[test]
    fn it_generates_a_schema() {
        let schema = serde_json::to_value(generate_config_schema()).unwrap();
        let properties = &schema["properties"];
        assert!(properties["server"].is_object());
        assert!(properties["limits"]["properties"]["max_body_bytes"].is_object());
    }
}
