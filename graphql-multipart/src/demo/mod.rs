//! Example executor answering the upload example schema.
//!
//! It resolves `version`, `singleUpload`, `multipleUpload` and `upload`
//! directly against the operation's variables, which is enough to exercise
//! every shape of request the service accepts. Uploads are not persisted.

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::OperationType;
use apollo_compiler::executable::Selection;
use apollo_compiler::executable::SelectionSet;
use apollo_compiler::validation::Valid;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value as JsonValue;
use tower::BoxError;

use crate::context::RequestContext;
use crate::executor::Executor;
use crate::graphql;
use crate::request::Operation;
use crate::value::Object;
use crate::value::Value;

const SCHEMA: &str = include_str!("schema.graphql");

/// Answer of `query { version }`.
pub const VERSION: &str = "v0.0.0";
const MUTATION_VERSION: &str = "sdd";
const UPLOAD_ID: &str = "file-id";

pub struct DemoExecutor {
    schema: Valid<Schema>,
}

impl DemoExecutor {
    pub fn new() -> Result<Self, BoxError> {
        let schema = Schema::parse_and_validate(SCHEMA, "schema.graphql")
            .map_err(|err| err.errors.to_string())?;
        Ok(Self { schema })
    }

    /// The SDL of the example schema.
    pub fn sdl() -> &'static str {
        SCHEMA
    }

    fn execute_sync(&self, operation: &Operation) -> graphql::Response {
        let document = match ExecutableDocument::parse_and_validate(
            &self.schema,
            &operation.query,
            "query.graphql",
        ) {
            Ok(document) => document,
            Err(err) => {
                return graphql::Response::from_errors(
                    err.errors
                        .iter()
                        .map(|diagnostic| {
                            graphql::Error::new(diagnostic.error.to_string())
                                .with_extension_code("GRAPHQL_VALIDATION_FAILED")
                        })
                        .collect(),
                );
            }
        };

        let Ok(executable) = document
            .operations
            .get(operation.operation_name.as_deref())
        else {
            let message = match &operation.operation_name {
                Some(name) => format!("Unknown operation named \"{name}\"."),
                None => "Must provide operation name if query contains multiple operations."
                    .to_string(),
            };
            return graphql::Response::from_errors(vec![graphql::Error::new(message)]);
        };

        if executable.operation_type == OperationType::Subscription {
            return graphql::Response::from_errors(vec![graphql::Error::new(
                "subscriptions are not supported",
            )]);
        }

        let mut resolver = Resolver {
            document: &document,
            variables: &operation.variables,
            errors: Vec::new(),
        };
        let data = resolver.root(executable.operation_type, &executable.selection_set);
        graphql::Response {
            data: Some(data),
            errors: resolver.errors,
        }
    }
}

#[async_trait::async_trait]
impl Executor for DemoExecutor {
    type Response = graphql::Response;

    async fn execute(
        &self,
        operation: Operation,
        context: &RequestContext,
    ) -> Result<Self::Response, BoxError> {
        tracing::debug!(
            remote_addr = ?context.remote_addr(),
            operation_name = operation.operation_name.as_deref().unwrap_or_default(),
            "executing demo operation"
        );
        Ok(self.execute_sync(&operation))
    }
}

struct Resolver<'a> {
    document: &'a ExecutableDocument,
    variables: &'a Object,
    errors: Vec<graphql::Error>,
}

impl<'a> Resolver<'a> {
    fn root(
        &mut self,
        operation_type: OperationType,
        selection_set: &'a SelectionSet,
    ) -> JsonValue {
        let mut object = JsonMap::new();
        for field in self.fields(selection_set) {
            let value = match field.name.as_str() {
                "__typename" => JsonValue::String(selection_set.ty.as_str().into()),
                "version" if operation_type == OperationType::Mutation => {
                    JsonValue::String(MUTATION_VERSION.into())
                }
                "version" => JsonValue::String(VERSION.into()),
                "singleUpload" => {
                    let file = self.argument(field, "file");
                    self.file(field, &file)
                }
                "multipleUpload" => match self.argument(field, "files") {
                    Value::Array(files) => JsonValue::Array(
                        files.iter().map(|file| self.file(field, file)).collect(),
                    ),
                    Value::Null => JsonValue::Null,
                    other => self.field_error(
                        field,
                        format!("expected a list of Upload, found {}", other.kind()),
                    ),
                },
                "upload" => match self.argument(field, "file") {
                    Value::Upload(upload) => {
                        tracing::info!(
                            filename = upload.filename(),
                            size = upload.size(),
                            "received upload"
                        );
                        JsonValue::String(UPLOAD_ID.into())
                    }
                    Value::Null => JsonValue::Null,
                    other => self.field_error(
                        field,
                        format!("expected an Upload, found {}", other.kind()),
                    ),
                },
                other => self.field_error(field, format!("no resolver for field '{other}'")),
            };
            object.insert::<serde_json_bytes::ByteString>(field.response_key().as_str().into(), value);
        }
        JsonValue::Object(object)
    }

    fn file(&mut self, field: &'a Node<Field>, value: &Value) -> JsonValue {
        let upload = match value {
            Value::Upload(upload) => upload,
            Value::Null => return JsonValue::Null,
            other => {
                return self.field_error(
                    field,
                    format!("expected an Upload, found {}", other.kind()),
                );
            }
        };

        let mut object = JsonMap::new();
        for selected in self.fields(&field.selection_set) {
            let value = match selected.name.as_str() {
                "__typename" => JsonValue::String("File".into()),
                "fileName" => JsonValue::String(upload.filename().into()),
                "size" => JsonValue::Number(upload.size().into()),
                "contentType" => upload
                    .content_type()
                    .map(|content_type| JsonValue::String(content_type.into()))
                    .unwrap_or(JsonValue::Null),
                other => self.field_error(selected, format!("no resolver for field '{other}'")),
            };
            object.insert::<serde_json_bytes::ByteString>(selected.response_key().as_str().into(), value);
        }
        JsonValue::Object(object)
    }

    /// Flattens fragments into the fields selected on one object.
    fn fields(&self, selection_set: &'a SelectionSet) -> Vec<&'a Node<Field>> {
        let mut fields = Vec::new();
        self.collect_fields(selection_set, &mut fields);
        fields
    }

    fn collect_fields(&self, selection_set: &'a SelectionSet, fields: &mut Vec<&'a Node<Field>>) {
        for selection in &selection_set.selections {
            match selection {
                Selection::Field(field) => fields.push(field),
                Selection::InlineFragment(fragment) => {
                    self.collect_fields(&fragment.selection_set, fields)
                }
                Selection::FragmentSpread(spread) => {
                    if let Some(fragment) = self.document.fragments.get(&spread.fragment_name) {
                        self.collect_fields(&fragment.selection_set, fields);
                    }
                }
            }
        }
    }

    fn argument(&self, field: &Field, name: &str) -> Value {
        field
            .arguments
            .iter()
            .find(|argument| argument.name.as_str() == name)
            .map(|argument| self.input_value(&argument.value))
            .unwrap_or_default()
    }

    fn input_value(&self, value: &ast::Value) -> Value {
        match value {
            ast::Value::Null => Value::Null,
            ast::Value::Variable(name) => self
                .variables
                .get(name.as_str())
                .cloned()
                .unwrap_or_default(),
            ast::Value::Enum(name) => Value::String(name.to_string()),
            ast::Value::String(s) => Value::String(s.clone()),
            ast::Value::Boolean(b) => Value::Bool(*b),
            ast::Value::Int(i) => i
                .try_to_i32()
                .map(|i| Value::Number(i.into()))
                .unwrap_or_default(),
            ast::Value::Float(f) => f
                .try_to_f64()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_default(),
            ast::Value::List(items) => {
                Value::Array(items.iter().map(|item| self.input_value(item)).collect())
            }
            ast::Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), self.input_value(value)))
                    .collect(),
            ),
        }
    }

    fn field_error(&mut self, field: &Field, message: String) -> JsonValue {
        tracing::debug!(field = %field.name, %message, "field error");
        self.errors.push(graphql::Error::new(message));
        JsonValue::Null
    }
}
