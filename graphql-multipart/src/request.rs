use serde::Deserialize;

use crate::error::MultipartRequestError;
use crate::value::Object;
use crate::value::Value;

/// A single GraphQL operation, ready to be executed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Operation {
    /// The (optional) GraphQL operation name.
    ///
    /// When specified, it selects the operation to run in a document holding
    /// several of them.
    pub operation_name: Option<String>,

    /// The GraphQL document.
    ///
    /// An operation sent without `query` in a JSON body carries an empty
    /// string here; executors report that as they see fit.
    pub query: String,

    /// Variables, with uploaded files already in place.
    pub variables: Object,
}

impl Operation {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_variables(mut self, variables: Object) -> Self {
        self.variables = variables;
        self
    }

    /// Builds an operation from one JSON object of a request body.
    ///
    /// Missing or `null` members take their default value. Members of the
    /// wrong type are rejected.
    pub fn from_object(mut object: Object) -> Result<Self, MultipartRequestError> {
        let operation_name = match object.swap_remove("operationName") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name).filter(|name| !name.is_empty()),
            Some(other) => {
                return Err(MultipartRequestError::InvalidOperation(format!(
                    "'operationName' must be a string, found {}",
                    other.kind()
                )));
            }
        };
        let query = match object.swap_remove("query") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(query)) => query,
            Some(other) => {
                return Err(MultipartRequestError::InvalidOperation(format!(
                    "'query' must be a string, found {}",
                    other.kind()
                )));
            }
        };
        let variables = match object.swap_remove("variables") {
            None | Some(Value::Null) => Object::new(),
            Some(Value::Object(variables)) => variables,
            Some(other) => {
                return Err(MultipartRequestError::InvalidOperation(format!(
                    "'variables' must be an object, found {}",
                    other.kind()
                )));
            }
        };

        Ok(Self {
            operation_name,
            query,
            variables,
        })
    }

    /// Convert encoded URL query string parameters (also known as "search
    /// params") into an [`Operation`].
    ///
    /// `query` is required; `variables` is an optional JSON object and
    /// `operationName` an optional string.
    pub fn from_urlencoded_query(url_encoded_query: &str) -> Result<Self, MultipartRequestError> {
        let params: QueryParams = serde_urlencoded::from_str(url_encoded_query)
            .map_err(|err| MultipartRequestError::InvalidOperation(err.to_string()))?;

        let query = params
            .query
            .filter(|query| !query.is_empty())
            .ok_or(MultipartRequestError::MissingQuery)?;

        let variables = match params.variables.as_deref() {
            None | Some("") => Object::new(),
            Some(variables) => serde_json::from_str::<Option<Object>>(variables)
                .map_err(MultipartRequestError::MalformedVariables)?
                .unwrap_or_default(),
        };

        Ok(Self {
            operation_name: params.operation_name.filter(|name| !name.is_empty()),
            query,
            variables,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
    query: Option<String>,
    variables: Option<String>,
    operation_name: Option<String>,
}

/// The operations carried by one HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub enum Operations {
    /// A JSON object: answered with a single result.
    Single(Operation),
    /// A JSON array: answered with an array of results in the same order.
    Batch(Vec<Operation>),
}

impl Operations {
    pub fn is_batch(&self) -> bool {
        matches!(self, Operations::Batch(_))
    }
}

impl TryFrom<Value> for Operations {
    type Error = MultipartRequestError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(entries) => {
                if entries.is_empty() {
                    return Err(MultipartRequestError::EmptyBatch);
                }
                entries
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| match entry {
                        Value::Object(object) => Operation::from_object(object),
                        other => Err(MultipartRequestError::InvalidOperation(format!(
                            "batch entry {index} must be an object, found {}",
                            other.kind()
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Operations::Batch)
            }
            Value::Object(object) => Operation::from_object(object).map(Operations::Single),
            other => Err(MultipartRequestError::InvalidOperationsShape(other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn object(value: serde_json::Value) -> Object {
        match Value::from(value) {
            Value::Object(object) => object,
            other => panic!("expected an object, got {}", other.kind()),
        }
    }

    #[test]
    fn it_reads_a_single_operation() {
        let operations = Operations::try_from(Value::from(json!({
            "query": "query aTest($arg1: String!) { test(who: $arg1) }",
            "operationName": "aTest",
            "variables": { "arg1": "me" },
            "extensions": { "extension": 1 }
        })))
        .unwrap();

        assert_eq!(
            operations,
            Operations::Single(
                Operation::new("query aTest($arg1: String!) { test(who: $arg1) }")
                    .with_operation_name("aTest")
                    .with_variables(object(json!({ "arg1": "me" })))
            )
        );
    }

    #[test]
    // some clients send `"variables": null`
    fn it_defaults_missing_members() {
        let operation = Operation::from_object(object(json!({
            "operationName": null,
            "variables": null
        })))
        .unwrap();

        assert_eq!(operation, Operation::default());
        assert_eq!(operation.query, "");
    }

    #[test]
    fn it_rejects_mistyped_members() {
        for body in [
            json!({ "query": 1 }),
            json!({ "query": "{ a }", "operationName": [] }),
            json!({ "query": "{ a }", "variables": [] }),
        ] {
            assert!(matches!(
                Operation::from_object(object(body)),
                Err(MultipartRequestError::InvalidOperation(_))
            ));
        }
    }

    #[test]
    fn it_reads_a_batch_in_order() {
        let operations = Operations::try_from(Value::from(json!([
            { "query": "{ first }" },
            { "query": "{ second }", "operationName": "second" }
        ])))
        .unwrap();

        assert!(operations.is_batch());
        assert_eq!(
            operations,
            Operations::Batch(vec![
                Operation::new("{ first }"),
                Operation::new("{ second }").with_operation_name("second"),
            ])
        );
    }

    #[test]
    fn it_rejects_other_shapes() {
        assert!(matches!(
            Operations::try_from(Value::from(json!("query"))),
            Err(MultipartRequestError::InvalidOperationsShape("string"))
        ));
        assert!(matches!(
            Operations::try_from(Value::from(json!([]))),
            Err(MultipartRequestError::EmptyBatch)
        ));
        assert!(matches!(
            Operations::try_from(Value::from(json!([{ "query": "{ a }" }, 1]))),
            Err(MultipartRequestError::InvalidOperation(_))
        ));
    }

    #[test]
    fn from_urlencoded_query_works() {
        let query_string = "operationName=version&query=query+version+%7B+version+%7D&variables=%7B%7D";

        let operation = Operation::from_urlencoded_query(query_string).unwrap();

        assert_eq!(
            operation,
            Operation::new("query version { version }").with_operation_name("version")
        );
    }

    #[test]
    fn from_urlencoded_query_with_variables_works() {
        let query_string =
            "query=%7B+a+%7D&variables=%7B%22date%22%3A%222022-01-01T00%3A00%3A00%2B00%3A00%22%7D";

        let operation = Operation::from_urlencoded_query(query_string).unwrap();

        assert_eq!(operation.operation_name, None);
        assert_eq!(
            operation.variables,
            object(json!({ "date": "2022-01-01T00:00:00+00:00" }))
        );
    }

    #[test]
    fn from_urlencoded_query_requires_a_query() {
        assert!(matches!(
            Operation::from_urlencoded_query("operationName=version"),
            Err(MultipartRequestError::MissingQuery)
        ));
        assert!(matches!(
            Operation::from_urlencoded_query("query="),
            Err(MultipartRequestError::MissingQuery)
        ));
    }

    #[test]
    fn from_urlencoded_query_rejects_bad_variables() {
        for variables in ["%7Bnope", "%5B1%5D"] {
            let query_string = format!("query=%7B+a+%7D&variables={variables}");
            assert!(matches!(
                Operation::from_urlencoded_query(&query_string),
                Err(MultipartRequestError::MalformedVariables(_))
            ));
        }
        assert!(
            Operation::from_urlencoded_query("query=%7B+a+%7D&variables=null")
                .unwrap()
                .variables
                .is_empty()
        );
    }
}
