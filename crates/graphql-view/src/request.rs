use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::RequestError;

/// Variables of an operation, always a JSON object once resolved.
pub type Variables = Map<String, Value>;

/// Parameters read from the URL query string.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryParams {
    pub query: Option<String>,
    pub variables: Option<String>,
    pub operation_name: Option<String>,
    pub pretty: Option<String>,
    pub raw: Option<String>,
}

impl QueryParams {
    pub(crate) fn from_uri(uri: &http::Uri) -> Result<Self, RequestError> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(uri.query().unwrap_or_default())
            .map_err(|err| {
                RequestError::NotWellFormed(format!("Could not deserialize request from query parameters: {err}"))
            })?;

        let mut params = QueryParams::default();

        // Repeated keys: the last one wins.
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "query" => &mut params.query,
                "variables" => &mut params.variables,
                "operationName" => &mut params.operation_name,
                "pretty" => &mut params.pretty,
                "raw" => &mut params.raw,
                _ => continue,
            };

            *slot = Some(value);
        }

        Ok(params)
    }

    /// `?pretty` with any non-empty value.
    pub(crate) fn wants_pretty(&self) -> bool {
        self.pretty.as_deref().is_some_and(|value| !value.is_empty())
    }

    pub(crate) fn wants_raw(&self) -> bool {
        self.raw.is_some()
    }

    fn query(&self) -> Option<&str> {
        non_empty(self.query.as_deref())
    }

    fn operation_name(&self) -> Option<&str> {
        non_empty(self.operation_name.as_deref())
    }

    fn variables(&self) -> Option<&str> {
        non_empty(self.variables.as_deref())
    }
}

/// A GraphQL operation as sent by the client, before merging it with the
/// URL parameters.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct OperationRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub variables: Option<RawVariables>,
    #[serde(default, rename = "operationName")]
    pub operation_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,
}

/// Variables either sent inline or as a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawVariables {
    Map(Variables),
    Encoded(String),
    /// Anything else, rejected when decoded.
    Invalid(Value),
}

impl RawVariables {
    fn decode(self) -> Result<Variables, RequestError> {
        match self {
            RawVariables::Map(variables) => Ok(variables),
            RawVariables::Encoded(text) => decode_variables(&text),
            RawVariables::Invalid(_) => Err(RequestError::InvalidVariablesJson),
        }
    }
}

fn decode_variables(text: &str) -> Result<Variables, RequestError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(variables)) => Ok(variables),
        Ok(Value::Null) => Ok(Variables::new()),
        Ok(_) | Err(_) => Err(RequestError::InvalidVariablesJson),
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        String(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::String(id) => id,
        Id::Number(id) => id.to_string(),
    }))
}

/// An operation ready to be handed over to the engine.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResolvedOperation {
    pub query: Option<String>,
    pub variables: Variables,
    pub operation_name: Option<String>,
    pub id: Option<String>,
}

impl ResolvedOperation {
    /// The query, if the client sent a non-empty one.
    pub fn query(&self) -> Option<&str> {
        non_empty(self.query.as_deref())
    }
}

/// The operations of one HTTP request, in the order the client sent them.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBatch {
    pub operations: Vec<ResolvedOperation>,
    /// Whether the client sent a JSON array, the response mirrors that shape.
    pub is_batch: bool,
}

impl RequestBatch {
    pub(crate) fn ensure_queries(&self) -> Result<(), RequestError> {
        if self.operations.iter().all(|operation| operation.query().is_some()) {
            Ok(())
        } else {
            Err(RequestError::MissingQuery)
        }
    }
}

/// Merges the parsed body with the URL parameters.
///
/// A single operation takes `query` and `operationName` from the URL when
/// present, and `variables` from the URL when present. Batched operations only
/// use the URL parameters as defaults. A missing query is not an error here,
/// it is detected before dispatching.
pub(crate) fn resolve(body: Value, params: &QueryParams, batch_enabled: bool) -> Result<RequestBatch, RequestError> {
    match body {
        Value::Array(elements) => {
            if !batch_enabled {
                return Err(RequestError::BatchNotAllowed);
            }

            if elements.is_empty() {
                return Err(RequestError::EmptyBatch);
            }

            let operations = elements
                .into_iter()
                .map(|element| resolve_batch_element(element, params))
                .collect::<Result<_, _>>()?;

            Ok(RequestBatch {
                operations,
                is_batch: true,
            })
        }
        Value::Object(object) => {
            let request = deserialize_operation(object)?;

            Ok(RequestBatch {
                operations: vec![resolve_single(request, params)?],
                is_batch: false,
            })
        }
        other => Err(RequestError::ParamsNotAnObject(other)),
    }
}

fn deserialize_operation(object: Map<String, Value>) -> Result<OperationRequest, RequestError> {
    OperationRequest::deserialize(Value::Object(object)).map_err(|err| RequestError::NotWellFormed(err.to_string()))
}

fn resolve_single(request: OperationRequest, params: &QueryParams) -> Result<ResolvedOperation, RequestError> {
    let variables = match params.variables() {
        Some(text) => decode_variables(text)?,
        None => request.variables.map(RawVariables::decode).transpose()?.unwrap_or_default(),
    };

    Ok(ResolvedOperation {
        query: params.query().map(str::to_owned).or(request.query),
        variables,
        operation_name: params.operation_name().map(str::to_owned).or(request.operation_name),
        id: request.id,
    })
}

fn resolve_batch_element(element: Value, params: &QueryParams) -> Result<ResolvedOperation, RequestError> {
    let Value::Object(object) = element else {
        return Err(RequestError::ParamsNotAnObject(element));
    };

    let request = deserialize_operation(object)?;

    let variables = match request.variables {
        Some(variables) => variables.decode()?,
        None => params.variables().map(decode_variables).transpose()?.unwrap_or_default(),
    };

    Ok(ResolvedOperation {
        query: non_empty(request.query.as_deref())
            .or(params.query())
            .map(str::to_owned),
        variables,
        operation_name: non_empty(request.operation_name.as_deref())
            .or(params.operation_name())
            .map(str::to_owned),
        id: request.id,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
