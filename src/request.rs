//! Caller supplied intent for a single remote operation.

use serde_json::{Map, Value};
use thiserror::Error;

/// Operation to run against exactly one node instance of a deployment.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationRequest {
    /// Deployment the target instance belongs to.
    pub deployment_id: String,
    /// The single node instance the operation runs on.
    pub instance_id: String,
    /// Dotted operation name (for example `maintenance.mount`).
    pub operation: String,
    /// Arbitrary JSON passed to the operation as keyword arguments.
    pub parameters: Value,
}

impl OperationRequest {
    /// Starts a builder for an [`OperationRequest`].
    #[must_use]
    pub fn builder() -> OperationRequestBuilder {
        OperationRequestBuilder::new()
    }

    /// Validates the request, returning a descriptive error when a required
    /// field is missing or malformed.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when a target field is empty or the
    /// operation name is not dotted.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.deployment_id.is_empty() {
            return Err(RequestError::MissingField("deployment_id"));
        }
        if self.instance_id.is_empty() {
            return Err(RequestError::MissingField("instance_id"));
        }
        if self.operation.is_empty() {
            return Err(RequestError::MissingField("operation"));
        }
        let dotted = self
            .operation
            .split_once('.')
            .is_some_and(|(interface, name)| !interface.is_empty() && !name.is_empty());
        if !dotted {
            return Err(RequestError::InvalidOperation(self.operation.clone()));
        }
        Ok(())
    }
}

/// Builder for [`OperationRequest`] that trims inputs and validates on
/// construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperationRequestBuilder {
    deployment_id: String,
    instance_id: String,
    operation: String,
    parameters: Option<Value>,
}

impl OperationRequestBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the deployment identifier.
    #[must_use]
    pub fn deployment_id(mut self, value: impl Into<String>) -> Self {
        self.deployment_id = value.into();
        self
    }

    /// Sets the node instance identifier.
    #[must_use]
    pub fn instance_id(mut self, value: impl Into<String>) -> Self {
        self.instance_id = value.into();
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn operation(mut self, value: impl Into<String>) -> Self {
        self.operation = value.into();
        self
    }

    /// Sets the operation parameters.
    #[must_use]
    pub fn parameters(mut self, value: Value) -> Self {
        self.parameters = Some(value);
        self
    }

    /// Builds and validates the [`OperationRequest`]. Missing or `null`
    /// parameters become an empty JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when validation fails.
    pub fn build(self) -> Result<OperationRequest, RequestError> {
        let parameters = match self.parameters {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value,
        };
        let request = OperationRequest {
            deployment_id: self.deployment_id.trim().to_owned(),
            instance_id: self.instance_id.trim().to_owned(),
            operation: self.operation.trim().to_owned(),
            parameters,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Errors raised while constructing an [`OperationRequest`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// A required field is empty.
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    /// The operation name is not of the form `interface.operation`.
    #[error("operation name '{0}' must be dotted, for example maintenance.mount")]
    InvalidOperation(String),
}
