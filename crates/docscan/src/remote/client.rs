use std::collections::BTreeMap;

use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::ServerSettings;
use crate::remote::error::RemoteError;
use crate::remote::xmlrpc::{encode_call, parse_response, Value};

/// One `(field, operator, value)` condition of a search domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainTerm {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl DomainTerm {
    pub fn equals(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            operator: "=".to_string(),
            value: value.into(),
        }
    }

    fn to_value(&self) -> Value {
        Value::Array(vec![
            Value::from(self.field.as_str()),
            Value::from(self.operator.as_str()),
            self.value.clone(),
        ])
    }
}

/// `id` and `name` of a record returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub id: i64,
    pub name: String,
}

/// The remote record-keeping system, as far as the pipeline needs it.
pub trait RemoteStore {
    /// Logs in and returns the session uid.
    fn authenticate(&self) -> Result<i64, RemoteError>;

    fn search(
        &self,
        uid: i64,
        object: &str,
        domain: &[DomainTerm],
    ) -> Result<Vec<RemoteRecord>, RemoteError>;

    fn create(
        &self,
        uid: i64,
        object: &str,
        values: BTreeMap<String, Value>,
    ) -> Result<i64, RemoteError>;
}

/// [`RemoteStore`] speaking Odoo's XML-RPC API.
pub struct XmlRpcStore {
    server: ServerSettings,
    client: reqwest::blocking::Client,
}

impl XmlRpcStore {
    pub fn new(server: ServerSettings) -> Result<Self, RemoteError> {
        // No idle connections are kept: every call opens a fresh one.
        let client = reqwest::blocking::Client::builder()
            .timeout(server.timeout)
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(server.accept_invalid_certs)
            .build()?;

        Ok(Self { server, client })
    }

    fn call(&self, service: &str, method: &str, params: &[Value]) -> Result<Value, RemoteError> {
        let url = format!("{}/xmlrpc/2/{}", self.server.url, service);
        debug!(
            "XML-RPC {} on {}",
            method,
            crate::sanitize::redact_url(&url)
        );

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(encode_call(method, params))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "HTTP {} from {}",
                status,
                crate::sanitize::redact_url(&url)
            )));
        }

        parse_response(&response.text()?)
    }

    fn execute_kw(
        &self,
        uid: i64,
        object: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Value, RemoteError> {
        self.call(
            "object",
            "execute_kw",
            &[
                Value::from(self.server.database.as_str()),
                Value::Int(uid),
                Value::from(self.server.password.expose_secret()),
                Value::from(object),
                Value::from(method),
                Value::Array(args),
                Value::Struct(kwargs),
            ],
        )
    }
}

impl RemoteStore for XmlRpcStore {
    fn authenticate(&self) -> Result<i64, RemoteError> {
        let result = self.call(
            "common",
            "authenticate",
            &[
                Value::from(self.server.database.as_str()),
                Value::from(self.server.username.as_str()),
                Value::from(self.server.password.expose_secret()),
                Value::Struct(BTreeMap::new()),
            ],
        )?;

        match result {
            Value::Int(uid) if uid > 0 => Ok(uid),
            Value::Bool(false) => Err(RemoteError::Fault {
                code: 0,
                message: format!(
                    "Authentication failed for user '{}' on database '{}'",
                    self.server.username, self.server.database
                ),
            }),
            other => Err(RemoteError::Protocol(format!(
                "Unexpected authenticate result: {:?}",
                other
            ))),
        }
    }

    fn search(
        &self,
        uid: i64,
        object: &str,
        domain: &[DomainTerm],
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        let domain = Value::Array(domain.iter().map(DomainTerm::to_value).collect());
        let mut kwargs = BTreeMap::new();
        kwargs.insert(
            "fields".to_string(),
            Value::from(vec![Value::from("id"), Value::from("name")]),
        );

        let result = self.execute_kw(uid, object, "search_read", vec![domain], kwargs)?;
        let rows = result
            .as_array()
            .ok_or_else(|| RemoteError::Protocol("search_read did not return a list".to_string()))?;

        rows.iter()
            .map(|row| {
                let members = row.as_struct().ok_or_else(|| {
                    RemoteError::Protocol("search_read row is not a struct".to_string())
                })?;
                let id = members
                    .get("id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| RemoteError::Protocol("search_read row without id".to_string()))?;
                let name = members
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Ok(RemoteRecord { id, name })
            })
            .collect()
    }

    fn create(
        &self,
        uid: i64,
        object: &str,
        values: BTreeMap<String, Value>,
    ) -> Result<i64, RemoteError> {
        let result = self.execute_kw(
            uid,
            object,
            "create",
            vec![Value::Struct(values)],
            BTreeMap::new(),
        )?;

        result
            .as_i64()
            .ok_or_else(|| RemoteError::Protocol(format!("create returned {:?}", result)))
    }
}
