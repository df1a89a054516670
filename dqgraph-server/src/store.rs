// Copyright 2025 DQGraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Gateway to the triple store's SPARQL 1.1 HTTP endpoint.
//!
//! Three thin operations: bulk turtle load, full clear, and SELECT
//! execution with the JSON results envelope flattened into row maps.
//! Calls share one client with a bounded timeout and are never retried
//! here; a store error is surfaced immediately to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use dqgraph_core::DqError;

use crate::config::StoreConfig;

/// One result row: SPARQL variable name -> lexical value. Typed
/// literal metadata is discarded.
pub type Row = BTreeMap<String, String>;

pub struct StoreGateway {
    client: reqwest::Client,
    repo_url: String,
}

impl StoreGateway {
    pub fn new(config: &StoreConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            repo_url: config.repository_url(),
        })
    }

    /// Bulk-load turtle content into the repository.
    pub async fn import(&self, turtle: Vec<u8>) -> Result<(), DqError> {
        let response = self
            .client
            .post(format!("{}/statements", self.repo_url))
            .header(reqwest::header::CONTENT_TYPE, "text/turtle")
            .body(turtle)
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(response).await
    }

    /// Drop every statement in the repository.
    pub async fn clear(&self) -> Result<(), DqError> {
        let response = self
            .client
            .post(format!("{}/statements", self.repo_url))
            .header(reqwest::header::CONTENT_TYPE, "application/sparql-update")
            .body("CLEAR ALL")
            .send()
            .await
            .map_err(transport_error)?;
        expect_success(response).await
    }

    /// Execute a SELECT query and flatten the result bindings.
    pub async fn query(&self, sparql: &str) -> Result<Vec<Row>, DqError> {
        debug!(query = sparql, "executing SPARQL query");
        let response = self
            .client
            .post(&self.repo_url)
            .header(reqwest::header::CONTENT_TYPE, "application/sparql-query")
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .body(sparql.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DqError::StoreRejected {
                status: Some(status.as_u16()),
                body,
            });
        }

        let envelope: serde_json::Value = response.json().await.map_err(transport_error)?;
        Ok(flatten_bindings(&envelope))
    }
}

fn transport_error(err: reqwest::Error) -> DqError {
    DqError::StoreRejected {
        status: err.status().map(|s| s.as_u16()),
        body: err.to_string(),
    }
}

async fn expect_success(response: reqwest::Response) -> Result<(), DqError> {
    let status = response.status();
    if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::NO_CONTENT {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(DqError::StoreRejected {
        status: Some(status.as_u16()),
        body,
    })
}

/// Flatten a SPARQL JSON results envelope into row maps. Only the
/// lexical `value` of each binding survives; an envelope without
/// `results.bindings` yields no rows.
pub fn flatten_bindings(envelope: &serde_json::Value) -> Vec<Row> {
    envelope["results"]["bindings"]
        .as_array()
        .map(|bindings| {
            bindings
                .iter()
                .map(|binding| {
                    binding
                        .as_object()
                        .map(|vars| {
                            vars.iter()
                                .filter_map(|(name, cell)| {
                                    cell["value"]
                                        .as_str()
                                        .map(|value| (name.clone(), value.to_string()))
                                })
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_typed_and_plain_bindings() {
        let envelope = json!({
            "head": {"vars": ["database", "avgScore"]},
            "results": {"bindings": [
                {
                    "database": {"type": "literal", "value": "sales"},
                    "avgScore": {
                        "type": "literal",
                        "datatype": "http://www.w3.org/2001/XMLSchema#decimal",
                        "value": "0.42"
                    }
                },
                {
                    "database": {"type": "uri", "value": "http://example.org/hr"}
                }
            ]}
        });

        let rows = flatten_bindings(&envelope);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["database"], "sales");
        assert_eq!(rows[0]["avgScore"], "0.42");
        assert_eq!(rows[1]["database"], "http://example.org/hr");
        assert!(!rows[1].contains_key("avgScore"));
    }

    #[test]
    fn empty_and_malformed_envelopes_yield_no_rows() {
        assert!(flatten_bindings(&json!({})).is_empty());
        assert!(flatten_bindings(&json!({"results": {}})).is_empty());
        assert!(flatten_bindings(&json!({"results": {"bindings": []}})).is_empty());
    }
}
