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

//! Canonicalization of uploaded rules documents.
//!
//! The mapping converters expect a `{"rules": [...]}` document; uploads
//! arrive in whatever shape the exporting tool produced. Normalization
//! is total over all JSON values: every array, every object and every
//! scalar has a defined outcome.

use serde_json::{json, Value};

use crate::error::DqError;

/// Normalize raw JSON text into a canonical `{"rules": [...]}` value.
///
/// - an array becomes `{"rules": <array>}`, order preserved;
/// - an object whose `rules` key is bound to an array passes through
///   unchanged;
/// - any other object is wrapped whole as a single-element rule list
///   (no key is ever silently discarded);
/// - scalars and `null` are rejected.
pub fn normalize_rules(raw: &str) -> Result<Value, DqError> {
    let parsed: Value = serde_json::from_str(raw)
        .map_err(|e| DqError::InvalidInput(format!("invalid JSON: {e}")))?;

    match parsed {
        Value::Array(rules) => Ok(json!({ "rules": rules })),
        Value::Object(map) => {
            if map.get("rules").map(Value::is_array).unwrap_or(false) {
                Ok(Value::Object(map))
            } else {
                Ok(json!({ "rules": [Value::Object(map)] }))
            }
        }
        _ => Err(DqError::InvalidInput(
            "JSON must be an array or an object".to_string(),
        )),
    }
}
