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

use std::path::PathBuf;

/// Failure taxonomy shared by every component. Callers match on the
/// variant; the server maps each variant to a response class (client
/// error for input problems, upstream-failure class for stage, store
/// and provider problems).
#[derive(Debug, thiserror::Error)]
pub enum DqError {
    /// Malformed or unsupported input (bad JSON shape, empty query,
    /// wrong file type). Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required pipeline precursor file is absent.
    #[error("missing input file: {0}")]
    MissingInput(PathBuf),

    /// An external converter exited non-zero or produced no output.
    /// Both captured streams are carried verbatim so a bad mapping
    /// file can be diagnosed without re-running the stage.
    #[error("stage command failed: {command}\n\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    StageExecutionFailed {
        command: String,
        stdout: String,
        stderr: String,
    },

    /// The triple store returned a non-success status (or was
    /// unreachable, in which case `status` is `None`).
    #[error("store rejected request (status {status:?}): {body}")]
    StoreRejected { status: Option<u16>, body: String },

    /// The completion provider failed after exhausting retries, or
    /// failed for a non-rate-limit reason.
    #[error("completion provider error: {0}")]
    Provider(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
