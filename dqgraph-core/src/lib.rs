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

//! Core logic for the DQGraph service: rules-document normalization,
//! SPARQL text normalization, the fixed analytical query catalog, and
//! the shared error taxonomy. Everything here is pure and synchronous;
//! the server crate wires it to subprocesses, the triple store and the
//! completion provider.

pub mod catalog;
pub mod error;
pub mod rules;
pub mod sparql;

pub use error::DqError;
