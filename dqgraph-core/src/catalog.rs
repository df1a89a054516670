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

//! Fixed catalog of analytical queries over the data-quality rule
//! graph.
//!
//! The "lowest" queries all share one shape: an outer SELECT grouping
//! average scores by a hierarchy level, joined against a correlated
//! subquery computing the global minimum of the same aggregate, with
//! an equality filter isolating the worst-scoring group(s). A `path`
//! string is synthesized by dot-joining the hierarchy levels. The
//! catalog is immutable and addressed by exact name only.

/// A named, parameterless catalog query.
#[derive(Debug, Clone, Copy)]
pub struct NamedQuery {
    pub name: &'static str,
    pub body: &'static str,
}

const QUERIES: &[NamedQuery] = &[
    NamedQuery {
        name: "Average score per database (asc)",
        body: r#"
PREFIX ex: <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?database (AVG(xsd:decimal(?score)) AS ?avgScore)
WHERE { ?rule a ex:DQRule ; ex:techSystem ?database ; ex:score ?score . }
GROUP BY ?database
ORDER BY ASC(?avgScore)
"#,
    },
    NamedQuery {
        name: "Average score per schema (asc)",
        body: r#"
PREFIX ex: <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?schema (AVG(xsd:decimal(?score)) AS ?avgScore)
WHERE { ?rule a ex:DQRule ; ex:techGroup ?schema ; ex:score ?score . }
GROUP BY ?schema
ORDER BY ASC(?avgScore)
"#,
    },
    NamedQuery {
        name: "Databases with lowest avg score (with path)",
        body: r#"
PREFIX ex: <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?database ?path ?avgScore
WHERE {
  {
    SELECT ?database (AVG(xsd:decimal(?score)) AS ?avgScore)
    WHERE { ?r a ex:DQRule ; ex:techSystem ?database ; ex:score ?score . }
    GROUP BY ?database
  }
  {
    SELECT (MIN(?avg) AS ?minAvg)
    WHERE {
      SELECT (AVG(xsd:decimal(?score)) AS ?avg)
      WHERE { ?r a ex:DQRule ; ex:techSystem ?db ; ex:score ?score . }
      GROUP BY ?db
    }
  }
  FILTER (?avgScore = ?minAvg)
  BIND(STR(?database) AS ?path)
}
"#,
    },
    NamedQuery {
        name: "Schemas with lowest avg score (with path)",
        body: r#"
PREFIX ex: <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?database ?schema ?path ?avgScore
WHERE {
  {
    SELECT ?database ?schema (AVG(xsd:decimal(?score)) AS ?avgScore)
    WHERE { ?r a ex:DQRule ; ex:techSystem ?database ; ex:techGroup ?schema ; ex:score ?score . }
    GROUP BY ?database ?schema
  }
  {
    SELECT (MIN(?avg) AS ?minAvg)
    WHERE {
      SELECT (AVG(xsd:decimal(?score)) AS ?avg)
      WHERE { ?r a ex:DQRule ; ex:techSystem ?db ; ex:techGroup ?sch ; ex:score ?score . }
      GROUP BY ?db ?sch
    }
  }
  FILTER (?avgScore = ?minAvg)
  BIND(CONCAT(STR(?database), ".", STR(?schema)) AS ?path)
}
"#,
    },
    NamedQuery {
        name: "Tables with lowest avg score (with path)",
        body: r#"
PREFIX ex: <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?database ?schema ?dataset ?path ?avgScore
WHERE {
  {
    SELECT ?database ?schema ?dataset (AVG(xsd:decimal(?score)) AS ?avgScore)
    WHERE { ?r a ex:DQRule ; ex:techSystem ?database ; ex:techGroup ?schema ; ex:dataset ?dataset ; ex:score ?score . }
    GROUP BY ?database ?schema ?dataset
  }
  {
    SELECT (MIN(?avg) AS ?minAvg)
    WHERE {
      SELECT (AVG(xsd:decimal(?score)) AS ?avg)
      WHERE { ?r a ex:DQRule ; ex:techSystem ?db ; ex:techGroup ?sch ; ex:dataset ?ds ; ex:score ?score . }
      GROUP BY ?db ?sch ?ds
    }
  }
  FILTER (?avgScore = ?minAvg)
  BIND(CONCAT(STR(?database), ".", STR(?schema), ".", STR(?dataset)) AS ?path)
}
"#,
    },
    NamedQuery {
        name: "Rules with lowest score (with code & path)",
        // The leaf attribute tolerates two property spellings, and the
        // leaf path segment is appended only when one of them is bound.
        body: r#"
PREFIX ex: <http://example.org/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
SELECT ?rule ?ruleCode ?techSystem ?techGroup ?dataset ?dataElement ?path ?score
WHERE {
  { SELECT (MIN(xsd:decimal(?s)) AS ?minScore) WHERE { ?r a ex:DQRule ; ex:score ?s . } }
  ?rule a ex:DQRule ; ex:score ?score ; ex:techSystem ?techSystem ; ex:techGroup ?techGroup ; ex:dataset ?dataset .
  OPTIONAL { ?rule ex:dataElement ?dataElement }
  OPTIONAL { ?rule ex:dataelement ?dataElement }
  OPTIONAL { ?rule ex:ruleCode ?ruleCode }
  FILTER (xsd:decimal(?score) = ?minScore)
  BIND(CONCAT(STR(?techSystem), ".", STR(?techGroup), ".", STR(?dataset),
              IF(BOUND(?dataElement), CONCAT(".", STR(?dataElement)), "")) AS ?path)
}
"#,
    },
];

/// Catalog names, sorted for stable listings.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = QUERIES.iter().map(|q| q.name).collect();
    names.sort_unstable();
    names
}

/// Exact-match lookup. Unknown names are a client error, resolved
/// before any store contact.
pub fn get(name: &str) -> Option<&'static str> {
    QUERIES.iter().find(|q| q.name == name).map(|q| q.body)
}
