//! Static scenario description consumed by the scheduler and the verifiers.
//!
//! A scenario declares the process tree of the subject and three thread-based
//! sub-scenarios:
//!
//! - **same process**: an outer thread whose interval must contain an inner one
//! - **barrier**: at most `max_concurrent` threads at a time, with a waiter
//!   that must finish as part of a full group
//! - **cross process**: a thread of the same-process scenario that must run
//!   strictly between two threads of another process
//!
//! # Document Formats
//!
//! [`ScenarioDescription::from_document`] accepts either the structured serde
//! form of this type, or the flat key layout used by existing assignment data
//! files (`nrProcs`, `procs`, `threads1_*`, `threads2_*`, `threads3_*`). Both
//! may be wrapped in standard base64. Flat values may be JSON integers or
//! numeric strings.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use snafu::ResultExt;
use snafu::Snafu;

use crate::key::ParticipantKey;

/// Errors produced while loading or validating a scenario description.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ScenarioError {
    /// The document is neither JSON nor valid base64.
    #[snafu(display("scenario document is not valid base64: {source}"))]
    Base64 {
        /// Underlying decode error.
        source: base64::DecodeError,
    },

    /// The base64 payload is not UTF-8.
    #[snafu(display("scenario document is not valid UTF-8: {source}"))]
    Utf8 {
        /// Underlying conversion error.
        source: std::string::FromUtf8Error,
    },

    /// The document is not valid JSON or does not match the structured form.
    #[snafu(display("failed to parse scenario document: {source}"))]
    Json {
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The top-level JSON value is not an object.
    #[snafu(display("scenario document must be a JSON object"))]
    NotAnObject,

    /// A required flat field is missing.
    #[snafu(display("scenario field '{field}' is missing"))]
    MissingField {
        /// Field name.
        field: String,
    },

    /// A flat field is present but is not an integer.
    #[snafu(display("scenario field '{field}' is not an integer: {value}"))]
    InvalidField {
        /// Field name.
        field: String,
        /// Offending value as found in the document.
        value: String,
    },

    /// The description parses but is internally inconsistent.
    #[snafu(display("invalid scenario: {reason}"))]
    Inconsistent {
        /// What is wrong.
        reason: String,
    },
}

/// Threads of one process whose intervals must nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SameProcessScenario {
    /// Process index the threads belong to.
    pub process: i32,
    /// Number of worker threads (indices `1..=thread_count`).
    pub thread_count: i32,
    /// Thread that must start first and end last.
    pub outer: i32,
    /// Thread that must run inside the outer one.
    pub inner: i32,
}

/// Threads of one process limited to `max_concurrent` at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarrierScenario {
    /// Process index the threads belong to.
    pub process: i32,
    /// Number of worker threads (indices `1..=thread_count`).
    pub thread_count: i32,
    /// Thread that must end while exactly `max_concurrent` threads run.
    pub waiter: i32,
    /// Concurrency bound.
    pub max_concurrent: i32,
}

/// A thread that must run strictly between two threads of another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossProcessScenario {
    /// Process index of the bracketing threads.
    pub process: i32,
    /// Number of worker threads in `process`.
    pub thread_count: i32,
    /// Thread that must end before the sandwiched thread starts.
    pub before: i32,
    /// Thread that must start after the sandwiched thread ends.
    pub after: i32,
    /// Process of the sandwiched thread (the same-process scenario's process).
    pub sandwiched_process: i32,
    /// Thread index of the sandwiched thread.
    pub sandwiched_thread: i32,
}

impl CrossProcessScenario {
    /// Key of the thread that must be sandwiched.
    #[inline]
    pub const fn sandwiched_key(&self) -> ParticipantKey {
        ParticipantKey::new(self.sandwiched_process, self.sandwiched_thread)
    }
}

/// Static description of the subject's required structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDescription {
    /// Number of processes, indexed `1..=process_count`. Process 1 is the root.
    pub process_count: i32,
    /// Parent index of every non-root process.
    pub parents: BTreeMap<i32, i32>,
    /// Same-process nesting scenario.
    pub same_process: SameProcessScenario,
    /// Bounded-concurrency scenario.
    pub barrier: BarrierScenario,
    /// Cross-process ordering scenario.
    pub cross_process: CrossProcessScenario,
}

impl ScenarioDescription {
    /// Load and validate a scenario from a document in any supported format.
    pub fn from_document(text: &str) -> Result<Self, ScenarioError> {
        let trimmed = text.trim();
        let json = if trimmed.starts_with('{') {
            trimmed.to_string()
        } else {
            let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD.decode(compact).context(Base64Snafu)?;
            String::from_utf8(bytes).context(Utf8Snafu)?
        };

        let value: Value = serde_json::from_str(&json).context(JsonSnafu)?;
        let Value::Object(obj) = value else {
            return NotAnObjectSnafu.fail();
        };

        let scenario = if obj.contains_key("nrProcs") {
            Self::from_flat(&obj)?
        } else {
            serde_json::from_value(Value::Object(obj)).context(JsonSnafu)?
        };
        scenario.validate()?;
        Ok(scenario)
    }

    fn from_flat(obj: &Map<String, Value>) -> Result<Self, ScenarioError> {
        let procs = match obj.get("procs") {
            Some(Value::Object(procs)) => procs,
            Some(other) => {
                return InvalidFieldSnafu {
                    field: "procs",
                    value: other.to_string(),
                }
                .fail();
            }
            None => return MissingFieldSnafu { field: "procs" }.fail(),
        };

        let mut parents = BTreeMap::new();
        for (child, parent) in procs {
            let field = format!("procs.{child}");
            let child_index = child.trim().parse::<i32>().map_err(|_| ScenarioError::InvalidField {
                field: field.clone(),
                value: child.clone(),
            })?;
            parents.insert(child_index, integer(&field, parent)?);
        }

        let threads1_proc = int_field(obj, "threads1_proc")?;
        Ok(Self {
            process_count: int_field(obj, "nrProcs")?,
            parents,
            same_process: SameProcessScenario {
                process: threads1_proc,
                thread_count: int_field(obj, "threads1_count")?,
                outer: int_field(obj, "threads1_outer")?,
                inner: int_field(obj, "threads1_inner")?,
            },
            barrier: BarrierScenario {
                process: int_field(obj, "threads2_proc")?,
                thread_count: int_field(obj, "threads2_count")?,
                waiter: int_field(obj, "threads2_waiter")?,
                max_concurrent: int_field(obj, "threads2_max")?,
            },
            cross_process: CrossProcessScenario {
                process: int_field(obj, "threads3_proc")?,
                thread_count: int_field(obj, "threads3_count")?,
                before: int_field(obj, "threads3_before")?,
                after: int_field(obj, "threads3_after")?,
                sandwiched_process: threads1_proc,
                sandwiched_thread: int_field(obj, "threads1_3")?,
            },
        })
    }

    /// Check internal consistency: parents are in range and every non-root
    /// process has one, thread indices fall within their declared counts.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let n = self.process_count;
        ensure(n >= 1, || format!("process count must be at least 1, got {n}"))?;

        for (&child, &parent) in &self.parents {
            ensure((2..=n).contains(&child), || format!("process {child} is not a non-root process index"))?;
            ensure((1..=n).contains(&parent), || {
                format!("parent {parent} of process {child} is outside 1..={n}")
            })?;
            ensure(parent != child, || format!("process {child} is its own parent"))?;
        }
        for p in 2..=n {
            ensure(self.parents.contains_key(&p), || format!("process {p} has no parent"))?;
        }

        let same = &self.same_process;
        check_thread("same-process outer", same.process, same.thread_count, same.outer, n)?;
        check_thread("same-process inner", same.process, same.thread_count, same.inner, n)?;
        ensure(same.outer != same.inner, || "outer and inner threads must differ".to_string())?;

        let barrier = &self.barrier;
        check_thread("barrier waiter", barrier.process, barrier.thread_count, barrier.waiter, n)?;
        ensure(barrier.max_concurrent >= 1, || {
            format!("barrier bound must be at least 1, got {}", barrier.max_concurrent)
        })?;

        let cross = &self.cross_process;
        check_thread("cross-process before", cross.process, cross.thread_count, cross.before, n)?;
        check_thread("cross-process after", cross.process, cross.thread_count, cross.after, n)?;
        ensure((1..=n).contains(&cross.sandwiched_process), || {
            format!("sandwiched process {} is outside 1..={n}", cross.sandwiched_process)
        })?;
        ensure(cross.sandwiched_thread >= 1, || {
            format!("sandwiched thread index must be at least 1, got {}", cross.sandwiched_thread)
        })?;
        Ok(())
    }

    /// Declared parent of `process`, if it is a non-root process.
    pub fn parent_of(&self, process: i32) -> Option<i32> {
        self.parents.get(&process).copied()
    }

    /// Non-root processes that are never anybody's parent, ascending.
    pub fn leaf_processes(&self) -> Vec<i32> {
        let parents: BTreeSet<i32> = self.parents.values().copied().collect();
        self.parents.keys().copied().filter(|p| !parents.contains(p)).collect()
    }
}

fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        InconsistentSnafu { reason: reason() }.fail()
    }
}

fn check_thread(role: &str, process: i32, count: i32, thread: i32, n: i32) -> Result<(), ScenarioError> {
    ensure((1..=n).contains(&process), || format!("{role} process {process} is outside 1..={n}"))?;
    ensure(count >= 0, || format!("{role} thread count must not be negative, got {count}"))?;
    ensure((1..=count).contains(&thread), || format!("{role} thread {thread} is outside 1..={count}"))
}

fn int_field(obj: &Map<String, Value>, field: &str) -> Result<i32, ScenarioError> {
    match obj.get(field) {
        Some(value) => integer(field, value),
        None => MissingFieldSnafu { field }.fail(),
    }
}

fn integer(field: &str, value: &Value) -> Result<i32, ScenarioError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ScenarioError::InvalidField {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT: &str = r#"{
        "nrProcs": 4,
        "procs": {"2": "1", "3": "2", "4": "1"},
        "threads1_proc": "2", "threads1_count": 4, "threads1_outer": 1, "threads1_inner": 3, "threads1_3": "2",
        "threads2_proc": 3, "threads2_count": 6, "threads2_waiter": 2, "threads2_max": 3,
        "threads3_proc": 4, "threads3_count": 3, "threads3_before": 1, "threads3_after": 3
    }"#;

    #[test]
    fn test_flat_document() {
        let scenario = ScenarioDescription::from_document(FLAT).unwrap();
        assert_eq!(scenario.process_count, 4);
        assert_eq!(scenario.parent_of(3), Some(2));
        assert_eq!(scenario.parent_of(1), None);
        assert_eq!(
            scenario.same_process,
            SameProcessScenario {
                process: 2,
                thread_count: 4,
                outer: 1,
                inner: 3
            }
        );
        assert_eq!(scenario.barrier.max_concurrent, 3);
        assert_eq!(scenario.cross_process.sandwiched_key(), ParticipantKey::new(2, 2));
    }

    #[test]
    fn test_base64_document() {
        let encoded = STANDARD.encode(FLAT);
        let wrapped = format!("{}\n{}\n", &encoded[..20], &encoded[20..]);
        let scenario = ScenarioDescription::from_document(&wrapped).unwrap();
        assert_eq!(scenario, ScenarioDescription::from_document(FLAT).unwrap());
    }

    #[test]
    fn test_structured_document_round_trips() {
        let scenario = ScenarioDescription::from_document(FLAT).unwrap();
        let structured = serde_json::to_string(&scenario).unwrap();
        assert_eq!(ScenarioDescription::from_document(&structured).unwrap(), scenario);
    }

    #[test]
    fn test_leaf_processes() {
        let scenario = ScenarioDescription::from_document(FLAT).unwrap();
        assert_eq!(scenario.leaf_processes(), vec![3, 4]);
    }

    #[test]
    fn test_missing_field() {
        let doc = FLAT.replace("\"threads2_max\": 3,", "");
        let err = ScenarioDescription::from_document(&doc).unwrap_err();
        assert!(matches!(err, ScenarioError::MissingField { ref field } if field == "threads2_max"));
    }

    #[test]
    fn test_non_integer_field() {
        let doc = FLAT.replace("\"threads2_max\": 3", "\"threads2_max\": \"three\"");
        let err = ScenarioDescription::from_document(&doc).unwrap_err();
        assert!(err.to_string().contains("threads2_max"));
    }

    #[test]
    fn test_parent_out_of_range() {
        let doc = FLAT.replace("\"4\": \"1\"", "\"4\": \"9\"");
        let err = ScenarioDescription::from_document(&doc).unwrap_err();
        assert!(matches!(err, ScenarioError::Inconsistent { .. }));
    }

    #[test]
    fn test_missing_parent() {
        let doc = FLAT.replace(", \"4\": \"1\"", "");
        let err = ScenarioDescription::from_document(&doc).unwrap_err();
        assert!(err.to_string().contains("process 4 has no parent"));
    }

    #[test]
    fn test_garbage_document() {
        assert!(matches!(ScenarioDescription::from_document("!!!"), Err(ScenarioError::Base64 { .. })));
        assert!(matches!(ScenarioDescription::from_document("[1, 2]"), Err(ScenarioError::Base64 { .. })));
    }
}
