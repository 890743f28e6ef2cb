/// Add Tool Implementation
///
/// The `add` tool sums two integers and records the sum in the session's
/// result record. The record is returned to the client as JSON text, e.g.
/// `{"result": 5}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, Result};
use crate::core::server::{MCPTool, ToolHandler, ToolRegistry};

/// Value held by a fresh record before any call has been made.
pub const INITIAL_RESULT: i64 = 10;

/// Holds the sum from the most recent successful `add` call.
///
/// Serializes to a single-key object, `{"result": <sum>}`. The record is
/// owned by the server session and lent to the handler for each call.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub result: i64,
}

impl Default for ResultRecord {
    fn default() -> Self {
        Self {
            result: INITIAL_RESULT,
        }
    }
}

/// Typed arguments for `add`. Only JSON integers that fit in an i64 are
/// accepted; strings and floats are rejected rather than coerced.
#[derive(Deserialize, Debug)]
struct AddArguments {
    a: i64,
    b: i64,
}

/// Add `a` and `b`, store the sum in `record` and return the updated record.
///
/// On overflow the record keeps its previous value.
pub fn add(record: &mut ResultRecord, a: i64, b: i64) -> Result<ResultRecord> {
    let sum = a.checked_add(b).ok_or(Error::Overflow { a, b })?;
    record.result = sum;
    Ok(*record)
}

/// Register the add tool with the tool registry.
pub fn register(registry: &mut ToolRegistry<ResultRecord>) {
    let tool = MCPTool {
        name: "add".to_string(),
        description: "Add two numbers".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "title": "addArguments",
            "properties": {
                "a": { "title": "A", "type": "integer" },
                "b": { "title": "B", "type": "integer" }
            },
            "required": ["a", "b"]
        }),
    };

    let handler: ToolHandler<ResultRecord> =
        Box::new(|record: &mut ResultRecord, args: Value| -> Result<Value> {
            let AddArguments { a, b } = serde_json::from_value(args)
                .map_err(|e| Error::invalid_arguments(e.to_string()))?;
            let updated = add(record, a, b)?;
            tracing::debug!(a, b, result = updated.result, "add");
            Ok(serde_json::to_value(updated)?)
        });

    registry.register(tool, handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> ToolRegistry<ResultRecord> {
        let mut registry = ToolRegistry::new();
        register(&mut registry);
        registry
    }

    #[test]
    fn test_record_starts_at_ten() {
        assert_eq!(ResultRecord::default().result, 10);
    }

    #[test]
    fn test_add_updates_record() {
        let mut record = ResultRecord::default();
        let returned = add(&mut record, 2, 3).unwrap();
        assert_eq!(returned.result, 5);
        assert_eq!(record.result, 5);
    }

    #[test]
    fn test_sequential_calls_overwrite_record() {
        let mut record = ResultRecord::default();
        assert_eq!(add(&mut record, 2, 3).unwrap().result, 5);
        assert_eq!(add(&mut record, 10, -1).unwrap().result, 9);
        assert_eq!(record.result, 9);
    }

    #[test]
    fn test_add_matches_integer_sum() {
        let mut record = ResultRecord::default();
        for (a, b) in [(0, 0), (-7, 7), (i64::MIN, 0), (i64::MAX, -1), (123_456, -654_321)] {
            let returned = add(&mut record, a, b).unwrap();
            assert_eq!(returned.result, a + b);
            assert_eq!(record.result, a + b);
        }
    }

    #[test]
    fn test_overflow_leaves_record_untouched() {
        let mut record = ResultRecord::default();
        add(&mut record, 1, 1).unwrap();
        let err = add(&mut record, i64::MAX, 1).unwrap_err();
        assert!(matches!(err, Error::Overflow { a: i64::MAX, b: 1 }));
        assert_eq!(record.result, 2);
    }

    #[test]
    fn test_record_serializes_to_single_key() {
        let value = serde_json::to_value(ResultRecord { result: 5 }).unwrap();
        assert_eq!(value, json!({"result": 5}));
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_register_describes_tool() {
        let registry = registry();
        assert_eq!(registry.tools.len(), 1);
        let tool = &registry.tools[0];
        assert_eq!(tool.name, "add");
        assert_eq!(tool.description, "Add two numbers");
        assert_eq!(tool.input_schema["required"], json!(["a", "b"]));
        assert_eq!(tool.input_schema["properties"]["a"]["type"], "integer");
    }

    #[test]
    fn test_handler_returns_record() {
        let registry = registry();
        let mut record = ResultRecord::default();
        let result = registry
            .call(&mut record, "add", json!({"a": 2, "b": 3}))
            .unwrap();
        assert_eq!(result, json!({"result": 5}));
        assert_eq!(record.result, 5);
    }

    #[test]
    fn test_handler_ignores_extra_fields() {
        let registry = registry();
        let mut record = ResultRecord::default();
        let result = registry
            .call(&mut record, "add", json!({"a": 1, "b": 1, "c": 100}))
            .unwrap();
        assert_eq!(result, json!({"result": 2}));
    }

    #[test]
    fn test_handler_rejects_non_integers() {
        let registry = registry();
        let mut record = ResultRecord::default();
        for args in [
            json!({"a": "2", "b": 3}),
            json!({"a": 2.0, "b": 3}),
            json!({"a": 2.5, "b": 3}),
            json!({"a": true, "b": 3}),
            json!({"a": null, "b": 3}),
            json!({"a": 2}),
            json!({}),
            json!("2 + 3"),
        ] {
            let err = registry.call(&mut record, "add", args.clone()).unwrap_err();
            assert!(
                matches!(err, Error::InvalidArguments(_)),
                "expected rejection for {args}"
            );
            assert_eq!(record.result, INITIAL_RESULT);
        }
    }

    #[test]
    fn test_handler_rejects_values_outside_i64() {
        let registry = registry();
        let mut record = ResultRecord::default();
        let err = registry
            .call(&mut record, "add", json!({"a": u64::MAX, "b": 0}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }
}
