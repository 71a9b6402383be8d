//! Property-based test generators using proptest.
//!
//! Every generated op call is valid against any root value the built-in
//! ops can produce, so replaying it never fails.

use proptest::prelude::*;
use serde_json::{json, Value};

/// A single op invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct OpCall {
    /// Op name.
    pub name: String,
    /// Op arguments.
    pub args: Vec<Value>,
}

impl OpCall {
    fn new(name: &str, args: Vec<Value>) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }
}

/// One step of a multi-replica script.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replica `replica` applies `call` locally.
    Op {
        /// Index of the replica.
        replica: usize,
        /// The op to apply.
        call: OpCall,
    },
    /// Replica `replica` runs a full sync cycle.
    Sync {
        /// Index of the replica.
        replica: usize,
    },
}

/// Strategy for generating color names, including ones `toggleColor`
/// does not know.
pub fn color_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("red".to_string()),
        Just("green".to_string()),
        Just("blue".to_string()),
        prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
    ]
}

/// Strategy for generating short words, including ones with spaces.
pub fn word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}( [a-z]{1,6})?").expect("Invalid regex")
}

/// Strategy for generating valid calls to the built-in ops.
pub fn op_call_strategy() -> impl Strategy<Value = OpCall> {
    prop_oneof![
        color_strategy().prop_map(|c| OpCall::new("setColor", vec![json!(c)])),
        Just(OpCall::new("toggleColor", vec![])),
        word_strategy().prop_map(|w| OpCall::new("append", vec![json!(w)])),
        Just(OpCall::new("dog", vec![])),
        (0i64..100).prop_map(|n| OpCall::new("stockWidgets", vec![json!(n)])),
        (0i64..100).prop_map(|n| OpCall::new("stockWidgets", vec![json!(n.to_string())])),
        Just(OpCall::new("sellWidget", vec![])),
        word_strategy().prop_map(|w| OpCall::new("insert", vec![json!(w)])),
    ]
}

/// Strategy for generating a sequence of op calls.
pub fn op_calls_strategy(max_len: usize) -> impl Strategy<Value = Vec<OpCall>> {
    prop::collection::vec(op_call_strategy(), 0..=max_len)
}

/// Strategy for generating a script of ops and syncs across `replicas`
/// replicas.
pub fn script_strategy(replicas: usize, max_len: usize) -> impl Strategy<Value = Vec<Step>> {
    let step = prop_oneof![
        3 => (0..replicas, op_call_strategy())
            .prop_map(|(replica, call)| Step::Op { replica, call }),
        1 => (0..replicas).prop_map(|replica| Step::Sync { replica }),
    ];
    prop::collection::vec(step, 0..=max_len)
}
