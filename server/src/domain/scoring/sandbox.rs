//! Sandboxed JavaScript metric execution
//!
//! User metric code runs as an async function body receiving
//! `(output, example)` inside an embedded JavaScript engine. Host-reaching
//! identifiers are shadowed to `undefined` through wrapper parameters, and
//! a wall-clock timeout plus an interpreter loop-iteration ceiling bound
//! runaway scripts.
//!
//! The sandbox is an advisory containment, not a security boundary; it is
//! never exposed to untrusted principals.

use std::time::Duration;

use boa_engine::object::builtins::JsPromise;
use boa_engine::{Context, JsValue as BoaValue, Source, builtins::promise::PromiseState};
use serde_json::Value as JsonValue;

use super::ScoreError;
use crate::core::constants::{SANDBOX_LOOP_LIMIT, SANDBOX_TIMEOUT_SECS};

/// Identifiers shadowed to `undefined` in the script's lexical scope
const SHADOWED: &[&str] = &[
    "global",
    "require",
    "process",
    "eval",
    "Function",
    "setTimeout",
    "setInterval",
    "fetch",
    "XMLHttpRequest",
    "File",
    "WebSocket",
    "Buffer",
];

/// Evaluate a metric script against (output, example) with the default
/// 5-second budget
pub async fn evaluate(
    code: &str,
    output: &JsonValue,
    example: &JsonValue,
) -> Result<f64, ScoreError> {
    evaluate_with(
        code,
        output,
        example,
        Duration::from_secs(SANDBOX_TIMEOUT_SECS),
    )
    .await
}

/// Evaluate with an explicit wall-clock budget
pub async fn evaluate_with(
    code: &str,
    output: &JsonValue,
    example: &JsonValue,
    timeout: Duration,
) -> Result<f64, ScoreError> {
    let code = code.to_string();
    let output = output.clone();
    let example = example.clone();

    // The engine context is !Send; build and drive it on a blocking thread
    // and race the whole evaluation against the wall clock. The loop
    // iteration limit stops the thread itself eventually.
    let task = tokio::task::spawn_blocking(move || run_script(&code, &output, &example));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(ScoreError::Script(join_err.to_string())),
        Err(_) => Err(ScoreError::Timeout),
    }
}

fn run_script(code: &str, output: &JsonValue, example: &JsonValue) -> Result<f64, ScoreError> {
    let mut context = Context::default();
    context
        .runtime_limits_mut()
        .set_loop_iteration_limit(SANDBOX_LOOP_LIMIT);

    // The user code becomes an async function body; shadowed identifiers
    // are extra parameters that are simply never passed
    let wrapper = format!(
        "(function(output, example, {}) {{ return (async function() {{\n{}\n}})(); }})",
        SHADOWED.join(", "),
        code
    );

    let function = context
        .eval(Source::from_bytes(wrapper.as_bytes()))
        .map_err(|e| classify(e.to_string()))?;
    let function = function
        .as_callable()
        .ok_or_else(|| ScoreError::Script("metric code is not a function body".into()))?;

    let output_js = BoaValue::from_json(output, &mut context)
        .map_err(|e| ScoreError::Script(e.to_string()))?;
    let example_js = BoaValue::from_json(example, &mut context)
        .map_err(|e| ScoreError::Script(e.to_string()))?;

    let result = function
        .call(&BoaValue::undefined(), &[output_js, example_js], &mut context)
        .map_err(|e| classify(e.to_string()))?;

    // Drain the microtask queue so the async wrapper settles
    let _ = context.run_jobs();

    let settled = match result.as_object().cloned() {
        Some(obj) => match JsPromise::from_object(obj) {
            Ok(promise) => match promise.state() {
                PromiseState::Fulfilled(value) => value,
                PromiseState::Rejected(err) => {
                    let message = err.to_string(&mut context).map_or_else(
                        |_| "script rejected".to_string(),
                        |s| s.to_std_string_escaped(),
                    );
                    return Err(classify(message));
                }
                // Awaiting something that can never resolve in here
                PromiseState::Pending => return Err(ScoreError::Timeout),
            },
            Err(_) => result,
        },
        None => result,
    };

    let number = settled
        .to_number(&mut context)
        .map_err(|e| ScoreError::Script(e.to_string()))?;

    if !number.is_finite() {
        return Err(ScoreError::NonFinite);
    }
    Ok(number)
}

/// Loop-limit aborts read as timeouts to the caller
fn classify(message: String) -> ScoreError {
    if message.contains("loop iteration limit") {
        ScoreError::Timeout
    } else {
        ScoreError::Script(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_simple_expression() {
        let score = evaluate("return 1 + 1;", &json!(null), &json!(null))
            .await
            .unwrap();
        assert_eq!(score, 2.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_receives_output_and_example() {
        let score = evaluate(
            "return output.length + example.bonus;",
            &json!("meow"),
            &json!({"bonus": 10}),
        )
        .await
        .unwrap();
        assert_eq!(score, 14.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_numeric_coercion_of_strings() {
        let score = evaluate("return '7.5';", &json!(null), &json!(null))
            .await
            .unwrap();
        assert_eq!(score, 7.5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_finite_fails() {
        let err = evaluate("return 'not a number';", &json!(null), &json!(null))
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::NonFinite));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shadowed_identifiers_are_undefined() {
        for identifier in ["eval", "Function", "fetch", "process", "setTimeout"] {
            let score = evaluate(
                &format!("return typeof {identifier} === 'undefined' ? 1 : 0;"),
                &json!(null),
                &json!(null),
            )
            .await
            .unwrap();
            assert_eq!(score, 1.0, "{identifier} should be shadowed");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_thrown_error_is_reported() {
        let err = evaluate("throw new Error('boom');", &json!(null), &json!(null))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_infinite_loop_times_out() {
        let err = evaluate_with(
            "while(true){}",
            &json!(null),
            &json!(null),
            Duration::from_millis(250),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Script execution timed out");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_await_of_resolved_promise() {
        let score = evaluate(
            "const v = await Promise.resolve(3); return v * 2;",
            &json!(null),
            &json!(null),
        )
        .await
        .unwrap();
        assert_eq!(score, 6.0);
    }
}
