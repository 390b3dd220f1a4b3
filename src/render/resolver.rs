//! Deep resolution of nested request structures.
//!
//! Walks an arbitrary string/array/object structure and replaces every
//! string leaf with its resolved value, preserving shape, key order and
//! array order. Traversal is deterministic and sequential so that effectful
//! expressions (e.g. sequential prompts) fire in a reproducible order.
//!
//! Any leaf failure aborts the whole call: no partially resolved structure
//! is ever returned, and the error is annotated with the path of the
//! failing field.

use std::future::Future;
use std::pin::Pin;

use log::debug;
use serde_json::{Map, Value};

use crate::render::{evaluate_template, CycleGuard, RenderContext, RenderError, RenderPurpose};

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, RenderError>> + Send + 'a>>;

/// Resolves a nested structure against a render context.
///
/// With [`RenderPurpose::NoRender`] the input is returned unchanged and no
/// template is parsed, no capability invoked. One cycle-guard stack spans
/// the whole walk, matching the scope of a top-level resolution call.
pub async fn resolve_value(input: &Value, ctx: &RenderContext) -> Result<Value, RenderError> {
    if ctx.purpose() == RenderPurpose::NoRender {
        return Ok(input.clone());
    }

    debug!(
        "resolving structure ({} variables, purpose {})",
        ctx.variable_count(),
        ctx.purpose()
    );

    let mut guard = CycleGuard::new();
    resolve_node(input, ctx, &mut guard).await
}

fn resolve_node<'a>(
    node: &'a Value,
    ctx: &'a RenderContext,
    guard: &'a mut CycleGuard,
) -> ResolveFuture<'a> {
    Box::pin(async move {
        match node {
            Value::String(text) => {
                let resolved = evaluate_template(text, ctx, guard).await?;
                Ok(Value::String(resolved))
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let resolved = resolve_node(item, ctx, guard)
                        .await
                        .map_err(|e| e.in_field(format!("[{}]", index)))?;
                    out.push(resolved);
                }
                Ok(Value::Array(out))
            }
            Value::Object(fields) => {
                let mut out = Map::new();
                for (key, value) in fields {
                    let resolved = resolve_node(value, ctx, guard)
                        .await
                        .map_err(|e| e.in_field(key.clone()))?;
                    out.insert(key.clone(), resolved);
                }
                Ok(Value::Object(out))
            }
            // Numbers, booleans and nulls are already concrete.
            other => Ok(other.clone()),
        }
    })
}
