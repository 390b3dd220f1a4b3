//! Expression evaluation for parsed template strings.
//!
//! The evaluator walks a node sequence in order and concatenates literal
//! text with evaluated expressions. Variable values that themselves contain
//! tags are re-parsed and resolved recursively with the same context and
//! the same cycle-guard stack, so self-reference is caught at any depth.
//! Effectful functions may suspend awaiting an external response; later
//! nodes of the same string are not evaluated until the suspension
//! completes, keeping effect order observable.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::capabilities::split_args;
use crate::render::{CycleGuard, RenderContext, RenderError, RenderPurpose};
use crate::template::{contains_tags, parse_template, ExpressionTag, TemplateNode};

type EvalFuture<'a> = Pin<Box<dyn Future<Output = Result<String, RenderError>> + Send + 'a>>;

/// Resolves one template string against a render context.
///
/// Strings without tags are returned unchanged, which also makes resolution
/// idempotent for fully literal input. The same guard must be threaded
/// through all evaluations belonging to one top-level resolution call.
pub fn evaluate_template<'a>(
    text: &'a str,
    ctx: &'a RenderContext,
    guard: &'a mut CycleGuard,
) -> EvalFuture<'a> {
    Box::pin(async move {
        if !contains_tags(text) {
            return Ok(text.to_string());
        }

        let nodes = parse_template(text)?;
        let mut out = String::with_capacity(text.len());

        for node in &nodes {
            match node {
                TemplateNode::Literal(literal) => out.push_str(literal),
                TemplateNode::Expression(tag) => {
                    out.push_str(&evaluate_expression(tag, ctx, guard).await?);
                }
            }
        }

        Ok(out)
    })
}

/// Evaluates one expression tag, keeping the cycle guard balanced on every
/// exit path.
async fn evaluate_expression(
    tag: &ExpressionTag,
    ctx: &RenderContext,
    guard: &mut CycleGuard,
) -> Result<String, RenderError> {
    guard.push(&tag.name)?;

    let result = if tag.is_call {
        evaluate_call(tag, ctx).await
    } else {
        evaluate_lookup(tag, ctx, guard).await
    };

    guard.pop();
    result
}

/// Resolves a bare variable reference from the merged namespace.
async fn evaluate_lookup(
    tag: &ExpressionTag,
    ctx: &RenderContext,
    guard: &mut CycleGuard,
) -> Result<String, RenderError> {
    let value = match ctx.variable(&tag.name) {
        Some(value) => value.clone(),
        None => {
            if ctx.is_required(&tag.name) {
                return Err(RenderError::UndefinedVariable {
                    name: tag.name.clone(),
                });
            }
            return Ok(String::new());
        }
    };

    match value {
        Value::String(text) if contains_tags(&text) => {
            evaluate_template(&text, ctx, guard).await
        }
        other => Ok(value_to_string(&other)),
    }
}

/// Dispatches a function call through the capability table, applying the
/// purpose policy before the handler runs.
async fn evaluate_call(tag: &ExpressionTag, ctx: &RenderContext) -> Result<String, RenderError> {
    let spec = ctx
        .capabilities()
        .get(&tag.name)
        .ok_or_else(|| RenderError::UnknownFunction {
            name: tag.name.clone(),
        })?;

    if !spec.allows(ctx.purpose()) {
        if ctx.purpose() == RenderPurpose::Preview && spec.placeholder_on_preview() {
            return Ok(spec.placeholder());
        }
        return Err(RenderError::PurposeNotAllowed {
            function: tag.name.clone(),
            purpose: ctx.purpose(),
        });
    }

    let args = split_args(&tag.raw_args);
    let value = spec.invoke(&args, ctx.purpose()).await?;
    Ok(value_to_string(&value))
}

/// Renders a variable value into string form for substitution.
///
/// A template slot is a string context: scalars use their display form,
/// containers their compact JSON, and null the empty string.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}
