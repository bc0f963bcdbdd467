//! The execution filter: runs the controller action.

use serde_json::Value;

use portico_core::{PorticoError, PorticoResult};

use super::{Filter, Next};
use crate::controller::ActionResult;
use crate::dispatcher::Dispatcher;

/// Runs the current controller action and applies its result.
///
/// This filter is always last. It runs whatever follows it first (nothing,
/// in a configured chain), then `pre_execute`, the action, and
/// `post_execute`. A result that ends the request (a response, a redirect,
/// or a forward that rendered) skips `post_execute`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecutionFilter;

impl Filter for ExecutionFilter {
    fn name(&self) -> &str {
        "execution"
    }

    fn execute(&self, dispatcher: &mut Dispatcher<'_>, next: Next<'_>) -> PorticoResult<()> {
        next.run(dispatcher)?;
        if dispatcher.is_halted() {
            return Ok(());
        }

        let controller = dispatcher.controller()?;
        let controller_name = dispatcher.controller_name().to_string();
        let action = dispatcher.action_name().to_string();

        controller.pre_execute(dispatcher)?;
        tracing::debug!(controller = %controller_name, action = %action, "executing action");
        let result = controller.handle(&action, dispatcher)?;
        if dispatcher.is_halted() {
            return Ok(());
        }

        apply(dispatcher, result, &controller_name, &action)?;
        if dispatcher.is_halted() {
            return Ok(());
        }
        controller.post_execute(dispatcher)
    }
}

fn apply(
    dispatcher: &mut Dispatcher<'_>,
    result: ActionResult,
    controller: &str,
    action: &str,
) -> PorticoResult<()> {
    match result {
        ActionResult::Response(response) => dispatcher.send(response),
        ActionResult::Text(body) => write_body(dispatcher, &body),
        ActionResult::Variables(variables) => dispatcher.view_mut().add_variables(variables),
        ActionResult::Value(Value::String(body)) => write_body(dispatcher, &body),
        ActionResult::Value(Value::Object(variables)) => {
            dispatcher.view_mut().add_variables(variables);
        }
        ActionResult::Value(other) => {
            return Err(PorticoError::InvalidControllerReturn {
                controller: controller.to_string(),
                action: action.to_string(),
                found: describe(&other).to_string(),
            });
        }
        ActionResult::Forward { controller, action } => {
            dispatcher.forward(&controller, &action)?;
        }
        ActionResult::Redirect { target, code } => dispatcher.redirect(&target, code)?,
        ActionResult::NotFound(message) => {
            dispatcher
                .view_mut()
                .add_variable("message", Value::String(message));
            dispatcher.forward_404()?;
        }
    }
    Ok(())
}

fn write_body(dispatcher: &mut Dispatcher<'_>, body: &str) {
    dispatcher.write(body);
    dispatcher.suppress_rendering();
}

const fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
