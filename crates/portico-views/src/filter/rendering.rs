//! The rendering filter: renders the action template after the action ran.

use portico_core::PorticoResult;
use portico_http::HttpResponse;

use super::{Filter, Next};
use crate::dispatcher::Dispatcher;

/// Renders the view once the rest of the chain has returned.
///
/// Nothing is rendered if the chain already produced a response or the
/// controller suppressed rendering. Otherwise the view's template (or the
/// action template `<Controller>/<action>.<ext>` when none was chosen) is
/// rendered, buffered output is discarded, and the rendered page becomes the
/// response. Either way the dispatcher is halted afterwards, so outer
/// chains of a forward do not render a second time.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderingFilter;

impl Filter for RenderingFilter {
    fn name(&self) -> &str {
        "rendering"
    }

    fn execute(&self, dispatcher: &mut Dispatcher<'_>, next: Next<'_>) -> PorticoResult<()> {
        next.run(dispatcher)?;
        if dispatcher.is_halted() {
            return Ok(());
        }

        if dispatcher.shall_render() {
            if dispatcher.view().template().is_none() {
                let template = dispatcher.action_template();
                dispatcher.view_mut().set_template(template);
            }
            let view = dispatcher.view();
            tracing::debug!(
                template = view.template().unwrap_or_default(),
                layout = view.layout().unwrap_or_default(),
                "rendering view"
            );
            let output = dispatcher.application().renderer().render(view)?;

            let mut response = HttpResponse::new(view.status(), output);
            response.set_content_type(view.content_type());
            dispatcher.send(response);
        }

        dispatcher.halt();
        Ok(())
    }
}
