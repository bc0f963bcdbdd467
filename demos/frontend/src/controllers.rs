//! Controllers of the frontend application.

use serde_json::{json, Map, Value};

use portico_core::PorticoResult;
use portico_http::RouteParams;
use portico_views::application::ApplicationBuilder;
use portico_views::controller::{ActionResult, Controller, FnController};
use portico_views::dispatcher::Dispatcher;

/// The home page.
pub struct Homepage;

impl Controller for Homepage {
    fn pre_execute(&self, dispatcher: &mut Dispatcher<'_>) -> PorticoResult<()> {
        dispatcher.view_mut().add_variable("title", json!("Homepage"));
        Ok(())
    }

    fn handle(&self, action: &str, dispatcher: &mut Dispatcher<'_>) -> PorticoResult<ActionResult> {
        match action {
            "index" => {
                let params: RouteParams = [("name", "massimo")].into_iter().collect();
                let who_url = dispatcher.url_for("who", &params, false)?;

                let mut variables = Map::new();
                variables.insert("name".into(), json!("Massimo"));
                variables.insert("lastname".into(), json!("Naccari"));
                variables.insert("who_url".into(), Value::String(who_url));
                Ok(ActionResult::Variables(variables))
            }
            other => Ok(ActionResult::not_found(format!("Homepage has no action {other}"))),
        }
    }
}

/// Static pages: `who`, `whereis` and `contact`.
pub fn static_content() -> FnController {
    FnController::new("StaticContent")
        .action("who", |d| {
            let mut variables = Map::new();
            variables.insert("name".into(), json!(d.param_str("name")));
            variables.insert("surname".into(), json!(d.request().get().get("surname")));
            variables.insert("extra".into(), json!(d.param_str("extra")));
            Ok(ActionResult::Variables(variables))
        })
        .action("whereis", |_| Ok(ActionResult::render()))
        .action("contact", |_| Ok(ActionResult::render()))
}

/// Sign in and sign out.
pub fn security() -> FnController {
    FnController::new("Security")
        .action("signin", |d| {
            if !d.is_post() {
                return Ok(ActionResult::render());
            }
            match d.request().post().get("username").filter(|name| !name.is_empty()) {
                Some(name) => {
                    tracing::info!(user = name, "signed in");
                    Ok(ActionResult::redirect("home"))
                }
                None => {
                    let mut variables = Map::new();
                    variables.insert("error".into(), json!("Please enter a username"));
                    Ok(ActionResult::Variables(variables))
                }
            }
        })
        .action("signout", |_| Ok(ActionResult::redirect("home")))
}

/// Registers every frontend controller on `builder`.
pub fn install(builder: ApplicationBuilder) -> ApplicationBuilder {
    builder
        .controller_factory("Homepage", || Box::new(Homepage))
        .controller(static_content())
        .controller(security())
}
