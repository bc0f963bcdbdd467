//! View state and template rendering.
//!
//! Controllers fill a [`ViewState`] (template, layout, variables, status)
//! while they run; the rendering filter hands it to the application's
//! [`Renderer`] once the controller is done. [`TeraRenderer`] renders with
//! [Tera](https://keats.github.io/tera/) and decorates the action output
//! with a layout: the action template renders first and its output is
//! exposed to the layout as `content`.

use std::error::Error as _;
use std::path::PathBuf;

use http::StatusCode;
use serde_json::{Map, Value};

use portico_core::{PorticoError, PorticoResult};

/// Variable holding the decorated action output inside a layout.
pub const LAYOUT_CONTENT_VARIABLE: &str = "content";

/// What the rendering filter will render for the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    template: Option<String>,
    layout: Option<String>,
    variables: Map<String, Value>,
    status: StatusCode,
    content_type: String,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            template: None,
            layout: None,
            variables: Map::new(),
            status: StatusCode::OK,
            content_type: "text/html".to_string(),
        }
    }
}

impl ViewState {
    /// Creates an empty view decorated with `layout`, if any.
    pub fn new(layout: Option<String>) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Returns the template to render, if one was chosen.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Chooses the template to render.
    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = Some(template.into());
    }

    /// Returns the layout the output is decorated with.
    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    /// Sets or clears the decorating layout.
    pub fn set_layout(&mut self, layout: Option<String>) {
        self.layout = layout;
    }

    /// Adds one template variable, replacing any previous value.
    pub fn add_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Serializes `value` and adds it as a template variable.
    pub fn add_serialized<T: serde::Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> PorticoResult<()> {
        self.add_variable(name, serde_json::to_value(value)?);
        Ok(())
    }

    /// Adds every entry of `variables`. Later values win.
    pub fn add_variables(&mut self, variables: Map<String, Value>) {
        self.variables.extend(variables);
    }

    /// Returns one template variable.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Returns all template variables.
    pub const fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    /// Returns the status of the rendered response.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status of the rendered response.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the content type of the rendered response.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type of the rendered response.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }
}

/// Turns a [`ViewState`] into output.
pub trait Renderer: std::fmt::Debug + Send + Sync {
    /// Renders the view's template, decorated with its layout.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::TemplateDoesNotExist`] if no template was
    /// chosen or it cannot be found, and [`PorticoError::TemplateError`] if
    /// rendering fails.
    fn render(&self, view: &ViewState) -> PorticoResult<String>;

    /// Returns `true` if `name` resolves to a loaded template.
    fn has_template(&self, name: &str) -> bool;
}

/// A [`Renderer`] backed by Tera.
///
/// Template names are relative to the template directories
/// (`Homepage/index.html`). A name without extension also resolves to
/// `<name>.<extension>`, so template routes can name `Info/welcome`.
///
/// Tera escapes HTML in `.html` templates, so layouts print the action
/// output with `{{ content | safe }}`.
///
/// # Examples
///
/// ```
/// use portico_views::view::{Renderer, TeraRenderer, ViewState};
///
/// let mut renderer = TeraRenderer::new("html");
/// renderer.add_raw_template("Homepage/index.html", "Hello {{ name }}").unwrap();
///
/// let mut view = ViewState::default();
/// view.set_template("Homepage/index");
/// view.add_variable("name", "Massimo".into());
/// assert_eq!(renderer.render(&view).unwrap(), "Hello Massimo");
/// ```
#[derive(Debug)]
pub struct TeraRenderer {
    tera: tera::Tera,
    extension: String,
}

impl TeraRenderer {
    /// Creates a renderer without templates.
    pub fn new(extension: &str) -> Self {
        Self {
            tera: tera::Tera::default(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Loads every template found under `dirs`. Missing directories are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::TemplateError`] if a template fails to parse.
    pub fn from_dirs(dirs: &[PathBuf], extension: &str) -> PorticoResult<Self> {
        let mut renderer = Self::new(extension);
        for dir in dirs {
            if !dir.is_dir() {
                tracing::warn!(dir = %dir.display(), "template directory does not exist");
                continue;
            }
            let glob = format!("{}/**/*", dir.display());
            let loaded = tera::Tera::new(&glob).map_err(|e| template_error(&e))?;
            renderer
                .tera
                .extend(&loaded)
                .map_err(|e| template_error(&e))?;
        }
        tracing::debug!(
            templates = renderer.tera.get_template_names().count(),
            "loaded templates"
        );
        Ok(renderer)
    }

    /// Adds a template from a string.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::TemplateError`] if the template fails to parse.
    pub fn add_raw_template(&mut self, name: &str, content: &str) -> PorticoResult<()> {
        self.tera
            .add_raw_template(name, content)
            .map_err(|e| template_error(&e))
    }

    /// Returns the loaded name `name` resolves to.
    fn resolve(&self, name: &str) -> Option<String> {
        let with_extension = format!("{name}.{}", self.extension);
        self.tera
            .get_template_names()
            .find(|loaded| *loaded == name || *loaded == with_extension)
            .map(str::to_string)
    }

    fn render_template(&self, name: &str, context: &tera::Context) -> PorticoResult<String> {
        let resolved = self
            .resolve(name)
            .ok_or_else(|| PorticoError::TemplateDoesNotExist(name.to_string()))?;
        self.tera
            .render(&resolved, context)
            .map_err(|e| template_error(&e))
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, view: &ViewState) -> PorticoResult<String> {
        let template = view
            .template()
            .ok_or_else(|| PorticoError::TemplateDoesNotExist("no template selected".into()))?;

        let mut context = tera::Context::from_value(Value::Object(view.variables().clone()))
            .map_err(|e| template_error(&e))?;
        let content = self.render_template(template, &context)?;

        let Some(layout) = view.layout() else {
            return Ok(content);
        };
        context.insert(LAYOUT_CONTENT_VARIABLE, &content);
        self.render_template(layout, &context)
    }

    fn has_template(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

/// Flattens a Tera error and its causes into one message.
fn template_error(error: &tera::Error) -> PorticoError {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    PorticoError::TemplateError(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> TeraRenderer {
        let mut renderer = TeraRenderer::new("html");
        renderer
            .add_raw_template("Homepage/index.html", "<p>{{ title }}</p>")
            .unwrap();
        renderer
            .add_raw_template("layout.html", "<main>{{ content | safe }}</main>{{ title }}")
            .unwrap();
        renderer
            .add_raw_template("broken.html", "{{ missing.field }}")
            .unwrap();
        renderer
    }

    #[test]
    fn test_view_state_defaults() {
        let view = ViewState::new(Some("layout".into()));
        assert_eq!(view.template(), None);
        assert_eq!(view.layout(), Some("layout"));
        assert_eq!(view.status(), StatusCode::OK);
        assert_eq!(view.content_type(), "text/html");
        assert!(view.variables().is_empty());
    }

    #[test]
    fn test_add_variables_later_wins() {
        let mut view = ViewState::default();
        view.add_variable("title", "first".into());
        let mut more = Map::new();
        more.insert("title".into(), "second".into());
        more.insert("count".into(), 2.into());
        view.add_variables(more);
        assert_eq!(view.variable("title"), Some(&Value::from("second")));
        assert_eq!(view.variables().len(), 2);
    }

    #[test]
    fn test_add_serialized() {
        let mut view = ViewState::default();
        view.add_serialized("tags", &["a", "b"]).unwrap();
        assert_eq!(view.variable("tags"), Some(&serde_json::json!(["a", "b"])));
    }

    #[test]
    fn test_render_resolves_extension() {
        let renderer = renderer();
        let mut view = ViewState::default();
        view.set_template("Homepage/index");
        view.add_variable("title", "Home".into());
        assert_eq!(renderer.render(&view).unwrap(), "<p>Home</p>");
        assert!(renderer.has_template("Homepage/index"));
        assert!(renderer.has_template("Homepage/index.html"));
        assert!(!renderer.has_template("Homepage/other"));
    }

    #[test]
    fn test_render_with_layout() {
        let renderer = renderer();
        let mut view = ViewState::new(Some("layout".into()));
        view.set_template("Homepage/index.html");
        view.add_variable("title", "Home".into());
        assert_eq!(
            renderer.render(&view).unwrap(),
            "<main><p>Home</p></main>Home"
        );
    }

    #[test]
    fn test_render_missing_template() {
        let renderer = renderer();
        let mut view = ViewState::default();
        assert!(matches!(
            renderer.render(&view),
            Err(PorticoError::TemplateDoesNotExist(_))
        ));
        view.set_template("Nope/index");
        assert!(matches!(
            renderer.render(&view),
            Err(PorticoError::TemplateDoesNotExist(name)) if name == "Nope/index"
        ));
    }

    #[test]
    fn test_render_error_is_template_error() {
        let renderer = renderer();
        let mut view = ViewState::default();
        view.set_template("broken");
        assert!(matches!(
            renderer.render(&view),
            Err(PorticoError::TemplateError(_))
        ));
    }

    #[test]
    fn test_from_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("StaticContent")).unwrap();
        std::fs::write(dir.path().join("StaticContent/who.html"), "who: {{ name }}").unwrap();

        let renderer = TeraRenderer::from_dirs(
            &[dir.path().to_path_buf(), dir.path().join("missing")],
            "html",
        )
        .unwrap();
        let mut view = ViewState::default();
        view.set_template("StaticContent/who");
        view.add_variable("name", "massimo".into());
        assert_eq!(renderer.render(&view).unwrap(), "who: massimo");
    }
}
