//! View rendering
//!
//! View scripts are plain text resolved through a [`LoaderChain`]:
//!
//! - `{{ name }}` inserts a variable, HTML-escaped
//! - `{{{ name }}}` inserts a variable as is
//! - `{{> script }}` renders another script with the same variables
//!
//! Unknown variables render empty. [`View::render`] wraps the output into the
//! layout, which receives it as the `content` variable.

use std::collections::HashMap;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::loader::{Import, LoaderChain};

const MAX_INCLUDE_DEPTH: usize = 16;

/// Variable the layout receives the rendered script under
pub const CONTENT_VAR: &str = "content";

type Vars = HashMap<String, String>;

/// View scripts, layout and template-wide variables
#[derive(Debug)]
pub struct Template {
    loaders: LoaderChain,
    layout: String,
    vars: Vars,
}

impl Template {
    /// Fails when no layout is named or the layout does not resolve
    pub fn new(loaders: LoaderChain, layout: &str) -> Result<Self> {
        if layout.is_empty() {
            return Err(Error::NoLayout);
        }
        if loaders.resolve(layout).is_none() {
            return Err(Error::ScriptNotFound(layout.to_string()));
        }
        Ok(Self {
            loaders,
            layout: layout.to_string(),
            vars: Vars::new(),
        })
    }

    /// Template over a single flat view directory
    pub fn from_directory(dir: impl AsRef<Path>, layout: &str) -> Result<Self> {
        let mut loaders = LoaderChain::new();
        loaders.register(Import::directory(dir)?);
        Self::new(loaders, layout)
    }

    /// Template over the configured view directories, searched in order
    pub fn from_config(app: &AppConfig) -> Result<Self> {
        let mut loaders = LoaderChain::new();
        for dir in &app.view_dirs {
            loaders.register(Import::directory(dir)?.with_extension(&app.view_extension));
        }
        Self::new(loaders, &app.layout)
    }

    /// Make a variable visible to every view
    pub fn assign(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Start a view with its own variables layered over the template's
    pub fn view(&self) -> View<'_> {
        View {
            template: self,
            vars: Vars::new(),
        }
    }

    fn lookup<'a>(&'a self, vars: &'a Vars, key: &str) -> Option<&'a str> {
        vars.get(key)
            .or_else(|| self.vars.get(key))
            .map(String::as_str)
    }

    fn render_script(&self, script: &str, vars: &Vars, depth: usize) -> Result<String> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(Error::IncludeDepth(script.to_string()));
        }
        let source = self.loaders.load(script)?;
        let mut out = String::with_capacity(source.len());
        let mut rest = source.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let tag = &rest[start..];

            let (open, close) = if tag.starts_with("{{{") {
                ("{{{", "}}}")
            } else {
                ("{{", "}}")
            };
            let Some(end) = tag[open.len()..].find(close) else {
                // Unterminated tag, keep the remainder verbatim
                rest = tag;
                break;
            };
            let inner = tag[open.len()..open.len() + end].trim();

            if open == "{{{" {
                out.push_str(self.lookup(vars, inner).unwrap_or_default());
            } else if let Some(include) = inner.strip_prefix('>') {
                out.push_str(&self.render_script(include.trim(), vars, depth + 1)?);
            } else {
                escape_html(self.lookup(vars, inner).unwrap_or_default(), &mut out);
            }
            rest = &tag[open.len() + end + close.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// One rendering with per-view variables
#[derive(Debug)]
pub struct View<'t> {
    template: &'t Template,
    vars: Vars,
}

impl View<'_> {
    pub fn assign(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Render `script` inside the layout
    pub fn render(&self, script: &str) -> Result<String> {
        let content = self.template.render_script(script, &self.vars, 0)?;
        let mut vars = self.vars.clone();
        vars.insert(CONTENT_VAR.to_string(), content);
        self.template
            .render_script(&self.template.layout, &vars, 0)
    }

    /// Render `script` without the layout
    pub fn render_partial(&self, script: &str) -> Result<String> {
        self.template.render_script(script, &self.vars, 0)
    }
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn views(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(format!("{name}.html")), body).unwrap();
        }
        dir
    }

    #[test]
    fn test_render_with_layout() {
        let dir = views(&[
            ("layout", "<title>{{ title }}</title><main>{{{ content }}}</main>"),
            ("index", "<p>Hello {{ name }}</p>"),
        ]);
        let mut template = Template::from_directory(dir.path(), "layout").unwrap();
        template.assign("title", "Home");

        let mut view = template.view();
        view.assign("name", "<Ada>");
        assert_eq!(
            view.render("index").unwrap(),
            "<title>Home</title><main><p>Hello &lt;Ada&gt;</p></main>"
        );
        assert_eq!(view.render_partial("index").unwrap(), "<p>Hello &lt;Ada&gt;</p>");
    }

    #[test]
    fn test_view_vars_shadow_template_vars() {
        let dir = views(&[("layout", "{{{ content }}}"), ("t", "{{ who }}|{{ missing }}|")]);
        let mut template = Template::from_directory(dir.path(), "layout").unwrap();
        template.assign("who", "template");
        assert_eq!(template.view().render("t").unwrap(), "template||");

        let mut view = template.view();
        view.assign("who", "view");
        assert_eq!(view.render("t").unwrap(), "view||");
    }

    #[test]
    fn test_includes() {
        let dir = views(&[
            ("layout", "{{{ content }}}"),
            ("page", "[{{> header }}]{{ x }}"),
            ("header", "H{{ x }}"),
            ("self", "{{> self }}"),
        ]);
        let template = Template::from_directory(dir.path(), "layout").unwrap();
        let mut view = template.view();
        view.assign("x", "1");
        assert_eq!(view.render("page").unwrap(), "[H1]1");
        assert!(matches!(view.render("self"), Err(Error::IncludeDepth(_))));
    }

    #[test]
    fn test_unterminated_tag_is_literal() {
        let dir = views(&[("layout", "{{{ content }}}"), ("broken", "a {{ b")]);
        let template = Template::from_directory(dir.path(), "layout").unwrap();
        assert_eq!(template.view().render_partial("broken").unwrap(), "a {{ b");
    }

    #[test]
    fn test_construction_errors() {
        let dir = views(&[("layout", "")]);
        assert!(matches!(
            Template::from_directory(dir.path(), ""),
            Err(Error::NoLayout)
        ));
        assert!(matches!(
            Template::from_directory(dir.path(), "frame"),
            Err(Error::ScriptNotFound(ref s)) if s == "frame"
        ));
        assert!(matches!(
            Template::from_directory(dir.path().join("nope"), "layout"),
            Err(Error::DirectoryNotFound(_))
        ));

        let template = Template::from_directory(dir.path(), "layout").unwrap();
        assert_eq!(template.layout(), "layout");
        assert!(matches!(
            template.view().render("absent"),
            Err(Error::ScriptNotFound(_))
        ));
    }

    #[test]
    fn test_from_config_searches_dirs_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("layout.tpl"), "<{{{ content }}}>").unwrap();
        fs::write(second.path().join("layout.tpl"), "unused").unwrap();
        fs::write(second.path().join("page.tpl"), "page").unwrap();

        let app = AppConfig {
            view_dirs: vec![
                first.path().display().to_string(),
                second.path().display().to_string(),
            ],
            view_extension: "tpl".to_string(),
            ..AppConfig::default()
        };
        let template = Template::from_config(&app).unwrap();
        assert_eq!(template.view().render("page").unwrap(), "<page>");
    }
}
