//! HTML document shell.

/// Parts of the final HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlTemplate {
    pub html_attrs: String,
    pub head_attrs: String,
    /// Head tags, resource hints, stylesheets and inline styles.
    pub head: String,
    pub body_attrs: String,
    /// Markup placed before the application in the body.
    pub body_prepend: String,
    /// Application markup, state script and entry scripts.
    pub app: String,
}

impl HtmlTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html_attrs(mut self, attrs: impl Into<String>) -> Self {
        self.html_attrs = attrs.into();
        self
    }

    pub fn with_head_attrs(mut self, attrs: impl Into<String>) -> Self {
        self.head_attrs = attrs.into();
        self
    }

    pub fn with_body_attrs(mut self, attrs: impl Into<String>) -> Self {
        self.body_attrs = attrs.into();
        self
    }

    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = head.into();
        self
    }

    pub fn with_body_prepend(mut self, html: impl Into<String>) -> Self {
        self.body_prepend = html.into();
        self
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    /// Render the full document.
    pub fn render(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html {}>\n  <head {}>\n    {}\n  </head>\n  <body {}>\n    {}{}\n  </body>\n</html>\n",
            self.html_attrs, self.head_attrs, self.head, self.body_attrs, self.body_prepend, self.app
        )
    }
}
