use axum::response::Html;
use serde_json::Value;
use tera::Tera;

use crate::context::Context;
use crate::errors::RequestError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("post.html", include_str!("../templates/post.html")),
    ("about.html", include_str!("../templates/about.html")),
    ("addpage.html", include_str!("../templates/addpage.html")),
    ("contact.html", include_str!("../templates/contact.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
];

/// Page templates compiled into the binary.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: Context) -> Result<Html<String>, RequestError> {
        let context = tera::Context::from_value(Value::Object(context))?;
        Ok(Html(self.tera.render(name, &context)?))
    }
}
