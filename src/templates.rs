use std::sync::Arc;

use axum::response::Html;
use handlebars::{handlebars_helper, html_escape, Handlebars};
use serde::Serialize;
use tracing::trace;

use crate::Result;

/// Layout partial every page renders into.
const BASE: &str = include_str!("../templates/base.hbs");

const PARTIALS: &[(&str, &str)] = &[
    ("post_card", include_str!("../templates/partials/post_card.hbs")),
    ("pagination", include_str!("../templates/partials/pagination.hbs")),
    ("field_errors", include_str!("../templates/partials/field_errors.hbs")),
];

const PAGES: &[(&str, &str)] = &[
    ("blog/index", include_str!("../templates/blog/index.hbs")),
    ("blog/category", include_str!("../templates/blog/category.hbs")),
    ("blog/profile", include_str!("../templates/blog/profile.hbs")),
    ("blog/detail", include_str!("../templates/blog/detail.hbs")),
    ("blog/create", include_str!("../templates/blog/create.hbs")),
    ("blog/delete", include_str!("../templates/blog/delete.hbs")),
    ("blog/comment", include_str!("../templates/blog/comment.hbs")),
    ("blog/comment_delete", include_str!("../templates/blog/comment_delete.hbs")),
    ("blog/user", include_str!("../templates/blog/user.hbs")),
    ("auth/registration", include_str!("../templates/auth/registration.hbs")),
    ("auth/login", include_str!("../templates/auth/login.hbs")),
    ("auth/logged_out", include_str!("../templates/auth/logged_out.hbs")),
    ("pages/about", include_str!("../templates/pages/about.hbs")),
    ("pages/rules", include_str!("../templates/pages/rules.hbs")),
    ("admin/index", include_str!("../templates/admin/index.hbs")),
    ("admin/category", include_str!("../templates/admin/category.hbs")),
    ("admin/location", include_str!("../templates/admin/location.hbs")),
    ("errors/400", include_str!("../templates/errors/400.hbs")),
    ("errors/403", include_str!("../templates/errors/403.hbs")),
    ("errors/404", include_str!("../templates/errors/404.hbs")),
    ("errors/500", include_str!("../templates/errors/500.hbs")),
];

// Escape first, then turn blank lines into paragraphs and single newlines
// into line breaks. Use with triple braces.
handlebars_helper!(linebreaks: |text: str| {
    let escaped = html_escape(text).replace("\r\n", "\n");
    escaped
        .split("\n\n")
        .filter(|para| !para.trim().is_empty())
        .map(|para| format!("<p>{}</p>", para.trim().replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
});

/// The handlebars registry with every page compiled in.
#[derive(Clone)]
pub struct Templates {
    registry: Arc<Handlebars<'static>>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_helper("linebreaks", Box::new(linebreaks));

        registry.register_partial("base", BASE)?;
        for (name, source) in PARTIALS {
            registry.register_partial(name, *source)?;
        }
        for (name, source) in PAGES {
            registry.register_template_string(name, *source)?;
        }

        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<Html<String>> {
        trace!("Rendering template at {}", name);
        Ok(Html(self.registry.render(name, data)?))
    }
}
