use askama::Template;

/// Upload form, flash messages and (after a successful upload) the preview
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub messages: &'a [String],
    /// Already rendered by [`PreviewTemplate`], inserted unescaped
    pub preview_html: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "preview.html")]
pub struct PreviewTemplate<'a> {
    pub classes: &'a str,
    pub headers: &'a [String],
    pub rows: &'a [Vec<String>],
}
