use comrak::options::Options;

/// Comrak options for author-supplied documents.
///
/// Raw HTML is passed through untouched and no tag filter runs: authors are
/// trusted, and any sanitization belongs to the deployment in front of us.
pub fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.autolink = true;
    ext.table = true;
    ext.strikethrough = true;
    ext.tagfilter = false;

    options.parse.smart = true;

    let render = &mut options.render;
    render.r#unsafe = true;
    render.hardbreaks = true;
    render.sourcepos = false;
}
