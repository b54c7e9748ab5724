use std::path::PathBuf;

pub(crate) const DEFAULT_THEME: &str = "base16-ocean.dark";

#[derive(Debug, Clone)]
pub(crate) struct HighlightOptions {
    /// Name of a syntect default theme.
    pub theme: String,
    pub line_numbers: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            line_numbers: true,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub source_dir: PathBuf,
    pub out_dir: PathBuf,
    pub template_dir: PathBuf,

    pub highlight: HighlightOptions,
}

impl Context {
    pub fn new(
        source_dir: PathBuf,
        out_dir: PathBuf,
        template_dir: PathBuf,
        highlight: HighlightOptions,
    ) -> Self {
        Self {
            source_dir,
            out_dir,
            template_dir,
            highlight,
        }
    }
}
