use url::Url;

use crate::BuildId;

/// Which kind of site page a URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// An app page carrying the build listing.
    App { app_id: String },
    /// A patchnotes page for one build.
    Patchnotes { build_id: BuildId },
    Other,
}

impl PageKind {
    pub fn is_app(&self) -> bool {
        matches!(self, PageKind::App { .. })
    }
}

pub fn classify_url(raw: &str) -> PageKind {
    let Ok(url) = Url::parse(raw.trim()) else {
        return PageKind::Other;
    };
    let mut segments = match url.path_segments() {
        Some(segments) => segments.filter(|s| !s.is_empty()),
        None => return PageKind::Other,
    };
    match (segments.next(), segments.next()) {
        (Some("app"), Some(id)) => PageKind::App {
            app_id: id.to_string(),
        },
        (Some("patchnotes"), Some(build)) => PageKind::Patchnotes {
            build_id: BuildId::new(build),
        },
        _ => PageKind::Other,
    }
}

/// `{base}/app/{app_id}/patchnotes/`, the page listing every build.
pub fn app_url(base: &Url, app_id: &str) -> Option<Url> {
    base.join(&format!("app/{app_id}/patchnotes/")).ok()
}

pub fn patchnotes_url(base: &Url, build_id: &BuildId) -> Option<Url> {
    base.join(&format!("patchnotes/{build_id}/")).ok()
}
