//! Read-only queries over site pages.
//!
//! App pages carry the build table (`#js-builds`, build id in the last cell of
//! each row) and one patchnotes link per build. Patchnotes pages carry one
//! anchor per depot (`/depot/<id>/...`); the element after the anchor's parent
//! holds that depot's versions list once the site has rendered it.

use std::collections::HashMap;

use grabber_core::{AppInfo, BuildId, Classification, DepotId, DiffEntry};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Everything the changes form needs from an app page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppListing {
    pub app: AppInfo,
    /// Most recent first, as listed.
    pub builds: Vec<BuildId>,
    patchnotes_links: HashMap<BuildId, String>,
}

impl AppListing {
    pub fn patchnotes_link(&self, build: &BuildId) -> Option<&str> {
        self.patchnotes_links.get(build).map(String::as_str)
    }

    pub fn contains(&self, build: &BuildId) -> bool {
        self.builds.contains(build)
    }
}

pub fn extract_app_listing(html: &str, page_url: &Url) -> AppListing {
    let doc = Html::parse_document(html);
    let builds = extract_builds(&doc);

    let mut patchnotes_links = HashMap::new();
    if let Ok(anchor_sel) = Selector::parse("a[href]") {
        for anchor in doc.select(&anchor_sel) {
            let Some(resolved) = anchor
                .value()
                .attr("href")
                .and_then(|href| page_url.join(href.trim()).ok())
            else {
                continue;
            };
            let Some(build) = patchnotes_build(&resolved) else {
                continue;
            };
            if builds.contains(&build) {
                patchnotes_links
                    .entry(build)
                    .or_insert_with(|| resolved.to_string());
            }
        }
    }

    AppListing {
        app: extract_app_info(&doc, page_url),
        builds,
        patchnotes_links,
    }
}

fn extract_builds(doc: &Html) -> Vec<BuildId> {
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("#js-builds tr"), Selector::parse("td"))
    else {
        return Vec::new();
    };
    doc.select(&row_sel)
        .filter_map(|row| row.select(&cell_sel).last())
        .map(|cell| BuildId::new(text_of(cell)))
        .filter(|build| !build.is_empty())
        .collect()
}

fn extract_app_info(doc: &Html, page_url: &Url) -> AppInfo {
    let title = Selector::parse("h1 a[data-appid]")
        .ok()
        .and_then(|sel| doc.select(&sel).next());

    match title {
        Some(anchor) => AppInfo {
            name: text_of(anchor),
            app_id: anchor.value().attr("data-appid").unwrap_or_default().to_string(),
        },
        None => {
            let name = Selector::parse("h1")
                .ok()
                .and_then(|sel| doc.select(&sel).next())
                .map(text_of)
                .unwrap_or_default();
            let app_id = match grabber_core::classify_url(page_url.as_str()) {
                grabber_core::PageKind::App { app_id } => app_id,
                _ => String::new(),
            };
            AppInfo { name, app_id }
        }
    }
}

/// The depot's anchor on a patchnotes page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepotAnchor {
    pub href: String,
    /// Manifest id encoded after `M:` in the anchor target.
    pub manifest_id: Option<String>,
}

/// State of one depot's diff section in a patchnotes page snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSection {
    DepotMissing,
    /// Anchor found but the versions list has not rendered yet.
    Pending { anchor: DepotAnchor },
    Ready {
        anchor: DepotAnchor,
        entries: Vec<DiffEntry>,
    },
}

pub fn inspect_patchnotes(html: &str, depot_id: &DepotId) -> DiffSection {
    let doc = Html::parse_document(html);
    let Some(anchor) = find_depot_anchor(&doc, depot_id) else {
        return DiffSection::DepotMissing;
    };
    let href = anchor.value().attr("href").unwrap_or_default().to_string();
    let depot_anchor = DepotAnchor {
        manifest_id: manifest_from_href(&href),
        href,
    };

    match versions_list(anchor) {
        Some(list) => DiffSection::Ready {
            anchor: depot_anchor,
            entries: classify_rows(list),
        },
        None => DiffSection::Pending {
            anchor: depot_anchor,
        },
    }
}

fn find_depot_anchor<'a>(doc: &'a Html, depot_id: &DepotId) -> Option<ElementRef<'a>> {
    if depot_id.is_empty() {
        return None;
    }
    let needle = format!("/depot/{depot_id}/");
    let sel = Selector::parse("a[href]").ok()?;
    doc.select(&sel).find(|anchor| {
        anchor
            .value()
            .attr("href")
            .is_some_and(|href| href.contains(&needle))
    })
}

fn versions_list(anchor: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let parent = anchor.parent().and_then(ElementRef::wrap)?;
    let list = parent.next_siblings().find_map(ElementRef::wrap)?;
    let marker = Selector::parse("li.versions").ok()?;
    list.select(&marker).next().map(|_| list)
}

fn classify_rows(list: ElementRef<'_>) -> Vec<DiffEntry> {
    let rows = [
        (Classification::Added, "diff-added", "ins"),
        (Classification::Removed, "diff-removed", "del"),
        (Classification::Modified, "diff-modified", "i"),
    ];
    let mut entries = Vec::new();
    for item in list.children().filter_map(ElementRef::wrap) {
        let Some((classification, _, path_tag)) = rows
            .iter()
            .find(|(_, class, _)| item.value().classes().any(|c| c == *class))
        else {
            continue;
        };
        let Ok(path_sel) = Selector::parse(path_tag) else {
            continue;
        };
        if let Some(path) = item.select(&path_sel).next().map(text_of) {
            if !path.is_empty() {
                entries.push(DiffEntry::new(*classification, path));
            }
        }
    }
    entries
}

/// Build id of a `/patchnotes/<build>/` link; any other path is rejected.
fn patchnotes_build(url: &Url) -> Option<BuildId> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();
    match segments.as_slice() {
        ["patchnotes", build] => Some(BuildId::new(*build)),
        _ => None,
    }
}

fn manifest_from_href(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("M:")?;
    let id: String = rest
        .chars()
        .take_while(|c| !matches!(c, '&' | '#' | '/' | '?'))
        .collect();
    (!id.is_empty()).then_some(id)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
