use grabber_core::DepotId;

/// `<depot>_changes.json`, with characters Windows rejects in file names replaced.
pub fn changes_filename(depot_id: &DepotId) -> String {
    let mut stem: String = depot_id
        .as_str()
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    stem = stem.trim_matches(&[' ', '.'][..]).to_string();
    if stem.is_empty() {
        stem = "depot".to_string();
    }
    format!("{stem}_changes.json")
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}
