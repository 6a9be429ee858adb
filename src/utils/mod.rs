pub mod path_security;

/// Strips accelerator markers from a menu label ("&Open" -> "Open"). A doubled
/// ampersand is the escape for a literal one ("Files && Folders" -> "Files & Folders").
pub fn strip_mnemonics(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars();
    while let Some(c) = chars.next() {
        if c == '&' {
            match chars.next() {
                Some('&') => out.push('&'),
                Some(next) => out.push(next),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
