use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Terminal column width of `s`.
///
/// ```
/// use digidex::util::display_width;
///
/// assert_eq!(display_width("Agumon"), 6);
/// assert_eq!(display_width("アグモン"), 8);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` so it occupies at most `max_width` columns, marking the cut with `…`.
///
/// Borrows when the text already fits.
///
/// ```
/// use digidex::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Agumon", 10), "Agumon");
/// assert_eq!(truncate_to_width("MetalGreymon", 6), "Metal…");
/// assert_eq!(truncate_to_width("Gabumon", 0), "");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    // One column is reserved for the ellipsis.
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::with_capacity(max_width + 2);
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Right-pad `s` with spaces to exactly `width` columns, truncating first if needed.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let cut = truncate_to_width(s, width);
    let pad = width.saturating_sub(display_width(&cut));
    let mut out = String::with_capacity(cut.len() + pad);
    out.push_str(&cut);
    out.extend(std::iter::repeat(' ').take(pad));
    out
}

/// Make server-provided text safe to draw on a single terminal line.
///
/// SEC-001: catalog names and levels come from a remote service, so escape
/// sequences (CSI `ESC [ ... final`, OSC `ESC ] ... BEL|ST`) and C0/C1
/// control characters are removed. Tabs and newlines become plain spaces.
pub fn sanitize_label(s: &str) -> Cow<'_, str> {
    let dirty = s
        .chars()
        .any(|c| c.is_control() || c == '\u{1b}');
    if !dirty {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // Parameters run until a final byte in 0x40..=0x7e.
                    for p in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&p) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(p) = chars.next() {
                        if p == '\u{07}' {
                            break;
                        }
                        if p == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\t' | '\n' | '\r' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
