use std::borrow::Cow;

/// Decodes HTML character references in a single pass.
///
/// Named references come from the full HTML5 table; decimal (`&#65;`) and
/// hexadecimal (`&#x41;`) references follow the HTML rules: NUL, surrogates
/// and out-of-range values become U+FFFD and 0x80..=0x9F map through
/// Windows-1252. Unknown or unterminated references are left untouched. Only
/// one layer is decoded: `&amp;lt;` becomes `&lt;`, which matches how
/// double-encoded feed text is expected to come out after the XML parser has
/// already removed the first layer.
///
/// Returns `Cow::Borrowed` when the input contains no `&`.
///
/// # Examples
///
/// ```
/// use gator::util::unescape_html;
///
/// assert_eq!(unescape_html("Tom &amp; Jerry"), "Tom & Jerry");
/// assert_eq!(unescape_html("caf&eacute;"), "café");
/// assert_eq!(unescape_html("&#8220;quoted&#x201D;"), "\u{201C}quoted\u{201D}");
/// assert_eq!(unescape_html("&bogus; stays"), "&bogus; stays");
/// ```
pub fn unescape_html(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        // Entity names are short; a missing ';' nearby means this is a bare '&'
        let end = tail
            .get(1..)
            .and_then(|t| t.char_indices().take(MAX_ENTITY_LEN + 1).find(|&(_, c)| c == ';'))
            .map(|(end, _)| end);

        match end {
            Some(end) if decode_entity(&tail[1..=end], &mut out) => {
                rest = &tail[end + 2..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

/// Longest entity body (between `&` and `;`) we attempt to decode.
/// `CounterClockwiseContourIntegral` is the longest HTML5 name.
const MAX_ENTITY_LEN: usize = 32;

/// Push the decoded form of `entity` onto `out`. Returns `false`, leaving
/// `out` untouched, when it is not a reference we recognize.
fn decode_entity(entity: &str, out: &mut String) -> bool {
    if let Some(num) = entity.strip_prefix('#') {
        return match decode_numeric(num) {
            Some(c) => {
                out.push(c);
                true
            }
            None => false,
        };
    }

    match quick_xml::escape::resolve_html5_entity(entity) {
        Some(text) => {
            out.push_str(text);
            true
        }
        None => false,
    }
}

fn decode_numeric(num: &str) -> Option<char> {
    let (digits, radix) = match num.strip_prefix(['x', 'X']) {
        Some(hex) => (hex, 16),
        None => (num, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    // All digits but too long for u32: out of range like any other large value
    let code = u32::from_str_radix(digits, radix).unwrap_or(u32::MAX);

    let c = match code {
        0x80..=0x9f => WINDOWS_1252[(code - 0x80) as usize],
        0 => char::REPLACEMENT_CHARACTER,
        _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    };
    Some(c)
}

/// Numeric references in 0x80..=0x9F name Windows-1252 characters.
const WINDOWS_1252: [char; 32] = [
    '\u{20ac}', '\u{81}', '\u{201a}', '\u{192}', '\u{201e}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2c6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8d}', '\u{17d}', '\u{8f}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2dc}', '\u{2122}', '\u{161}', '\u{203a}', '\u{153}', '\u{9d}', '\u{17e}', '\u{178}',
];

/// Removes characters that could manipulate the terminal when printing
/// feed-controlled text.
///
/// Drops ASCII control characters (except tab and newline), DEL, and whole
/// ANSI CSI sequences (`ESC [ ... final`). A bare ESC is dropped on its own.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unsafe = |c: char| c == '\x7f' || (c.is_ascii_control() && c != '\t' && c != '\n');

    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Parameter and intermediate bytes run until a final byte in 0x40..=0x7e
            for n in chars.by_ref() {
                if ('\x40'..='\x7e').contains(&n) {
                    break;
                }
            }
        } else if !is_unsafe(c) {
            out.push(c);
        }
    }
    Cow::Owned(out)
}
