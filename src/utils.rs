//! Header parsing helpers

use std::path::Path;

/// Title for an archive, taken from a Content-Disposition header value
///
/// Handles both `filename="Name.7z"` and RFC 5987 `filename*=UTF-8''Name.7z`,
/// preferring the latter when both are present. The last extension is
/// stripped and surrounding whitespace trimmed. Path separators are replaced
/// so the title is always a single directory name.
///
/// Returns `None` when no usable filename is present.
///
/// # Examples
///
/// ```
/// use vault_dl::utils::title_from_content_disposition;
///
/// let title = title_from_content_disposition(r#"attachment; filename="Tekken 3 (USA).7z""#);
/// assert_eq!(title.as_deref(), Some("Tekken 3 (USA)"));
/// ```
pub fn title_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut encoded = None;

    for part in parameters(value) {
        let part = part.trim();
        if let Some(raw) = part.strip_prefix("filename*=") {
            // Format is: charset'lang'encoded-filename
            if let Some(idx) = raw.rfind('\'')
                && let Ok(decoded) = urlencoding::decode(raw[idx + 1..].trim_matches('"'))
            {
                encoded = Some(decoded.into_owned());
            }
        } else if let Some(raw) = part.strip_prefix("filename=") {
            plain = Some(unquote(raw.trim()));
        }
    }

    let filename = encoded.or(plain)?;
    let title = sanitize_title(strip_extension(&filename));
    (!title.is_empty()).then_some(title)
}

/// Split a header value on `;` outside quoted strings
fn parameters(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Value of a token or quoted-string, with quoted-pair escapes resolved
fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"') else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

fn strip_extension(filename: &str) -> &str {
    match Path::new(filename).extension() {
        Some(ext) => &filename[..filename.len() - ext.len() - 1],
        None => filename,
    }
}

/// Make a string safe to use as one directory name
pub fn sanitize_title(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.chars().all(|c| c == '.') {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// MIME essence of a Content-Type value: lowercase, parameters dropped
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Human-readable byte count (binary units)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
