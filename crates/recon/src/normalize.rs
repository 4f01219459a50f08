//! Scanner input canonicalization.
//!
//! Barcode readers and QR payloads hand us all sorts of noise around the
//! shipment id: prefixes, escaped control sequences, URLs. The canonical
//! shipment id in this domain is 11 ASCII digits starting with `4`.

/// Length of a canonical shipment identifier.
pub const ID_LEN: usize = 11;

/// Canonicalize a raw scanned string, or reject it.
///
/// 1. Trim and drop C0/C1 control characters.
/// 2. First `4` followed by ten ASCII digits wins.
/// 3. Otherwise the first 11 of all ASCII digits in the string, if there are
///    at least 11.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw.trim().chars().filter(|c| !is_control(*c)).collect();
    if cleaned.is_empty() {
        return None;
    }

    if let Some(id) = find_shipment_run(cleaned.as_bytes()) {
        return Some(id);
    }

    let digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= ID_LEN {
        return Some(digits[..ID_LEN].to_string());
    }

    None
}

/// Split a pasted list of ids on whitespace, commas and semicolons and
/// normalize each token. Returns `(accepted, rejected_tokens)`; accepted ids
/// keep first-seen order without repeats.
pub fn normalize_list(input: &str) -> (Vec<String>, Vec<String>) {
    let mut accepted: Vec<String> = Vec::new();
    let mut rejected = Vec::new();

    for token in input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|t| !t.is_empty())
    {
        match normalize(token) {
            Some(id) => {
                if !accepted.contains(&id) {
                    accepted.push(id);
                }
            }
            None => rejected.push(token.to_string()),
        }
    }

    (accepted, rejected)
}

fn is_control(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

fn find_shipment_run(bytes: &[u8]) -> Option<String> {
    if bytes.len() < ID_LEN {
        return None;
    }
    (0..=bytes.len() - ID_LEN).find_map(|start| {
        let window = &bytes[start..start + ID_LEN];
        if window[0] == b'4' && window[1..].iter().all(u8::is_ascii_digit) {
            // ASCII only, so the slice is valid UTF-8
            std::str::from_utf8(window).ok().map(str::to_string)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_id() {
        assert_eq!(normalize("40000000001").as_deref(), Some("40000000001"));
    }

    #[test]
    fn trims_and_strips_controls() {
        assert_eq!(normalize("  \u{0002}41234567890\r\n").as_deref(), Some("41234567890"));
        assert_eq!(normalize("\u{0085}4123\u{001d}4567890").as_deref(), Some("41234567890"));
    }

    #[test]
    fn first_shipment_run_wins() {
        assert_eq!(
            normalize("abc 41111111111 xyz 42222222222").as_deref(),
            Some("41111111111")
        );
    }

    #[test]
    fn run_inside_longer_digits_starts_at_first_four() {
        // 1 2 3 then 4567890123 4 -> window starting at the first '4'
        assert_eq!(normalize("123456789012345").as_deref(), Some("45678901234"));
    }

    #[test]
    fn fallback_takes_first_eleven_digits() {
        assert_eq!(normalize("id:123-456-789-012").as_deref(), Some("12345678901"));
    }

    #[test]
    fn too_few_digits_rejected() {
        assert_eq!(normalize("4000"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("no digits here"), None);
    }

    #[test]
    fn non_ascii_digits_ignored() {
        // Arabic-Indic digits are not shipment digits
        assert_eq!(normalize("٤٠٠٠٠٠٠٠٠٠١"), None);
    }

    #[test]
    fn list_splits_and_reports_rejects() {
        let (ok, bad) = normalize_list("40000000001, 40000000002;bogus\n40000000001");
        assert_eq!(ok, vec!["40000000001", "40000000002"]);
        assert_eq!(bad, vec!["bogus"]);
    }
}
