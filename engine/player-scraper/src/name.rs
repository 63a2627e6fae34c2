//! Player-name canonicalization.
//!
//! Market cards frequently render a name twice (a desktop and a mobile span
//! inside the same block), which reaches us as `"Pau LópezPau López"`,
//! `"Pau Cubarsí Cubarsí"` or `"Robin Le NormandLe Normand"`. [`clean_name`]
//! runs a fixed pipeline of collapsing stages; each stage consumes the
//! previous one's output and the composition is idempotent for these
//! duplication patterns.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static TOKEN_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}0-9.'’-]+|\S+").unwrap());

/// Canonical form of a raw player name.
pub fn clean_name(raw: &str) -> String {
    let base = normalize_whitespace(raw);
    let base = dedupe_double_text(&base);
    let base = dedupe_repeated_words(&base);
    let base = dedupe_repeated_suffix(&base);
    dedupe_trailing_tokens(&base)
}

/// Casefolded canonical name, the fallback identity key for a player.
pub fn name_key(raw: &str) -> Option<String> {
    let cleaned = clean_name(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_lowercase())
    }
}

/// Collapse every whitespace run (non-breaking spaces included) to one space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"AA"` or `"A A"` becomes `"A"`.
pub fn dedupe_double_text(text: &str) -> String {
    let s = normalize_whitespace(text);
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();

    if n > 0 && n % 2 == 0 {
        let half = n / 2;
        if chars[..half] == chars[half..] {
            return chars[..half].iter().collect::<String>().trim().to_string();
        }
    }

    if n >= 3 && n % 2 == 1 {
        let half = n / 2;
        if chars[half] == ' ' && chars[..half] == chars[half + 1..] {
            return chars[..half].iter().collect::<String>().trim().to_string();
        }
    }

    s
}

/// Drop a word that repeats the previous kept word, ignoring case.
pub fn dedupe_repeated_words(text: &str) -> String {
    let s = normalize_whitespace(text);
    let mut kept: Vec<&str> = Vec::new();
    for part in s.split(' ') {
        if let Some(last) = kept.last() {
            if part.to_lowercase() == last.to_lowercase() {
                continue;
            }
        }
        kept.push(part);
    }
    kept.join(" ")
}

/// Remove a trailing block repeated back to back, even without a separator.
///
/// Candidate sizes are scanned from half the length downwards and only
/// "substantial" chunks count: at least three visible characters and an
/// uppercase letter or an inner separator. This keeps names like `"Lala"`
/// intact. The search restarts after every truncation.
pub fn dedupe_repeated_suffix(text: &str) -> String {
    let mut current: Vec<char> = normalize_whitespace(text).chars().collect();
    if current.is_empty() {
        return String::new();
    }

    loop {
        let lowered: Vec<char> = current.iter().map(|&c| fold_char(c)).collect();
        let n = current.len();
        let mut truncated = None;

        for size in (1..=n / 2).rev() {
            if !is_substantial_chunk(&current[n - size..]) {
                continue;
            }
            if lowered[n - 2 * size..n - size] == lowered[n - size..] {
                truncated = Some(n - size);
                break;
            }
        }

        match truncated {
            Some(end) => {
                current.truncate(end);
                while current.last().is_some_and(|c| c.is_whitespace()) {
                    current.pop();
                }
            }
            None => break,
        }
    }

    normalize_whitespace(&current.iter().collect::<String>())
}

fn is_substantial_chunk(chunk: &[char]) -> bool {
    let visible = chunk.iter().collect::<String>();
    if visible.trim().chars().count() < 3 {
        return false;
    }
    chunk.iter().any(|c| c.is_uppercase())
        || chunk.iter().any(|c| matches!(c, ' ' | '-' | '\'' | '’'))
}

/// Per-character lowercase that keeps positions aligned with the source.
fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Split `"GazzanigaGazzaniga"`-style joins at a lower→upper boundary.
///
/// The accumulated chunk must already hold three characters, so particles
/// such as `"McD"` or `"DeJong"` are not torn apart.
pub fn split_camel_chunk(chunk: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut prev: Option<char> = None;

    for ch in chunk.chars() {
        let boundary = prev.is_some_and(|p| p.is_lowercase()) && ch.is_uppercase();
        if boundary && current_len >= 3 {
            result.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push(ch);
        current_len += 1;
        prev = Some(ch);
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

/// Words of a name, camel-case joins split apart.
pub fn tokenize_name(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for raw in text.split_whitespace() {
        for part in split_camel_chunk(raw) {
            let before = tokens.len();
            tokens.extend(TOKEN_MATCHER.find_iter(&part).map(|m| m.as_str().to_string()));
            if tokens.len() == before {
                tokens.push(part);
            }
        }
    }
    tokens
}

/// Accent-free, punctuation-free, lowercase form of a name token.
pub fn normalize_token(token: &str) -> String {
    token
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '\'' | '’' | '´' | '`' | '-'))
        .collect::<String>()
        .to_lowercase()
}

/// Remove repeated tokens and a trailing echo of earlier tokens.
///
/// `"Pau Cubarsí Cubarsi"` → `"Pau Cubarsí"`; a short trailing fragment that
/// prefixes an earlier token (`"Nico Williams Ni"`) is dropped as well.
pub fn dedupe_trailing_tokens(text: &str) -> String {
    let tokens = tokenize_name(text);
    if tokens.is_empty() {
        return String::new();
    }

    let mut deduped: Vec<(String, String)> = Vec::with_capacity(tokens.len());
    let mut last_norm: Option<String> = None;
    for token in tokens {
        let norm = normalize_token(&token);
        if !norm.is_empty() && last_norm.as_deref() == Some(norm.as_str()) {
            continue;
        }
        last_norm = Some(norm.clone());
        deduped.push((token, norm));
    }

    let mut end = deduped.len();
    while end > 0 {
        let norm = &deduped[end - 1].1;
        let preceding = &deduped[..end - 1];
        let short_prefix = norm.chars().count() <= 2
            && preceding.iter().any(|(_, p)| p.starts_with(norm.as_str()));
        let echoes = norm.is_empty() || preceding.iter().any(|(_, p)| p == norm) || short_prefix;
        if !echoes {
            break;
        }
        end -= 1;
    }

    deduped[..end].iter().map(|(token, _)| token.as_str()).collect::<Vec<_>>().join(" ")
}

/// True when two adjacent words are equal ignoring case, a hint that the
/// pipeline met a duplication pattern it does not know.
pub fn has_adjacent_repeat(text: &str) -> bool {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    words.windows(2).any(|pair| pair[0] == pair[1])
}
