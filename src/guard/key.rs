//! Store key addressing.
//!
//! A guard lives under `{user_id}{SEPARATOR}{guard_id}`. The per-user scan
//! pattern is the same prefix followed by `*`, in Redis glob syntax.
//!
//! Injectivity holds as long as user ids never contain the separator. The
//! HTTP layer rejects such ids before they reach the codec.

/// Separator between user id and guard id.
pub const KEY_SEPARATOR: char = '_';

/// Characters with special meaning in a glob pattern.
const GLOB_META: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Compose the store key for a user's guard.
pub fn prepare_key(user_id: &str, guard_id: &str) -> String {
    let mut key = String::with_capacity(user_id.len() + guard_id.len() + 1);
    key.push_str(user_id);
    key.push(KEY_SEPARATOR);
    key.push_str(guard_id);
    key
}

/// Glob pattern matching every key [`prepare_key`] produces for `user_id`.
///
/// Glob metacharacters inside the user id are escaped so that the pattern
/// is a literal prefix match.
pub fn prefix_for(user_id: &str) -> String {
    let mut pattern = String::with_capacity(user_id.len() + 2);
    for c in user_id.chars() {
        if GLOB_META.contains(&c) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push(KEY_SEPARATOR);
    pattern.push('*');
    pattern
}

/// Split a key back into `(user_id, guard_id)`.
///
/// Splits at the first separator, which is the inverse of [`prepare_key`]
/// for separator-free user ids. Returns `None` if no separator is present.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(KEY_SEPARATOR)
}

/// Glob matcher with Redis `KEYS`/`SCAN MATCH` semantics.
///
/// Supports `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and backslash escapes.
pub fn pattern_matches(pattern: &str, s: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let s: Vec<char> = s.chars().collect();
    glob_match(&pattern, &s)
}

fn glob_match(pattern: &[char], s: &[char]) -> bool {
    let Some((&p, rest)) = pattern.split_first() else {
        return s.is_empty();
    };

    match p {
        '*' => {
            if rest.is_empty() {
                return true;
            }
            (0..=s.len()).any(|i| glob_match(rest, &s[i..]))
        }
        '?' => !s.is_empty() && glob_match(rest, &s[1..]),
        '[' => {
            let Some((&c, s_rest)) = s.split_first() else {
                return false;
            };
            match match_class(rest, c) {
                Some((true, after)) => glob_match(after, s_rest),
                Some((false, _)) => false,
                // Unterminated class: treat '[' literally.
                None => c == '[' && glob_match(rest, s_rest),
            }
        }
        '\\' if !rest.is_empty() => {
            !s.is_empty() && s[0] == rest[0] && glob_match(&rest[1..], &s[1..])
        }
        literal => !s.is_empty() && s[0] == literal && glob_match(rest, &s[1..]),
    }
}

/// Match `c` against a character class whose body starts at `class`.
///
/// Returns whether it matched and the pattern remaining after `]`.
fn match_class(class: &[char], c: char) -> Option<(bool, &[char])> {
    let (negated, mut i) = match class.first() {
        Some('^') => (true, 1),
        _ => (false, 0),
    };
    let mut matched = false;

    while i < class.len() {
        match class[i] {
            ']' => return Some((matched != negated, &class[i + 1..])),
            '\\' if i + 1 < class.len() => {
                matched |= class[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < class.len() && class[i + 1] == '-' && class[i + 2] != ']' => {
                let hi = class[i + 2];
                matched |= lo <= c && c <= hi;
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }
    None
}
