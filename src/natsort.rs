//! Natural ordering
//!
//! Human-friendly string ordering: digit runs compare by numeric value, so
//! "Team 9" sorts before "Team 10". Used for presenting keys; the data file
//! itself is always written in plain byte order.

use std::cmp::Ordering;

/// One run of a split string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

/// Split into alternating digit / non-digit runs
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (idx, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(make_chunk(&s[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if let Some(prev) = in_digits {
        out.push(make_chunk(&s[start..], prev));
    }
    out
}

fn make_chunk(run: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(run)
    } else {
        Chunk::Text(run)
    }
}

/// Compare digit runs by value without parsing (no overflow on long runs)
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
        (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
        // numbers sort before text at the same position
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
    }
}

/// Natural comparison, case sensitive
///
/// Equal numeric values with different zero padding ("07" vs "7") fall back
/// to plain string order so the ordering stays total.
pub fn natcmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = cmp_chunk(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

/// Natural comparison ignoring case
pub fn natcasecmp(a: &str, b: &str) -> Ordering {
    natcmp(&a.to_lowercase(), &b.to_lowercase())
}

/// Sort in place with the given comparator
pub fn natsort<S: AsRef<str>>(items: &mut [S], cmp: fn(&str, &str) -> Ordering) {
    items.sort_by(|a, b| cmp(a.as_ref(), b.as_ref()));
}

/// Sorted copy using the given comparator
pub fn natsorted<S: AsRef<str> + Clone>(items: &[S], cmp: fn(&str, &str) -> Ordering) -> Vec<S> {
    let mut copy = items.to_vec();
    natsort(&mut copy, cmp);
    copy
}
