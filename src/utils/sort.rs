//! Version-aware ("natural") string ordering, as used by `ls -v`.
//!
//! Runs of ASCII digits compare by numeric value, everything else compares
//! byte-wise. `db_backup.2.sqlc` sorts before `db_backup.10.sqlc`.

use std::cmp::Ordering;

pub fn version_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.as_bytes();
    let mut right = b.as_bytes();

    loop {
        match (left.first(), right.first()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let (l_num, l_rest) = split_digits(left);
                let (r_num, r_rest) = split_digits(right);
                let ord = cmp_numeric(l_num, r_num);
                if ord != Ordering::Equal {
                    return ord;
                }
                left = l_rest;
                right = r_rest;
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(r);
                }
                left = &left[1..];
                right = &right[1..];
            }
        }
    }
}

/// Sort names in place using `version_cmp`.
pub fn version_sort(names: &mut [String]) {
    names.sort_by(|a, b| version_cmp(a, b));
}

/// Last entry in version order, i.e. the newest dump.
pub fn latest(names: &[String]) -> Option<&String> {
    names.iter().max_by(|a, b| version_cmp(a, b))
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn cmp_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = trim_leading_zeros(a);
    let b = trim_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_runs_compare_by_value() {
        assert_eq!(version_cmp("dump.2.sqlc", "dump.10.sqlc"), Ordering::Less);
        assert_eq!(version_cmp("dump.10.sqlc", "dump.9.sqlc"), Ordering::Greater);
    }

    #[test]
    fn plain_names_compare_bytewise() {
        let mut names = vec!["c.sqlc".to_string(), "a.sqlc".to_string(), "b.sqlc".to_string()];
        version_sort(&mut names);
        assert_eq!(names, vec!["a.sqlc", "b.sqlc", "c.sqlc"]);
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let mut names = vec![
            "db_backup.2024-11-02_08-00-00.sqlc".to_string(),
            "db_backup.2024-01-15_23-59-59.sqlc".to_string(),
            "db_backup.2024-11-02_07-59-59.sqlc".to_string(),
        ];
        version_sort(&mut names);
        assert_eq!(names[0], "db_backup.2024-01-15_23-59-59.sqlc");
        assert_eq!(names[2], "db_backup.2024-11-02_08-00-00.sqlc");
    }

    #[test]
    fn leading_zeros_fall_back_to_full_comparison() {
        assert_eq!(version_cmp("a01", "a1"), "a01".cmp("a1"));
        assert_ne!(version_cmp("a01", "a1"), Ordering::Equal);
    }

    #[test]
    fn latest_picks_last_in_version_order() {
        let names = vec!["a.sqlc".to_string(), "c.sqlc".to_string(), "b.sqlc".to_string()];
        assert_eq!(latest(&names).map(String::as_str), Some("c.sqlc"));
        assert_eq!(latest(&[]), None);
    }
}
