//! Object key construction
//!
//! Store backends address artifacts by `/`-separated keys built from job
//! names, build numbers and file names. Segments are typed so a key can only
//! be made of text and numbers.

/// One component of an object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Text(&'a str),
    Number(u64),
}

impl<'a> From<&'a str> for PathSegment<'a> {
    fn from(value: &'a str) -> Self {
        PathSegment::Text(value)
    }
}

impl<'a> From<&'a String> for PathSegment<'a> {
    fn from(value: &'a String) -> Self {
        PathSegment::Text(value.as_str())
    }
}

impl From<u64> for PathSegment<'_> {
    fn from(value: u64) -> Self {
        PathSegment::Number(value)
    }
}

/// Join segments with `/`.
///
/// Empty components are dropped and separators inside text segments are
/// normalized, so `["logs/", "", "job", 7]` becomes `logs/job/7`.
pub fn join_path(segments: &[PathSegment<'_>]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment {
            PathSegment::Text(text) => parts.extend(
                text.split('/')
                    .filter(|part| !part.is_empty() && *part != ".")
                    .map(str::to_string),
            ),
            PathSegment::Number(number) => parts.push(number.to_string()),
        }
    }
    parts.join("/")
}

/// Final component of a `/`-separated key.
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_mixes_text_and_numbers() {
        let key = join_path(&["logs".into(), "ci-job".into(), 1234u64.into(), "artifacts".into()]);
        assert_eq!(key, "logs/ci-job/1234/artifacts");
    }

    #[test]
    fn test_join_drops_empty_and_duplicate_separators() {
        let key = join_path(&["logs/".into(), "".into(), "/job//".into(), 7u64.into()]);
        assert_eq!(key, "logs/job/7");
    }

    #[test]
    fn test_join_of_nothing_is_empty() {
        assert_eq!(join_path(&[]), "");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("artifacts/E2E_Latency_1.json"), "E2E_Latency_1.json");
        assert_eq!(base_name("plain.json"), "plain.json");
    }
}
