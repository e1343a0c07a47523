//! Set difference over image reference sets

use crate::image::ImageRefSet;

/// Elements of `a` whose `(repository, tag)` is absent from `b`.
///
/// Source minus destination gives sync candidates; destination minus
/// source gives purge candidates.
pub fn diff(a: &ImageRefSet, b: &ImageRefSet) -> ImageRefSet {
    a.iter().filter(|image| !b.contains(image)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageRef;

    fn set(items: &[(&str, &str)]) -> ImageRefSet {
        items.iter().map(|(r, t)| ImageRef::new(*r, *t)).collect()
    }

    #[test]
    fn test_missing_tag_is_candidate() {
        let source = set(&[("app", "v1"), ("app", "v2")]);
        let destination = set(&[("app", "v1")]);
        assert_eq!(diff(&source, &destination), set(&[("app", "v2")]));
    }

    #[test]
    fn test_swapped_arguments_give_purge_set() {
        let source = set(&[("app", "v1")]);
        let destination = set(&[("app", "v1"), ("old", "v0")]);
        assert_eq!(diff(&destination, &source), set(&[("old", "v0")]));
    }

    #[test]
    fn test_same_tag_other_repository_differs() {
        let source = set(&[("app", "latest")]);
        let destination = set(&[("api", "latest")]);
        assert_eq!(diff(&source, &destination), source);
    }

    #[test]
    fn test_self_diff_is_empty() {
        let source = set(&[("app", "v1"), ("lib", "v3")]);
        assert!(diff(&source, &source).is_empty());
        assert!(diff(&ImageRefSet::new(), &source).is_empty());
    }
}
