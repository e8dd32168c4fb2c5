use bevy_ecs::prelude::Component;
use smallvec::SmallVec;

/// Free-form labels used for tag-addressed messaging and lookups.
#[derive(Component, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(pub SmallVec<[String; 4]>);

impl Tags {
    pub fn has(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut out: SmallVec<[String; 4]> = SmallVec::new();
        for tag in iter {
            let tag = tag.into();
            if !out.contains(&tag) {
                out.push(tag);
            }
        }
        Tags(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_dedup_and_lookup() {
        let tags: Tags = ["enemy", "flying", "enemy"].into_iter().collect();
        assert_eq!(tags.0.len(), 2);
        assert!(tags.has("enemy"));
        assert!(!tags.has("player"));
    }
}
