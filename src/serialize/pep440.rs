use crate::domain::{Stage, Version};
use crate::error::Result;
use crate::serialize::{metadata_items, SerializeOptions};
use crate::style::{check_version, Style};

/// The pieces of a PEP 440 version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pep440Parts {
    /// Release segment, such as "0.1.0"
    pub base: String,
    /// Pre-release label, normalized on output
    pub stage: Option<String>,
    /// Ignored without a stage; a missing revision renders as 0
    pub revision: Option<u64>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub epoch: Option<u64>,
    /// Local version label segments
    pub metadata: Vec<String>,
}

impl Pep440Parts {
    pub fn new(base: impl Into<String>) -> Self {
        Pep440Parts {
            base: base.into(),
            ..Default::default()
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(epoch) = self.epoch {
            out.push_str(&format!("{}!", epoch));
        }
        out.push_str(&self.base);
        if let Some(stage) = &self.stage {
            out.push_str(&Stage::new(stage.as_str()).pep440_name());
            out.push_str(&self.revision.unwrap_or(0).to_string());
        }
        if let Some(post) = self.post {
            out.push_str(&format!(".post{}", post));
        }
        if let Some(dev) = self.dev {
            out.push_str(&format!(".dev{}", dev));
        }
        if !self.metadata.is_empty() {
            out.push('+');
            out.push_str(&self.metadata.join("."));
        }
        out
    }
}

/// Assemble and validate a PEP 440 version from its pieces.
pub fn serialize_pep440(parts: &Pep440Parts) -> Result<String> {
    let rendered = parts.render();
    check_version(&rendered, Style::Pep440)?;
    Ok(rendered)
}

pub(crate) fn render(version: &Version, options: &SerializeOptions) -> String {
    let mut parts = Pep440Parts::new(version.base_string());
    parts.epoch = version.epoch;

    let mut post = None;
    let mut dev = None;
    if let Some(stage) = &version.stage {
        if !stage.is_post_or_dev() {
            parts.stage = Some(stage.name.clone());
            parts.revision = stage.revision;
        } else if stage.name.eq_ignore_ascii_case("post") {
            post = Some(stage.revision.unwrap_or(0));
        } else {
            dev = Some(stage.revision.unwrap_or(0));
        }
    }

    if version.distance > 0 {
        if !version.is_smart_bumped() && post.is_none() && dev.is_none() {
            post = Some(version.distance);
            dev = Some(0);
        } else {
            dev = Some(dev.unwrap_or(0) + version.distance);
        }
    } else if version.dirty == Some(true) && dev.is_none() {
        dev = Some(0);
    }

    parts.post = post;
    parts.dev = dev;
    parts.metadata = metadata_items(version, options);
    parts.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(v: &Version, options: SerializeOptions) -> String {
        v.serialize(&options).unwrap()
    }

    fn opts() -> SerializeOptions {
        SerializeOptions::default()
    }

    fn full() -> Version {
        Version::new([1])
            .with_stage("a", Some(2))
            .with_distance(3)
            .with_commit("abc")
            .with_dirty(true)
    }

    #[test]
    fn test_plain() {
        assert_eq!(serialize(&Version::new([0, 1, 0]), opts()), "0.1.0");
        assert_eq!(serialize(&Version::new([0, 1, 0]).with_epoch(2), opts()), "2!0.1.0");
    }

    #[test]
    fn test_distance_commit_dirty() {
        assert_eq!(serialize(&full(), opts()), "1a2.post3.dev0+abc");
        assert_eq!(
            serialize(&full(), SerializeOptions { dirty: true, ..opts() }),
            "1a2.post3.dev0+abc.dirty"
        );
        assert_eq!(
            serialize(&full(), SerializeOptions { metadata: Some(false), ..opts() }),
            "1a2.post3.dev0"
        );
        assert_eq!(
            serialize(
                &full(),
                SerializeOptions {
                    metadata: Some(false),
                    dirty: true,
                    ..opts()
                }
            ),
            "1a2.post3.dev0"
        );
    }

    #[test]
    fn test_on_tag() {
        let v = Version::new([1])
            .with_stage("a", Some(2))
            .with_commit("abc")
            .with_dirty(false);
        assert_eq!(serialize(&v, opts()), "1a2");
        assert_eq!(
            serialize(&v, SerializeOptions { metadata: Some(true), ..opts() }),
            "1a2+abc"
        );
    }

    #[test]
    fn test_dirty_on_tag_gets_dev0() {
        let v = Version::new([0, 1, 0]).with_dirty(true);
        assert_eq!(serialize(&v, opts()), "0.1.0.dev0");
        assert_eq!(
            serialize(&v, SerializeOptions { dirty: true, ..opts() }),
            "0.1.0.dev0+dirty"
        );
        let clean = Version::new([0, 1, 0]).with_dirty(false);
        assert_eq!(serialize(&clean, SerializeOptions { dirty: true, ..opts() }), "0.1.0");
    }

    #[test]
    fn test_stage_normalization() {
        assert_eq!(serialize(&Version::new([1]).with_stage("a", None), opts()), "1a0");
        assert_eq!(serialize(&Version::new([1]).with_stage("b", Some(2)), opts()), "1b2");
        assert_eq!(serialize(&Version::new([1]).with_stage("rc", Some(2)), opts()), "1rc2");
        assert_eq!(
            serialize(&Version::new([1]).with_stage("alpha", Some(2)), opts()),
            "1a2"
        );
        assert_eq!(
            serialize(&Version::new([1]).with_stage("preview", Some(1)), opts()),
            "1rc1"
        );
    }

    #[test]
    fn test_post_and_dev_stages() {
        let post = Version::new([0, 1, 0]).with_stage("post", Some(1));
        assert_eq!(serialize(&post, opts()), "0.1.0.post1");
        assert_eq!(serialize(&post.clone().with_distance(3), opts()), "0.1.0.post1.dev3");
        assert_eq!(
            serialize(&post.with_distance(3), SerializeOptions { bump: true, ..opts() }),
            "0.1.0.post2.dev3"
        );

        let capitalized = Version::new([0, 1, 0]).with_stage("Post", Some(2));
        assert_eq!(serialize(&capitalized, opts()), "0.1.0.post2");

        let dev = Version::new([0, 1, 0]).with_stage("dev", Some(1));
        assert_eq!(serialize(&dev, opts()), "0.1.0.dev1");
        assert_eq!(serialize(&dev.clone().with_distance(3), opts()), "0.1.0.dev4");
        assert_eq!(
            serialize(&dev.with_distance(3), SerializeOptions { bump: true, ..opts() }),
            "0.1.0.dev5"
        );
    }

    #[test]
    fn test_bump() {
        let bump = || SerializeOptions { bump: true, ..opts() };
        assert_eq!(serialize(&Version::new([0, 1, 0]), bump()), "0.1.0");
        assert_eq!(serialize(&Version::new([0, 1, 0]).with_distance(3), bump()), "0.1.1.dev3");
        assert_eq!(serialize(&Version::new([1]).with_distance(3), bump()), "2.dev3");
        assert_eq!(
            serialize(&Version::new([0, 1, 0]).with_stage("a", None).with_distance(3), bump()),
            "0.1.0a2.dev3"
        );
        assert_eq!(
            serialize(&Version::new([0, 1, 0]).with_stage("b", Some(2)).with_distance(3), bump()),
            "0.1.0b3.dev3"
        );
    }

    #[test]
    fn test_tagged_metadata() {
        let v = Version::new([0, 1, 0])
            .with_distance(1)
            .with_commit("abc")
            .with_tagged_metadata("def");
        assert_eq!(
            serialize(&v, SerializeOptions { tagged_metadata: true, ..opts() }),
            "0.1.0.post1.dev0+abc.def"
        );
    }

    #[test]
    fn test_serialize_pep440_pieces() {
        assert_eq!(serialize_pep440(&Pep440Parts::new("1.2.3")).unwrap(), "1.2.3");
        let parts = Pep440Parts {
            epoch: Some(0),
            ..Pep440Parts::new("1.2.3")
        };
        assert_eq!(serialize_pep440(&parts).unwrap(), "0!1.2.3");
        let parts = Pep440Parts {
            stage: Some("a".to_string()),
            ..Pep440Parts::new("1.2.3")
        };
        assert_eq!(serialize_pep440(&parts).unwrap(), "1.2.3a0");
        let parts = Pep440Parts {
            stage: Some("ALphA".to_string()),
            revision: Some(4),
            ..Pep440Parts::new("1.2.3")
        };
        assert_eq!(serialize_pep440(&parts).unwrap(), "1.2.3a4");
        let parts = Pep440Parts {
            metadata: vec!["foo".to_string(), "bar".to_string()],
            ..Pep440Parts::new("1.2.3")
        };
        assert_eq!(serialize_pep440(&parts).unwrap(), "1.2.3+foo.bar");

        let all = Pep440Parts {
            base: "1.2.3".to_string(),
            stage: Some("a".to_string()),
            revision: Some(4),
            post: Some(5),
            dev: Some(6),
            epoch: Some(0),
            metadata: vec!["foo".to_string(), "bar".to_string()],
        };
        assert_eq!(serialize_pep440(&all).unwrap(), "0!1.2.3a4.post5.dev6+foo.bar");

        assert!(serialize_pep440(&Pep440Parts::new("foo")).is_err());
    }
}
