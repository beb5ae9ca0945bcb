//! Seams to the robot controller. Implementations live with the
//! transport that talks to the controller; the library only consumes them.
//!
//! All signal and register indices are 1-based, as shown on the teach pendant.

use tracing::debug;

use crate::program::{Pose, ProgramDocument};
use crate::Result;

/// Digital/analog I/O and numeric registers.
pub trait RobotIoPort {
    fn digital_input(&mut self, index: u32) -> Result<bool>;

    fn digital_output(&mut self, index: u32) -> Result<bool>;

    fn set_digital_output(&mut self, index: u32, value: bool) -> Result<()>;

    fn analog_input(&mut self, index: u32) -> Result<f64>;

    fn set_analog_output(&mut self, index: u32, value: f64) -> Result<()>;

    fn register(&mut self, index: u32) -> Result<i32>;

    fn set_register(&mut self, index: u32, value: i32) -> Result<()>;
}

pub trait RobotPoseSource {
    /// Current tool pose in user frame `user_frame`.
    fn current_pose(&mut self, user_frame: i32) -> Result<Pose>;

    fn user_frame(&mut self, index: i32) -> Result<Pose>;

    fn write_user_frame(&mut self, index: i32, frame: &Pose) -> Result<()>;
}

/// File access to the controller program storage.
pub trait ProgramTransferChannel {
    fn download(&mut self, name: &str) -> Result<Vec<u8>>;

    fn upload(&mut self, name: &str, content: &[u8]) -> Result<()>;

    fn delete(&mut self, name: &str) -> Result<()>;

    /// Every file name in the current directory.
    fn list(&mut self) -> Result<Vec<String>>;

    /// Sorted names matching `pattern`, see [`wildcard_matches`].
    fn list_matching(&mut self, pattern: &str) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .list()?
            .into_iter()
            .filter(|name| wildcard_matches(pattern, name))
            .collect();
        names.sort();
        Ok(names)
    }

    fn contains(&mut self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|n| n == name))
    }
}

/// Download `name` through `channel` and parse it.
pub fn fetch_program<C: ProgramTransferChannel + ?Sized>(
    channel: &mut C,
    name: &str,
) -> Result<ProgramDocument> {
    let bytes = channel.download(name)?;
    debug!("Downloaded {} ({} bytes)", name, bytes.len());
    ProgramDocument::from_bytes(&bytes)
}

/// Upload `program` as `name`.
pub fn store_program<C: ProgramTransferChannel + ?Sized>(
    channel: &mut C,
    name: &str,
    program: &ProgramDocument,
) -> Result<()> {
    channel.upload(name, &program.to_bytes())
}

/// Controller listing rule: `*` matches any run of characters, a pattern
/// without an extension matches the name with any non-empty extension, an
/// empty pattern matches every name.
pub fn wildcard_matches(pattern: &str, name: &str) -> bool {
    if pattern.is_empty() {
        return !name.is_empty();
    }
    if pattern.contains('.') {
        return glob(pattern.as_bytes(), name.as_bytes());
    }
    // the stem may itself contain a dot when `*` spans it
    name.char_indices()
        .filter(|(_, c)| *c == '.')
        .any(|(dot, _)| dot + 1 < name.len() && glob(pattern.as_bytes(), name[..dot].as_bytes()))
}

fn glob(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == b'*')
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::test_data::SAMPLE_PROGRAM;
    use crate::Error;

    #[derive(Default)]
    struct MemoryChannel {
        files: BTreeMap<String, Vec<u8>>,
    }

    impl ProgramTransferChannel for MemoryChannel {
        fn download(&mut self, name: &str) -> Result<Vec<u8>> {
            self.files.get(name).cloned().ok_or_else(|| {
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, name.to_owned()))
            })
        }

        fn upload(&mut self, name: &str, content: &[u8]) -> Result<()> {
            self.files.insert(name.to_owned(), content.to_vec());
            Ok(())
        }

        fn delete(&mut self, name: &str) -> Result<()> {
            self.files.remove(name);
            Ok(())
        }

        fn list(&mut self) -> Result<Vec<String>> {
            Ok(self.files.keys().rev().cloned().collect())
        }
    }

    #[test]
    fn wildcards() {
        assert!(wildcard_matches("a*", "abc.tp"));
        assert!(wildcard_matches("a*", "a.ls"));
        assert!(!wildcard_matches("a*", "abc"));
        assert!(!wildcard_matches("a*", "abc."));
        assert!(!wildcard_matches("a*", "bac.tp"));
        assert!(wildcard_matches("a*.tp", "abc.tp"));
        assert!(!wildcard_matches("a*.tp", "abc.ls"));
        assert!(wildcard_matches("DOOR", "DOOR.LS"));
        assert!(!wildcard_matches("DOOR", "DOOR2.LS"));
        assert!(wildcard_matches("*", "x.y.z"));
        assert!(wildcard_matches("", "anything"));
        assert!(wildcard_matches("*.ls", "x.ls"));
        assert!(!wildcard_matches("*.ls", "x.lsx"));
    }

    #[test]
    fn transfer() {
        let mut channel = MemoryChannel::default();
        let program = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        store_program(&mut channel, "SAMPLE.LS", &program).unwrap();
        channel.upload("SAMPLE.TP", b"binary").unwrap();
        channel.upload("OTHER.LS", b"").unwrap();

        assert_eq!(fetch_program(&mut channel, "SAMPLE.LS").unwrap(), program);
        assert!(fetch_program(&mut channel, "MISSING.LS").is_err());
        assert_eq!(
            channel.list_matching("SAMPLE").unwrap(),
            vec!["SAMPLE.LS".to_owned(), "SAMPLE.TP".to_owned()]
        );
        assert_eq!(
            channel.list_matching("*.LS").unwrap(),
            vec!["OTHER.LS".to_owned(), "SAMPLE.LS".to_owned()]
        );

        channel.delete("SAMPLE.TP").unwrap();
        assert!(!channel.contains("SAMPLE.TP").unwrap());
        assert!(channel.contains("SAMPLE.LS").unwrap());
    }
}
