use std::path::PathBuf;

use tracing::debug;

use crate::{
    domain::MessageRef,
    errors::Error,
    messaging::{port::MessengerPort, types::DocumentInfo},
    Result,
};

/// Directory where attached documents are saved and served from.
#[derive(Clone, Debug)]
pub struct DownloadDir {
    root: PathBuf,
}

impl DownloadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn ensure(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// File name a document will be stored under.
    pub fn file_name_for(doc: &DocumentInfo, msg: MessageRef) -> String {
        let fallback = || format!("document_{}", msg.message_id.0);
        doc.file_name
            .as_deref()
            .map(sanitize_file_name)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(fallback)
    }

    /// Download the document attached to `msg`, returning the stored file name.
    ///
    /// Bytes land in a `.part` file first; an existing file with the same name is replaced.
    pub async fn save(
        &self,
        messenger: &dyn MessengerPort,
        msg: MessageRef,
        doc: &DocumentInfo,
    ) -> Result<String> {
        let name = Self::file_name_for(doc, msg);
        let final_path = self.root.join(&name);
        let part_path = self.root.join(format!(".{name}.part"));

        let stored = match messenger.download_attachment(msg, &part_path).await {
            Ok(bytes) => tokio::fs::rename(&part_path, &final_path)
                .await
                .map(|()| bytes)
                .map_err(Error::from),
            Err(e) => Err(e),
        };

        match stored {
            Ok(bytes) => {
                debug!(file = %name, bytes, "document saved");
                Ok(name)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }

    /// Map a client-supplied file name to a stored regular file.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || sanitize_file_name(name) != name {
            return Err(Error::InvalidPath {
                path: PathBuf::from(name),
                reason: "not a stored file name".to_string(),
            });
        }

        let path = self.root.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(Error::NotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reduce an attacker-controlled name to a single safe path component.
///
/// Keeps the last path component, replaces separators and control characters
/// with `_`, and strips leading dots and whitespace until neither remains, so
/// nothing hidden or relative survives. `.` and `..` reduce to an empty name.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut out = String::with_capacity(last.len());
    for ch in last.chars() {
        if ch.is_control() || matches!(ch, ':' | '*' | '?' | '"' | '<' | '>' | '|') {
            out.push('_');
        } else {
            out.push(ch);
        }
    }

    let mut name = out.as_str();
    loop {
        let next = name.trim().trim_start_matches('.');
        if next == name {
            break;
        }
        name = next;
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};

    use super::*;
    use crate::{
        domain::{ChatId, MessageId},
        messaging::types::{Button, MessagingCapabilities},
    };

    fn msg(id: i32) -> MessageRef {
        MessageRef {
            chat_id: ChatId(10),
            message_id: MessageId(id),
        }
    }

    struct FileWriter {
        payload: Option<&'static [u8]>,
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait::async_trait]
    impl MessengerPort for FileWriter {
        fn capabilities(&self) -> MessagingCapabilities {
            MessagingCapabilities {
                supports_callbacks: false,
                supports_downloads: true,
                max_message_len: 4096,
            }
        }

        async fn send_text(&self, _text: &str) -> Result<MessageRef> {
            Ok(msg(1))
        }

        async fn click_button(&self, _msg: MessageRef, _button: &Button) -> Result<()> {
            Ok(())
        }

        async fn download_attachment(&self, _msg: MessageRef, dest: &Path) -> Result<u64> {
            self.seen.lock().unwrap().push(dest.to_path_buf());
            std::fs::write(dest, b"partial")?;
            match self.payload {
                Some(bytes) => {
                    std::fs::write(dest, bytes)?;
                    Ok(bytes.len() as u64)
                }
                None => Err(Error::External("connection reset".to_string())),
            }
        }
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("report.txt"), "report.txt");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\x\\a.pdf"), "a.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("a\nb?.txt"), "a_b_.txt");
        assert_eq!(sanitize_file_name("данные.csv"), "данные.csv");
        assert_eq!(sanitize_file_name(".."), "");
        assert_eq!(sanitize_file_name("."), "");
    }

    #[test]
    fn leading_whitespace_does_not_shield_dots() {
        assert_eq!(sanitize_file_name(" .hidden"), "hidden");
        assert_eq!(sanitize_file_name(" .."), "");
        assert_eq!(sanitize_file_name(". . .x"), "x");
        assert_eq!(sanitize_file_name("dir/ ..\t"), "t");

        let doc = DocumentInfo {
            file_name: Some(" ..".to_string()),
            ..Default::default()
        };
        assert_eq!(DownloadDir::file_name_for(&doc, msg(9)), "document_9");
    }

    #[tokio::test]
    async fn saved_dot_names_can_be_resolved() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DownloadDir::new(tmp.path());
        let messenger = FileWriter {
            payload: Some(b"x"),
            seen: Mutex::new(Vec::new()),
        };
        let doc = DocumentInfo {
            file_name: Some(" .x".to_string()),
            ..Default::default()
        };

        let name = dir.save(&messenger, msg(4), &doc).await.unwrap();
        assert_eq!(name, "x");
        assert_eq!(dir.resolve(&name).await.unwrap(), tmp.path().join("x"));
    }

    #[tokio::test]
    async fn failed_rename_removes_part_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("taken")).unwrap();
        std::fs::write(tmp.path().join("taken").join("inner"), b"keep").unwrap();
        let dir = DownloadDir::new(tmp.path());
        let messenger = FileWriter {
            payload: Some(b"data"),
            seen: Mutex::new(Vec::new()),
        };
        let doc = DocumentInfo {
            file_name: Some("taken".to_string()),
            ..Default::default()
        };

        assert!(dir.save(&messenger, msg(5), &doc).await.is_err());
        assert!(!tmp.path().join(".taken.part").exists());
        assert!(tmp.path().join("taken").is_dir());
    }

    #[test]
    fn falls_back_to_message_id_name() {
        let doc = DocumentInfo {
            file_name: Some("..".to_string()),
            ..Default::default()
        };
        assert_eq!(DownloadDir::file_name_for(&doc, msg(42)), "document_42");
        assert_eq!(
            DownloadDir::file_name_for(&DocumentInfo::default(), msg(7)),
            "document_7"
        );
    }

    #[tokio::test]
    async fn save_writes_final_file_and_removes_part() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DownloadDir::new(tmp.path());
        let messenger = FileWriter {
            payload: Some(b"hello"),
            seen: Mutex::new(Vec::new()),
        };
        let doc = DocumentInfo {
            file_name: Some("leak.txt".to_string()),
            size: Some(5),
        };

        let name = dir.save(&messenger, msg(3), &doc).await.unwrap();
        assert_eq!(name, "leak.txt");
        assert_eq!(std::fs::read(tmp.path().join("leak.txt")).unwrap(), b"hello");
        assert!(!tmp.path().join(".leak.txt.part").exists());
        assert_eq!(
            messenger.seen.lock().unwrap()[0],
            tmp.path().join(".leak.txt.part")
        );
    }

    #[tokio::test]
    async fn failed_save_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DownloadDir::new(tmp.path());
        let messenger = FileWriter {
            payload: None,
            seen: Mutex::new(Vec::new()),
        };
        let doc = DocumentInfo {
            file_name: Some("x.bin".to_string()),
            ..Default::default()
        };

        assert!(dir.save(&messenger, msg(3), &doc).await.is_err());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn resolve_rejects_traversal_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("ok.txt"), b"1").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        let dir = DownloadDir::new(tmp.path());

        assert_eq!(dir.resolve("ok.txt").await.unwrap(), tmp.path().join("ok.txt"));
        assert!(matches!(dir.resolve("missing.txt").await, Err(Error::NotFound)));
        assert!(matches!(dir.resolve("sub").await, Err(Error::NotFound)));
        assert!(matches!(
            dir.resolve("../ok.txt").await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            dir.resolve(".ok.txt").await,
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(dir.resolve("..").await, Err(Error::InvalidPath { .. })));
        assert!(matches!(dir.resolve("").await, Err(Error::InvalidPath { .. })));
    }
}
