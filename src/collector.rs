use anyhow::{Context, Result};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
};
use tokio::io::AsyncReadExt;

const STDIN: &str = "-";

/// Where to read the host list from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Input {
    FsPath(PathBuf),
    Stdin,
}

impl Input {
    pub fn new(value: &str) -> Self {
        if value == STDIN {
            Self::Stdin
        } else {
            Self::FsPath(PathBuf::from(value))
        }
    }

    /// Read the host list, one host per line.
    ///
    /// Lines are returned as they are: blank lines and duplicates are kept,
    /// a missing newline on the last line is fine. Bytes that are not valid
    /// UTF-8 are replaced rather than rejecting the whole list.
    ///
    /// # Errors
    ///
    /// Fails if the input cannot be read. Nothing should be fetched in that
    /// case.
    pub async fn read_hosts(&self) -> Result<Vec<String>> {
        let content = match self {
            Self::FsPath(path) => read_file(path).await?,
            Self::Stdin => {
                let mut content = Vec::new();
                tokio::io::stdin()
                    .read_to_end(&mut content)
                    .await
                    .context("Cannot read host list from stdin")?;
                content
            }
        };
        Ok(split_lines(&content))
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read host list from {}", path.display()))
}

// Invalid UTF-8 stays confined to its own line, which then fails as a host
fn split_lines(content: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(content)
        .lines()
        .map(ToString::to_string)
        .collect()
}

impl Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::FsPath(path) => write!(f, "{}", path.display()),
            Input::Stdin => write!(f, "stdin"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_hosts_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "server-0001.cloud-ops.example.org\nserver-0002.cloud-ops.example.org\n"
        )
        .unwrap();

        let hosts = Input::FsPath(file.path().to_owned())
            .read_hosts()
            .await
            .unwrap();
        assert_eq!(
            hosts,
            vec![
                "server-0001.cloud-ops.example.org",
                "server-0002.cloud-ops.example.org",
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_and_duplicate_lines_are_kept() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a.org\n\na.org").unwrap();

        let hosts = Input::FsPath(file.path().to_owned())
            .read_hosts()
            .await
            .unwrap();
        assert_eq!(hosts, vec!["a.org", "", "a.org"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_kept() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"a.org\nbad-\xff.org\nb.org\n").unwrap();

        let hosts = Input::FsPath(file.path().to_owned())
            .read_hosts()
            .await
            .unwrap();
        assert_eq!(hosts, vec!["a.org", "bad-\u{FFFD}.org", "b.org"]);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let input = Input::new("/definitely/not/here/servers.txt");
        assert!(input.read_hosts().await.is_err());
    }

    #[test]
    fn test_input_new() {
        assert_eq!(Input::new("-"), Input::Stdin);
        assert_eq!(
            Input::new("servers.txt"),
            Input::FsPath(PathBuf::from("servers.txt"))
        );
    }
}
