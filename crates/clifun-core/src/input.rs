use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Where a tool reads its document from: a file or standard input (`-`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Input {
    #[default]
    Stdin,
    Path(PathBuf),
}

impl Input {
    pub fn parse(s: &str) -> Self {
        if s.is_empty() || s == "-" {
            Input::Stdin
        } else {
            Input::Path(PathBuf::from(s))
        }
    }

    pub fn from_path(p: &Path) -> Self {
        Input::Path(p.to_path_buf())
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Input::Stdin => {
                let mut buf = Vec::new();
                io::stdin().lock().read_to_end(&mut buf)?;
                Ok(buf)
            }
            Input::Path(p) => {
                if p.is_dir() {
                    return Err(Error::InvalidArgument(format!(
                        "{} is a directory",
                        p.display()
                    )));
                }
                Ok(fs::read(p)?)
            }
        }
    }

    pub fn read_to_string(&self) -> Result<String> {
        let data = self.read_bytes()?;
        tracing::debug!(input = %self, bytes = data.len(), "read input");
        String::from_utf8(data).map_err(|_| Error::NonUtf8)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => f.write_str("<stdin>"),
            Input::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

impl std::str::FromStr for Input {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Input::parse(s))
    }
}
