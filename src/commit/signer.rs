//! commit::signer
//!
//! GPG signatures for commits built through the git data API.
//!
//! GitHub verifies a commit signature against the raw commit object it
//! stores, so the payload signed here must match that object byte for byte:
//! tree, parents, author and committer lines with whole-second timestamps
//! in UTC, a blank line, then the message.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::forge::CommitAuthor;

/// Errors from signing a commit.
#[derive(Debug, Error)]
pub enum SignError {
    /// The gpg binary could not be started or talked to.
    #[error("failed to run gpg: {0}")]
    Spawn(#[from] std::io::Error),

    /// gpg ran and reported failure.
    #[error("gpg {step} failed: {stderr}")]
    Gpg { step: &'static str, stderr: String },

    /// gpg succeeded but wrote nothing.
    #[error("gpg produced an empty signature")]
    EmptySignature,

    /// The blocking signing task did not complete.
    #[error("signing task failed: {0}")]
    Task(String),
}

/// Produces an ASCII-armored detached signature for a commit payload.
pub trait CommitSigner: Send + Sync {
    fn sign(&self, payload: &str) -> Result<String, SignError>;
}

/// The canonical git commit object that GitHub will store for a commit.
pub fn commit_payload(
    tree: &str,
    parents: &[String],
    author: &CommitAuthor,
    message: &str,
) -> String {
    let mut payload = format!("tree {}\n", tree);
    for parent in parents {
        payload.push_str(&format!("parent {}\n", parent));
    }
    let identity = format!(
        "{} <{}> {} +0000",
        author.name,
        author.email,
        author.date.timestamp()
    );
    payload.push_str(&format!("author {}\n", identity));
    payload.push_str(&format!("committer {}\n", identity));
    payload.push('\n');
    payload.push_str(message);
    payload
}

/// Signs with the `gpg` binary using a throwaway home directory.
///
/// The secret key is imported fresh for every signature so nothing leaks
/// into the user's keyring.
#[derive(Clone)]
pub struct GpgSigner {
    program: String,
    secret_key: String,
    passphrase: Option<String>,
    local_user: String,
}

// Custom Debug to avoid exposing key material
impl std::fmt::Debug for GpgSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpgSigner")
            .field("program", &self.program)
            .field("local_user", &self.local_user)
            .field("has_passphrase", &self.passphrase.is_some())
            .finish_non_exhaustive()
    }
}

impl GpgSigner {
    /// `local_user` selects the signing key, usually the committer email.
    pub fn new(
        secret_key: impl Into<String>,
        passphrase: Option<String>,
        local_user: impl Into<String>,
    ) -> Self {
        Self {
            program: "gpg".to_string(),
            secret_key: secret_key.into(),
            passphrase: passphrase.filter(|p| !p.is_empty()),
            local_user: local_user.into(),
        }
    }

    /// Use a different gpg executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn run(
        &self,
        home: &Path,
        step: &'static str,
        args: &[&str],
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, SignError> {
        let mut child = Command::new(&self.program)
            .arg("--homedir")
            .arg(home)
            .arg("--batch")
            .arg("--no-tty")
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SignError::Gpg {
                step,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Arguments and stdin that hand the passphrase to gpg, if there is one.
    fn passphrase_input(&self) -> (Vec<&'static str>, Option<Vec<u8>>) {
        match &self.passphrase {
            Some(passphrase) => (
                vec!["--pinentry-mode", "loopback", "--passphrase-fd", "0"],
                Some(format!("{}\n", passphrase).into_bytes()),
            ),
            None => (Vec::new(), None),
        }
    }
}

impl CommitSigner for GpgSigner {
    fn sign(&self, payload: &str) -> Result<String, SignError> {
        let home = tempfile::tempdir()?;
        tracing::debug!(local_user = %self.local_user, "signing commit with gpg");

        let key_file = home.path().join("secret.asc");
        std::fs::write(&key_file, &self.secret_key)?;
        let key_path = key_file.to_string_lossy().to_string();
        let (passphrase_args, passphrase_stdin) = self.passphrase_input();

        let mut import_args: Vec<&str> = passphrase_args.clone();
        import_args.extend(["--import", key_path.as_str()]);
        self.run(home.path(), "import", &import_args, passphrase_stdin.as_deref())?;

        let payload_file = home.path().join("commit");
        std::fs::write(&payload_file, payload)?;
        let payload_path = payload_file.to_string_lossy().to_string();

        let mut sign_args: Vec<&str> = passphrase_args;
        sign_args.extend([
            "--local-user",
            self.local_user.as_str(),
            "--armor",
            "--detach-sign",
            "--output",
            "-",
            payload_path.as_str(),
        ]);
        let signature = self.run(home.path(), "sign", &sign_args, passphrase_stdin.as_deref())?;

        let signature = String::from_utf8_lossy(&signature).trim().to_string();
        if signature.is_empty() {
            return Err(SignError::EmptySignature);
        }
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn author() -> CommitAuthor {
        CommitAuthor {
            name: "bot".into(),
            email: "bot@example.com".into(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    mod payload {
        use super::*;

        #[test]
        fn single_parent() {
            let payload = commit_payload("t1", &["p1".to_string()], &author(), "Create \"f\".");
            assert_eq!(
                payload,
                "tree t1\n\
                 parent p1\n\
                 author bot <bot@example.com> 1704067200 +0000\n\
                 committer bot <bot@example.com> 1704067200 +0000\n\
                 \n\
                 Create \"f\"."
            );
        }

        #[test]
        fn root_commit_has_no_parent_line() {
            let payload = commit_payload("t1", &[], &author(), "m");
            assert!(!payload.contains("parent"));
            assert!(payload.starts_with("tree t1\nauthor "));
        }
    }

    mod gpg {
        use super::*;

        #[test]
        fn debug_redacts_key_material() {
            let signer = GpgSigner::new("-----BEGIN PGP", Some("hunter2".into()), "bot@example.com");
            let debug = format!("{:?}", signer);
            assert!(!debug.contains("BEGIN PGP"));
            assert!(!debug.contains("hunter2"));
            assert!(debug.contains("has_passphrase: true"));
        }

        #[test]
        fn empty_passphrase_is_none() {
            let signer = GpgSigner::new("key", Some(String::new()), "bot@example.com");
            assert!(signer.passphrase.is_none());
            assert!(signer.passphrase_input().1.is_none());
        }

        #[test]
        fn missing_binary_is_spawn_error() {
            let signer = GpgSigner::new("key", None, "bot@example.com")
                .with_program("/nonexistent/githubfile-gpg");
            let err = signer.sign("payload").unwrap_err();
            assert!(matches!(err, SignError::Spawn(_)));
        }
    }
}
