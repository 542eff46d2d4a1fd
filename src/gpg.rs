//! # gpg Invocation
//!
//! Thin wrappers around the gpg command line. Output is parsed only where the
//! store needs structured data:
//!
//! - `--with-colons` key listings become [`Recipient`] values
//! - `--list-only` output of a ciphertext yields the key ids it was encrypted for
//!
//! Decrypt and encrypt return the raw [`ProcessOutput`]; the caller decides what a
//! non-zero exit means.

use crate::error::{PassError, Result};
use crate::process::{Executor, Invocation, OpTag, ProcessOutput};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Long key id: 16 hex characters.
static KEY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]{16}$").expect("valid key id pattern"));

/// An identity that store entries can be encrypted for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    /// Identifier written to `.gpg-id` (long key id, fingerprint or user id).
    pub id: String,
    /// First user id of the key.
    pub name: String,
    pub fingerprint: String,
    pub enabled: bool,
    /// The local keyring holds the secret part.
    pub has_secret: bool,
    /// Ids of the keys gpg actually encrypts to for this identity.
    pub subkey_ids: Vec<String>,
}

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_secret(mut self, has_secret: bool) -> Self {
        self.has_secret = has_secret;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

pub fn is_key_id(token: &str) -> bool {
    KEY_ID.is_match(token)
}

/// Parse `gpg --with-colons --with-fingerprint` output.
///
/// `pub`/`sec` records start a new key. The primary and each `sub`/`ssb` record
/// contribute to `subkey_ids` only when their own capability field (lowercase
/// letters of field 12) includes `e`.
pub fn parse_colon_listing(output: &str, secret: bool) -> Vec<Recipient> {
    let mut keys: Vec<Recipient> = Vec::new();
    let mut expect_fingerprint = false;

    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        let Some(&record) = fields.first() else {
            continue;
        };
        let key_id = fields.get(4).copied().unwrap_or_default();
        let encrypts = fields.get(11).is_some_and(|caps| caps.contains('e'));

        match record {
            "pub" | "sec" => {
                let mut key = Recipient::new(key_id).with_secret(secret);
                if encrypts && is_key_id(key_id) {
                    key.subkey_ids.push(key_id.to_string());
                }
                keys.push(key);
                expect_fingerprint = true;
            }
            "sub" | "ssb" => {
                if let Some(key) = keys.last_mut() {
                    if encrypts && is_key_id(key_id) && !key.subkey_ids.iter().any(|k| k == key_id) {
                        key.subkey_ids.push(key_id.to_string());
                    }
                }
                expect_fingerprint = false;
            }
            "fpr" if expect_fingerprint => {
                if let (Some(key), Some(fpr)) = (keys.last_mut(), fields.get(9)) {
                    key.fingerprint = fpr.to_string();
                }
                expect_fingerprint = false;
            }
            "uid" => {
                if let (Some(key), Some(uid)) = (keys.last_mut(), fields.get(9)) {
                    if key.name.is_empty() {
                        key.name = uid.to_string();
                    }
                }
            }
            _ => {}
        }
    }
    keys
}

/// Key ids named in `gpg --list-only` output.
///
/// Lines are split on whitespace; the fifth token of lines that have one is kept
/// when it is exactly 16 characters (`gpg: public key is 0123456789ABCDEF`).
pub fn parse_list_only(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            (tokens.len() > 4).then(|| tokens[4])
        })
        .filter(|token| token.chars().count() == 16)
        .map(str::to_string)
        .collect()
}

/// gpg bound to an executable and an [`Executor`].
#[derive(Clone)]
pub struct Gpg {
    executor: Executor,
    program: PathBuf,
}

impl Gpg {
    pub fn new(executor: Executor, program: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }

    fn decrypt_invocation(&self, file: &Path) -> Invocation {
        Invocation::new(
            &self.program,
            [
                "-d",
                "--quiet",
                "--yes",
                "--no-encrypt-to",
                "--batch",
                "--use-agent",
            ],
        )
        .arg_path(file)
    }

    /// Decrypt `file` and return gpg's output; plaintext is on stdout.
    pub fn decrypt(&self, file: &Path) -> Result<ProcessOutput> {
        self.executor.run_blocking(&self.decrypt_invocation(file))
    }

    /// Fire-and-forget decrypt, completing with [`OpTag::Show`].
    pub fn decrypt_async(&self, file: &Path) {
        self.executor.spawn(OpTag::Show, self.decrypt_invocation(file));
    }

    /// Decrypt `file` to text, treating any failure as [`PassError::Decryption`].
    pub fn decrypt_text(&self, file: &Path) -> Result<String> {
        let output = self.decrypt(file)?;
        if !output.success() {
            return Err(PassError::Decryption {
                path: file.to_path_buf(),
                reason: output.stderr_str().trim().to_string(),
            });
        }
        Ok(output.stdout_str())
    }

    /// Encrypt `plaintext` for `recipients` into `file`. Without `overwrite` gpg
    /// refuses to replace an existing file.
    pub fn encrypt<S: AsRef<str>>(
        &self,
        file: &Path,
        recipients: &[S],
        plaintext: &[u8],
        overwrite: bool,
    ) -> Result<ProcessOutput> {
        let mut args: Vec<String> = vec!["--batch".into(), "-eq".into(), "--output".into()];
        args.push(file.to_string_lossy().into_owned());
        for recipient in recipients {
            args.push("-r".into());
            args.push(recipient.as_ref().to_string());
        }
        if overwrite {
            args.push("--yes".into());
        }
        args.push("-".into());

        let invocation = Invocation::new(&self.program, args).stdin(plaintext);
        self.executor.run_blocking(&invocation)
    }

    /// Ids of the keys `file` was encrypted for, sorted.
    pub fn list_only(&self, file: &Path) -> Result<Vec<String>> {
        let invocation = Invocation::new(
            &self.program,
            [
                "-v",
                "--no-secmem-warning",
                "--no-permission-warning",
                "--list-only",
                "--keyid-format=long",
            ],
        )
        .arg_path(file)
        .env("LC_ALL", "C");
        let output = self.executor.run_blocking(&invocation)?;

        let mut combined = output.stdout_str();
        combined.push_str(&output.stderr_str());
        let mut keys = parse_list_only(&combined);
        keys.sort();
        Ok(keys)
    }

    /// Keys matching `pattern` (all keys when empty) from the public or secret
    /// keyring.
    pub fn list_keys(&self, pattern: &str, secret: bool) -> Result<Vec<Recipient>> {
        let mut args = vec![
            "--no-tty",
            "--with-colons",
            "--with-fingerprint",
            if secret {
                "--list-secret-keys"
            } else {
                "--list-keys"
            },
        ];
        if !pattern.is_empty() {
            args.push(pattern);
        }
        let output = self
            .executor
            .run_blocking(&Invocation::new(&self.program, args))?;
        if !output.success() {
            tracing::debug!(pattern, status = output.status, "no keys listed");
        }
        Ok(parse_colon_listing(&output.stdout_str(), secret))
    }

    /// Public keys matching `pattern`, with `has_secret` set for those whose
    /// secret part is also present.
    pub fn recipients(&self, pattern: &str) -> Result<Vec<Recipient>> {
        let mut keys = self.list_keys(pattern, false)?;
        let secret = self.list_keys(pattern, true)?;
        for key in &mut keys {
            key.has_secret = secret.iter().any(|s| s.id == key.id);
        }
        Ok(keys)
    }

    /// Encryption key ids belonging to `recipient`.
    pub fn subkeys_of(&self, recipient: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for key in self.list_keys(recipient, false)? {
            for id in key.subkey_ids {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
tru::1:1700000000:0:3:1:5
pub:u:3072:1:AAAA111122223333:1700000000:::u:::scESC::::::23::0:
fpr:::::::::0123456789ABCDEF0123AAAA111122223333:
uid:u::::1700000000::HASH::Alice <alice@example.com>::::::::::0:
uid:u::::1700000000::HASH::Alice Work <alice@work.example>::::::::::0:
sub:u:3072:1:BBBB444455556666:1700000000::::::e::::::23:
fpr:::::::::FFFF0000FFFF0000FFFFBBBB444455556666:
sub:u:3072:1:CCCC777788889999:1700000000::::::s::::::23:
fpr:::::::::EEEE0000EEEE0000EEEECCCC777788889999:
pub:f:255:22:DDDD000011112222:1700000000:::-:::escaESC::::::23::0:
fpr:::::::::9999888877776666555544443333DDDD00001111:
uid:f::::1700000000::HASH::Bob <bob@example.com>::::::::::0:
";

    #[test]
    fn test_parse_colon_listing() {
        let keys = parse_colon_listing(LISTING, false);
        assert_eq!(keys.len(), 2);

        let alice = &keys[0];
        assert_eq!(alice.id, "AAAA111122223333");
        assert_eq!(alice.name, "Alice <alice@example.com>");
        assert_eq!(alice.fingerprint, "0123456789ABCDEF0123AAAA111122223333");
        assert!(alice.enabled);
        assert!(!alice.has_secret);
        assert_eq!(alice.subkey_ids, vec!["BBBB444455556666"]);

        let bob = &keys[1];
        assert_eq!(bob.id, "DDDD000011112222");
        assert_eq!(bob.name, "Bob <bob@example.com>");
        assert_eq!(bob.fingerprint, "9999888877776666555544443333DDDD00001111");
        assert_eq!(bob.subkey_ids, vec!["DDDD000011112222"]);
    }

    #[test]
    fn test_parse_secret_listing_marks_secret() {
        let listing = LISTING.replace("pub:", "sec:").replace("sub:", "ssb:");
        let keys = parse_colon_listing(&listing, true);
        assert!(keys.iter().all(|k| k.has_secret));
        assert_eq!(keys[0].subkey_ids, vec!["BBBB444455556666"]);
    }

    #[test]
    fn test_parse_list_only() {
        let output = "\
gpg: public key is BBBB444455556666
gpg: encrypted with 3072-bit RSA key, ID BBBB444455556666, created 2023-11-14
      \"Alice <alice@example.com>\"
gpg: public key is DDDD000011112222
gpg: public key is SHORT
gpg: anonymous recipient; trying secret key 0000000000000000 ...
";
        assert_eq!(
            parse_list_only(output),
            vec!["BBBB444455556666", "DDDD000011112222"]
        );
    }

    #[test]
    fn test_is_key_id() {
        assert!(is_key_id("BBBB444455556666"));
        assert!(is_key_id("bbbb444455556666"));
        assert!(!is_key_id("BBBB44445555666"));
        assert!(!is_key_id("ZZZZ444455556666"));
    }

    #[test]
    fn test_recipient_builder() {
        let r = Recipient::new("alice").with_secret(true).enabled(false);
        assert_eq!(r.id, "alice");
        assert!(r.has_secret);
        assert!(!r.enabled);
        assert!(r.subkey_ids.is_empty());
    }
}
