//! Shared test support.
//!
//! [`FakeGpg`] stands in for the gpg binary so the suites run without a
//! keyring. Invocations of any other program (git) are recorded and then go
//! to the real [`SystemRunner`].
//!
//! Ciphertext written by the fake is a plain envelope:
//!
//! ```text
//! FAKEGPG
//! <comma separated encryption key ids>
//! <plaintext>
//! ```

#![allow(dead_code)]

use git2::Repository;
use pass_imitate::process::{is_program, Invocation};
use pass_imitate::{ImitatePass, ProcessOutput, Runner, Settings, SystemRunner};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const FAKE_GPG: &str = "fake-gpg";
const ENVELOPE: &str = "FAKEGPG";

pub const ALICE: &str = "AAAA000000000001";
pub const ALICE_SUB: &str = "AAAA0000000000E1";
pub const BOB: &str = "BBBB000000000001";
pub const BOB_SUB: &str = "BBBB0000000000E1";
pub const CAROL: &str = "CCCC000000000001";
pub const CAROL_SUB: &str = "CCCC0000000000E1";

#[derive(Debug, Clone)]
pub struct FakeKey {
    pub id: String,
    pub uid: String,
    pub subkey: String,
    pub secret: bool,
}

impl FakeKey {
    fn fingerprint(&self) -> String {
        format!("{:0>40}", self.id)
    }

    fn matches(&self, pattern: &str) -> bool {
        pattern.is_empty()
            || self.id.eq_ignore_ascii_case(pattern)
            || self.uid.contains(pattern)
    }
}

/// In-memory keyring answering the gpg calls the store makes.
pub struct FakeGpg {
    keys: Vec<FakeKey>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeGpg {
    /// Alice and Bob with secret keys, Carol public only.
    pub fn new() -> Self {
        Self {
            keys: vec![
                fake_key(ALICE, "Alice <alice@example.com>", ALICE_SUB, true),
                fake_key(BOB, "Bob <bob@example.com>", BOB_SUB, true),
                fake_key(CAROL, "Carol <carol@example.com>", CAROL_SUB, false),
            ],
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of gpg calls carrying `arg`.
    pub fn calls_with(&self, arg: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| is_program(&inv.program, FAKE_GPG) && inv.has_arg(arg))
            .count()
    }

    /// Every invocation seen so far, git included, in order.
    pub fn call_log(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn decrypts(&self) -> usize {
        self.calls_with("-d")
    }

    pub fn encrypts(&self) -> usize {
        self.calls_with("-eq")
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn find(&self, pattern: &str) -> Option<&FakeKey> {
        self.keys.iter().find(|key| key.matches(pattern))
    }

    fn handle(&self, inv: &Invocation) -> ProcessOutput {
        if inv.has_arg("-eq") {
            self.encrypt(inv)
        } else if inv.has_arg("-d") {
            self.decrypt(inv)
        } else if inv.has_arg("--list-only") {
            self.list_only(inv)
        } else if inv.has_arg("--list-keys") {
            self.list_keys(inv, false)
        } else if inv.has_arg("--list-secret-keys") {
            self.list_keys(inv, true)
        } else {
            output(2, "", "gpg: unsupported invocation")
        }
    }

    fn encrypt(&self, inv: &Invocation) -> ProcessOutput {
        let Some(file) = value_after(inv, "--output") else {
            return output(2, "", "gpg: no output file");
        };
        if Path::new(file).exists() && !inv.has_arg("--yes") {
            return output(2, "", &format!("gpg: File '{file}' exists."));
        }
        let mut subkeys = Vec::new();
        for (i, arg) in inv.args.iter().enumerate() {
            if arg != "-r" {
                continue;
            }
            let recipient = inv.args.get(i + 1).map(String::as_str).unwrap_or_default();
            match self.find(recipient) {
                Some(key) => subkeys.push(key.subkey.clone()),
                None => {
                    return output(
                        2,
                        "",
                        &format!("gpg: {recipient}: skipped: No public key"),
                    )
                }
            }
        }
        let plaintext = inv.stdin.clone().unwrap_or_default();
        let mut envelope = format!("{ENVELOPE}\n{}\n", subkeys.join(",")).into_bytes();
        envelope.extend(plaintext);
        match fs::write(file, envelope) {
            Ok(()) => output(0, "", ""),
            Err(err) => output(2, "", &format!("gpg: {err}")),
        }
    }

    fn decrypt(&self, inv: &Invocation) -> ProcessOutput {
        let Some((subkeys, body)) = inv.args.last().and_then(|f| read_envelope(f)) else {
            return output(2, "", "gpg: decryption failed: No secret key");
        };
        let readable = self
            .keys
            .iter()
            .any(|key| key.secret && subkeys.contains(&key.subkey));
        if !readable {
            return output(2, "", "gpg: decryption failed: No secret key");
        }
        ProcessOutput {
            status: 0,
            stdout: body,
            stderr: Vec::new(),
        }
    }

    fn list_only(&self, inv: &Invocation) -> ProcessOutput {
        let subkeys = inv
            .args
            .last()
            .and_then(|f| read_envelope(f))
            .map(|(subkeys, _)| subkeys)
            .unwrap_or_default();
        let stderr: String = subkeys
            .iter()
            .map(|key| format!("gpg: public key is {key}\n"))
            .collect();
        output(0, "", &stderr)
    }

    fn list_keys(&self, inv: &Invocation, secret: bool) -> ProcessOutput {
        let pattern = inv
            .args
            .last()
            .filter(|arg| !arg.starts_with("--"))
            .map(String::as_str)
            .unwrap_or_default();
        let (primary, sub) = if secret { ("sec", "ssb") } else { ("pub", "sub") };
        let mut listing = String::new();
        for key in self
            .keys
            .iter()
            .filter(|key| key.matches(pattern) && (key.secret || !secret))
        {
            listing.push_str(&format!(
                "{primary}:u:3072:1:{}:1700000000:::u:::scSC::::::23::0:\n",
                key.id
            ));
            listing.push_str(&format!("fpr:::::::::{}:\n", key.fingerprint()));
            listing.push_str(&format!(
                "uid:u::::1700000000::HASH::{}::::::::::0:\n",
                key.uid
            ));
            listing.push_str(&format!(
                "{sub}:u:3072:1:{}:1700000000::::::e::::::23:\n",
                key.subkey
            ));
        }
        let status = if listing.is_empty() { 2 } else { 0 };
        output(status, &listing, "")
    }
}

impl Runner for FakeGpg {
    fn run(&self, invocation: &Invocation) -> pass_imitate::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        if !is_program(&invocation.program, FAKE_GPG) {
            return SystemRunner.run(invocation);
        }
        Ok(self.handle(invocation))
    }
}

fn fake_key(id: &str, uid: &str, subkey: &str, secret: bool) -> FakeKey {
    FakeKey {
        id: id.into(),
        uid: uid.into(),
        subkey: subkey.into(),
        secret,
    }
}

fn output(status: i32, stdout: &str, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        status,
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

fn value_after<'a>(inv: &'a Invocation, flag: &str) -> Option<&'a str> {
    let pos = inv.args.iter().position(|arg| arg == flag)?;
    inv.args.get(pos + 1).map(String::as_str)
}

/// Key ids and plaintext of an envelope file.
pub fn read_envelope(file: impl AsRef<Path>) -> Option<(Vec<String>, Vec<u8>)> {
    let data = fs::read(file).ok()?;
    let header = format!("{ENVELOPE}\n");
    let rest = data.strip_prefix(header.as_bytes())?;
    let newline = rest.iter().position(|&b| b == b'\n')?;
    let keys = String::from_utf8_lossy(&rest[..newline])
        .split(',')
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    Some((keys, rest[newline + 1..].to_vec()))
}

/// Sorted key ids an entry file is encrypted for.
pub fn envelope_keys(file: impl AsRef<Path>) -> Vec<String> {
    let mut keys = read_envelope(file).map(|(keys, _)| keys).unwrap_or_default();
    keys.sort();
    keys
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A store in a fresh temporary directory backed by [`FakeGpg`].
pub struct TestStore {
    pub temp: TempDir,
    pub gpg: Arc<FakeGpg>,
    pub store: ImitatePass,
}

impl TestStore {
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn write_gpg_id(&self, dir: &str, ids: &[&str]) {
        let dir = self.root().join(dir);
        fs::create_dir_all(&dir).unwrap();
        let mut content = ids.join("\n");
        content.push('\n');
        fs::write(dir.join(".gpg-id"), content).unwrap();
    }

    pub fn entry(&self, name: &str) -> std::path::PathBuf {
        self.root().join(format!("{name}.gpg"))
    }
}

pub fn settings_for(root: &Path, use_git: bool) -> Settings {
    Settings::new(root).with_gpg(FAKE_GPG).with_use_git(use_git)
}

/// Store without git.
pub fn plain_store() -> TestStore {
    store_with(|root| settings_for(root, false))
}

/// Store inside a freshly initialised git repository with an identity set.
pub fn git_store() -> TestStore {
    let test = store_with(|root| settings_for(root, true));
    create_git_repo(test.root());
    test
}

pub fn store_with(settings: impl FnOnce(&Path) -> Settings) -> TestStore {
    init_tracing();
    let temp = TempDir::new().expect("failed to create temp dir");
    let gpg = Arc::new(FakeGpg::new());
    let store = ImitatePass::with_runner(settings(temp.path()), gpg.clone());
    TestStore { temp, gpg, store }
}

pub fn create_git_repo(dir: &Path) {
    let repo = Repository::init(dir).expect("failed to init git repo");
    let mut config = repo.config().expect("failed to open git config");
    config
        .set_str("user.email", "test@example.com")
        .expect("failed to set git user.email");
    config
        .set_str("user.name", "Test User")
        .expect("failed to set git user.name");
}

/// Messages of every commit reachable from HEAD, newest first, trimmed.
pub fn commit_messages(dir: &Path) -> Vec<String> {
    let repo = Repository::open(dir).expect("failed to open repo");
    let mut walk = repo.revwalk().expect("failed to walk history");
    if walk.push_head().is_err() {
        return Vec::new();
    }
    walk.map(|oid| {
        let commit = repo.find_commit(oid.unwrap()).unwrap();
        commit.message().unwrap_or_default().trim().to_string()
    })
    .collect()
}

/// `true` when `rel` is tracked at HEAD.
pub fn tracked_at_head(dir: &Path, rel: &str) -> bool {
    let repo = Repository::open(dir).expect("failed to open repo");
    let Ok(head) = repo.head() else {
        return false;
    };
    let tree = head.peel_to_tree().unwrap();
    tree.get_path(Path::new(rel)).is_ok()
}
