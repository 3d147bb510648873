//! Tests for credential resolution order and interactive flows.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use owlkit_credentials::backend::MemoryBackend;
use owlkit_credentials::{
    CredentialError, CredentialManager, GetOptions, Mode, Prompter, SecretBackend, SetOutcome,
};

/// Answers prompts from a script and records what was asked.
#[derive(Clone, Default)]
struct ScriptedPrompter {
    secrets: Arc<Mutex<VecDeque<String>>>,
    confirms: Arc<Mutex<VecDeque<bool>>>,
    asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedPrompter {
    fn new(secrets: &[&str], confirms: &[bool]) -> Self {
        Self {
            secrets: Arc::new(Mutex::new(secrets.iter().map(|s| s.to_string()).collect())),
            confirms: Arc::new(Mutex::new(confirms.iter().copied().collect())),
            asked: Arc::default(),
        }
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn secret(&self, prompt: &str) -> io::Result<String> {
        self.asked.lock().unwrap().push(prompt.to_string());
        self.secrets
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted secret"))
    }

    fn confirm(&self, question: &str, _default: bool) -> io::Result<bool> {
        self.asked.lock().unwrap().push(question.to_string());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }
}

fn manager_with(
    prompter: ScriptedPrompter,
    env: &[(&str, &str)],
) -> (Arc<MemoryBackend>, CredentialManager) {
    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let backend = Arc::new(MemoryBackend::new());
    let manager = CredentialManager::with_backend(Box::new(SharedBackend(backend.clone())))
        .with_prompter(prompter)
        .with_env_lookup(move |name| env.get(name).cloned());
    (backend, manager)
}

/// Lets a test inspect the backend the manager owns.
struct SharedBackend(Arc<MemoryBackend>);

impl SecretBackend for SharedBackend {
    fn kind(&self) -> owlkit_credentials::BackendKind {
        self.0.kind()
    }
    fn get(&self, service: &str) -> owlkit_credentials::Result<Option<owlkit_credentials::Credential>> {
        self.0.get(service)
    }
    fn set(&self, credential: &owlkit_credentials::Credential) -> owlkit_credentials::Result<()> {
        self.0.set(credential)
    }
    fn delete(&self, service: &str) -> owlkit_credentials::Result<()> {
        self.0.delete(service)
    }
    fn list(&self) -> owlkit_credentials::Result<Vec<String>> {
        self.0.list()
    }
}

// Resolution order
#[test]
fn cli_value_wins_over_stored_and_env() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[("OWLKIT_CGC_TOKEN", "envval")]);
    m.set("cgc", "stored", Mode::NonInteractive).unwrap();

    let opts = GetOptions::non_interactive()
        .cli_value("clival")
        .env_var("OWLKIT_CGC_TOKEN");
    assert_eq!(m.get("cgc", &opts).unwrap().expose(), b"clival");
}

#[test]
fn stored_wins_over_env() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[("OWLKIT_CGC_TOKEN", "envval")]);
    m.set("cgc", "stored", Mode::NonInteractive).unwrap();

    let opts = GetOptions::non_interactive().env_var("OWLKIT_CGC_TOKEN");
    assert_eq!(m.get("cgc", &opts).unwrap().expose(), b"stored");
}

#[test]
fn env_used_when_nothing_stored() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[("OWLKIT_CGC_TOKEN", "envval")]);

    let opts = GetOptions::non_interactive().env_var("OWLKIT_CGC_TOKEN");
    assert_eq!(m.get("cgc", &opts).unwrap().expose(), b"envval");
}

#[test]
fn empty_env_value_counts_as_unset() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[("OWLKIT_CGC_TOKEN", "")]);

    let opts = GetOptions::non_interactive().env_var("OWLKIT_CGC_TOKEN");
    assert!(matches!(
        m.get("cgc", &opts),
        Err(CredentialError::NoCredential { .. })
    ));
}

#[test]
fn maybe_cli_value_none_leaves_option_unset() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[]);
    m.set("cgc", "stored", Mode::NonInteractive).unwrap();

    let opts = GetOptions::non_interactive().maybe_cli_value(None::<String>);
    assert!(opts.cli_value.is_none());
    assert_eq!(m.get("cgc", &opts).unwrap().expose(), b"stored");
}

// Non-interactive miss
#[test]
fn non_interactive_miss_fails_without_prompting() {
    let prompter = ScriptedPrompter::new(&["should-not-be-read"], &[true]);
    let (_, m) = manager_with(prompter.clone(), &[]);

    let opts = GetOptions::non_interactive().env_var("OWLKIT_CGC_TOKEN");
    let err = m.get("cgc", &opts).unwrap_err();
    assert!(prompter.asked().is_empty());

    let CredentialError::NoCredential { service, env_var } = &err else {
        panic!("expected NoCredential, got {err:?}");
    };
    assert_eq!(service, "cgc");
    assert_eq!(env_var.as_deref(), Some("OWLKIT_CGC_TOKEN"));
    let msg = err.to_string();
    assert!(msg.contains("cgc"));
    assert!(msg.contains("OWLKIT_CGC_TOKEN"));
    assert!(!msg.contains('\n'));
}

// Interactive prompting
#[test]
fn interactive_prompt_and_persist() {
    let prompter = ScriptedPrompter::new(&["typed-token\n"], &[true]);
    let (backend, m) = manager_with(prompter.clone(), &[]);

    let secret = m
        .get("ghcr", &GetOptions::interactive().prompt("GitHub token: "))
        .unwrap();
    assert_eq!(secret.expose(), b"typed-token");
    assert_eq!(prompter.asked()[0], "GitHub token: ");

    let stored = backend.get("ghcr").unwrap().unwrap();
    assert_eq!(stored.secret.expose(), b"typed-token");
}

#[test]
fn interactive_prompt_without_persisting() {
    let prompter = ScriptedPrompter::new(&["typed-token"], &[false]);
    let (backend, m) = manager_with(prompter, &[]);

    let secret = m.get("ghcr", &GetOptions::interactive()).unwrap();
    assert_eq!(secret.expose(), b"typed-token");
    assert!(backend.get("ghcr").unwrap().is_none());
}

#[test]
fn interactive_empty_answer_is_declined() {
    let prompter = ScriptedPrompter::new(&["   "], &[]);
    let (_, m) = manager_with(prompter, &[]);

    assert!(matches!(
        m.get("ghcr", &GetOptions::interactive()),
        Err(CredentialError::NoCredential { .. })
    ));
}

#[test]
fn interactive_prefers_stored_over_prompt() {
    let prompter = ScriptedPrompter::new(&["typed"], &[true]);
    let (_, m) = manager_with(prompter.clone(), &[]);
    m.set("ghcr", "stored", Mode::NonInteractive).unwrap();

    assert_eq!(
        m.get("ghcr", &GetOptions::interactive()).unwrap().expose(),
        b"stored"
    );
    assert!(prompter.asked().is_empty());
}

#[test]
fn unreadable_terminal_is_prompt_error() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[]);
    assert!(matches!(
        m.get("ghcr", &GetOptions::interactive()),
        Err(CredentialError::Prompt(_))
    ));
}

// Set / replace
#[test]
fn interactive_replace_requires_confirmation() {
    let prompter = ScriptedPrompter::new(&[], &[false, true]);
    let (_, m) = manager_with(prompter.clone(), &[]);

    assert_eq!(m.set("cgc", "first", Mode::Interactive).unwrap(), SetOutcome::Created);
    assert!(prompter.asked().is_empty());

    assert_eq!(m.set("cgc", "second", Mode::Interactive).unwrap(), SetOutcome::Kept);
    let opts = GetOptions::non_interactive();
    assert_eq!(m.get("cgc", &opts).unwrap().expose(), b"first");

    assert_eq!(m.set("cgc", "third", Mode::Interactive).unwrap(), SetOutcome::Replaced);
    assert_eq!(m.get("cgc", &opts).unwrap().expose(), b"third");
    assert_eq!(prompter.asked().len(), 2);
}

#[test]
fn set_with_username_keeps_metadata() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[]);
    m.set_with_username("ghcr", "octocat", "pat", Mode::NonInteractive)
        .unwrap();
    assert_eq!(m.username("ghcr").unwrap().as_deref(), Some("octocat"));
    assert_eq!(m.username("missing").unwrap(), None);
}

// Delete / list
#[test]
fn delete_is_idempotent() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[]);
    m.delete("never-stored").unwrap();

    m.set("cgc", "t", Mode::NonInteractive).unwrap();
    m.delete("cgc").unwrap();
    m.delete("cgc").unwrap();
    assert!(m.list_services().unwrap().is_empty());
}

#[test]
fn list_services_returns_names_only() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[]);
    m.set("sbg-us", "a", Mode::NonInteractive).unwrap();
    m.set("cgc", "b", Mode::NonInteractive).unwrap();
    assert_eq!(m.list_services().unwrap(), vec!["cgc", "sbg-us"]);
}

// Force-new flow
#[test]
fn prompt_and_store_ignores_stored_value() {
    let prompter = ScriptedPrompter::new(&["fresh"], &[true]);
    let (backend, m) = manager_with(prompter, &[]);
    m.set("cgc", "stale", Mode::NonInteractive).unwrap();

    let secret = m.prompt_and_store("cgc", None).unwrap();
    assert_eq!(secret.expose(), b"fresh");
    assert_eq!(backend.get("cgc").unwrap().unwrap().secret.expose(), b"fresh");
}

// Platforms
#[test]
fn platform_token_from_env() {
    let (_, m) = manager_with(
        ScriptedPrompter::default(),
        &[("OWLKIT_SBG_EU_TOKEN", "eu-token")],
    );
    let token = m
        .get_platform_token(Some("sbg-eu"), Mode::NonInteractive, None)
        .unwrap();
    assert_eq!(token.expose(), b"eu-token");
}

#[test]
fn platform_token_defaults_to_cgc() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[("OWLKIT_CGC_TOKEN", "cgc-token")]);
    let token = m.get_platform_token(None, Mode::NonInteractive, None).unwrap();
    assert_eq!(token.expose(), b"cgc-token");
}

#[test]
fn platform_token_respects_env_prefix() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[("CI_CGC_TOKEN", "ci")]);
    let m = m.with_env_prefix("CI");
    let token = m.get_platform_token(Some("cgc"), Mode::NonInteractive, None).unwrap();
    assert_eq!(token.expose(), b"ci");
}

#[test]
fn platform_token_missing_names_env_var() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[]);
    let err = m
        .get_platform_token(Some("biodata-catalyst"), Mode::NonInteractive, None)
        .unwrap_err();
    assert!(err.to_string().contains("OWLKIT_BIODATA_CATALYST_TOKEN"));
}

#[test]
fn platform_token_unknown_platform() {
    let (_, m) = manager_with(ScriptedPrompter::default(), &[]);
    assert!(matches!(
        m.get_platform_token(Some("nonexistent"), Mode::NonInteractive, None),
        Err(CredentialError::UnknownPlatform { .. })
    ));
}

// Migration
#[test]
fn import_from_other_backend() {
    let (backend, m) = manager_with(ScriptedPrompter::default(), &[]);
    let legacy = MemoryBackend::new();
    legacy
        .set(&owlkit_credentials::Credential::new("cgc", "legacy"))
        .unwrap();

    assert_eq!(m.import_from(&legacy).unwrap(), 1);
    assert_eq!(backend.get("cgc").unwrap().unwrap().secret.expose(), b"legacy");
}

// Secrets never leak through errors
#[test]
fn errors_never_contain_secret_values() {
    let prompter = ScriptedPrompter::new(&[], &[]);
    let (_, m) = manager_with(prompter, &[]);
    m.set("cgc", "super-secret-value", Mode::NonInteractive).unwrap();

    let err = m
        .get("other", &GetOptions::non_interactive().env_var("OWLKIT_OTHER_TOKEN"))
        .unwrap_err();
    assert!(!err.to_string().contains("super-secret-value"));
    assert!(!format!("{err:?}").contains("super-secret-value"));
}
