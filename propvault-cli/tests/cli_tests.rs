use clap::Parser;
use propvault_cli::{Command, PREVIOUS_MASTER_KEY_ENV, run};
use propvault_store::{PropertyServices, ServerConfig, SqliteBackend};

const FAST_KDF: &str = "
[encryption.kdf]
memory_cost = 1024
time_cost = 1
parallelism = 1
";

#[derive(Parser)]
struct TestCli {
    #[command(subcommand)]
    command: Command,
}

fn parse(args: &[&str]) -> Command {
    TestCli::try_parse_from(std::iter::once("propvault").chain(args.iter().copied()))
        .unwrap()
        .command
}

fn config(master_key: Option<&str>) -> ServerConfig {
    let mut text = String::new();
    if let Some(key) = master_key {
        text.push_str(&format!("[encryption]\nmaster_key = \"{key}\"\n"));
    }
    text.push_str(FAST_KDF);
    ServerConfig::from_toml(&text).unwrap()
}

struct Harness {
    config: ServerConfig,
    services: PropertyServices,
}

impl Harness {
    fn new(backend: &SqliteBackend, master_key: Option<&str>) -> Self {
        let config = config(master_key);
        let services = PropertyServices::new(&config, backend.clone()).unwrap();
        Self { config, services }
    }

    fn exec(&self, args: &[&str]) -> anyhow::Result<String> {
        self.exec_with_env(args, |_| None)
    }

    fn exec_with_env(
        &self,
        args: &[&str],
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<String> {
        let mut out = Vec::new();
        run(&parse(args), &self.config, &self.services, env, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }
}

// ── parsing ──────────────────────────────────────────────────────

#[test]
fn parses_set_with_optional_value() {
    match parse(&["set", "tenant", "smtp", "password", "hunter2"]) {
        Command::Set {
            target,
            name,
            value,
        } => {
            assert_eq!(target.owner, "tenant");
            assert_eq!(target.category, "smtp");
            assert!(!target.plain);
            assert_eq!(name, "password");
            assert_eq!(value.as_deref(), Some("hunter2"));
        }
        other => panic!("unexpected command {other:?}"),
    }
    match parse(&["set", "--plain", "tenant", "ui", "theme"]) {
        Command::Set { target, value, .. } => {
            assert!(target.plain);
            assert_eq!(value, None);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn rekey_defaults_to_previous_key_env() {
    assert_eq!(
        parse(&["rekey"]),
        Command::Rekey {
            previous_key_env: PREVIOUS_MASTER_KEY_ENV.to_string()
        }
    );
}

// ── commands ─────────────────────────────────────────────────────

#[test]
fn check_reports_configuration() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let with_key = Harness::new(&backend, Some("k"));
    let out = with_key.exec(&["check"]).unwrap();
    assert!(out.contains("AES128"));
    assert!(out.contains("ok"));

    let without_key = Harness::new(&backend, None);
    let err = without_key.exec(&["check"]).unwrap_err();
    assert!(format!("{err:#}").contains("master encryption key"));
}

#[test]
fn set_get_show_delete_cycle() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let cli = Harness::new(&backend, Some("k"));

    cli.exec(&["set", "tenant", "smtp", "user", "postmaster"]).unwrap();
    cli.exec(&["set", "tenant", "smtp", "password", "hunter2"]).unwrap();
    cli.exec(&["set", "tenant", "smtp", "unused"]).unwrap();

    assert_eq!(cli.exec(&["get", "tenant", "smtp", "password"]).unwrap(), "hunter2\n");
    assert_eq!(cli.exec(&["get", "tenant", "smtp", "unused"]).unwrap(), "(null)\n");
    assert!(cli.exec(&["get", "tenant", "smtp", "missing"]).is_err());

    assert_eq!(
        cli.exec(&["show", "tenant", "smtp"]).unwrap(),
        "user = postmaster\npassword = hunter2\nunused = (null)\n"
    );

    let json: serde_json::Value =
        serde_json::from_str(&cli.exec(&["show", "tenant", "smtp", "--json"]).unwrap()).unwrap();
    assert_eq!(json[0]["name"], "user");
    assert_eq!(json[1]["value"], "hunter2");
    assert!(json[2]["value"].is_null());

    assert_eq!(
        cli.exec(&["delete", "tenant", "smtp", "password"]).unwrap(),
        "deleted\n"
    );
    assert_eq!(
        cli.exec(&["delete", "tenant", "smtp", "password"]).unwrap(),
        "nothing to delete\n"
    );
    assert_eq!(cli.exec(&["delete", "tenant", "smtp"]).unwrap(), "deleted\n");
    assert_eq!(cli.exec(&["show", "tenant", "smtp"]).unwrap(), "");
}

#[test]
fn set_without_master_key_fails() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let cli = Harness::new(&backend, None);
    let err = cli.exec(&["set", "tenant", "smtp", "k", "v"]).unwrap_err();
    assert!(format!("{err:#}").contains("master encryption key"));

    // Plain-text properties still work.
    cli.exec(&["set", "--plain", "tenant", "ui", "theme", "dark"]).unwrap();
    assert_eq!(cli.exec(&["get", "--plain", "tenant", "ui", "theme"]).unwrap(), "dark\n");
}

#[test]
fn list_separates_plain_and_encrypted_scopes() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let cli = Harness::new(&backend, Some("k"));
    cli.exec(&["set", "tenant", "smtp", "k", "v"]).unwrap();
    cli.exec(&["set", "tenant", "ldap", "k", "v"]).unwrap();
    cli.exec(&["set", "--plain", "tenant", "ui", "k", "v"]).unwrap();

    assert_eq!(
        cli.exec(&["list"]).unwrap(),
        "tenant/ldap\tAES128\ntenant/smtp\tAES128\n"
    );
    assert_eq!(cli.exec(&["list", "--category", "smtp"]).unwrap(), "tenant/smtp\tAES128\n");
    assert_eq!(cli.exec(&["list", "--plain"]).unwrap(), "tenant/ui\tNone\n");
}

#[test]
fn rekey_uses_previous_key_from_env() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let old = Harness::new(&backend, Some("old-key"));
    old.exec(&["set", "tenant", "smtp", "password", "hunter2"]).unwrap();

    let new = Harness::new(&backend, Some("new-key"));
    assert!(new.exec(&["get", "tenant", "smtp", "password"]).is_err());

    let err = new.exec(&["rekey"]).unwrap_err();
    assert!(format!("{err}").contains(PREVIOUS_MASTER_KEY_ENV));

    let out = new
        .exec_with_env(&["rekey"], |var| {
            (var == PREVIOUS_MASTER_KEY_ENV).then(|| "old-key".to_string())
        })
        .unwrap();
    assert_eq!(out, "re-encrypted 1 property sets\n");
    assert_eq!(new.exec(&["get", "tenant", "smtp", "password"]).unwrap(), "hunter2\n");
}
