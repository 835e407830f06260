//! Binary-level tests for the payrec CLI

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn payrec(base: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("payrec").unwrap();
    cmd.env("PAYEE_RECON_DIR", base.path())
        .env_remove("RUST_LOG")
        .env_remove("CNPJA_API_KEY");
    cmd
}

#[test]
fn test_extract_masked_cpf() {
    let base = TempDir::new().unwrap();
    payrec(&base)
        .args(["extract", "Pagamento Pix ANA SOUZA ***.123.456-** Banco X"])
        .assert()
        .success()
        .stdout(predicate::str::contains("***.123.456-** (masked CPF)"))
        .stdout(predicate::str::contains("Digits:      123456 (person)"))
        .stdout(predicate::str::contains("Payee:       ANA SOUZA"));
}

#[test]
fn test_extract_json() {
    let base = TempDir::new().unwrap();
    let output = payrec(&base)
        .args(["extract", "--json", "TED 12.345.678/0001-99 CODIGO TED: AB12"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let details: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(details["identifier"]["source"], "cnpj");
    assert_eq!(details["ted_code"], "AB12");
}

#[test]
fn test_init_and_config() {
    let base = TempDir::new().unwrap();
    payrec(&base)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Default settings written"));
    assert!(base.path().join("config.json").exists());
    assert!(base.path().join("data").is_dir());

    payrec(&base)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("left unchanged"));

    payrec(&base)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Base directory:"))
        .stdout(predicate::str::contains("\"max_retries\": 3"));
}

#[test]
fn test_cache_show_and_reset() {
    let base = TempDir::new().unwrap();
    payrec(&base)
        .args(["cache", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached companies."));

    fs::create_dir_all(base.path().join("data")).unwrap();
    fs::write(
        base.path().join("data").join("registry_cache.json"),
        r#"{"12345678000199": {"razao_social": "ACME COMERCIO LTDA", "qsa": []}}"#,
    )
    .unwrap();

    payrec(&base)
        .args(["cache", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("12345678000199   ACME COMERCIO LTDA"))
        .stdout(predicate::str::contains("1 cached companies"));

    payrec(&base)
        .args(["cache", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Previous cache kept at"));

    payrec(&base)
        .args(["cache", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached companies."));

    payrec(&base)
        .arg("audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("RESET RegistryCache"));
}

#[test]
fn test_lookup_without_api_key_fails_cleanly() {
    let base = TempDir::new().unwrap();
    payrec(&base)
        .args(["lookup", "12.345.678/0001-99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CNPJA_API_KEY"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_run_without_statement_fails_cleanly() {
    let base = TempDir::new().unwrap();
    payrec(&base)
        .arg("run")
        .env("CNPJA_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_run_without_api_key_completes() {
    let base = TempDir::new().unwrap();
    let data = base.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        data.join("contacts.csv"),
        "cpf_cnpj;nome;razao_social;nome_fantasia;socios\n00000012345;Ana Souza;;;\n",
    )
    .unwrap();
    fs::write(
        data.join("transactions.json"),
        r#"[
            {"data": "01/03/2025", "descricao": "PIX", "valor": -50,
             "cpf_cnpj_parcial": "***.123.456-**", "favorecido": "Ana Souza"},
            {"data": "02/03/2025", "descricao": "TED", "valor": 70,
             "cpf_cnpj_parcial": "98.765.432/0001-00", "favorecido": "DESCONHECIDA LTDA"}
        ]"#,
    )
    .unwrap();

    payrec(&base)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 attached, 1 without candidate"))
        .stderr(predicate::str::contains("CNPJA_API_KEY"));

    assert!(base
        .path()
        .join("output")
        .join("reconciled_transactions.json")
        .exists());
    // Failed lookups are never cached
    let cache = data.join("registry_cache.json");
    assert!(!cache.exists() || !fs::read_to_string(cache).unwrap().contains("98765432000100"));
}

#[test]
fn test_aliases_integrate_then_audit() {
    let base = TempDir::new().unwrap();
    fs::create_dir_all(base.path().join("data")).unwrap();
    fs::write(
        base.path().join("data").join("aliases.csv"),
        "nome;cpf\nCarla Dias;987.654.321-00\nSem Documento;\n",
    )
    .unwrap();

    payrec(&base)
        .args(["aliases", "integrate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added:     1"))
        .stdout(predicate::str::contains("Invalid:   1"))
        .stdout(predicate::str::contains("Dry run"));
    assert!(!base.path().join("data").join("contacts.csv").exists());

    payrec(&base)
        .args(["aliases", "integrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Contacts saved"));

    let contacts = fs::read_to_string(base.path().join("data").join("contacts.csv")).unwrap();
    assert!(contacts.contains("98765432100;Carla Dias"));

    payrec(&base)
        .args(["audit", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"origin\": \"alias_integration\""));
}

#[test]
fn test_missing_alias_file_is_reported() {
    let base = TempDir::new().unwrap();
    payrec(&base)
        .args(["aliases", "backfill"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Alias file not found"));
}
