use propvault_crypto::{KEY_SIZE, KdfParams, MasterKey, Salt, derive_key};
use std::sync::Arc;
use std::thread;

fn test_params() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

// ── derive_key ───────────────────────────────────────────────────

#[test]
fn derive_key_produces_consistent_results() {
    let salt = Salt::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
    let params = test_params();
    let key1 = derive_key("test_password_123", &salt, &params).unwrap();
    let key2 = derive_key("test_password_123", &salt, &params).unwrap();
    assert_eq!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn different_passwords_produce_different_keys() {
    let salt = Salt::from_bytes([1; 16]);
    let params = test_params();
    let key1 = derive_key("password1", &salt, &params).unwrap();
    let key2 = derive_key("password2", &salt, &params).unwrap();
    assert_ne!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn different_salts_produce_different_keys() {
    let params = test_params();
    let key1 = derive_key("same_password", &Salt::from_bytes([1; 16]), &params).unwrap();
    let key2 = derive_key("same_password", &Salt::from_bytes([2; 16]), &params).unwrap();
    assert_ne!(key1.as_bytes(), key2.as_bytes());
}

#[test]
fn invalid_params_fail_derivation() {
    let params = KdfParams {
        memory_cost: 1,
        time_cost: 0,
        parallelism: 0,
    };
    let err = derive_key("pw", &Salt::random(), &params).unwrap_err();
    assert!(format!("{err}").contains("key derivation failed"));
}

#[test]
fn derived_key_is_aes128_sized() {
    let key = derive_key("pw", &Salt::random(), &test_params()).unwrap();
    assert_eq!(key.as_bytes().len(), KEY_SIZE);
    assert_eq!(KEY_SIZE, 16);
}

#[test]
fn derived_key_debug_redacts() {
    let key = derive_key("pw", &Salt::random(), &test_params()).unwrap();
    let debug = format!("{key:?}");
    assert!(debug.contains("REDACTED"));
}

// ── MasterKey ────────────────────────────────────────────────────

#[test]
fn master_key_seal_open_roundtrip() {
    let master = MasterKey::with_params("correct horse", test_params()).unwrap();
    let sealed = master.seal(b"secret value").unwrap();
    assert_eq!(master.open(&sealed).unwrap(), b"secret value");
}

#[test]
fn master_key_opens_values_from_another_session() {
    let writer = MasterKey::with_params("shared passphrase", test_params()).unwrap();
    let reader = MasterKey::with_params("shared passphrase", test_params()).unwrap();
    let sealed = writer.seal(b"persisted").unwrap();
    assert_eq!(reader.open(&sealed).unwrap(), b"persisted");
}

#[test]
fn master_key_wrong_passphrase_fails() {
    let writer = MasterKey::with_params("passphrase one", test_params()).unwrap();
    let reader = MasterKey::with_params("passphrase two", test_params()).unwrap();
    let sealed = writer.seal(b"persisted").unwrap();
    let err = reader.open(&sealed).unwrap_err();
    assert!(format!("{err}").contains("decryption failed"));
}

#[test]
fn master_key_rejects_blank_passphrase() {
    let err = MasterKey::with_params("   ", test_params()).unwrap_err();
    assert!(format!("{err}").contains("master encryption key"));
}

#[test]
fn master_key_debug_redacts_passphrase() {
    let master = MasterKey::with_params("hunter2", test_params()).unwrap();
    let debug = format!("{master:?}");
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("REDACTED"));
}

#[test]
fn master_key_concurrent_use() {
    let master = Arc::new(MasterKey::with_params("threads", test_params()).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let master = Arc::clone(&master);
            thread::spawn(move || {
                let plaintext = format!("value-{i}");
                let sealed = master.seal(plaintext.as_bytes()).unwrap();
                assert_eq!(master.open(&sealed).unwrap(), plaintext.as_bytes());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn master_key_reads_many_foreign_sessions() {
    let reader = MasterKey::with_params("shared", test_params()).unwrap();
    let own = reader.seal(b"mine").unwrap();

    let sealed: Vec<Vec<u8>> = (0..80)
        .map(|i| {
            let writer = MasterKey::with_params("shared", test_params()).unwrap();
            writer.seal(format!("value-{i}").as_bytes()).unwrap()
        })
        .collect();

    for (i, bytes) in sealed.iter().enumerate() {
        assert_eq!(reader.open(bytes).unwrap(), format!("value-{i}").as_bytes());
    }
    assert_eq!(reader.open(&own).unwrap(), b"mine");
    assert_eq!(reader.open(&sealed[0]).unwrap(), b"value-0");
}
