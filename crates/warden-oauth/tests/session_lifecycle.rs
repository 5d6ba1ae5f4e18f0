//! Creating, saving and unlocking a session file through the prompts.

use tempfile::TempDir;
use warden_oauth::{
    ClientCredentials, Registration, ScriptedPrompt, SessionVault, Token, WardenError,
};

fn registration() -> Registration {
    Registration {
        authorize_endpoint: "https://login.example.com/authorize".to_string(),
        token_endpoint: "https://login.example.com/token".to_string(),
        redirect_uri: "http://localhost".to_string(),
        scope: vec!["openid".to_string(), "offline_access".to_string()],
    }
}

fn client() -> ClientCredentials {
    ClientCredentials {
        client_id: "client-1".to_string(),
        client_secret: Some("s3cret".to_string()),
    }
}

#[test]
fn test_create_save_and_unlock() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let mut create_prompt =
        ScriptedPrompt::new(["short", "abcdefghij", "abcdefghiX", "abcdefghij", "abcdefghij"]);
    let mut vault = SessionVault::create(registration(), client(), &mut create_prompt).unwrap();
    assert_eq!(create_prompt.messages.len(), 2);

    let token = Token::bearer("access-1")
        .with_refresh_token("refresh-1")
        .with_expires_at(1_900_000_000);
    vault.save(&token, Some(&path)).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("access-1"));
    assert!(!raw.contains("s3cret"));

    let mut unlock_prompt = ScriptedPrompt::new(["not-the-password", "abcdefghij"]);
    let loaded = SessionVault::load(&path, &mut unlock_prompt).unwrap();
    assert_eq!(unlock_prompt.messages, vec!["Incorrect password."]);
    assert_eq!(loaded.token, Some(token));
    assert_eq!(loaded.vault.registration(), &registration());
    assert_eq!(loaded.vault.client().client_secret.as_deref(), Some("s3cret"));
    assert_eq!(loaded.vault.path(), Some(path.as_path()));
}

#[test]
fn test_canceled_creation_is_fatal() {
    let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
    let err = SessionVault::create(registration(), client(), &mut prompt).unwrap_err();
    assert!(matches!(err, WardenError::NoPrivateKey(_)));
}
