use super::*;
use serial_test::serial;
use std::collections::HashMap;
use tempfile::TempDir;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.model, "all-minilm:latest");
    assert_eq!(config.ollama.embedding_dimension, 384);
    assert_eq!(config.database.table, "chunks");
    assert_eq!(config.database.port, 5432);
    assert_eq!(config.database.password, None);
    assert_eq!(config.chunking.sentences_per_chunk, 3);
    assert_eq!(config.search.top_k, 3);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.database.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.database.user = "  ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.sentences_per_chunk = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkSize(0))
    ));

    let mut invalid_config = config;
    invalid_config.search.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));
}

#[test]
fn table_name_validation() {
    assert!(is_valid_table_name("chunks"));
    assert!(is_valid_table_name("documents"));
    assert!(is_valid_table_name("_chunks_v2"));

    assert!(!is_valid_table_name(""));
    assert!(!is_valid_table_name("2chunks"));
    assert!(!is_valid_table_name("chunks; DROP TABLE users"));
    assert!(!is_valid_table_name("public.chunks"));
    assert!(!is_valid_table_name(&"a".repeat(64)));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn password_not_serialized_when_absent() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    assert!(!toml_str.contains("password"));
}

#[test]
fn debug_output_redacts_password() {
    let database = DatabaseConfig {
        password: Some("hunter2".to_string()),
        ..DatabaseConfig::default()
    };

    let debug = format!("{:?}", database);
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("<redacted>"));
}

#[test]
fn display_url_omits_password() {
    let database = DatabaseConfig {
        password: Some("hunter2".to_string()),
        ..DatabaseConfig::default()
    };

    assert_eq!(
        database.display_url(),
        "postgres://postgres@127.0.0.1:5432/semantic_chunks"
    );
}

#[test]
fn overrides_replace_database_fields() {
    let mut database = DatabaseConfig::default();
    database
        .apply_overrides(lookup_from(&[
            ("SEMANTIC_CHUNKS_DB_HOST", "db.internal"),
            ("SEMANTIC_CHUNKS_DB_PORT", "6543"),
            ("SEMANTIC_CHUNKS_DB_NAME", "annotator"),
            ("SEMANTIC_CHUNKS_DB_USER", "indexer"),
            ("SEMANTIC_CHUNKS_DB_PASSWORD", "secret"),
            ("SEMANTIC_CHUNKS_DB_TABLE", "documents"),
        ]))
        .expect("overrides should apply");

    assert_eq!(database.host, "db.internal");
    assert_eq!(database.port, 6543);
    assert_eq!(database.name, "annotator");
    assert_eq!(database.user, "indexer");
    assert_eq!(database.password.as_deref(), Some("secret"));
    assert_eq!(database.table, "documents");
}

#[test]
fn overrides_leave_unset_fields_alone() {
    let mut database = DatabaseConfig::default();
    database
        .apply_overrides(lookup_from(&[("SEMANTIC_CHUNKS_DB_PASSWORD", "secret")]))
        .expect("overrides should apply");

    assert_eq!(database.host, DatabaseConfig::default().host);
    assert_eq!(database.password.as_deref(), Some("secret"));
}

#[test]
fn override_with_bad_port_fails() {
    let mut database = DatabaseConfig::default();
    let result = database.apply_overrides(lookup_from(&[("SEMANTIC_CHUNKS_DB_PORT", "five")]));
    assert!(matches!(result, Err(ConfigError::InvalidPortValue(_))));
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());
    assert!(config.set_embedding_dimension(768).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());
    assert!(config.set_embedding_dimension(8).is_err());

    let mut database = DatabaseConfig::default();
    assert!(database.set_host("db.example.com".to_string()).is_ok());
    assert!(database.set_port(5433).is_ok());
    assert!(database.set_name("annotator_dev".to_string()).is_ok());
    assert!(database.set_user("indexer".to_string()).is_ok());
    assert!(database.set_table("documents".to_string()).is_ok());

    assert!(database.set_host(String::new()).is_err());
    assert!(database.set_port(0).is_err());
    assert!(database.set_name(" ".to_string()).is_err());
    assert!(database.set_user(String::new()).is_err());
    assert!(database.set_table("bad name".to_string()).is_err());
    assert_eq!(database.table, "documents");
}

#[test]
#[serial]
fn load_missing_config_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load_from(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.ollama.model, "all-minilm:latest");
    assert_eq!(config.chunking.sentences_per_chunk, 3);
}

#[test]
#[serial]
fn partial_config_file_fills_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[database]\ntable = \"documents\"\n\n[chunking]\nsentences_per_chunk = 5\n",
    )
    .expect("should write config");

    let config = Config::load_from(temp_dir.path()).expect("should load config");

    assert_eq!(config.database.table, "documents");
    assert_eq!(config.database.port, 5432);
    assert_eq!(config.chunking.sentences_per_chunk, 5);
    assert_eq!(config.ollama, OllamaConfig::default());
}

#[test]
#[serial]
fn invalid_config_file_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[database]\ntable = \"chunks; drop\"\n",
    )
    .expect("should write config");

    assert!(Config::load_from(temp_dir.path()).is_err());
}

#[test]
#[serial]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let base_dir = temp_dir.path().join("nested");

    let mut config = Config {
        base_dir: base_dir.clone(),
        ..Config::default()
    };
    config.search.top_k = 7;
    config.database.table = "documents".to_string();
    config.save().expect("should save config");

    assert!(base_dir.join("config.toml").exists());

    let reloaded = Config::load_from(&base_dir).expect("should reload config");
    assert_eq!(reloaded.search.top_k, 7);
    assert_eq!(reloaded.database.table, "documents");
}
