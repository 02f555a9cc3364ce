use transkv_core::db::open_db_in_memory;
use transkv_core::{
    translates, AccessOptions, BackendError, BackendOptions, ConfigurationError, Locale,
    OptionName, RepoError, SqliteHostRepository, SqliteTranslationRepository, Translated,
    TranslationService, ValueType,
};

#[test]
fn unset_options_take_rich_text_defaults() {
    let model = translates("Post", &["content"], "action_text", &BackendOptions::new()).unwrap();
    let config = model.config();

    assert_eq!(config.association_name, "rich_text_translations");
    assert_eq!(config.class_name, "action_text_rich_texts");
    assert_eq!(config.key_column, "name");
    assert_eq!(config.value_column, "body");
    assert_eq!(config.belongs_to, "record");
    assert_eq!(config.host_type_column(), "record_type");
    assert_eq!(config.host_id_column(), "record_id");
}

#[test]
fn explicit_option_wins_over_default() {
    let options = BackendOptions::new().key_column("k");
    let model = translates("Post", &["content"], "action_text", &options).unwrap();
    let config = model.config();

    assert_eq!(config.key_column, "k");
    assert_eq!(config.value_column, "body");
    assert_eq!(config.class_name, "action_text_rich_texts");
}

#[test]
fn type_option_is_rejected_for_rich_text_before_defaulting() {
    let options = BackendOptions::new().value_type("string");
    let err = translates("Post", &["content"], "action_text", &options).unwrap_err();

    assert_eq!(
        err,
        ConfigurationError::UnsupportedOption {
            backend: "action_text".to_string(),
            option: OptionName::ValueType,
        }
    );
    assert!(err.to_string().contains("unsupported"));
}

#[test]
fn key_value_type_selects_storage_table() {
    let text = translates("Post", &["title"], "key_value", &BackendOptions::new()).unwrap();
    assert_eq!(text.config().class_name, "mobility_text_translations");
    assert_eq!(text.config().value_type, Some(ValueType::Text));

    let options = BackendOptions::new().value_type("string");
    let string = translates("Post", &["title"], "key_value", &options).unwrap();
    assert_eq!(string.config().class_name, "mobility_string_translations");
    assert_eq!(string.config().association_name, "string_translations");

    let options = BackendOptions::new().value_type("json");
    let err = translates("Post", &["title"], "key_value", &options).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
}

#[test]
fn options_parse_from_json() {
    let options: BackendOptions =
        serde_json::from_str(r#"{"key_column": "k", "class_name": "post_translations"}"#).unwrap();
    let model = translates("Post", &["content"], "action_text", &options).unwrap();
    assert_eq!(model.config().key_column, "k");
    assert_eq!(model.config().class_name, "post_translations");

    let typed: BackendOptions = serde_json::from_str(r#"{"type": "string"}"#).unwrap();
    assert!(typed.is_set(OptionName::ValueType));

    let unknown = serde_json::from_str::<BackendOptions>(r#"{"table": "x"}"#);
    assert!(unknown.is_err());
}

#[test]
fn unsafe_identifiers_and_bad_declarations_are_rejected() {
    let options = BackendOptions::new().class_name("posts; DROP TABLE hosts");
    let err = translates("Post", &["content"], "action_text", &options).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::InvalidIdentifier {
            option: OptionName::ClassName,
            ..
        }
    ));

    let err = translates("Post", &["content"], "nope", &BackendOptions::new()).unwrap_err();
    assert!(matches!(err, ConfigurationError::UnknownBackend(_)));

    let err = translates("Post", &[], "action_text", &BackendOptions::new()).unwrap_err();
    assert_eq!(err, ConfigurationError::EmptyAttributeSet);

    let err =
        translates("Post", &["content", "content"], "action_text", &BackendOptions::new())
            .unwrap_err();
    assert!(matches!(err, ConfigurationError::DuplicateAttribute(_)));
}

#[test]
fn overridden_shape_is_used_for_storage() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE post_translations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            k TEXT NOT NULL,
            body TEXT,
            locale TEXT NOT NULL,
            record_type TEXT NOT NULL,
            record_id TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();

    let options = BackendOptions::new()
        .class_name("post_translations")
        .key_column("k");
    let model = translates("Post", &["content"], "action_text", &options).unwrap();
    let service = TranslationService::try_new(
        model,
        SqliteTranslationRepository::try_new(&conn).unwrap(),
        SqliteHostRepository::try_new(&conn).unwrap(),
    )
    .unwrap();

    let en = Locale::parse("en").unwrap();
    let mut post = service.create_host().unwrap();
    service
        .write(&mut post, "content", &en, Some("hi"), &AccessOptions::default())
        .unwrap();
    service.save(&mut post).unwrap();

    let stored: String = conn
        .query_row(
            "SELECT k FROM post_translations WHERE locale = 'en';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, "content");

    let mut reloaded = service.find_host(post.id()).unwrap().unwrap();
    let read = service
        .read(&mut reloaded, "content", &en, &AccessOptions::default())
        .unwrap();
    assert_eq!(read.as_ref().and_then(Translated::as_value), Some("hi"));
}

#[test]
fn service_rejects_missing_storage_table() {
    let conn = open_db_in_memory().unwrap();
    let options = BackendOptions::new().class_name("missing_translations");
    let model = translates("Post", &["content"], "action_text", &options).unwrap();

    let result = TranslationService::try_new(
        model,
        SqliteTranslationRepository::try_new(&conn).unwrap(),
        SqliteHostRepository::try_new(&conn).unwrap(),
    );
    assert!(matches!(
        result,
        Err(BackendError::Repo(RepoError::MissingRequiredTable(_)))
    ));
}
