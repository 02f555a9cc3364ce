use rusqlite::Connection;
use transkv_core::db::open_db_in_memory;
use transkv_core::model::locale::with_locale;
use transkv_core::{
    translates, AccessOptions, BackendError, BackendOptions, Host, HostId, HostRef, Locale,
    LocaleError, SqliteHostRepository, SqliteTranslationRepository, Translated,
    TranslationService,
};

type Service<'conn> =
    TranslationService<SqliteTranslationRepository<'conn>, SqliteHostRepository<'conn>>;

fn service(conn: &Connection) -> Service<'_> {
    let model = translates("Post", &["title", "summary"], "key_value", &BackendOptions::new())
        .unwrap();
    TranslationService::try_new(
        model,
        SqliteTranslationRepository::try_new(conn).unwrap(),
        SqliteHostRepository::try_new(conn).unwrap(),
    )
    .unwrap()
}

fn locale(tag: &str) -> Locale {
    Locale::parse(tag).unwrap()
}

fn read_value(
    service: &Service<'_>,
    host: &mut Host,
    attribute: &str,
    tag: &str,
) -> Option<String> {
    service
        .read(host, attribute, &locale(tag), &AccessOptions::default())
        .unwrap()
        .map(|read| match read {
            Translated::Value(value) => value,
            Translated::Record(record) => panic!("unexpected record read: {record:?}"),
        })
}

#[test]
fn write_then_read_returns_value_before_and_after_save() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut post = service.create_host().unwrap();

    service
        .write(&mut post, "title", &locale("en"), Some("Hello"), &AccessOptions::default())
        .unwrap();
    assert_eq!(read_value(&service, &mut post, "title", "en").as_deref(), Some("Hello"));

    let summary = service.save(&mut post).unwrap();
    assert_eq!(summary.inserted, 1);
    assert!(!post.has_pending_changes());

    let mut reloaded = service.find_host(post.id()).unwrap().unwrap();
    assert_eq!(
        read_value(&service, &mut reloaded, "title", "en").as_deref(),
        Some("Hello")
    );
}

#[test]
fn reading_absent_locale_is_none_and_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut post = service.create_host().unwrap();

    assert_eq!(read_value(&service, &mut post, "title", "de"), None);
    assert!(post.is_translation_loaded("title", &locale("de")));
    assert!(!post.has_pending_changes());

    let summary = service.save(&mut post).unwrap();
    assert_eq!(summary.inserted, 0);
    assert_eq!(
        service
            .count_records(post.reference(), "title", &locale("de"))
            .unwrap(),
        0
    );
}

#[test]
fn repeated_writes_keep_one_row_per_locale() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let en = locale("en");
    let mut post = service.create_host().unwrap();

    service
        .write(&mut post, "title", &en, Some("a"), &AccessOptions::default())
        .unwrap();
    service.save(&mut post).unwrap();

    service
        .write(&mut post, "title", &en, Some("a"), &AccessOptions::default())
        .unwrap();
    let unchanged = service.save(&mut post).unwrap();
    assert_eq!(unchanged.inserted + unchanged.updated, 0);

    service
        .write(&mut post, "title", &en, Some("b"), &AccessOptions::default())
        .unwrap();
    let changed = service.save(&mut post).unwrap();
    assert_eq!(changed.updated, 1);
    assert_eq!(changed.inserted, 0);

    assert_eq!(service.count_records(post.reference(), "title", &en).unwrap(), 1);
    let mut reloaded = service.find_host(post.id()).unwrap().unwrap();
    assert_eq!(read_value(&service, &mut reloaded, "title", "en").as_deref(), Some("b"));
}

#[test]
fn locales_and_attributes_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut post = service.create_host().unwrap();

    service
        .write(&mut post, "title", &locale("en"), Some("A"), &AccessOptions::default())
        .unwrap();
    service
        .write(&mut post, "title", &locale("fr"), Some("B"), &AccessOptions::default())
        .unwrap();
    service
        .write(&mut post, "summary", &locale("en"), Some("S"), &AccessOptions::default())
        .unwrap();
    assert_eq!(service.save(&mut post).unwrap().inserted, 3);

    let mut reloaded = service.find_host(post.id()).unwrap().unwrap();
    assert_eq!(read_value(&service, &mut reloaded, "title", "en").as_deref(), Some("A"));
    assert_eq!(read_value(&service, &mut reloaded, "title", "fr").as_deref(), Some("B"));
    assert_eq!(read_value(&service, &mut reloaded, "summary", "en").as_deref(), Some("S"));
    assert_eq!(read_value(&service, &mut reloaded, "summary", "fr"), None);

    let other = service.create_host().unwrap();
    let mut other = service.find_host(other.id()).unwrap().unwrap();
    assert_eq!(read_value(&service, &mut other, "title", "en"), None);
}

#[test]
fn empty_string_is_stored_and_distinct_from_absent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut post = service.create_host().unwrap();

    service
        .write(&mut post, "title", &locale("en"), Some(""), &AccessOptions::default())
        .unwrap();
    service.save(&mut post).unwrap();

    let mut reloaded = service.find_host(post.id()).unwrap().unwrap();
    assert_eq!(read_value(&service, &mut reloaded, "title", "en").as_deref(), Some(""));
    assert_eq!(read_value(&service, &mut reloaded, "title", "fr"), None);
}

#[test]
fn cached_lookup_is_reused_until_fresh_read() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let en = locale("en");
    let mut post = service.create_host().unwrap();
    service
        .write(&mut post, "title", &en, Some("v1"), &AccessOptions::default())
        .unwrap();
    service.save(&mut post).unwrap();

    let mut reader = service.find_host(post.id()).unwrap().unwrap();
    assert_eq!(read_value(&service, &mut reader, "title", "en").as_deref(), Some("v1"));

    conn.execute(
        "UPDATE mobility_text_translations SET value = 'v2' WHERE key = 'title';",
        [],
    )
    .unwrap();

    assert_eq!(read_value(&service, &mut reader, "title", "en").as_deref(), Some("v1"));
    let fresh = service
        .read(&mut reader, "title", &en, &AccessOptions::fresh())
        .unwrap();
    assert_eq!(fresh, Some(Translated::Value("v2".to_string())));
}

#[test]
fn fresh_read_keeps_unsaved_write() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let en = locale("en");
    let mut post = service.create_host().unwrap();

    service
        .write(&mut post, "title", &en, Some("draft"), &AccessOptions::default())
        .unwrap();
    let read = service
        .read(&mut post, "title", &en, &AccessOptions::fresh())
        .unwrap();
    assert_eq!(read.as_ref().and_then(Translated::as_value), Some("draft"));
    assert!(post.has_pending_changes());
}

#[test]
fn writing_none_deletes_saved_record() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let en = locale("en");
    let mut post = service.create_host().unwrap();
    service
        .write(&mut post, "title", &en, Some("gone soon"), &AccessOptions::default())
        .unwrap();
    service.save(&mut post).unwrap();

    service
        .write(&mut post, "title", &en, None, &AccessOptions::default())
        .unwrap();
    assert_eq!(read_value(&service, &mut post, "title", "en"), None);
    let summary = service.save(&mut post).unwrap();
    assert_eq!(summary.deleted, 1);
    assert_eq!(service.count_records(post.reference(), "title", &en).unwrap(), 0);

    service
        .write(&mut post, "title", &en, Some("back"), &AccessOptions::default())
        .unwrap();
    assert_eq!(service.save(&mut post).unwrap().inserted, 1);
}

#[test]
fn writing_none_on_unsaved_record_discards_it() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let en = locale("en");
    let mut post = service.create_host().unwrap();

    service
        .write(&mut post, "title", &en, Some("temp"), &AccessOptions::default())
        .unwrap();
    service
        .write(&mut post, "title", &en, None, &AccessOptions::default())
        .unwrap();
    assert!(!post.has_pending_changes());
    assert_eq!(service.save(&mut post).unwrap().inserted, 0);
}

#[test]
fn current_locale_drives_ambient_accessors() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let mut post = service.create_host().unwrap();

    let err = service.read_current(&mut post, "title").unwrap_err();
    assert!(matches!(err, BackendError::Locale(LocaleError::NotSet)));

    with_locale(&locale("fr"), || {
        service
            .write_current(&mut post, "title", Some("Bonjour"))
            .unwrap();
    });
    assert_eq!(read_value(&service, &mut post, "title", "fr").as_deref(), Some("Bonjour"));
    assert_eq!(read_value(&service, &mut post, "title", "en"), None);

    let read = with_locale(&locale("fr"), || service.read_current(&mut post, "title")).unwrap();
    assert_eq!(read, Some(Translated::Value("Bonjour".to_string())));
}

#[test]
fn preload_fills_cache_for_many_hosts() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let en = locale("en");
    for title in ["one", "two"] {
        let mut post = service.create_host().unwrap();
        service
            .write(&mut post, "title", &en, Some(title), &AccessOptions::default())
            .unwrap();
        service.save(&mut post).unwrap();
    }
    service.create_host().unwrap();

    let mut hosts = service.list_hosts().unwrap();
    assert_eq!(hosts.len(), 3);
    service
        .preload(&mut hosts, "with_title_translation", &en)
        .unwrap();
    assert!(hosts
        .iter()
        .all(|host| host.is_translation_loaded("title", &en)));

    conn.execute("DELETE FROM mobility_text_translations;", [])
        .unwrap();
    let mut titles: Vec<String> = hosts
        .iter_mut()
        .filter_map(|host| read_value(&service, host, "title", "en"))
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["one".to_string(), "two".to_string()]);

    let err = service.preload(&mut hosts, "with_body", &en).unwrap_err();
    assert!(matches!(err, BackendError::UnknownScope(_)));
}

#[test]
fn unknown_attribute_and_foreign_host_type_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let en = locale("en");
    let mut post = service.create_host().unwrap();

    let err = service
        .write(&mut post, "body", &en, Some("x"), &AccessOptions::default())
        .unwrap_err();
    assert!(matches!(err, BackendError::UnknownAttribute(_)));

    let mut comment = Host::new(HostRef::new("Comment", HostId::new_v4()));
    let err = service
        .read(&mut comment, "title", &en, &AccessOptions::default())
        .unwrap_err();
    assert!(matches!(err, BackendError::HostTypeMismatch { .. }));
}
