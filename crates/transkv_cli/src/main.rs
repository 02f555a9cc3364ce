//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `transkv_core` wiring end to end against an in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use std::error::Error;
use transkv_core::{
    open_db_in_memory, translates, AccessOptions, BackendOptions, Locale, SqliteHostRepository,
    SqliteTranslationRepository, Translated, TranslationService,
};

fn main() -> Result<(), Box<dyn Error>> {
    println!("transkv_core version={}", transkv_core::core_version());

    let conn = open_db_in_memory()?;
    let model = translates("Post", &["content"], "action_text", &BackendOptions::new())?;
    let service = TranslationService::try_new(
        model,
        SqliteTranslationRepository::try_new(&conn)?,
        SqliteHostRepository::try_new(&conn)?,
    )?;

    let en = Locale::parse("en")?;
    let fr = Locale::parse("fr")?;
    let mut post = service.create_host()?;
    let options = AccessOptions::default();
    service.write(&mut post, "content", &en, Some("<p>Hello</p>"), &options)?;
    service.write(&mut post, "content", &fr, Some("<p>Bonjour</p>"), &options)?;
    let summary = service.save(&mut post)?;
    println!("saved inserted={}", summary.inserted);

    let mut reloaded = service
        .find_host(post.id())?
        .ok_or("saved post is missing")?;
    for locale in [&en, &fr] {
        match service.read(&mut reloaded, "content", locale, &options)? {
            Some(Translated::Record(record)) => print!("{locale}: {}", record.to_html()),
            Some(Translated::Value(value)) => println!("{locale}: {value}"),
            None => println!("{locale}: <none>"),
        }
    }
    Ok(())
}
