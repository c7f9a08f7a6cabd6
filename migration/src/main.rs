use std::{env, fs, path::Path};

mod runner;

/// Schema management entry point.
///
/// `migration` applies any pending migrations to the configured SQLite file,
/// `migration fresh` recreates the database from scratch, and
/// `migration clean` just deletes it.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = env::var("DATABASE_PATH").expect("DATABASE_PATH must be set");
    let url = format!("sqlite://{db_path}?mode=rwc");

    match env::args().nth(1).as_deref() {
        Some("clean") => delete_database(&db_path),
        Some("fresh") => {
            delete_database(&db_path);
            ensure_parent_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
        _ => {
            ensure_parent_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
    }
}

fn delete_database(path: &str) {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).expect("Failed to delete DB file");
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).expect("Failed to create DB directory");
    }
}
