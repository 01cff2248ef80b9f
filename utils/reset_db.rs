use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};

const TABLES: [&str; 4] = ["renders", "concepts", "projects", "seaql_migrations"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

    let db = Database::connect(database_url).await?;

    for table in TABLES {
        db.execute(Statement::from_string(
            DbBackend::Postgres,
            format!("DROP TABLE IF EXISTS \"{}\" CASCADE;", table),
        ))
        .await?;
        println!("dropped {}", table);
    }

    println!("Database reset successfully");
    Ok(())
}
