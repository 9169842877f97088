//! Basic example: compile a scope, then run it.

use std::sync::Arc;

use scopegen::prelude::*;
use tracing::info;

// === Application types ===

struct Config {
    database_url: String,
}

trait UserStore: Send + Sync {
    fn find(&self, id: u64) -> String;
}

struct Database {
    url: String,
}

impl UserStore for Database {
    fn find(&self, id: u64) -> String {
        format!("user {id} from {}", self.url)
    }
}

impl Closeable for Database {
    fn close(&self) -> std::result::Result<(), BoxError> {
        println!("[CLOSE] disconnecting from {}", self.url);
        Ok(())
    }
}

struct Report {
    user: u64,
    store: Arc<Database>,
}

// === Type metadata, as an annotation scanner would record it ===

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with_type(TypeMetadata::new("Config"))
        .with_type(TypeMetadata::new("UserStore"))
        .with_type(TypeMetadata::new("UserId"))
        .with_type(
            TypeMetadata::new("Database")
                .supertype("UserStore")
                .closeable()
                .constructor(ConstructorMeta::new(["Config"])),
        )
        .with_type(
            TypeMetadata::new("ReportFactory")
                .method(MethodMeta::new("create").param("UserId").returns("Report")),
        )
        .with_type(
            TypeMetadata::new("Report").constructor(ConstructorMeta::new(["UserId", "UserStore"])),
        )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("scopegen_compiler=debug,scopegen_runtime=debug")
        .init();

    // Compile: every dependency is checked here, before anything runs.
    let plan = ScopeBuilder::create(Arc::new(catalog()), "app", "AppScope")
        .instance("Config")
        .constructor("Database")
        .satisfy("UserStore")
        .with("Database")?
        .factory("ReportFactory")
        .compile()?;

    for slot in plan.emission_order() {
        info!(slot = %slot.identifier(), kind = %slot.kind(), "Planned");
    }

    // Run: map the plan's recipes to Rust constructors.
    let recipes = RecipeTable::new()
        .constructor("Database", |args| {
            let config = args.get::<Config>(0)?;
            Ok(Instance::closeable(Database {
                url: config.database_url.clone(),
            }))
        })
        .constructor("Report", |args| {
            Ok(Instance::new(Report {
                user: *args.get::<u64>(0)?,
                store: args.get::<Database>(1)?,
            }))
        });
    let values = ValueBindings::new().value(
        "config",
        Config {
            database_url: "postgres://localhost/myapp".to_string(),
        },
    );

    let scope = ScopeInstance::new(&plan, recipes, values)?;

    let store = scope.resolve::<Database>("userStore")?;
    println!("{}", store.find(1));

    let reports = scope.factory("reportFactory")?;
    for user in [7u64, 8] {
        let report = reports.make::<Report>(vec![Instance::new(user)])?;
        println!("report for {}: {}", report.user, report.store.find(report.user));
    }

    scope.close()?;
    Ok(())
}
