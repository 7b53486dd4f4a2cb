//! Deriving `Component`
//!
//! ```bash
//! cargo run --example derive --features derive
//! ```

use interface_injector::{Component, Container, Lifetime, implements};
use std::sync::Arc;

trait Config: Send + Sync {
    fn database_url(&self) -> &str;
}

trait Repository: Send + Sync {
    fn describe(&self) -> String;
}

#[derive(Component)]
#[component(lifetime = "instance-singleton")]
struct EnvConfig {
    database_url: String,
}

impl Config for EnvConfig {
    fn database_url(&self) -> &str {
        if self.database_url.is_empty() {
            "postgres://localhost/app"
        } else {
            &self.database_url
        }
    }
}

#[derive(Component)]
struct UserRepository {
    #[inject]
    config: Arc<dyn Config>,
    #[inject]
    container: Container,
    queries: u64,
}

impl Repository for UserRepository {
    fn describe(&self) -> String {
        format!(
            "users at {} ({} queries, scope depth {})",
            self.config.database_url(),
            self.queries,
            self.container.depth()
        )
    }
}

implements!(EnvConfig => dyn Config);
implements!(UserRepository => dyn Repository);

fn main() -> interface_injector::Result<()> {
    assert_eq!(<EnvConfig as Component>::LIFETIME, Lifetime::InstanceSingleton);
    println!("UserRepository depends on {:?}", UserRepository::dependencies());

    let container = Container::new();
    container.register_type::<dyn Config, EnvConfig>()?;
    container.register_type::<dyn Repository, UserRepository>()?;

    let repository = container.get::<dyn Repository>()?;
    println!("{}", repository.describe());
    Ok(())
}
