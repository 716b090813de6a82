use landing_cms::backend::{Backend, BackendError, SupabaseClient};
use landing_cms::config::BackendConfig;

#[derive(Debug, PartialEq)]
enum Outcome {
    Created,
    AlreadyRegistered,
}

fn is_already_registered(err: &BackendError) -> bool {
    err.to_string().to_lowercase().contains("already registered")
}

async fn create_admin(
    backend: &dyn Backend,
    email: &str,
    password: &str,
) -> Result<Outcome, BackendError> {
    match backend.sign_up(email, password).await {
        Ok(_) => Ok(Outcome::Created),
        Err(e) if is_already_registered(&e) => Ok(Outcome::AlreadyRegistered),
        Err(e) => Err(e),
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = BackendConfig::from_env();
    let email = non_empty_env("ADMIN_EMAIL");
    let password = non_empty_env("ADMIN_PASSWORD");

    let mut missing = config.missing();
    if email.is_none() {
        missing.push("ADMIN_EMAIL");
    }
    if password.is_none() {
        missing.push("ADMIN_PASSWORD");
    }
    let (email, password) = match (email, password) {
        (Some(email), Some(password)) if missing.is_empty() => (email, password),
        _ => {
            eprintln!("Missing required environment variables: {}", missing.join(", "));
            std::process::exit(1);
        }
    };

    let client = match SupabaseClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match create_admin(&client, &email, &password).await {
        Ok(Outcome::Created) => {
            println!("Admin user created: {}", email);
            println!("Confirm the address if email confirmation is enabled, then sign in at /admin/login.");
        }
        Ok(Outcome::AlreadyRegistered) => {
            println!("Admin user already exists: {}", email);
        }
        Err(e) => {
            eprintln!("Error creating admin user: {}", e);
            std::process::exit(1);
        }
    }
}
