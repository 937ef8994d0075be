//! Login, logout and status commands

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::config::Config;
use crate::session::tokens::TokenClaims;
use crate::session::{FileStorage, LogNavigator, Navigator, SessionManager};

/// Build a session backed by the on-disk session file.
pub fn open_session(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Arc<SessionManager>> {
    let path = Config::session_path()?;
    let storage = Arc::new(FileStorage::open(&path)?);
    SessionManager::new(&config.session_settings(), storage, navigator)
        .context("Failed to set up session")
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(&['\r', '\n'][..]).to_string();
    anyhow::ensure!(!password.is_empty(), "Password must not be empty");
    Ok(password)
}

/// Sign in with email and password
pub async fn login(config: &Config, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };

    let session = open_session(config, Arc::new(LogNavigator))?;
    session.routes().set_current("/login");
    let profile = session.login(email, &password).await.context("Login failed")?;

    println!("Login successful.");
    if let Some(name) = &profile.name {
        println!("Signed in as {}", name);
    }
    match profile.parsed_role() {
        Some(role) => println!("Role: {} (dashboard {})", role, role.dashboard_path()),
        None => {
            if let Some(raw) = &profile.role {
                println!("Role: {}", raw);
            }
        }
    }
    Ok(())
}

/// End the session on the backend and clear local state
pub async fn logout(config: &Config) -> Result<()> {
    let session = open_session(config, Arc::new(LogNavigator))?;
    session.logout().await;
    println!("Logged out.");
    Ok(())
}

/// Display current session status. Makes no network calls.
pub async fn status(config: &Config) -> Result<()> {
    let session = open_session(config, Arc::new(LogNavigator))?;

    match session.tokens().get_token() {
        Some(token) => match TokenClaims::decode(&token) {
            Some(claims) if claims.is_expired_at(Utc::now()) => {
                println!("Access token:   expired");
            }
            Some(claims) => {
                println!("Access token:   valid");
                if let Some(exp) = claims.expires_at() {
                    println!("  expires_at:   {}", exp);
                }
            }
            None => println!("Access token:   present"),
        },
        None => println!("Access token:   none"),
    }

    if session.has_refresh_cookie() {
        println!("Refresh cookie: present");
    } else {
        println!("Refresh cookie: none");
    }

    let profile = session.profile().load();
    if !profile.is_empty() {
        println!();
        println!("Name:           {}", profile.name.as_deref().unwrap_or("(none)"));
        println!("Email:          {}", profile.email.as_deref().unwrap_or("(none)"));
        println!("Role:           {}", profile.role.as_deref().unwrap_or("(none)"));
        if let Some(id) = &profile.national_id {
            println!("DNI:            {}", id);
        }
        if let Some(level) = &profile.level {
            println!("Level:          {}", level);
        }
        if let Some(grade) = &profile.grade {
            println!("Grade:          {}", grade);
        }
    }

    if let Some(reason) = session.logout_reason() {
        println!();
        println!("Last session ended: {}", reason.message());
    }

    Ok(())
}
