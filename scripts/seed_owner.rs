//! Bootstrap script: creates the initial OWNER account so the API has a
//! login to start from. Safe to re-run; an existing account is left alone.
//!
//! Usage:
//!   cargo run --bin seed_owner -- --email owner@example.com --password changeme

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use uuid::Uuid;

use stitchtrack::auth::hash_password;
use stitchtrack::models::{Role, User};
use stitchtrack::storage::Storage;

#[derive(Parser, Debug)]
#[command(name = "seed_owner", about = "Create the initial OWNER account")]
struct Args {
    /// Owner login email
    #[arg(long)]
    email: String,

    /// Initial password (the owner should change it after first login)
    #[arg(long)]
    password: String,

    /// Sled data directory, same as the server's DATA_DIR
    #[arg(long, default_value = "./stitchtrack_data")]
    data_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let storage = Storage::open(&args.data_dir)?;

    let email = args.email.trim().to_lowercase();
    if let Some(existing) = storage.find_user_by_email(&email)? {
        println!("Account {} already exists ({:?}), nothing to do", email, existing.role);
        return Ok(());
    }

    if args.password.len() < 6 {
        return Err("Password must be at least 6 characters".into());
    }

    let now = Utc::now();
    let owner = User {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: hash_password(&args.password)?,
        role: Role::Owner,
        must_change_password: false,
        created_at: now,
        updated_at: now,
    };
    storage.insert_user(&owner)?;

    println!("Created OWNER account {email} (id {})", owner.id);
    Ok(())
}
