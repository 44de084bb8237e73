use std::sync::Arc;

use rally::prelude::*;

const SEED_VAR: &str = "RALLY_SEED_ACCOUNTS";

// ---------------------------------------------------------------------------
// Account seeding
// ---------------------------------------------------------------------------

/// Parses `name:password,name:password`. Blank entries are skipped.
fn parse_seed(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((name, password)) if !name.is_empty() && !password.is_empty() => {
                Ok((name.to_string(), password.to_string()))
            }
            _ => Err(format!("{SEED_VAR}: expected name:password, got {entry:?}")),
        })
        .collect()
}

async fn seed_accounts(
    accounts: &AccountStore,
    credentials: &Argon2Credentials,
    raw: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    for (name, password) in parse_seed(raw)? {
        let hash = credentials.hash(&password)?;
        let id = accounts.register(&name, hash).await?;
        tracing::info!(account_id = %id, username = %name, "seeded account");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real deployments set the environment.
    dotenvy::dotenv().ok();
    rally::logging::init("rally=info,rally_session=info,rally_social=info");

    let config = ServerConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let credentials = Argon2Credentials::new();
    let accounts = Arc::new(AccountStore::new(Arc::clone(&clock)));
    if let Ok(raw) = std::env::var(SEED_VAR) {
        seed_accounts(&accounts, &credentials, &raw).await?;
    }

    let gateway = Gateway::from_config(&config, accounts, credentials, clock);
    let server = RallyServerBuilder::from_config(&config).build(gateway).await?;
    tracing::info!(addr = %server.local_addr()?, "rally demo server ready");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_reads_pairs_and_skips_blanks() {
        let seeds = parse_seed("ana:hunter22, bob:pa:ss ,").unwrap();
        assert_eq!(
            seeds,
            vec![
                ("ana".to_string(), "hunter22".to_string()),
                ("bob".to_string(), "pa:ss".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_seed_rejects_missing_password() {
        assert!(parse_seed("ana").is_err());
        assert!(parse_seed("ana:").is_err());
        assert!(parse_seed(":pw").is_err());
    }
}
