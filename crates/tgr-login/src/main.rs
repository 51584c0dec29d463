//! One-time interactive login that prints a `SESSION_STRING` for the relay.

use anyhow::anyhow;
use grammers_client::{Client, Config as ClientConfig, InitParams, SignInError};
use grammers_session::Session;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use tgr_core::config::api_credentials;

async fn prompt(
    lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>,
    message: &str,
) -> anyhow::Result<String> {
    let mut out = tokio::io::stdout();
    out.write_all(message.as_bytes()).await?;
    out.flush().await?;

    let line = lines
        .next_line()
        .await?
        .ok_or_else(|| anyhow!("stdin closed"))?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tgr_core::logging::init("tgr-login")?;

    let (api_id, api_hash) = api_credentials(|k| std::env::var(k).ok())?;

    info!("connecting to telegram");
    let client = Client::connect(ClientConfig {
        session: Session::new(),
        api_id,
        api_hash,
        params: InitParams::default(),
    })
    .await
    .map_err(|e| anyhow!("telegram connect failed: {e}"))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if !client
        .is_authorized()
        .await
        .map_err(|e| anyhow!("checking authorization failed: {e}"))?
    {
        let phone = prompt(&mut lines, "Phone number (international format): ").await?;
        let token = client
            .request_login_code(&phone)
            .await
            .map_err(|e| anyhow!("requesting login code failed: {e}"))?;
        let code = prompt(&mut lines, "Login code: ").await?;

        match client.sign_in(&token, &code).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompt(&mut lines, "Two-step verification password: ").await?;
                client
                    .check_password(password_token, password.as_str())
                    .await
                    .map_err(|e| anyhow!("password check failed: {e}"))?;
            }
            Err(e) => return Err(anyhow!("sign-in failed: {e}")),
        }
    }

    let session_string = tgr_telegram::session::encode(client.session());
    info!("login complete");

    println!();
    println!("Add this line to your .env (keep it secret):");
    println!("SESSION_STRING={session_string}");
    Ok(())
}
